//! Console adapters: parse typed commands into controller intents and render the
//! replies. No exam state lives here.

use std::fmt::Write as _;

use crate::exam::{
    Direction, ExamController, ExamSnapshot, FlaggedQuestion, NavOutcome, ScoreReport,
    SectionReview, SubmissionOutcome, Verdict,
};

pub const HELP: &str = "\
Commands:
  next | prev             move within the current section
  choose <1-4>            select an option (0 clears)
  clear                   clear the selection
  flag                    flag/unflag the current question
  flag <section> <n>      flag/unflag question n of a section
  section <name>          switch section (keeps your place)
  jump <section> <n>      go to question n of a section
  flags                   list flagged questions
  status                  show the current question
  score                   show the score of committed answers
  submit                  submit the exam
  review                  review answers after submitting
  restart                 return to login after submitting
  quit                    exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Choose(Option<usize>),
    Flag(Option<(String, usize)>),
    Section(String),
    Jump(String, usize),
    Flags,
    Status,
    Score,
    Submit,
    Review,
    Restart,
    Help,
    Quit,
}

/// `<section words...> <n>` with a 1-based question number.
fn parse_target(args: &[&str]) -> Result<(String, usize), String> {
    let (number, section) = args
        .split_last()
        .filter(|(_, section)| !section.is_empty())
        .ok_or_else(|| "expected <section> <question number>".to_string())?;
    let number: usize = number
        .parse()
        .map_err(|_| format!("'{number}' is not a question number"))?;
    if number == 0 {
        return Err("question numbers start at 1".into());
    }
    Ok((section.join(" "), number - 1))
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((head, args)) = words.split_first() else {
        return Err("type 'help' for commands".into());
    };

    match (head.to_ascii_lowercase().as_str(), args) {
        ("next" | "n", []) => Ok(Command::Next),
        ("prev" | "p", []) => Ok(Command::Prev),
        ("choose" | "c", [option]) => {
            let option: i64 = option
                .parse()
                .map_err(|_| format!("'{option}' is not an option number"))?;
            // Anything outside 1..=4 clears the answer.
            let option = usize::try_from(option)
                .ok()
                .and_then(|option| option.checked_sub(1));
            Ok(Command::Choose(option))
        }
        ("clear", []) => Ok(Command::Choose(None)),
        ("flag" | "f", []) => Ok(Command::Flag(None)),
        ("flag" | "f", target) => parse_target(target).map(|t| Command::Flag(Some(t))),
        ("section" | "s", name) if !name.is_empty() => Ok(Command::Section(name.join(" "))),
        ("jump" | "j", target) => parse_target(target).map(|(s, i)| Command::Jump(s, i)),
        ("flags", []) => Ok(Command::Flags),
        ("status", []) => Ok(Command::Status),
        ("score", []) => Ok(Command::Score),
        ("submit", []) => Ok(Command::Submit),
        ("review", []) => Ok(Command::Review),
        ("restart", []) => Ok(Command::Restart),
        ("help" | "?", _) => Ok(Command::Help),
        ("quit" | "exit", []) => Ok(Command::Quit),
        _ => Err(format!("unknown command '{}'; type 'help'", line.trim())),
    }
}

/// What the console should do after a command.
#[derive(Debug)]
pub enum Reply {
    Text(String),
    Submitted(SubmissionOutcome),
    Restart,
    Quit,
}

async fn navigate(controller: &ExamController, direction: Direction) -> Result<String, String> {
    let (outcome, snapshot) = controller
        .navigate(direction)
        .await
        .map_err(|e| e.to_string())?;
    Ok(match outcome {
        NavOutcome::EndOfSection => "You reached the end of this section.".to_string(),
        NavOutcome::Moved | NavOutcome::StartOfSection => render_snapshot(&snapshot),
    })
}

pub async fn execute(controller: &ExamController, command: Command) -> Result<Reply, String> {
    let text = match command {
        Command::Next => navigate(controller, Direction::Next).await?,
        Command::Prev => navigate(controller, Direction::Previous).await?,
        Command::Choose(option) => {
            let snapshot = controller.choose(option).await.map_err(|e| e.to_string())?;
            render_snapshot(&snapshot)
        }
        Command::Flag(None) => {
            let flagged = controller
                .toggle_current_flag()
                .await
                .map_err(|e| e.to_string())?;
            let message = if flagged { "Flagged for review." } else { "Flag removed." };
            message.to_string()
        }
        Command::Flag(Some((section, index))) => {
            let flagged = controller
                .toggle_flag(&section, index)
                .await
                .map_err(|e| e.to_string())?;
            let state = if flagged { "flagged" } else { "unflagged" };
            format!("{section} - Q{} {state}.", index + 1)
        }
        Command::Section(section) => {
            let (switched, snapshot) = controller
                .switch_section(&section)
                .await
                .map_err(|e| e.to_string())?;
            if !switched {
                return Err(format!("'{section}' is not one of your sections"));
            }
            render_snapshot(&snapshot)
        }
        Command::Jump(section, index) => {
            let snapshot = controller
                .jump_to(&section, index)
                .await
                .map_err(|e| e.to_string())?;
            render_snapshot(&snapshot)
        }
        Command::Flags => {
            let flagged = controller
                .flagged_questions()
                .await
                .map_err(|e| e.to_string())?;
            render_flags(&flagged)
        }
        Command::Status => {
            let snapshot = controller
                .snapshot()
                .await
                .ok_or_else(|| "no exam in progress".to_string())?;
            render_snapshot(&snapshot)
        }
        Command::Score => {
            let report = controller.scores().await.map_err(|e| e.to_string())?;
            render_scores(&report)
        }
        Command::Submit => {
            return match controller.submit().await.map_err(|e| e.to_string())? {
                Some(outcome) => Ok(Reply::Submitted(outcome)),
                None => Ok(Reply::Text("The exam has already been submitted.".into())),
            };
        }
        Command::Review => {
            let reviews = controller.review().await.map_err(|e| e.to_string())?;
            render_review(&reviews)
        }
        Command::Restart => return Ok(Reply::Restart),
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Reply::Quit),
    };

    Ok(Reply::Text(text))
}

pub fn render_snapshot(snapshot: &ExamSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[{}] {} - Question {}/{}{}",
        snapshot.remaining_display,
        snapshot.active_section,
        snapshot.question_index + 1,
        snapshot.question_count,
        if snapshot.flagged { "  (flagged)" } else { "" }
    );
    let _ = writeln!(out, "{}", snapshot.question_text);
    for (idx, option) in snapshot.options.iter().enumerate() {
        let marker = if snapshot.in_view == Some(idx) { "(*)" } else { "( )" };
        let _ = writeln!(out, "  {marker} {}. {option}", idx + 1);
    }
    let progress: Vec<String> = snapshot
        .sections
        .iter()
        .map(|s| format!("{} {}/{}", s.name, s.answered, s.total))
        .collect();
    let _ = write!(out, "Answered: {}", progress.join(", "));
    if snapshot.low_time {
        let _ = write!(out, "\nLess than {} left!", snapshot.remaining_display);
    }
    out
}

pub fn render_flags(flagged: &[FlaggedQuestion]) -> String {
    if flagged.is_empty() {
        return "No flagged questions.".into();
    }
    flagged
        .iter()
        .map(|f| format!("{}: {}", f.label(), f.preview))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_scores(report: &ScoreReport) -> String {
    let mut out = String::new();
    for section in &report.sections {
        let _ = writeln!(out, "  {}: {}/{}", section.section, section.score, section.total);
    }
    let _ = writeln!(
        out,
        "Total Score: {}/{}",
        report.overall_score, report.overall_total
    );
    let _ = write!(out, "Percentage: {}%", report.percentage());
    out
}

pub fn render_outcome(outcome: &SubmissionOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Exam submitted.");
    let _ = writeln!(out, "Name: {}", outcome.candidate_name);
    let _ = writeln!(out, "Roll: {}", outcome.candidate_id);
    let _ = writeln!(out, "{}", render_scores(&outcome.report));
    let _ = writeln!(out, "Time taken: {}s", outcome.elapsed_secs);
    match &outcome.persistence_warning {
        None => {
            let _ = write!(out, "Results saved to {}", outcome.results_location);
        }
        Some(warning) => {
            let _ = write!(out, "Warning: results were not saved ({warning})");
        }
    }
    out
}

pub fn render_review(reviews: &[SectionReview]) -> String {
    let mut out = String::new();
    for review in reviews {
        let _ = writeln!(out, "Section: {}", review.section);
        for item in &review.items {
            let _ = writeln!(out, "Q{}. {}", item.number, item.text);
            for (idx, option) in item.options.iter().enumerate() {
                let prefix = if idx == item.correct {
                    "✔"
                } else if item.answer == Some(idx) && item.verdict == Verdict::Incorrect {
                    "✖"
                } else {
                    " "
                };
                let _ = writeln!(out, "   {prefix} {option}");
            }
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::SectionScore;

    #[test]
    fn parses_navigation_and_answers() {
        assert_eq!(parse_command("next"), Ok(Command::Next));
        assert_eq!(parse_command("  P "), Ok(Command::Prev));
        assert_eq!(parse_command("choose 2"), Ok(Command::Choose(Some(1))));
        assert_eq!(parse_command("choose 0"), Ok(Command::Choose(None)));
        assert_eq!(parse_command("choose -1"), Ok(Command::Choose(None)));
        assert_eq!(
            parse_command("choose -9223372036854775808"),
            Ok(Command::Choose(None))
        );
        assert_eq!(parse_command("clear"), Ok(Command::Choose(None)));
        assert!(parse_command("choose two").is_err());
    }

    #[test]
    fn parses_targets_with_one_based_numbers() {
        assert_eq!(
            parse_command("jump Coding 3"),
            Ok(Command::Jump("Coding".into(), 2))
        );
        assert_eq!(
            parse_command("flag General Knowledge 1"),
            Ok(Command::Flag(Some(("General Knowledge".into(), 0))))
        );
        assert_eq!(parse_command("flag"), Ok(Command::Flag(None)));
        assert!(parse_command("jump Coding 0").is_err());
        assert!(parse_command("jump 3").is_err());
        assert_eq!(
            parse_command("section Reasoning"),
            Ok(Command::Section("Reasoning".into()))
        );
    }

    #[test]
    fn rejects_unknown_and_empty_input() {
        assert!(parse_command("").is_err());
        assert!(parse_command("dance").is_err());
        assert!(parse_command("submit now").is_err());
        assert!(parse_command("score all").is_err());
        assert_eq!(parse_command("score"), Ok(Command::Score));
    }

    #[test]
    fn renders_flag_list() {
        assert_eq!(render_flags(&[]), "No flagged questions.");
        let flagged = vec![FlaggedQuestion {
            section: "Aptitude".into(),
            index: 2,
            preview: "If train A runs".into(),
        }];
        assert_eq!(render_flags(&flagged), "Aptitude - Q3: If train A runs");
    }

    #[test]
    fn renders_score_summary() {
        let report = ScoreReport {
            sections: vec![
                SectionScore {
                    section: "Aptitude".into(),
                    score: 4,
                    total: 5,
                },
                SectionScore {
                    section: "Coding".into(),
                    score: 2,
                    total: 5,
                },
            ],
            overall_score: 6,
            overall_total: 10,
        };
        assert_eq!(
            render_scores(&report),
            "  Aptitude: 4/5\n  Coding: 2/5\nTotal Score: 6/10\nPercentage: 60%"
        );
    }
}
