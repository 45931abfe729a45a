use serde::{Deserialize, Serialize};

use super::state::{ExamSession, ExamStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SectionScore {
    pub section: String,
    pub score: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub sections: Vec<SectionScore>,
    pub overall_score: usize,
    pub overall_total: usize,
}

impl ScoreReport {
    /// Truncated integer percentage; 0 when there are no questions.
    pub fn percentage(&self) -> usize {
        if self.overall_total == 0 {
            return 0;
        }
        self.overall_score * 100 / self.overall_total
    }
}

/// Pure function of the session and its bank; safe to call before or after submission.
pub fn compute_scores(session: &ExamSession) -> ScoreReport {
    let sections: Vec<SectionScore> = session
        .sections()
        .iter()
        .filter_map(|name| {
            let section = session.bank().section(name)?;
            let progress = session.progress(name)?;
            let score = section
                .questions
                .iter()
                .zip(&progress.selected)
                .filter(|(question, answer)| question.is_correct(**answer))
                .count();
            Some(SectionScore {
                section: name.clone(),
                score,
                total: section.len(),
            })
        })
        .collect();

    ScoreReport {
        overall_score: sections.iter().map(|s| s.score).sum(),
        overall_total: sections.iter().map(|s| s.total).sum(),
        sections,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Correct,
    Incorrect,
    Unanswered,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub number: usize,
    pub text: String,
    pub options: Vec<String>,
    pub correct: usize,
    pub answer: Option<usize>,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SectionReview {
    pub section: String,
    pub items: Vec<ReviewItem>,
}

/// Answer-by-answer breakdown. Only available once the session is submitted.
pub fn review(session: &ExamSession) -> Option<Vec<SectionReview>> {
    if session.status() != ExamStatus::Submitted {
        return None;
    }

    let reviews = session
        .sections()
        .iter()
        .filter_map(|name| {
            let section = session.bank().section(name)?;
            let progress = session.progress(name)?;
            let items = section
                .questions
                .iter()
                .zip(&progress.selected)
                .enumerate()
                .map(|(idx, (question, answer))| ReviewItem {
                    number: idx + 1,
                    text: question.text.clone(),
                    options: question.options.to_vec(),
                    correct: question.correct,
                    answer: *answer,
                    verdict: match answer {
                        None => Verdict::Unanswered,
                        Some(_) if question.is_correct(*answer) => Verdict::Correct,
                        Some(_) => Verdict::Incorrect,
                    },
                })
                .collect();
            Some(SectionReview {
                section: name.clone(),
                items,
            })
        })
        .collect();

    Some(reviews)
}
