pub mod bank;
pub mod commands;
pub mod exam;
pub mod results;
pub mod settings;
pub mod timer;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::{
    io::{self, AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::mpsc::{self, UnboundedReceiver},
};

use commands::{execute, parse_command, render_outcome, render_snapshot, Reply};
use exam::{ExamController, ExamEvent};
use results::CsvResultLog;
use settings::ExamSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Name,
    Roll,
    Sections,
    Exam,
    Submitted,
}

struct Console {
    controller: ExamController,
    settings: ExamSettings,
    stage: Stage,
    name: String,
    roll: String,
}

impl Console {
    fn prompt(&self) {
        match self.stage {
            Stage::Name => println!("Full name:"),
            Stage::Roll => println!("Roll/ID:"),
            Stage::Sections => {
                let names = self.controller.bank().section_names();
                println!(
                    "Choose sections, comma separated (default: all): {}",
                    names.join(", ")
                );
            }
            Stage::Exam | Stage::Submitted => {}
        }
    }

    fn welcome(&self) {
        println!("SmartExam - Multi-Section");
        println!("Total Duration: {} minutes", self.settings.duration_minutes);
        println!("Timer is shared across sections. Type 'help' during the exam for commands.");
    }

    fn resolve_sections(&self, line: &str) -> Vec<String> {
        let bank = self.controller.bank();
        if line.trim().is_empty() {
            return bank.section_names();
        }
        line.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                bank.sections()
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(name))
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| name.to_string())
            })
            .collect()
    }

    /// Returns `false` when the console should exit.
    async fn handle_line(&mut self, line: &str) -> bool {
        match self.stage {
            Stage::Name => {
                self.name = line.trim().to_string();
                self.stage = Stage::Roll;
            }
            Stage::Roll => {
                self.roll = line.trim().to_string();
                if self.name.is_empty() || self.roll.is_empty() {
                    println!("Please enter both name and roll/ID.");
                    self.stage = Stage::Name;
                } else {
                    self.stage = Stage::Sections;
                }
            }
            Stage::Sections => {
                let sections = self.resolve_sections(line);
                match self
                    .controller
                    .start_exam(&self.name, &self.roll, &sections)
                    .await
                {
                    Ok(snapshot) => {
                        self.stage = Stage::Exam;
                        println!("{}", render_snapshot(&snapshot));
                    }
                    Err(err) => println!("{err}"),
                }
            }
            Stage::Exam | Stage::Submitted => {
                let command = match parse_command(line) {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{message}");
                        return true;
                    }
                };
                match execute(&self.controller, command).await {
                    Ok(Reply::Text(text)) => println!("{text}"),
                    Ok(Reply::Submitted(outcome)) => {
                        self.stage = Stage::Submitted;
                        println!("{}", render_outcome(&outcome));
                        println!("Type 'review' to see your answers or 'restart' to return to login.");
                    }
                    Ok(Reply::Restart) if self.stage == Stage::Submitted => {
                        self.controller.reset().await;
                        self.name.clear();
                        self.roll.clear();
                        self.stage = Stage::Name;
                    }
                    Ok(Reply::Restart) => println!("Submit the exam before returning to login."),
                    Ok(Reply::Quit) => return false,
                    Err(message) => println!("{message}"),
                }
            }
        }
        self.prompt();
        true
    }

    fn handle_event(&mut self, event: ExamEvent) {
        match event {
            ExamEvent::Heartbeat {
                remaining_display, ..
            } => println!("[{remaining_display} remaining]"),
            ExamEvent::LowTime { remaining_secs } => {
                println!("Hurry up: {} minutes left.", remaining_secs.div_ceil(60));
            }
            ExamEvent::TimeExpired { outcome } => {
                self.stage = Stage::Submitted;
                println!("Time is over. The exam was submitted automatically.");
                println!("{}", render_outcome(&outcome));
                println!("Type 'review' to see your answers or 'restart' to return to login.");
            }
        }
    }

    async fn run(
        mut self,
        mut lines: Lines<BufReader<Stdin>>,
        mut events: UnboundedReceiver<ExamEvent>,
    ) -> Result<()> {
        self.welcome();
        self.prompt();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("failed to read from stdin")? else {
                        break;
                    };
                    if !self.handle_line(&line).await {
                        break;
                    }
                }
                Some(event) = events.recv() => self.handle_event(event),
            }
        }

        self.controller.shutdown().await;
        Ok(())
    }
}

pub async fn run() -> Result<()> {
    // Warnings by default; RUST_LOG overrides.
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let settings = ExamSettings::from_env().context("failed to load settings")?;
    let bank = settings.question_bank().context("failed to load question bank")?;
    let store = Arc::new(CsvResultLog::new(settings.results_path.clone()));
    if settings.warning_threshold_secs >= settings.duration_secs() {
        warn!("Warning threshold covers the whole exam; the low-time flag will be set from the start");
    }

    info!(
        "SmartExam starting: {} sections, {} minutes, results in {}",
        bank.sections().len(),
        settings.duration_minutes,
        settings.results_path.display()
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let controller = ExamController::new(bank, store, &settings, events_tx);

    let console = Console {
        controller,
        settings,
        stage: Stage::Name,
        name: String::new(),
        roll: String::new(),
    };

    let lines = BufReader::new(io::stdin()).lines();
    console.run(lines, events_rx).await
}
