use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    bank::{QuestionBank, OPTION_COUNT},
    timer::{Countdown, TickOutcome},
};

use super::error::{ExamError, ExamResult};

const PREVIEW_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ExamStatus {
    Running,
    Submitted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Previous,
    Next,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NavOutcome {
    Moved,
    /// `Next` on the last question. Soft notice, nothing changed.
    EndOfSection,
    /// `Previous` on the first question. Nothing changed.
    StartOfSection,
}

/// Per-section position, answers and flags.
///
/// Both vectors are sized to the section's question count at creation and never
/// resized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SectionProgress {
    pub current: usize,
    pub selected: Vec<Option<usize>>,
    pub flagged: Vec<bool>,
}

impl SectionProgress {
    fn new(question_count: usize) -> Self {
        Self {
            current: 0,
            selected: vec![None; question_count],
            flagged: vec![false; question_count],
        }
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn answered_count(&self) -> usize {
        self.selected.iter().filter(|s| s.is_some()).count()
    }

    pub fn flagged_count(&self) -> usize {
        self.flagged.iter().filter(|f| **f).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedQuestion {
    pub section: String,
    pub index: usize,
    pub preview: String,
}

impl FlaggedQuestion {
    /// `"<Section> - Q<n>"`, 1-based.
    pub fn label(&self) -> String {
        format!("{} - Q{}", self.section, self.index + 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    pub name: String,
    pub total: usize,
    pub answered: usize,
    pub flagged: usize,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExamSnapshot {
    pub session_id: Uuid,
    pub candidate_name: String,
    pub candidate_id: String,
    pub status: ExamStatus,
    pub sections: Vec<SectionSummary>,
    pub active_section: String,
    pub question_index: usize,
    pub question_count: usize,
    pub question_text: String,
    pub options: Vec<String>,
    pub in_view: Option<usize>,
    pub recorded: Option<usize>,
    pub flagged: bool,
    pub remaining_secs: u64,
    pub remaining_display: String,
    pub low_time: bool,
}

#[derive(Debug, Clone)]
pub struct ExamSession {
    id: Uuid,
    bank: Arc<QuestionBank>,
    candidate_name: String,
    candidate_id: String,
    sections: Vec<String>,
    /// Aligned with `sections`.
    progress: Vec<SectionProgress>,
    active: usize,
    /// Option shown as selected for the active question; committed on every move.
    in_view: Option<usize>,
    countdown: Countdown,
    anchor: Instant,
    finished_elapsed_secs: Option<u64>,
    status: ExamStatus,
}

fn normalize(option: Option<usize>) -> Option<usize> {
    option.filter(|o| *o < OPTION_COUNT)
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

impl ExamSession {
    pub fn start(
        bank: Arc<QuestionBank>,
        name: &str,
        id: &str,
        selected: &[String],
        duration_secs: u64,
        warning_threshold_secs: u64,
    ) -> ExamResult<Self> {
        let name = name.trim();
        let id = id.trim();
        if name.is_empty() || id.is_empty() {
            return Err(ExamError::Validation(
                "Please enter both name and roll/ID.".into(),
            ));
        }

        let mut sections: Vec<String> = Vec::with_capacity(selected.len());
        for section in selected {
            if !bank.contains(section) {
                return Err(ExamError::Validation(format!("Unknown section '{section}'.")));
            }
            if !sections.contains(section) {
                sections.push(section.clone());
            }
        }
        if sections.is_empty() {
            return Err(ExamError::Validation("Select at least one section.".into()));
        }

        let progress = sections
            .iter()
            .map(|name| SectionProgress::new(bank.section(name).map_or(0, |s| s.len())))
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            bank,
            candidate_name: name.to_string(),
            candidate_id: id.to_string(),
            sections,
            progress,
            active: 0,
            in_view: None,
            countdown: Countdown::new(duration_secs, warning_threshold_secs),
            anchor: Instant::now(),
            finished_elapsed_secs: None,
            status: ExamStatus::Running,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn candidate_name(&self) -> &str {
        &self.candidate_name
    }

    pub fn candidate_id(&self) -> &str {
        &self.candidate_id
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn active_section(&self) -> &str {
        &self.sections[self.active]
    }

    pub fn progress(&self, section: &str) -> Option<&SectionProgress> {
        self.position(section).map(|idx| &self.progress[idx])
    }

    fn position(&self, section: &str) -> Option<usize> {
        self.sections.iter().position(|name| name == section)
    }

    pub fn status(&self) -> ExamStatus {
        self.status
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn in_view(&self) -> Option<usize> {
        self.in_view
    }

    /// Whole seconds since start, truncated. Frozen once the session is submitted.
    pub fn elapsed_secs(&self) -> u64 {
        self.finished_elapsed_secs
            .unwrap_or_else(|| self.anchor.elapsed().as_secs())
    }

    fn ensure_running(&self) -> ExamResult<()> {
        match self.status {
            ExamStatus::Running => Ok(()),
            ExamStatus::Submitted => Err(ExamError::SessionClosed),
        }
    }

    fn active_progress(&self) -> &SectionProgress {
        &self.progress[self.active]
    }

    fn active_progress_mut(&mut self) -> &mut SectionProgress {
        &mut self.progress[self.active]
    }

    fn reload_in_view(&mut self) {
        let progress = self.active_progress();
        self.in_view = progress.selected[progress.current];
    }

    fn commit_in_view(&mut self) {
        let option = self.in_view;
        let progress = self.active_progress_mut();
        let current = progress.current;
        progress.selected[current] = option;
    }

    /// Sets the in-view selection without committing it.
    pub fn choose(&mut self, option: Option<usize>) -> ExamResult<()> {
        self.ensure_running()?;
        self.in_view = normalize(option);
        Ok(())
    }

    /// Writes `option` for the active question. Out-of-range options clear the answer.
    pub fn record_answer(&mut self, option: Option<usize>) -> ExamResult<()> {
        self.ensure_running()?;
        self.in_view = normalize(option);
        self.commit_in_view();
        Ok(())
    }

    pub fn navigate(&mut self, direction: Direction) -> ExamResult<NavOutcome> {
        self.ensure_running()?;
        self.commit_in_view();

        let progress = self.active_progress_mut();
        let outcome = match direction {
            Direction::Next if progress.current + 1 < progress.len() => {
                progress.current += 1;
                NavOutcome::Moved
            }
            Direction::Next => NavOutcome::EndOfSection,
            Direction::Previous if progress.current > 0 => {
                progress.current -= 1;
                NavOutcome::Moved
            }
            Direction::Previous => NavOutcome::StartOfSection,
        };

        self.reload_in_view();
        Ok(outcome)
    }

    /// Returns `false` without touching state when `section` was not selected.
    pub fn switch_section(&mut self, section: &str) -> ExamResult<bool> {
        self.ensure_running()?;
        let Some(position) = self.position(section) else {
            return Ok(false);
        };

        self.commit_in_view();
        self.active = position;
        self.reload_in_view();
        Ok(true)
    }

    pub fn jump_to(&mut self, section: &str, index: usize) -> ExamResult<()> {
        self.ensure_running()?;
        let position = self
            .position(section)
            .filter(|&idx| index < self.progress[idx].len())
            .ok_or_else(|| ExamError::OutOfRange {
                section: section.to_string(),
                index,
            })?;

        self.commit_in_view();
        self.active = position;
        self.active_progress_mut().current = index;
        self.reload_in_view();
        Ok(())
    }

    /// Flips the flag on any selected question, not only the active one. Returns the new value.
    pub fn toggle_flag(&mut self, section: &str, index: usize) -> ExamResult<bool> {
        self.ensure_running()?;
        let flag = self
            .position(section)
            .and_then(|idx| self.progress[idx].flagged.get_mut(index))
            .ok_or_else(|| ExamError::OutOfRange {
                section: section.to_string(),
                index,
            })?;
        *flag = !*flag;
        Ok(*flag)
    }

    pub fn toggle_current_flag(&mut self) -> ExamResult<bool> {
        self.ensure_running()?;
        let progress = self.active_progress_mut();
        let current = progress.current;
        progress.flagged[current] = !progress.flagged[current];
        Ok(progress.flagged[current])
    }

    pub fn flagged_questions(&self) -> Vec<FlaggedQuestion> {
        let mut flagged = Vec::new();
        for (name, progress) in self.sections.iter().zip(&self.progress) {
            let Some(section) = self.bank.section(name) else {
                continue;
            };
            for (index, _) in progress.flagged.iter().enumerate().filter(|(_, f)| **f) {
                flagged.push(FlaggedQuestion {
                    section: name.clone(),
                    index,
                    preview: preview(&section.questions[index].text),
                });
            }
        }
        flagged
    }

    /// Advances the shared clock by one tick. Ignored once the session has left `Running`.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if self.status != ExamStatus::Running {
            return None;
        }
        Some(self.countdown.tick())
    }

    /// `Running -> Submitted`. Commits the in-view answer and freezes elapsed time.
    /// Returns `false` if the session was already closed, which makes submission idempotent.
    pub fn close(&mut self) -> bool {
        if self.status != ExamStatus::Running {
            return false;
        }
        self.commit_in_view();
        self.finished_elapsed_secs = Some(self.anchor.elapsed().as_secs());
        self.status = ExamStatus::Submitted;
        true
    }

    pub fn snapshot(&self) -> ExamSnapshot {
        let progress = self.active_progress();
        let question = self
            .bank
            .section(self.active_section())
            .and_then(|section| section.questions.get(progress.current));

        let sections = self
            .sections
            .iter()
            .zip(&self.progress)
            .map(|(name, p)| SectionSummary {
                name: name.clone(),
                total: p.len(),
                answered: p.answered_count(),
                flagged: p.flagged_count(),
            })
            .collect();

        ExamSnapshot {
            session_id: self.id,
            candidate_name: self.candidate_name.clone(),
            candidate_id: self.candidate_id.clone(),
            status: self.status,
            sections,
            active_section: self.active_section().to_string(),
            question_index: progress.current,
            question_count: progress.len(),
            question_text: question.map(|q| q.text.clone()).unwrap_or_default(),
            options: question.map(|q| q.options.to_vec()).unwrap_or_default(),
            in_view: self.in_view,
            recorded: progress.selected[progress.current],
            flagged: progress.flagged[progress.current],
            remaining_secs: self.countdown.remaining_secs,
            remaining_display: self.countdown.formatted(),
            low_time: self.countdown.low_time(),
        }
    }
}
