use std::{
    fs::OpenOptions,
    path::PathBuf,
};

use chrono::{DateTime, Local};
use log::{info, warn};
use serde::Serialize;

use crate::exam::{ExamError, ExamResult, ScoreReport};

pub const RESULT_HEADER: [&str; 7] = [
    "Timestamp",
    "Name",
    "Roll",
    "Section",
    "Score",
    "TotalQuestions",
    "TimeTakenSeconds",
];

pub const OVERALL_LABEL: &str = "Overall";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ResultRow {
    pub timestamp: String,
    pub name: String,
    pub roll: String,
    pub section: String,
    pub score: usize,
    pub total_questions: usize,
    pub time_taken_seconds: u64,
}

/// Everything written for one submission. All rows share `submitted_at`.
#[derive(Debug, Clone)]
pub struct ResultBatch {
    pub submitted_at: DateTime<Local>,
    pub name: String,
    pub roll: String,
    pub elapsed_secs: u64,
    pub report: ScoreReport,
}

impl ResultBatch {
    pub fn rows(&self) -> Vec<ResultRow> {
        let timestamp = self.submitted_at.format(TIMESTAMP_FORMAT).to_string();
        let row = |section: &str, score: usize, total: usize| ResultRow {
            timestamp: timestamp.clone(),
            name: self.name.clone(),
            roll: self.roll.clone(),
            section: section.to_string(),
            score,
            total_questions: total,
            time_taken_seconds: self.elapsed_secs,
        };

        let mut rows: Vec<ResultRow> = self
            .report
            .sections
            .iter()
            .map(|s| row(&s.section, s.score, s.total))
            .collect();
        rows.push(row(
            OVERALL_LABEL,
            self.report.overall_score,
            self.report.overall_total,
        ));
        rows
    }
}

/// Append-only sink for submitted results.
pub trait ResultStore: Send + Sync {
    fn append(&self, batch: &ResultBatch) -> ExamResult<()>;

    fn location(&self) -> String;
}

/// CSV log; the header is written only when the file is created.
#[derive(Debug, Clone)]
pub struct CsvResultLog {
    path: PathBuf,
}

impl CsvResultLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn write(&self, batch: &ResultBatch) -> Result<(), csv::Error> {
        let is_new = !self.path.is_file();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(RESULT_HEADER)?;
        }
        for row in batch.rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl ResultStore for CsvResultLog {
    fn append(&self, batch: &ResultBatch) -> ExamResult<()> {
        self.write(batch).map_err(|source| ExamError::Persistence {
            path: self.path.clone(),
            source,
        })
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Writes the batch and downgrades any failure to a warning message.
pub fn persist_results(store: &dyn ResultStore, batch: &ResultBatch) -> Option<String> {
    match store.append(batch) {
        Ok(()) => {
            info!(
                "Saved results for {} ({}) to {}",
                batch.name,
                batch.roll,
                store.location()
            );
            None
        }
        Err(err) => {
            warn!("Failed to save results: {err}");
            Some(err.to_string())
        }
    }
}
