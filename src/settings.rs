use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::bank::{builtin_bank, QuestionBank};

pub const SETTINGS_ENV: &str = "SMARTEXAM_SETTINGS";
const DEFAULT_SETTINGS_FILE: &str = "smartexam.json";

/// Fixed at startup; never reloaded while an exam is running.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExamSettings {
    pub duration_minutes: u64,
    pub warning_threshold_secs: u64,
    pub results_path: PathBuf,
    pub question_bank_path: Option<PathBuf>,
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            duration_minutes: 30,
            warning_threshold_secs: 300,
            results_path: PathBuf::from("results.csv"),
            question_bank_path: None,
        }
    }
}

impl ExamSettings {
    /// Reads `path` if it exists; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings {}", path.display()))
    }

    /// `$SMARTEXAM_SETTINGS`, falling back to `smartexam.json` in the working directory.
    pub fn from_env() -> Result<Self> {
        let path = env::var_os(SETTINGS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
        Self::load(&path)
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_minutes.saturating_mul(60)
    }

    pub fn question_bank(&self) -> Result<Arc<QuestionBank>> {
        let bank = match &self.question_bank_path {
            Some(path) => QuestionBank::load(path)?,
            None => builtin_bank(),
        };
        Ok(Arc::new(bank))
    }
}
