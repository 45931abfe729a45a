use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TickOutcome {
    /// Clock was decremented; `low_time` is set once remaining drops to the threshold.
    Running { remaining_secs: u64, low_time: bool },
    /// Remaining was already zero when the tick fired.
    Expired,
}

/// Shared exam clock. One per session, independent of the active section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub duration_secs: u64,
    pub remaining_secs: u64,
    pub warning_threshold_secs: u64,
}

impl Countdown {
    pub fn new(duration_secs: u64, warning_threshold_secs: u64) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            warning_threshold_secs,
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.remaining_secs == 0 {
            return TickOutcome::Expired;
        }
        self.remaining_secs -= 1;
        TickOutcome::Running {
            remaining_secs: self.remaining_secs,
            low_time: self.low_time(),
        }
    }

    pub fn low_time(&self) -> bool {
        self.remaining_secs <= self.warning_threshold_secs
    }

    pub fn formatted(&self) -> String {
        format_remaining(self.remaining_secs)
    }
}

/// `MM:SS`; minutes keep counting past 59.
pub fn format_remaining(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
