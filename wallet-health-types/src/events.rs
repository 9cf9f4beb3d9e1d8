use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Per-item progress through a sweep, burn or refuel batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BatchItemState {
    Pending,
    Signing,
    Submitting,
    Confirmed,
    Failed,
}

impl BatchItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchItemState::Confirmed | BatchItemState::Failed)
    }
}

impl fmt::Display for BatchItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchItemState::Pending => "pending",
            BatchItemState::Signing => "signing",
            BatchItemState::Submitting => "submitting",
            BatchItemState::Confirmed => "confirmed",
            BatchItemState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemEvent {
    pub batch_id: Uuid,
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub state: BatchItemState,
    pub signature: Option<String>,
    pub details: Option<String>, // e.g., error message on failure
    pub timestamp: DateTime<Utc>,
}

impl BatchItemEvent {
    /// Status line in the "Sweeping X... (i/n)" form.
    pub fn status_line(&self) -> String {
        format!("{} {} ({}/{})", self.state, self.label, self.index + 1, self.total)
    }
}
