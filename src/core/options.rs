use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Options controlling what a history store records and accepts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HistoryOptions {
    /// Keep the raw per-iteration timings in each record
    pub save_individual_runs: bool,
    /// Reject runs where any benchmark ran fewer times than this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_required_runs: Option<u64>,
    /// Accepted but not enforced: run results carry no timer-precision information
    pub only_hr_time: bool,
    /// Require each run to match the previous snapshot's benchmark set and run counts
    pub strict: bool,
}

/// Per-append metadata for a snapshot.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub id: Option<String>,
    /// Defaults to the current UTC time
    pub date: Option<OffsetDateTime>,
}

impl AddOptions {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_date(mut self, date: OffsetDateTime) -> Self {
        self.date = Some(date);
        self
    }
}
