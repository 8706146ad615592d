pub mod config;
pub mod core;
pub mod history;
pub mod history_cmd;
pub mod storage;

use thiserror::Error;

pub use crate::core::{
    AddOptions, BenchExtras, BenchmarkResult, Delta, DeltaMap, Extras, HistoryDocument,
    HistoryOptions, MetricKey, RunExtras, RunRecord, RunResult, Snapshot,
};
pub use crate::history::BenchmarkHistory;

#[derive(Debug, Error)]
pub enum HistoryError {
    /// A requested derived metric is absent or not numeric for the current run.
    #[error(
        "no numeric property named \"{key}\" in calculated extras for currently measured benchmark named \"{benchmark}\""
    )]
    MissingCurrentExtra { benchmark: String, key: String },
    #[error("invalid history document: {0}")]
    InvalidHistory(String),
    #[error("invalid run result: {0}")]
    InvalidRun(String),
    #[error("benchmark \"{benchmark}\" ran {runs} time(s), at least {required} required")]
    InsufficientRuns {
        benchmark: String,
        runs: u64,
        required: u64,
    },
    #[error("strict mode: {0}")]
    StrictViolation(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type HistoryResult<T> = Result<T, HistoryError>;
