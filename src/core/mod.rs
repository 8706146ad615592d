//! Core types for bench-history.
//!
//! This module contains the history document schema, store options and the
//! extras-computer traits the store is parameterized over.

pub mod extras;
pub mod options;
pub mod schema;

// Re-export key types for convenience
pub use extras::{BenchExtras, RunExtras, RunSummaryExtras, StatsExtras};
pub use options::{AddOptions, HistoryOptions};
pub use schema::{
    BenchmarkResult, Delta, DeltaMap, Extras, HistoryDocument, MetricKey, RunRecord, RunResult,
    Snapshot,
};
