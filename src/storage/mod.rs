//! Storage layer for history documents and delta exports.
//!
//! The history store itself never touches the filesystem; these helpers are
//! what the CLI uses to persist and load its state.

pub mod csv;
pub mod json;

// Re-export key types
pub use csv::{CSV_HEADERS, DeltaCsvExporter};
pub use json::{read_history, read_run_result, write_history};
