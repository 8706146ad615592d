//! JSON file storage for history documents and harness run results.

use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::HistoryResult;
use crate::core::{HistoryDocument, RunResult};

/// Read a history document from `path`.
///
/// A missing file is an empty history, so the first run of a benchmark suite
/// needs no setup.
///
/// # Errors
/// Returns an error if the file cannot be read, is not a history document,
/// or fails validation.
pub fn read_history(path: &Path) -> HistoryResult<HistoryDocument> {
    if !path.exists() {
        debug!(path = %path.display(), "history file missing, starting empty");
        return Ok(HistoryDocument::default());
    }
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read history file {}", path.display()))?;
    HistoryDocument::from_json_str(&s)
}

/// Write a history document to `path` as canonical JSON text.
pub fn write_history(path: &Path, doc: &HistoryDocument) -> HistoryResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    let mut text = doc.to_json_string()?;
    text.push('\n');
    std::fs::write(path, text)
        .with_context(|| format!("failed to write history file {}", path.display()))?;
    debug!(path = %path.display(), snapshots = doc.history.len(), "history written");
    Ok(())
}

/// Read a harness run result from `path`.
pub fn read_run_result(path: &Path) -> HistoryResult<RunResult> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read run result {}", path.display()))?;
    Ok(serde_json::from_str(&s)?)
}
