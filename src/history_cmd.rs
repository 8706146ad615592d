//! CLI command handlers for `add`, `deltas`, `show` and `validate`.
//!
//! Each handler loads the history file, drives the store, and writes results
//! back out. Progress goes to stderr; machine-readable output to stdout.

use std::path::PathBuf;

use anyhow::Context;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

use crate::config::{HistoryConfig, load_config};
use crate::core::{AddOptions, DeltaMap, MetricKey};
use crate::storage::{DeltaCsvExporter, read_history, read_run_result, write_history};
use crate::{HistoryError, HistoryResult};

fn config_or_default(config: Option<PathBuf>) -> HistoryResult<HistoryConfig> {
    match config {
        Some(path) => load_config(&path),
        None => Ok(HistoryConfig::default()),
    }
}

/// Parse an RFC 3339 timestamp such as `2024-01-15T12:00:00Z`.
pub fn parse_date(s: &str) -> HistoryResult<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339)
        .map_err(|e| HistoryError::Message(format!("invalid date \"{s}\": {e}")))
}

/// Run the `add` command: append a run result to the history file.
pub fn add(
    history_path: PathBuf,
    results_path: PathBuf,
    id: Option<String>,
    date: Option<String>,
    config: Option<PathBuf>,
) -> HistoryResult<()> {
    let cfg = config_or_default(config)?;
    let run = read_run_result(&results_path)?;
    let mut history = cfg.build_history(read_history(&history_path)?)?;

    let opts = AddOptions {
        id,
        date: date.as_deref().map(parse_date).transpose()?,
    };
    history.add_results(&run, opts)?;

    write_history(&history_path, history.document())?;
    info!(
        snapshots = history.len(),
        path = %history_path.display(),
        "history updated"
    );
    Ok(())
}

/// Run the `deltas` command: compare a run result against the history file.
///
/// With neither `json_out` nor `csv_out`, the delta map is printed to stdout
/// as JSON.
pub fn deltas(
    history_path: PathBuf,
    results_path: PathBuf,
    keys: Vec<String>,
    config: Option<PathBuf>,
    json_out: Option<PathBuf>,
    csv_out: Option<PathBuf>,
) -> HistoryResult<DeltaMap> {
    let cfg = config_or_default(config)?;
    let run = read_run_result(&results_path)?;
    let history = cfg.build_history(read_history(&history_path)?)?;

    let keys = keys
        .iter()
        .map(|k| k.parse::<MetricKey>())
        .collect::<HistoryResult<Vec<_>>>()?;
    let deltas = history.deltas_from(&run, &keys)?;

    let text = serde_json::to_string_pretty(&deltas)?;
    if let Some(path) = &json_out {
        std::fs::write(path, &text)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote deltas JSON");
    }
    if let Some(path) = &csv_out {
        DeltaCsvExporter::new().export(&deltas, path)?;
        info!(path = %path.display(), "wrote deltas CSV");
    }
    if json_out.is_none() && csv_out.is_none() {
        println!("{text}");
    }
    Ok(deltas)
}

/// Run the `show` command: print the canonical history text.
pub fn show(history_path: PathBuf) -> HistoryResult<()> {
    let doc = read_history(&history_path)?;
    println!("{}", doc.to_json_string()?);
    Ok(())
}

/// Run the `validate` command. Returns the snapshot count.
pub fn validate(history_path: PathBuf) -> HistoryResult<usize> {
    if !history_path.exists() {
        return Err(HistoryError::Message(format!(
            "history file not found: {}",
            history_path.display()
        )));
    }
    let doc = read_history(&history_path)?;
    eprintln!(
        "{}: {} snapshot(s), valid",
        history_path.display(),
        doc.history.len()
    );
    Ok(doc.history.len())
}
