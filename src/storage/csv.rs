//! CSV export for delta maps.

use std::io::Write;
use std::path::Path;

use crate::HistoryError;
use crate::core::DeltaMap;

/// CSV column headers in deterministic order.
pub const CSV_HEADERS: &[&str] = &["benchmark", "metric", "percent", "amount"];

/// CSV exporter for delta maps.
///
/// One row per benchmark and metric, ordered by benchmark name then metric
/// key. Non-finite percentages are written as `inf`, `-inf` or `NaN`.
#[derive(Debug, Clone, Default)]
pub struct DeltaCsvExporter;

impl DeltaCsvExporter {
    pub fn new() -> Self {
        DeltaCsvExporter
    }

    /// Export deltas to a CSV file.
    ///
    /// # Errors
    /// Returns an error if file operations or CSV writing fails.
    pub fn export(&self, deltas: &DeltaMap, output: &Path) -> Result<(), HistoryError> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    HistoryError::Message(format!("failed to create directory: {e}"))
                })?;
            }
        }

        let file = std::fs::File::create(output)
            .map_err(|e| HistoryError::Message(format!("failed to create file: {e}")))?;

        self.export_to_writer(deltas, file)
    }

    /// Export deltas to any writer.
    pub fn export_to_writer<W: Write>(
        &self,
        deltas: &DeltaMap,
        writer: W,
    ) -> Result<(), HistoryError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer
            .write_record(CSV_HEADERS)
            .map_err(|e| HistoryError::Message(format!("failed to write CSV headers: {e}")))?;

        for (benchmark, metrics) in deltas {
            for (metric, delta) in metrics {
                csv_writer
                    .write_record(&[
                        benchmark.clone(),
                        metric.clone(),
                        delta.percent.to_string(),
                        delta.amount.to_string(),
                    ])
                    .map_err(|e| HistoryError::Message(format!("failed to write CSV row: {e}")))?;
            }
        }

        csv_writer
            .flush()
            .map_err(|e| HistoryError::Message(format!("failed to flush CSV writer: {e}")))?;

        Ok(())
    }
}
