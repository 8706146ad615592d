//! Wire schema for run results, history documents and deltas.
//!
//! Field names follow the camelCase layout of the persisted history document,
//! so documents written by earlier tooling load without conversion.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{HistoryError, HistoryResult};

/// Derived per-benchmark metrics, keyed by metric name.
pub type Extras = serde_json::Map<String, serde_json::Value>;

/// Benchmark name -> metric key -> delta.
pub type DeltaMap = BTreeMap<String, BTreeMap<String, Delta>>;

/// One benchmark's raw outcome as produced by the harness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    pub name: String,
    pub measured_runs_avg_ms: f64,
    pub total_ms: f64,
    pub runs_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_runs_ms: Option<Vec<f64>>,
}

/// A full harness run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RunResult {
    pub results: Vec<BenchmarkResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtered: Option<u64>,
}

/// One benchmark's recorded outcome within a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub measured_runs_avg_ms: f64,
    pub total_ms: f64,
    pub runs_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_runs_ms: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<Extras>,
}

/// One recorded run. Never mutated once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_extras: Option<serde_json::Value>,
    pub benchmarks: BTreeMap<String, RunRecord>,
}

/// The unit of persistence: every snapshot in append order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HistoryDocument {
    pub history: Vec<Snapshot>,
}

impl HistoryDocument {
    /// Parse a previously exported document and validate it.
    pub fn from_json_str(s: &str) -> HistoryResult<Self> {
        let doc: HistoryDocument = serde_json::from_str(s)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Canonical text form, indented with two spaces.
    pub fn to_json_string(&self) -> HistoryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the numeric fields a delta computation relies on.
    ///
    /// Hand-edited documents are the usual source of trouble here, so the
    /// error names the snapshot index and benchmark.
    pub fn validate(&self) -> HistoryResult<()> {
        for (idx, snapshot) in self.history.iter().enumerate() {
            for (name, record) in &snapshot.benchmarks {
                if name.trim().is_empty() {
                    return Err(HistoryError::InvalidHistory(format!(
                        "snapshot {idx}: empty benchmark name"
                    )));
                }
                record.check_durations().map_err(|e| {
                    HistoryError::InvalidHistory(format!(
                        "snapshot {idx}, benchmark \"{name}\": {e}"
                    ))
                })?;
            }
        }
        Ok(())
    }
}

impl RunRecord {
    /// Every stored duration must be finite and non-negative; anything else
    /// serializes as `null` and cannot be read back.
    pub fn check_durations(&self) -> Result<(), String> {
        check_duration("measuredRunsAvgMs", self.measured_runs_avg_ms)?;
        check_duration("totalMs", self.total_ms)?;
        for v in self.measured_runs_ms.iter().flatten() {
            check_duration("measuredRunsMs", *v)?;
        }
        Ok(())
    }
}

fn check_duration(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{field} must be a finite non-negative number, got {value}"));
    }
    Ok(())
}

/// Change of one metric relative to the matched historical record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Delta {
    /// `(current - previous) / previous`, as a fraction
    pub percent: f64,
    /// `current - previous`
    pub amount: f64,
}

impl Delta {
    pub fn between(current: f64, previous: f64) -> Self {
        let amount = current - previous;
        Delta {
            percent: amount / previous,
            amount,
        }
    }
}

/// A metric a delta can be requested for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MetricKey {
    #[default]
    MeasuredRunsAvgMs,
    TotalMs,
    /// Name of a field in the bench extras output
    Extra(String),
}

impl MetricKey {
    pub fn as_str(&self) -> &str {
        match self {
            MetricKey::MeasuredRunsAvgMs => "measuredRunsAvgMs",
            MetricKey::TotalMs => "totalMs",
            MetricKey::Extra(name) => name,
        }
    }

    pub fn extra(name: impl Into<String>) -> Self {
        MetricKey::Extra(name.into())
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(HistoryError::Message("empty metric key".to_string())),
            "measuredRunsAvgMs" => Ok(MetricKey::MeasuredRunsAvgMs),
            "totalMs" => Ok(MetricKey::TotalMs),
            other => Ok(MetricKey::Extra(other.to_string())),
        }
    }
}

impl From<&BenchmarkResult> for RunRecord {
    fn from(r: &BenchmarkResult) -> Self {
        RunRecord {
            measured_runs_avg_ms: r.measured_runs_avg_ms,
            total_ms: r.total_ms,
            runs_count: r.runs_count,
            measured_runs_ms: None,
            extras: None,
        }
    }
}
