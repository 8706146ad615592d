//! Delta computation between a live run and the recorded history.
//!
//! Matching is by benchmark name against the last snapshot (in append order)
//! that contains it. Missing history is absence, not an error; a derived metric
//! that the current run cannot produce is an error.

use std::collections::BTreeMap;

use tracing::debug;

use super::store::BenchmarkHistory;
use crate::core::extras::numeric_extra;
use crate::core::{BenchmarkResult, Delta, DeltaMap, MetricKey, RunResult};
use crate::{HistoryError, HistoryResult};

impl BenchmarkHistory {
    /// Deltas for every benchmark in `run` that has a prior record.
    ///
    /// Benchmarks without history are left out of the returned map. An empty
    /// `keys` slice means `measuredRunsAvgMs`.
    ///
    /// # Errors
    /// Returns `MissingCurrentExtra` for the first benchmark whose computed
    /// extras lack a requested derived key.
    pub fn deltas_from(&self, run: &RunResult, keys: &[MetricKey]) -> HistoryResult<DeltaMap> {
        let mut deltas = DeltaMap::new();
        for result in &run.results {
            if let Some(d) = self.delta_for_benchmark(result, keys)? {
                deltas.insert(result.name.clone(), d);
            }
        }
        debug!(
            benchmarks = run.results.len(),
            matched = deltas.len(),
            "computed deltas"
        );
        Ok(deltas)
    }

    /// Deltas for a single benchmark, or `None` if no snapshot records it.
    ///
    /// Derived keys present now but missing from the matched record are
    /// skipped: that record predates the metric.
    pub fn delta_for_benchmark(
        &self,
        result: &BenchmarkResult,
        keys: &[MetricKey],
    ) -> HistoryResult<Option<BTreeMap<String, Delta>>> {
        let Some(previous) = self.last_record_for(&result.name) else {
            debug!(benchmark = %result.name, "no prior record");
            return Ok(None);
        };

        let default_keys = [MetricKey::MeasuredRunsAvgMs];
        let keys = if keys.is_empty() { &default_keys[..] } else { keys };

        // Only computed when a derived key is requested
        let mut current_extras = None;

        let mut deltas = BTreeMap::new();
        for key in keys {
            let delta = match key {
                MetricKey::MeasuredRunsAvgMs => Delta::between(
                    result.measured_runs_avg_ms,
                    previous.measured_runs_avg_ms,
                ),
                MetricKey::TotalMs => Delta::between(result.total_ms, previous.total_ms),
                MetricKey::Extra(name) => {
                    let extras = current_extras.get_or_insert_with(|| {
                        self.bench_extras.as_ref().map(|e| e.compute(result))
                    });
                    let current = extras
                        .as_ref()
                        .and_then(|e| numeric_extra(e, name))
                        .ok_or_else(|| HistoryError::MissingCurrentExtra {
                            benchmark: result.name.clone(),
                            key: name.clone(),
                        })?;
                    let Some(prev) = previous
                        .extras
                        .as_ref()
                        .and_then(|e| numeric_extra(e, name))
                    else {
                        debug!(
                            benchmark = %result.name,
                            key = %name,
                            "key missing from history, skipped"
                        );
                        continue;
                    };
                    Delta::between(current, prev)
                }
            };
            deltas.insert(key.to_string(), delta);
        }

        Ok(Some(deltas))
    }
}
