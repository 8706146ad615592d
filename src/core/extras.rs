//! Extras computers: injected strategies deriving metrics from raw results.
//!
//! The history store only ever talks to these traits. Closures implement them,
//! and two built-in computers cover the common case for the CLI.

use serde_json::{Value, json};

use super::schema::{BenchmarkResult, Extras, RunResult};

/// Derives metrics from one benchmark's raw result.
pub trait BenchExtras {
    fn compute(&self, result: &BenchmarkResult) -> Extras;
}

/// Derives metrics from a whole run.
pub trait RunExtras {
    fn compute(&self, run: &RunResult) -> Value;
}

impl<F> BenchExtras for F
where
    F: Fn(&BenchmarkResult) -> Extras,
{
    fn compute(&self, result: &BenchmarkResult) -> Extras {
        self(result)
    }
}

impl<F> RunExtras for F
where
    F: Fn(&RunResult) -> Value,
{
    fn compute(&self, run: &RunResult) -> Value {
        self(run)
    }
}

/// Summary statistics over `measuredRunsMs`.
///
/// Produces `min`, `max`, `mean`, `median`, `p95` and `std`. Results without
/// raw timings produce an empty map.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsExtras;

impl BenchExtras for StatsExtras {
    fn compute(&self, result: &BenchmarkResult) -> Extras {
        let mut extras = Extras::new();
        let samples = match result.measured_runs_ms.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => return extras,
        };

        let n = samples.len();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };
        // p95: index = ceil(0.95 * n) - 1, clamped
        let p95_idx = ((0.95 * n as f64).ceil() as usize)
            .saturating_sub(1)
            .min(n - 1);

        extras.insert("min".to_string(), json!(min));
        extras.insert("max".to_string(), json!(max));
        extras.insert("mean".to_string(), json!(mean));
        extras.insert("median".to_string(), json!(median));
        extras.insert("p95".to_string(), json!(sorted[p95_idx]));
        extras.insert("std".to_string(), json!(variance.sqrt()));
        extras
    }
}

/// Run-level summary: benchmark count, filtered count, summed wall time and tool version.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummaryExtras;

impl RunExtras for RunSummaryExtras {
    fn compute(&self, run: &RunResult) -> Value {
        let total_ms: f64 = run.results.iter().map(|r| r.total_ms).sum();
        json!({
            "benchmarks": run.results.len(),
            "filtered": run.filtered.unwrap_or(0),
            "totalMs": total_ms,
            "tool": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        })
    }
}

/// Read a numeric extra, treating non-numeric values as absent.
pub(crate) fn numeric_extra(extras: &Extras, key: &str) -> Option<f64> {
    extras.get(key).and_then(Value::as_f64)
}
