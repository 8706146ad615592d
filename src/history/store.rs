//! Append-only store of run snapshots.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::core::{
    AddOptions, BenchExtras, HistoryDocument, HistoryOptions, RunExtras, RunRecord, RunResult,
    Snapshot,
};
use crate::{HistoryError, HistoryResult};

/// Benchmark history: the ordered snapshot list plus the options and extras
/// computers used when appending.
///
/// Append order is the only notion of "more recent" the store has; snapshots
/// are never re-sorted by date.
pub struct BenchmarkHistory {
    pub(super) data: HistoryDocument,
    pub(super) options: HistoryOptions,
    pub(super) bench_extras: Option<Box<dyn BenchExtras>>,
    pub(super) run_extras: Option<Box<dyn RunExtras>>,
}

impl fmt::Debug for BenchmarkHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkHistory")
            .field("snapshots", &self.data.history.len())
            .field("options", &self.options)
            .field("bench_extras", &self.bench_extras.is_some())
            .field("run_extras", &self.run_extras.is_some())
            .finish()
    }
}

impl BenchmarkHistory {
    /// Create a store over an existing (possibly empty) document.
    ///
    /// # Errors
    /// Returns `InvalidHistory` if the document fails validation.
    pub fn new(options: HistoryOptions, document: HistoryDocument) -> HistoryResult<Self> {
        document.validate()?;
        debug!(snapshots = document.history.len(), "history loaded");
        Ok(Self::from_parts(options, document))
    }

    /// Create a store with no snapshots.
    pub fn empty(options: HistoryOptions) -> Self {
        Self::from_parts(options, HistoryDocument::default())
    }

    fn from_parts(options: HistoryOptions, data: HistoryDocument) -> Self {
        if options.only_hr_time {
            warn!("only_hr_time is not enforced: run results carry no timer precision");
        }
        BenchmarkHistory {
            data,
            options,
            bench_extras: None,
            run_extras: None,
        }
    }

    /// Set the per-benchmark extras computer.
    pub fn with_bench_extras(mut self, extras: impl BenchExtras + 'static) -> Self {
        self.bench_extras = Some(Box::new(extras));
        self
    }

    /// Set the run-level extras computer.
    pub fn with_run_extras(mut self, extras: impl RunExtras + 'static) -> Self {
        self.run_extras = Some(Box::new(extras));
        self
    }

    pub fn options(&self) -> &HistoryOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.data.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.history.is_empty()
    }

    /// Record a completed run as a new snapshot at the end of the history.
    ///
    /// # Errors
    /// Returns `InvalidRun` when a duration to be stored is negative or not
    /// finite, and `InsufficientRuns` or `StrictViolation` when the run is
    /// rejected by the configured options. A rejected run leaves the store
    /// unchanged.
    pub fn add_results(&mut self, run: &RunResult, opts: AddOptions) -> HistoryResult<&mut Self> {
        self.check_min_runs(run)?;
        if self.options.strict {
            self.check_strict(run)?;
        }

        let date = opts.date.unwrap_or_else(OffsetDateTime::now_utc);

        let mut benchmarks = BTreeMap::new();
        for r in &run.results {
            let mut record = RunRecord::from(r);
            if self.options.save_individual_runs {
                record.measured_runs_ms = r.measured_runs_ms.clone();
            }
            record
                .check_durations()
                .map_err(|e| HistoryError::InvalidRun(format!("benchmark \"{}\": {e}", r.name)))?;
            record.extras = self.bench_extras.as_ref().map(|e| e.compute(r));
            // Duplicate names: last one wins
            benchmarks.insert(r.name.clone(), record);
        }

        let run_extras = self.run_extras.as_ref().map(|e| e.compute(run));

        info!(
            benchmarks = benchmarks.len(),
            id = opts.id.as_deref().unwrap_or(""),
            "appending snapshot"
        );
        self.data.history.push(Snapshot {
            date,
            id: opts.id,
            run_extras,
            benchmarks,
        });

        Ok(self)
    }

    /// The most recently appended record for `name`, if any snapshot has one.
    pub fn last_record_for(&self, name: &str) -> Option<&RunRecord> {
        self.data
            .history
            .iter()
            .rev()
            .find_map(|s| s.benchmarks.get(name))
    }

    /// Read-only view of the current document.
    pub fn document(&self) -> &HistoryDocument {
        &self.data
    }

    /// Deep copy of the current document.
    pub fn export(&self) -> HistoryDocument {
        self.data.clone()
    }

    /// Canonical JSON text of the current document.
    pub fn export_string(&self) -> HistoryResult<String> {
        self.data.to_json_string()
    }

    fn check_min_runs(&self, run: &RunResult) -> HistoryResult<()> {
        let Some(required) = self.options.min_required_runs else {
            return Ok(());
        };
        match run.results.iter().find(|r| r.runs_count < required) {
            Some(r) => Err(HistoryError::InsufficientRuns {
                benchmark: r.name.clone(),
                runs: r.runs_count,
                required,
            }),
            None => Ok(()),
        }
    }

    fn check_strict(&self, run: &RunResult) -> HistoryResult<()> {
        let Some(last) = self.data.history.last() else {
            return Ok(());
        };

        let current: BTreeMap<&str, u64> = run
            .results
            .iter()
            .map(|r| (r.name.as_str(), r.runs_count))
            .collect();
        let previous: BTreeSet<&str> = last.benchmarks.keys().map(String::as_str).collect();

        if let Some(removed) = previous.iter().find(|n| !current.contains_key(*n)) {
            return Err(HistoryError::StrictViolation(format!(
                "benchmark \"{removed}\" was removed since the last snapshot"
            )));
        }
        if let Some(added) = current.keys().find(|n| !previous.contains(*n)) {
            return Err(HistoryError::StrictViolation(format!(
                "benchmark \"{added}\" is new since the last snapshot"
            )));
        }
        for (name, runs) in &current {
            let prev_runs = last.benchmarks[*name].runs_count;
            if *runs != prev_runs {
                return Err(HistoryError::StrictViolation(format!(
                    "benchmark \"{name}\" changed runs count from {prev_runs} to {runs}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BenchmarkResult, RunSummaryExtras, StatsExtras};
    use serde_json::json;

    fn bench(name: &str, avg: f64, runs: u64) -> BenchmarkResult {
        BenchmarkResult {
            name: name.to_string(),
            measured_runs_avg_ms: avg,
            total_ms: avg * runs as f64,
            runs_count: runs,
            measured_runs_ms: Some(vec![avg; runs as usize]),
        }
    }

    fn run(results: Vec<BenchmarkResult>) -> RunResult {
        RunResult {
            results,
            filtered: None,
        }
    }

    #[test]
    fn test_history_len_tracks_appends() {
        let mut history = BenchmarkHistory::empty(HistoryOptions::default());
        assert!(history.is_empty());

        let r = run(vec![bench("a", 1.0, 3)]);
        history
            .add_results(&r, AddOptions::default())
            .unwrap()
            .add_results(&r, AddOptions::default())
            .unwrap()
            .add_results(&r, AddOptions::default())
            .unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history.document().history.len(), 3);
    }

    #[test]
    fn test_add_results_records_metadata() {
        let mut history = BenchmarkHistory::empty(HistoryOptions::default());
        let date = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        history
            .add_results(
                &run(vec![bench("a", 2.0, 4)]),
                AddOptions::default().with_id("v1").with_date(date),
            )
            .unwrap();

        let snap = &history.document().history[0];
        assert_eq!(snap.id.as_deref(), Some("v1"));
        assert_eq!(snap.date, date);
        assert!(snap.run_extras.is_none());

        let rec = &snap.benchmarks["a"];
        assert_eq!(rec.measured_runs_avg_ms, 2.0);
        assert_eq!(rec.total_ms, 8.0);
        assert_eq!(rec.runs_count, 4);
        // Not saved unless configured
        assert!(rec.measured_runs_ms.is_none());
        assert!(rec.extras.is_none());
    }

    #[test]
    fn test_save_individual_runs() {
        let opts = HistoryOptions {
            save_individual_runs: true,
            ..Default::default()
        };
        let mut history = BenchmarkHistory::empty(opts);
        history
            .add_results(&run(vec![bench("a", 2.0, 3)]), AddOptions::default())
            .unwrap();
        let rec = &history.document().history[0].benchmarks["a"];
        assert_eq!(rec.measured_runs_ms, Some(vec![2.0, 2.0, 2.0]));
    }

    #[test]
    fn test_extras_computed_when_configured() {
        let mut history = BenchmarkHistory::empty(HistoryOptions::default())
            .with_bench_extras(StatsExtras)
            .with_run_extras(RunSummaryExtras);
        history
            .add_results(&run(vec![bench("a", 2.0, 3)]), AddOptions::default())
            .unwrap();

        let snap = &history.document().history[0];
        assert_eq!(snap.run_extras.as_ref().unwrap()["benchmarks"], json!(1));
        let extras = snap.benchmarks["a"].extras.as_ref().unwrap();
        assert_eq!(extras["max"], json!(2.0));
        assert_eq!(extras["std"], json!(0.0));
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let mut history = BenchmarkHistory::empty(HistoryOptions::default());
        history
            .add_results(
                &run(vec![bench("dup", 1.0, 2), bench("dup", 5.0, 2)]),
                AddOptions::default(),
            )
            .unwrap();
        let snap = &history.document().history[0];
        assert_eq!(snap.benchmarks.len(), 1);
        assert_eq!(snap.benchmarks["dup"].measured_runs_avg_ms, 5.0);
    }

    #[test]
    fn test_last_record_uses_append_order() {
        let mut history = BenchmarkHistory::empty(HistoryOptions::default());
        let later = OffsetDateTime::from_unix_timestamp(2_000_000_000).unwrap();
        let earlier = OffsetDateTime::from_unix_timestamp(1_000_000_000).unwrap();
        history
            .add_results(
                &run(vec![bench("a", 1.0, 2)]),
                AddOptions::default().with_date(later),
            )
            .unwrap()
            .add_results(
                &run(vec![bench("a", 3.0, 2)]),
                AddOptions::default().with_date(earlier),
            )
            .unwrap()
            .add_results(&run(vec![bench("b", 9.0, 2)]), AddOptions::default())
            .unwrap();

        // The earlier-dated snapshot was appended last, so it wins.
        assert_eq!(
            history.last_record_for("a").unwrap().measured_runs_avg_ms,
            3.0
        );
        assert!(history.last_record_for("missing").is_none());
    }

    #[test]
    fn test_min_required_runs_rejects_run() {
        let opts = HistoryOptions {
            min_required_runs: Some(5),
            ..Default::default()
        };
        let mut history = BenchmarkHistory::empty(opts);
        let err = history
            .add_results(
                &run(vec![bench("ok", 1.0, 5), bench("short", 1.0, 2)]),
                AddOptions::default(),
            )
            .unwrap_err();
        match err {
            HistoryError::InsufficientRuns {
                benchmark,
                runs,
                required,
            } => {
                assert_eq!(benchmark, "short");
                assert_eq!(runs, 2);
                assert_eq!(required, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(history.is_empty());
    }

    #[test]
    fn test_strict_mode() {
        let opts = HistoryOptions {
            strict: true,
            ..Default::default()
        };
        let mut history = BenchmarkHistory::empty(opts);
        history
            .add_results(
                &run(vec![bench("a", 1.0, 3), bench("b", 1.0, 3)]),
                AddOptions::default(),
            )
            .unwrap();

        let removed = history.add_results(&run(vec![bench("a", 1.0, 3)]), AddOptions::default());
        assert!(removed.unwrap_err().to_string().contains("removed"));

        let added = history.add_results(
            &run(vec![bench("a", 1.0, 3), bench("b", 1.0, 3), bench("c", 1.0, 3)]),
            AddOptions::default(),
        );
        assert!(added.unwrap_err().to_string().contains("new"));

        let changed = history.add_results(
            &run(vec![bench("a", 1.0, 3), bench("b", 1.0, 4)]),
            AddOptions::default(),
        );
        assert!(changed.unwrap_err().to_string().contains("runs count"));

        assert_eq!(history.len(), 1);
        history
            .add_results(
                &run(vec![bench("b", 2.0, 3), bench("a", 2.0, 3)]),
                AddOptions::default(),
            )
            .unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_non_finite_run_rejected() {
        let mut history = BenchmarkHistory::empty(HistoryOptions::default());
        history
            .add_results(&run(vec![bench("a", 1.0, 2)]), AddOptions::default())
            .unwrap();

        // A harness reporting zero runs yields a 0/0 average
        let empty_bench = BenchmarkResult {
            name: "empty".to_string(),
            measured_runs_avg_ms: f64::NAN,
            total_ms: 0.0,
            runs_count: 0,
            measured_runs_ms: None,
        };
        let err = history
            .add_results(
                &run(vec![bench("a", 1.0, 2), empty_bench]),
                AddOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, HistoryError::InvalidRun(_)));
        assert!(err.to_string().contains("empty"));

        let negative = history.add_results(&run(vec![bench("a", -2.0, 2)]), AddOptions::default());
        assert!(matches!(negative, Err(HistoryError::InvalidRun(_))));

        // The store still exports a document it can load again
        assert_eq!(history.len(), 1);
        let doc = HistoryDocument::from_json_str(&history.export_string().unwrap()).unwrap();
        assert!(BenchmarkHistory::new(HistoryOptions::default(), doc).is_ok());
    }

    #[test]
    fn test_individual_runs_checked_only_when_saved() {
        let mut r = bench("a", 1.0, 2);
        r.measured_runs_ms = Some(vec![1.0, f64::INFINITY]);

        let mut history = BenchmarkHistory::empty(HistoryOptions::default());
        assert!(history.add_results(&run(vec![r.clone()]), AddOptions::default()).is_ok());

        let mut saving = BenchmarkHistory::empty(HistoryOptions {
            save_individual_runs: true,
            ..Default::default()
        });
        let err = saving
            .add_results(&run(vec![r]), AddOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("measuredRunsMs"));
        assert!(saving.is_empty());
    }

    #[test]
    fn test_empty_matches_new_over_default_document() {
        let opts = HistoryOptions {
            only_hr_time: true,
            ..Default::default()
        };
        let empty = BenchmarkHistory::empty(opts.clone());
        let adopted = BenchmarkHistory::new(opts, HistoryDocument::default()).unwrap();
        assert_eq!(format!("{empty:?}"), format!("{adopted:?}"));
    }

    #[test]
    fn test_new_rejects_invalid_document() {
        let mut history = BenchmarkHistory::empty(HistoryOptions::default());
        history
            .add_results(&run(vec![bench("a", 1.0, 1)]), AddOptions::default())
            .unwrap();
        let mut doc = history.export();
        doc.history[0]
            .benchmarks
            .get_mut("a")
            .unwrap()
            .total_ms = f64::INFINITY;

        let err = BenchmarkHistory::new(HistoryOptions::default(), doc).unwrap_err();
        assert!(matches!(err, HistoryError::InvalidHistory(_)));
    }

    #[test]
    fn test_export_is_a_deep_copy() {
        let mut history = BenchmarkHistory::empty(HistoryOptions::default());
        history
            .add_results(&run(vec![bench("a", 1.0, 1)]), AddOptions::default())
            .unwrap();

        let mut exported = history.export();
        exported.history.clear();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_run_extras_closure() {
        let mut history = BenchmarkHistory::empty(HistoryOptions::default())
            .with_run_extras(|r: &RunResult| json!({ "f": r.filtered }));
        let mut r = run(vec![bench("a", 1.0, 1)]);
        r.filtered = Some(2);
        history.add_results(&r, AddOptions::default()).unwrap();
        assert_eq!(
            history.document().history[0].run_extras,
            Some(json!({ "f": 2 }))
        );
    }
}
