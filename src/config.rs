use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use crate::core::{HistoryDocument, HistoryOptions, RunSummaryExtras, StatsExtras};
use crate::history::BenchmarkHistory;
use crate::{HistoryError, HistoryResult};

/// Built-in per-benchmark extras computers selectable from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchExtrasKind {
    Stats,
}

/// Built-in run-level extras computers selectable from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunExtrasKind {
    Summary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtrasConfig {
    pub bench: Option<BenchExtrasKind>,
    pub run: Option<RunExtrasKind>,
}

/// History configuration file:
///
/// Top-level keys are flattened into [`HistoryOptions`], so serde cannot
/// reject unknown ones. They are logged with `warn!` and otherwise ignored.
///
/// ```toml
/// save_individual_runs = true
/// min_required_runs = 10
///
/// [extras]
/// bench = "stats"
/// run = "summary"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    #[serde(flatten)]
    pub options: HistoryOptions,
    pub extras: ExtrasConfig,
}

const KNOWN_KEYS: &[&str] = &[
    "save_individual_runs",
    "min_required_runs",
    "only_hr_time",
    "strict",
    "extras",
];

impl HistoryConfig {
    pub fn from_toml_str(s: &str) -> HistoryResult<Self> {
        let table: toml::Table = s
            .parse()
            .map_err(|e| HistoryError::Message(format!("invalid config: {e}")))?;
        for key in unknown_keys(&table) {
            warn!(key = %key, "unknown config key ignored");
        }
        toml::from_str(s).map_err(|e| HistoryError::Message(format!("invalid config: {e}")))
    }

    /// Build a store over `document` with the configured options and extras.
    pub fn build_history(&self, document: HistoryDocument) -> HistoryResult<BenchmarkHistory> {
        let mut history = BenchmarkHistory::new(self.options.clone(), document)?;
        if let Some(BenchExtrasKind::Stats) = self.extras.bench {
            history = history.with_bench_extras(StatsExtras);
        }
        if let Some(RunExtrasKind::Summary) = self.extras.run {
            history = history.with_run_extras(RunSummaryExtras);
        }
        Ok(history)
    }
}

fn unknown_keys(table: &toml::Table) -> Vec<String> {
    table
        .keys()
        .filter(|k| !KNOWN_KEYS.contains(&k.as_str()))
        .cloned()
        .collect()
}

pub fn load_config(path: &Path) -> HistoryResult<HistoryConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    HistoryConfig::from_toml_str(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let cfg = HistoryConfig::from_toml_str(
            r#"
save_individual_runs = true
min_required_runs = 10
only_hr_time = true
strict = true

[extras]
bench = "stats"
run = "summary"
"#,
        )
        .unwrap();

        assert!(cfg.options.save_individual_runs);
        assert_eq!(cfg.options.min_required_runs, Some(10));
        assert!(cfg.options.only_hr_time);
        assert!(cfg.options.strict);
        assert_eq!(cfg.extras.bench, Some(BenchExtrasKind::Stats));
        assert_eq!(cfg.extras.run, Some(RunExtrasKind::Summary));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = HistoryConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, HistoryConfig::default());
        assert!(!cfg.options.save_individual_runs);
        assert!(cfg.options.min_required_runs.is_none());
    }

    #[test]
    fn test_unknown_extras_kind_rejected() {
        let err = HistoryConfig::from_toml_str("[extras]\nbench = \"magic\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid config"));
    }

    #[test]
    fn test_unknown_top_level_key_detected() {
        let table: toml::Table = "strcit = true\nstrict = false\n".parse().unwrap();
        assert_eq!(unknown_keys(&table), vec!["strcit".to_string()]);

        // Still loads; the misspelt key has no effect
        let cfg = HistoryConfig::from_toml_str("strcit = true\n").unwrap();
        assert!(!cfg.options.strict);
    }

    #[test]
    fn test_unknown_extras_field_rejected() {
        let err = HistoryConfig::from_toml_str("[extras]\nbnech = \"stats\"\n").unwrap_err();
        assert!(err.to_string().contains("bnech"));
    }

    #[test]
    fn test_missing_config_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_build_history_wires_extras() {
        let cfg = HistoryConfig {
            extras: ExtrasConfig {
                bench: Some(BenchExtrasKind::Stats),
                run: None,
            },
            ..Default::default()
        };
        let history = cfg.build_history(HistoryDocument::default()).unwrap();
        let debug = format!("{history:?}");
        assert!(debug.contains("bench_extras: true"));
        assert!(debug.contains("run_extras: false"));
    }
}
