//! Sigwatch configuration, loaded from TOML.
//!
//! Every section and field is defaulted, so an empty file (or no file at all)
//! yields the stock configuration. Values are validated once on load.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use sigwatch_core::domain::{IndicatorKind, Period, SignalVariant};
use sigwatch_core::signals::ClassifierConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigwatchConfig {
    pub classifier: ClassifierConfig,
    pub optimizer: OptimizerConfig,
    pub monitor: MonitorConfig,
}

/// Grid and ranking settings for the strategy optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub periods: Vec<Period>,
    /// Plain crossover families, run once each.
    pub base_indicators: Vec<IndicatorKind>,
    /// Divergence and combo families, run once per entry of `windows`.
    pub divergence_indicators: Vec<IndicatorKind>,
    pub windows: Vec<usize>,
    pub top_k: usize,
    /// Periods with fewer bars than this are dropped before alignment.
    pub min_history_bars: usize,
    /// Periods left with fewer bars than this after alignment are skipped.
    pub min_common_bars: usize,
    pub parallel: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            periods: vec![
                Period::Min15,
                Period::Min30,
                Period::Min60,
                Period::Min120,
                Period::Min240,
                Period::Daily,
            ],
            base_indicators: vec![
                IndicatorKind::Macd,
                IndicatorKind::Kdj,
                IndicatorKind::Ma,
                IndicatorKind::Rsi,
            ],
            divergence_indicators: vec![
                IndicatorKind::MacdDivergence,
                IndicatorKind::KdjDivergence,
                IndicatorKind::MacdCombo,
                IndicatorKind::KdjCombo,
            ],
            windows: vec![2, 3, 5],
            top_k: 8,
            min_history_bars: 50,
            min_common_bars: 30,
            parallel: true,
        }
    }
}

/// Live monitoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
    /// Directory of `<symbol>_<period>.csv` files.
    pub data_dir: PathBuf,
    /// JSON task file.
    pub store_path: PathBuf,
    /// Tasks with fewer bars than this produce no signal.
    pub min_bars: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            data_dir: PathBuf::from("data"),
            store_path: PathBuf::from("tasks.json"),
            min_bars: 30,
        }
    }
}

impl SigwatchConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.classifier.validate().map_err(ConfigError::Invalid)?;

        let opt = &self.optimizer;
        if opt.top_k == 0 {
            return Err(ConfigError::Invalid("optimizer.top_k must be at least 1".into()));
        }
        if opt.windows.iter().any(|&w| w == 0) {
            return Err(ConfigError::Invalid("optimizer.windows must all be >= 1".into()));
        }
        if opt.periods.is_empty() {
            return Err(ConfigError::Invalid("optimizer.periods must not be empty".into()));
        }
        if let Some(k) = opt
            .base_indicators
            .iter()
            .find(|k| k.variant() != SignalVariant::Crossover)
        {
            return Err(ConfigError::Invalid(format!(
                "optimizer.base_indicators: {k} is not a crossover family"
            )));
        }
        if let Some(k) = opt
            .divergence_indicators
            .iter()
            .find(|k| k.variant() == SignalVariant::Crossover)
        {
            return Err(ConfigError::Invalid(format!(
                "optimizer.divergence_indicators: {k} is not a divergence or combo family"
            )));
        }
        if self.monitor.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("monitor.poll_interval_secs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = SigwatchConfig::from_toml("").unwrap();
        assert_eq!(config, SigwatchConfig::default());
        assert_eq!(config.optimizer.windows, vec![2, 3, 5]);
        assert_eq!(config.optimizer.top_k, 8);
        assert_eq!(config.classifier.combo_validity_bars, 10);
        assert_eq!(config.monitor.min_bars, 30);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = SigwatchConfig::from_toml(
            r#"
            [classifier]
            rsi_oversold = 25.0

            [optimizer]
            periods = ["60min", "daily"]
            windows = [3]
            parallel = false
            "#,
        )
        .unwrap();
        assert_eq!(config.classifier.rsi_oversold, 25.0);
        assert_eq!(config.classifier.rsi_overbought, 70.0);
        assert_eq!(config.optimizer.periods, vec![Period::Min60, Period::Daily]);
        assert_eq!(config.optimizer.windows, vec![3]);
        assert!(!config.optimizer.parallel);
        assert_eq!(config.optimizer.top_k, 8);
    }

    #[test]
    fn indicator_lists_use_wire_names() {
        let config = SigwatchConfig::from_toml(
            r#"
            [optimizer]
            base_indicators = ["MACD", "RSI"]
            divergence_indicators = ["KDJ_COMBO"]
            "#,
        )
        .unwrap();
        assert_eq!(config.optimizer.base_indicators, vec![IndicatorKind::Macd, IndicatorKind::Rsi]);
        assert_eq!(config.optimizer.divergence_indicators, vec![IndicatorKind::KdjCombo]);
    }

    #[test]
    fn rejects_zero_top_k() {
        let err = SigwatchConfig::from_toml("[optimizer]\ntop_k = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_window() {
        let err = SigwatchConfig::from_toml("[optimizer]\nwindows = [2, 0]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unordered_thresholds() {
        let err = SigwatchConfig::from_toml("[classifier]\nrsi_oversold = 75.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_misplaced_family() {
        let err = SigwatchConfig::from_toml("[optimizer]\nbase_indicators = [\"MACD_DIV\"]\n").unwrap_err();
        assert!(err.to_string().contains("MACD_DIV"));
    }

    #[test]
    fn parse_error_is_reported() {
        let err = SigwatchConfig::from_toml("[optimizer\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SigwatchConfig::from_file(Path::new("/nonexistent/sigwatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
