//! Sigwatch Runner — optimization, live monitoring, collaborators, reports.
//!
//! This crate builds on `sigwatch-core` to provide:
//! - TOML configuration with defaulted sections
//! - Market data providers (CSV directory, deterministic synthetic walk)
//! - JSON-file task store owning each task's last signal
//! - Notifier contract with a stdout implementation
//! - Monitoring poll pass with per-task dedup
//! - Strategy optimizer (rayon grid search over period × indicator × window)
//! - Plain-text reports and CSV export

pub mod config;
pub mod data;
pub mod monitor;
pub mod notify;
pub mod optimizer;
pub mod report;
pub mod store;

pub use config::{ConfigError, MonitorConfig, OptimizerConfig, SigwatchConfig};
pub use data::{CsvDataProvider, DataError, MarketDataProvider, SyntheticProvider};
pub use monitor::{Monitor, MonitorError, PollSummary};
pub use notify::{Notifier, StdoutNotifier};
pub use optimizer::{
    OptimizationReport, OptimizationResult, OptimizeError, PeriodCoverage, StrategyOptimizer,
};
pub use store::{JsonTaskStore, MonitorTask, StoreError, TaskStore};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<SigwatchConfig>();
        assert_sync::<SigwatchConfig>();
    }

    #[test]
    fn providers_are_send_sync() {
        assert_send::<CsvDataProvider>();
        assert_sync::<CsvDataProvider>();
        assert_send::<SyntheticProvider>();
        assert_sync::<SyntheticProvider>();
    }

    #[test]
    fn optimizer_is_send_sync() {
        assert_send::<StrategyOptimizer>();
        assert_sync::<StrategyOptimizer>();
        assert_send::<OptimizationReport>();
        assert_sync::<OptimizationReport>();
    }

    #[test]
    fn monitor_task_is_send_sync() {
        assert_send::<MonitorTask>();
        assert_sync::<MonitorTask>();
    }

    #[test]
    fn monitor_is_send_sync() {
        assert_send::<Monitor<SyntheticProvider, StdoutNotifier>>();
        assert_sync::<Monitor<SyntheticProvider, StdoutNotifier>>();
    }
}
