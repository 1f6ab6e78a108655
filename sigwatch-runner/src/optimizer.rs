//! StrategyOptimizer — grid search over period × indicator × window.
//!
//! Every period's history is cut to the latest common start date before any
//! backtest runs, so cumulative returns are compared over the same span.
//! Combinations are independent and run on the rayon pool; results come
//! back in evaluation order, which makes the ranking's tie order stable.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use sigwatch_core::backtest::{BacktestEngine, TradeStats};
use sigwatch_core::domain::{BarSeries, Period};
use sigwatch_core::signals::{ClassifierConfig, IndicatorSpec, SignalClassifier};

use crate::config::OptimizerConfig;
use crate::data::MarketDataProvider;

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("no period of '{symbol}' has at least {min_bars} bars")]
    NoHistory { symbol: String, min_bars: usize },

    #[error("no period of '{symbol}' keeps {min_bars} bars after aligning to {common_start}")]
    NoCommonHistory {
        symbol: String,
        min_bars: usize,
        common_start: NaiveDateTime,
    },

    #[error("no combination produced a completed trade for '{0}'")]
    NoTrades(String),
}

/// One evaluated (period, spec) combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub period: Period,
    pub spec: IndicatorSpec,
    pub bar_count: usize,
    pub stats: TradeStats,
}

/// A period that took part in the search, after alignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodCoverage {
    pub period: Period,
    /// Start of the period's own history, before alignment.
    pub original_start: Option<NaiveDateTime>,
    pub bars: usize,
}

/// Ranked outcome of one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    pub symbol: String,
    /// Latest of the individual start dates; every period was cut here.
    pub common_start: NaiveDateTime,
    pub periods: Vec<PeriodCoverage>,
    /// Number of combinations backtested, including zero-trade ones.
    pub evaluated: usize,
    /// Top-K by total return, best first.
    pub ranked: Vec<OptimizationResult>,
}

impl OptimizationReport {
    pub fn best(&self) -> Option<&OptimizationResult> {
        self.ranked.first()
    }
}

pub struct StrategyOptimizer {
    config: OptimizerConfig,
    classifier: ClassifierConfig,
}

impl StrategyOptimizer {
    pub fn new(config: OptimizerConfig, classifier: ClassifierConfig) -> Self {
        Self { config, classifier }
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Specs tried on every period: each base family once, then each
    /// divergence family once per window.
    pub fn candidate_specs(&self) -> Vec<IndicatorSpec> {
        let base = self
            .config
            .base_indicators
            .iter()
            .map(|&kind| IndicatorSpec::default_for(kind));
        let divergence = self.config.divergence_indicators.iter().flat_map(|&kind| {
            self.config
                .windows
                .iter()
                .map(move |&w| IndicatorSpec::with_window(kind, w))
        });
        base.chain(divergence).collect()
    }

    /// Fetch every configured period, then rank.
    ///
    /// A period whose fetch fails is logged and left out.
    pub fn optimize(
        &self,
        symbol: &str,
        provider: &dyn MarketDataProvider,
    ) -> Result<OptimizationReport, OptimizeError> {
        let histories: Vec<(Period, BarSeries)> = self
            .config
            .periods
            .iter()
            .filter_map(|&period| match provider.fetch(symbol, period) {
                Ok(series) => Some((period, series)),
                Err(e) => {
                    warn!(symbol, %period, error = %e, "skipping period: fetch failed");
                    None
                }
            })
            .collect();
        self.optimize_histories(symbol, histories)
    }

    /// Rank combinations over already-loaded histories.
    pub fn optimize_histories(
        &self,
        symbol: &str,
        histories: Vec<(Period, BarSeries)>,
    ) -> Result<OptimizationReport, OptimizeError> {
        let min_history = self.config.min_history_bars;
        let usable: Vec<(Period, BarSeries)> = histories
            .into_iter()
            .filter(|(period, series)| {
                let keep = series.len() >= min_history && !series.is_empty();
                if !keep {
                    debug!(symbol, %period, bars = series.len(), "dropping short history");
                }
                keep
            })
            .collect();

        let common_start = usable
            .iter()
            .filter_map(|(_, s)| s.start())
            .max()
            .ok_or_else(|| OptimizeError::NoHistory {
                symbol: symbol.to_string(),
                min_bars: min_history,
            })?;

        let (aligned, periods) = align(usable, common_start, self.config.min_common_bars);
        if aligned.is_empty() {
            return Err(OptimizeError::NoCommonHistory {
                symbol: symbol.to_string(),
                min_bars: self.config.min_common_bars,
                common_start,
            });
        }

        let specs = self.candidate_specs();
        let jobs: Vec<(Period, &BarSeries, IndicatorSpec)> = aligned
            .iter()
            .flat_map(|(period, series)| specs.iter().map(move |spec| (*period, series, *spec)))
            .collect();

        info!(
            symbol,
            periods = aligned.len(),
            combinations = jobs.len(),
            common_start = %common_start,
            "optimizing"
        );

        let evaluated: Vec<Option<OptimizationResult>> = if self.config.parallel {
            jobs.par_iter()
                .map(|&(period, series, spec)| self.evaluate(period, series, spec))
                .collect()
        } else {
            jobs.iter()
                .map(|&(period, series, spec)| self.evaluate(period, series, spec))
                .collect()
        };

        let mut ranked: Vec<OptimizationResult> = evaluated
            .into_iter()
            .flatten()
            .filter(|r| r.stats.trades > 0)
            .collect();
        if ranked.is_empty() {
            return Err(OptimizeError::NoTrades(symbol.to_string()));
        }

        // stable: ties keep evaluation order
        ranked.sort_by(|a, b| b.stats.total_return.total_cmp(&a.stats.total_return));
        ranked.truncate(self.config.top_k);

        Ok(OptimizationReport {
            symbol: symbol.to_string(),
            common_start,
            periods,
            evaluated: jobs.len(),
            ranked,
        })
    }

    fn evaluate(&self, period: Period, series: &BarSeries, spec: IndicatorSpec) -> Option<OptimizationResult> {
        let classifier = match SignalClassifier::new(spec, self.classifier) {
            Ok(c) => c,
            Err(e) => {
                warn!(%period, %spec, error = %e, "skipping invalid spec");
                return None;
            }
        };
        let report = BacktestEngine::new(classifier).run(series.bars());
        Some(OptimizationResult {
            period,
            spec,
            bar_count: report.bar_count,
            stats: report.stats,
        })
    }
}

/// Cut every series at `common_start` and drop those left too short.
pub fn align(
    histories: Vec<(Period, BarSeries)>,
    common_start: NaiveDateTime,
    min_bars: usize,
) -> (Vec<(Period, BarSeries)>, Vec<PeriodCoverage>) {
    let mut aligned = Vec::with_capacity(histories.len());
    let mut coverage = Vec::with_capacity(histories.len());
    for (period, series) in histories {
        let cut = series.since(common_start);
        if cut.len() < min_bars {
            debug!(%period, bars = cut.len(), "dropping period: too few bars after alignment");
            continue;
        }
        coverage.push(PeriodCoverage {
            period,
            original_start: series.start(),
            bars: cut.len(),
        });
        aligned.push((period, cut));
    }
    (aligned, coverage)
}
