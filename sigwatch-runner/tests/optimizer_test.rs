//! Integration tests for the strategy optimizer.
//!
//! Histories with different start dates must be cut to the latest start
//! before anything is ranked, and the report must say where that was.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use sigwatch_core::domain::{Bar, BarSeries, Period};
use sigwatch_core::signals::ClassifierConfig;
use sigwatch_runner::config::OptimizerConfig;
use sigwatch_runner::data::{DataError, MarketDataProvider};
use sigwatch_runner::optimizer::{OptimizeError, StrategyOptimizer};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn day(d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Hourly oscillating closes starting at `start`; `phase` varies the shape.
fn oscillating(start: NaiveDateTime, len: usize, phase: f64) -> BarSeries {
    let bars = (0..len)
        .map(|i| {
            let t = i as f64;
            let close = 60.0 + (t * 0.25 + phase).sin() * 6.0 + (t * 0.04).cos() * 3.0;
            let open = close - 0.2;
            Bar {
                timestamp: start + Duration::hours(i as i64),
                open,
                high: close.max(open) + 0.4,
                low: close.min(open) - 0.4,
                close,
                volume: Some(5_000.0),
            }
        })
        .collect();
    BarSeries::new(bars).unwrap()
}

struct MapProvider {
    series: HashMap<Period, BarSeries>,
}

impl MarketDataProvider for MapProvider {
    fn fetch(&self, symbol: &str, period: Period) -> Result<BarSeries, DataError> {
        self.series.get(&period).cloned().ok_or(DataError::Empty {
            symbol: symbol.to_string(),
            period,
        })
    }
}

fn three_period_provider() -> MapProvider {
    let mut series = HashMap::new();
    series.insert(Period::Min30, oscillating(day(1), 400, 0.0));
    series.insert(Period::Min60, oscillating(day(5), 400, 0.7));
    series.insert(Period::Daily, oscillating(day(3), 400, 1.9));
    MapProvider { series }
}

fn config(periods: Vec<Period>) -> OptimizerConfig {
    OptimizerConfig {
        periods,
        ..OptimizerConfig::default()
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn reported_start_is_latest_individual_start() {
    let provider = three_period_provider();
    let optimizer = StrategyOptimizer::new(
        config(vec![Period::Min30, Period::Min60, Period::Daily]),
        ClassifierConfig::default(),
    );
    let report = optimizer.optimize("TEST", &provider).unwrap();

    assert_eq!(report.common_start, day(5));
    assert_eq!(report.periods.len(), 3);
    for coverage in &report.periods {
        // 400 hourly bars from day 1 leave 400 - 96 after day 5, etc.
        let expected = match coverage.period {
            Period::Min30 => 400 - 96,
            Period::Min60 => 400,
            Period::Daily => 400 - 48,
            other => panic!("unexpected period {other}"),
        };
        assert_eq!(coverage.bars, expected, "{}", coverage.period);
    }
    for r in &report.ranked {
        let coverage = report.periods.iter().find(|c| c.period == r.period).unwrap();
        assert_eq!(r.bar_count, coverage.bars);
    }
}

#[test]
fn ranking_is_descending_and_bounded() {
    let provider = three_period_provider();
    let optimizer = StrategyOptimizer::new(
        config(vec![Period::Min30, Period::Min60, Period::Daily]),
        ClassifierConfig::default(),
    );
    let report = optimizer.optimize("TEST", &provider).unwrap();

    assert!(!report.ranked.is_empty());
    assert!(report.ranked.len() <= 8);
    assert_eq!(report.evaluated, 3 * 16);
    assert!(report.ranked.iter().all(|r| r.stats.trades > 0));
    for pair in report.ranked.windows(2) {
        assert!(pair[0].stats.total_return >= pair[1].stats.total_return);
    }
    assert_eq!(report.best(), report.ranked.first());
}

#[test]
fn parallel_and_sequential_agree() {
    let provider = three_period_provider();
    let cfg = config(vec![Period::Min30, Period::Min60, Period::Daily]);
    let par = StrategyOptimizer::new(cfg.clone(), ClassifierConfig::default())
        .with_parallelism(true)
        .optimize("TEST", &provider)
        .unwrap();
    let seq = StrategyOptimizer::new(cfg, ClassifierConfig::default())
        .with_parallelism(false)
        .optimize("TEST", &provider)
        .unwrap();
    assert_eq!(par, seq);
}

#[test]
fn failed_fetch_skips_period() {
    let provider = three_period_provider();
    // 240min is not served by the provider
    let optimizer = StrategyOptimizer::new(
        config(vec![Period::Min240, Period::Min30, Period::Min60]),
        ClassifierConfig::default(),
    );
    let report = optimizer.optimize("TEST", &provider).unwrap();
    let periods: Vec<Period> = report.periods.iter().map(|c| c.period).collect();
    assert_eq!(periods, vec![Period::Min30, Period::Min60]);
    assert_eq!(report.common_start, day(5));
}

#[test]
fn short_histories_are_ignored_before_alignment() {
    let mut provider = three_period_provider();
    // starts latest of all, but too short to take part
    provider.series.insert(Period::Min15, oscillating(day(20), 20, 0.0));
    let optimizer = StrategyOptimizer::new(
        config(vec![Period::Min15, Period::Min30, Period::Min60]),
        ClassifierConfig::default(),
    );
    let report = optimizer.optimize("TEST", &provider).unwrap();
    assert_eq!(report.common_start, day(5));
}

#[test]
fn flat_history_has_no_trades() {
    let start = day(1);
    let bars = (0..200)
        .map(|i| Bar {
            timestamp: start + Duration::hours(i),
            open: 10.0,
            high: 10.0,
            low: 10.0,
            close: 10.0,
            volume: None,
        })
        .collect();
    let optimizer = StrategyOptimizer::new(config(vec![Period::Min60]), ClassifierConfig::default());
    let err = optimizer
        .optimize_histories("FLAT", vec![(Period::Min60, BarSeries::new(bars).unwrap())])
        .unwrap_err();
    assert!(matches!(err, OptimizeError::NoTrades(_)));
}
