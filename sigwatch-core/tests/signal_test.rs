//! Scenario tests for indicators, divergences and classification.
//!
//! 1. A strictly rising 1..40 close series: MACD dif ends positive, no death cross
//! 2. A flat 40-bar series: RSI settles at 50, no golden/death signal
//! 3. Higher price high with lower indicator high: exactly one bearish divergence
//! 4. Insufficient history: every family reports nothing
//! 5. Live classification agrees with the replay used by the backtest, and
//!    every family (divergence and combo included) fires on a noisy walk

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sigwatch_core::backtest::BacktestEngine;
use sigwatch_core::divergence::{
    detect_history, detect_in, detect_latest, Companion, DivergenceParams, DivergenceSource,
};
use sigwatch_core::domain::{Bar, IndicatorKind, Polarity};
use sigwatch_core::indicators::{macd, rsi, KdjParams, MacdParams, RsiParams};
use sigwatch_core::signals::{ClassifierConfig, IndicatorSpec, SignalClassifier};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::minutes(30 * i as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: Some(10_000.0),
            }
        })
        .collect()
}

fn classifier(kind: IndicatorKind) -> SignalClassifier {
    SignalClassifier::new(IndicatorSpec::default_for(kind), ClassifierConfig::default()).unwrap()
}

/// Seeded random walk with +/-2% steps: plenty of turning points of every
/// size, so divergences of both polarities occur throughout.
fn noisy_walk(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 50.0_f64;
    (0..len)
        .map(|_| {
            price *= 1.0 + rng.gen_range(-0.02..0.02);
            price
        })
        .collect()
}

fn companions() -> [Companion; 2] {
    [
        Companion::MacdHistogram(MacdParams::default()),
        Companion::KdjJ(KdjParams::default()),
    ]
}

// ──────────────────────────────────────────────
// Scenarios
// ──────────────────────────────────────────────

#[test]
fn rising_series_has_positive_dif_and_no_death_cross() {
    let closes: Vec<f64> = (1..=40).map(|v| v as f64).collect();
    let bars = bars_from_closes(&closes);

    let m = macd(&bars, MacdParams::default());
    assert!(m.dif.last().unwrap() > 0.0);

    for kind in [IndicatorKind::Macd, IndicatorKind::Kdj, IndicatorKind::Ma] {
        let signals = classifier(kind).replay(&bars).signals();
        assert!(
            signals.iter().all(|s| s.polarity() == Polarity::Bullish),
            "{kind}: unexpected death cross in {signals:?}"
        );
    }
}

#[test]
fn flat_series_rsi_is_fifty_and_silent() {
    let bars = bars_from_closes(&[10.0; 40]);
    let r = rsi(&bars, RsiParams::default());
    assert_eq!(r.last(), Some(50.0));

    let backtest = BacktestEngine::new(classifier(IndicatorKind::Rsi)).run(&bars);
    assert!(backtest.signals.is_empty());
    assert_eq!(backtest.stats.trades, 0);
}

#[test]
fn higher_high_with_lower_indicator_high_is_one_bearish_divergence() {
    // Companion values are given explicitly so the scenario is exact.
    let closes = [
        50.0, 51.0, 52.0, 53.0, 56.0, 53.0, 52.0, 51.0, 52.0, 53.0, 54.0, 58.0, 54.0, 53.0, 52.0,
        51.0,
    ];
    let histogram = [
        0.1, 0.2, 0.3, 0.5, 1.2, 0.5, 0.3, 0.1, 0.2, 0.3, 0.4, 0.8, 0.4, 0.3, 0.2, 0.1,
    ];
    let found = detect_in(&closes, &histogram, DivergenceSource::Macd, &DivergenceParams::default(), 0);

    assert_eq!(found.len(), 1);
    let d = &found[0];
    assert_eq!(d.polarity, Polarity::Bearish);
    assert_eq!((d.price.idx1, d.price.idx2), (4, 11));
    assert!(d.price.val2 > d.price.val1);
    assert!(d.indicator.val2 < d.indicator.val1);
    assert!((0.0..=100.0).contains(&d.strength));
}

#[test]
fn bearish_divergence_found_in_bars_by_live_detector() {
    let bars = bars_from_closes(&noisy_walk(1500, 11));
    let params = DivergenceParams::default();
    let companion = Companion::MacdHistogram(MacdParams::default());

    // first window whose only finding is a bearish divergence
    let (end, found) = (params.lookback..=bars.len())
        .map(|end| (end, detect_latest(&bars[..end], companion, &params)))
        .find(|(_, found)| found.len() == 1 && found[0].polarity == Polarity::Bearish)
        .expect("a 1500-bar walk has a window with a lone bearish divergence");

    let d = &found[0];
    let offset = end - params.lookback;
    assert!(d.price.idx1 >= offset && d.price.idx1 < d.price.idx2 && d.price.idx2 < end);
    assert_eq!(d.price.val1, bars[d.price.idx1].close);
    assert_eq!(d.price.val2, bars[d.price.idx2].close);
    assert!(d.price.val2 > d.price.val1);
    assert!(d.indicator.val2 < d.indicator.val1);
    assert!((0.0..=100.0).contains(&d.strength));

    // same answer as matching the window by hand
    let window = &bars[offset..end];
    let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
    let histogram = macd(window, MacdParams::default()).histogram;
    let by_hand = detect_in(&closes, histogram.raw(), DivergenceSource::Macd, &params, offset);
    assert_eq!(by_hand, found);
}

#[test]
fn divergence_history_on_bars_is_well_formed() {
    let bars = bars_from_closes(&noisy_walk(1500, 11));
    let params = DivergenceParams::default();
    for companion in companions() {
        let all = detect_history(&bars, companion, &params);
        let source = companion.source();
        assert!(
            all.iter().any(|d| d.polarity == Polarity::Bearish),
            "{source:?}: no bearish divergence"
        );
        assert!(
            all.iter().any(|d| d.polarity == Polarity::Bullish),
            "{source:?}: no bullish divergence"
        );
        for d in &all {
            assert!(d.price.idx1 < d.price.idx2);
            assert!(d.price.idx2 < bars.len());
            assert!((0.0..=100.0).contains(&d.strength));
            if d.polarity == Polarity::Bearish {
                assert!(d.price.val2 > d.price.val1);
            } else {
                assert!(d.price.val2 < d.price.val1);
            }
        }
    }
}

#[test]
fn insufficient_history_is_silent() {
    let closes: Vec<f64> = (0..20).map(|i| 10.0 + (i % 3) as f64).collect();
    let bars = bars_from_closes(&closes);
    for kind in [
        IndicatorKind::Macd,
        IndicatorKind::MacdDivergence,
        IndicatorKind::KdjDivergence,
        IndicatorKind::MacdCombo,
        IndicatorKind::KdjCombo,
    ] {
        let c = classifier(kind);
        assert!(c.replay(&bars).signals().is_empty(), "{kind}");
        assert!(c.classify(&bars).is_none(), "{kind}");
    }
}

#[test]
fn live_and_batch_paths_agree() {
    let bars = bars_from_closes(&noisy_walk(1500, 11));

    for kind in IndicatorKind::ALL {
        let c = SignalClassifier::new(IndicatorSpec::with_window(kind, 3), ClassifierConfig::default()).unwrap();
        let batch = BacktestEngine::new(c.clone()).run(&bars).signals;
        let live: Vec<_> = (1..bars.len()).filter_map(|end| c.classify(&bars[..=end])).collect();
        assert!(!batch.is_empty(), "{kind}: no signals");
        assert_eq!(batch, live, "{kind}");
    }
}

#[test]
fn divergence_signals_fire_at_every_window() {
    let bars = bars_from_closes(&noisy_walk(1500, 11));

    for kind in [IndicatorKind::MacdDivergence, IndicatorKind::KdjDivergence] {
        for window in [1, 2, 3, 5] {
            let c = SignalClassifier::new(IndicatorSpec::with_window(kind, window), ClassifierConfig::default())
                .unwrap();
            let report = BacktestEngine::new(c.clone()).run(&bars);
            assert!(!report.signals.is_empty(), "{kind} window={window}: no signals");
            assert!(report.divergences >= report.signals.len(), "{kind} window={window}");

            // each signal sits exactly `window` bars after the second extremum
            let history = c.replay(&bars).divergence_history();
            for sig in &report.signals {
                assert!(
                    history
                        .iter()
                        .any(|d| d.polarity == sig.polarity() && d.price.idx2 + window == sig.bar_index),
                    "{kind} window={window} at {}",
                    sig.bar_index
                );
            }
        }
    }
}
