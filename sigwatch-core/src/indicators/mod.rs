//! Indicator engine: MA, MACD, KDJ, RSI.
//!
//! Every indicator is a causal, total function of the bar slice it is given:
//! the value at index `i` depends only on bars `0..=i`, and too little history
//! produces undefined slots rather than an error. Outputs are wrapped in
//! [`IndicatorSeries`] so that undefined slots surface as `None`.

pub mod ema;
pub mod kdj;
pub mod ma;
pub mod macd;
pub mod rsi;
pub mod series;
pub mod snapshot;

pub use kdj::{kdj, Kdj, KdjParams};
pub use ma::{moving_average, MaParams};
pub use macd::{macd, Macd, MacdParams};
pub use rsi::{rsi, RsiParams};
pub use series::IndicatorSeries;
pub use snapshot::IndicatorSnapshot;

/// Rolling minimum over `window` values, `NaN` until the window is full.
pub(crate) fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_fold(values, window, f64::INFINITY, f64::min)
}

/// Rolling maximum over `window` values, `NaN` until the window is full.
pub(crate) fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_fold(values, window, f64::NEG_INFINITY, f64::max)
}

fn rolling_fold(values: &[f64], window: usize, init: f64, f: fn(f64, f64) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }
    for end in (window - 1)..n {
        result[end] = values[end + 1 - window..=end].iter().copied().fold(init, f);
    }
    result
}

/// Create synthetic hourly bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: Some(1000.0),
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
