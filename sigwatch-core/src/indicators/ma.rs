//! Simple moving averages.
//!
//! Rolling mean of closes; the first defined value sits at index `window - 1`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::IndicatorSeries;
use crate::domain::Bar;

/// Fast/slow windows for the MA crossover family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaParams {
    pub fast: usize,
    pub slow: usize,
}

impl Default for MaParams {
    fn default() -> Self {
        Self { fast: 5, slow: 10 }
    }
}

/// Compute `ma[n]` for every requested window.
pub fn moving_average(bars: &[Bar], windows: &[usize]) -> BTreeMap<usize, IndicatorSeries> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    windows
        .iter()
        .map(|&w| (w, IndicatorSeries::new(format!("ma{w}"), sma_of_series(&closes, w))))
        .collect()
}

/// Rolling mean over `window` values. `NaN` inside a window makes that
/// window's mean undefined.
pub fn sma_of_series(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if window == 0 || n < window {
        return result;
    }

    for end in (window - 1)..n {
        let slice = &values[end + 1 - window..=end];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[end] = slice.iter().sum::<f64>() / window as f64;
    }

    result
}
