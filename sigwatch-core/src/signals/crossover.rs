//! Crossover primitives over `(previous, current)` pairs.

use crate::domain::Polarity;
use crate::indicators::IndicatorSeries;

/// Two-series cross: golden when `fast` moves from at-or-below `slow` to
/// strictly above it, death for the mirror. A bar is never both.
pub fn cross(fast: (f64, f64), slow: (f64, f64)) -> Option<Polarity> {
    let (prev_fast, cur_fast) = fast;
    let (prev_slow, cur_slow) = slow;
    if prev_fast <= prev_slow && cur_fast > cur_slow {
        Some(Polarity::Bullish)
    } else if prev_fast >= prev_slow && cur_fast < cur_slow {
        Some(Polarity::Bearish)
    } else {
        None
    }
}

/// Fixed-threshold cross: bullish when the value rises through `lower`,
/// bearish when it falls through `upper`.
pub fn threshold_cross(value: (f64, f64), lower: f64, upper: f64) -> Option<Polarity> {
    let (prev, cur) = value;
    if prev <= lower && cur > lower {
        Some(Polarity::Bullish)
    } else if prev >= upper && cur < upper {
        Some(Polarity::Bearish)
    } else {
        None
    }
}

/// Cross between two series on bar `index`; `None` if either pair is undefined.
pub fn series_cross(fast: &IndicatorSeries, slow: &IndicatorSeries, index: usize) -> Option<Polarity> {
    cross(fast.pair(index)?, slow.pair(index)?)
}
