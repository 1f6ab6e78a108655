//! MACD — moving average convergence/divergence.
//!
//! dif = EMA(close, fast) - EMA(close, slow)
//! dea = EMA(dif, signal)
//! histogram = 2 * (dif - dea)
//!
//! The recursions start at bar 0; all three lines are reported undefined
//! before index `slow - 1`.

use serde::{Deserialize, Serialize};

use super::ema::ema_span;
use super::IndicatorSeries;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

impl MacdParams {
    /// First index at which all three lines are defined.
    pub fn warmup(&self) -> usize {
        self.slow.saturating_sub(1)
    }
}

#[derive(Debug, Clone)]
pub struct Macd {
    pub dif: IndicatorSeries,
    pub dea: IndicatorSeries,
    /// The `macd` bar line, `2 * (dif - dea)`.
    pub histogram: IndicatorSeries,
}

pub fn macd(bars: &[Bar], params: MacdParams) -> Macd {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let fast = ema_span(&closes, params.fast);
    let slow = ema_span(&closes, params.slow);

    let dif: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let dea = ema_span(&dif, params.signal);
    let histogram: Vec<f64> = dif.iter().zip(&dea).map(|(d, e)| 2.0 * (d - e)).collect();

    let warmup = params.warmup();
    Macd {
        dif: IndicatorSeries::new("dif", dif).mask_before(warmup),
        dea: IndicatorSeries::new("dea", dea).mask_before(warmup),
        histogram: IndicatorSeries::new("macd", histogram).mask_before(warmup),
    }
}
