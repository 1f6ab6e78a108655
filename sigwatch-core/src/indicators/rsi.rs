//! RSI — Relative Strength Index with Wilder smoothing.
//!
//! Gains and losses are smoothed with alpha = 1/period, starting from a zero
//! change at bar 0. RSI = 100 - 100 / (1 + avg_gain / avg_loss), or 50 when
//! the average loss is zero. Undefined before index `period`.

use serde::{Deserialize, Serialize};

use super::ema::ema_alpha;
use super::IndicatorSeries;
use crate::domain::Bar;

const NEUTRAL_RSI: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiParams {
    pub period: usize,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

pub fn rsi(bars: &[Bar], params: RsiParams) -> IndicatorSeries {
    let n = bars.len();
    if params.period == 0 || n == 0 {
        return IndicatorSeries::new("rsi", vec![f64::NAN; n]);
    }

    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let change = bars[i].close - bars[i - 1].close;
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    let alpha = 1.0 / params.period as f64;
    let avg_gain = ema_alpha(&gains, alpha);
    let avg_loss = ema_alpha(&losses, alpha);

    let values: Vec<f64> = avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| {
            if l == 0.0 {
                NEUTRAL_RSI
            } else {
                100.0 - 100.0 / (1.0 + g / l)
            }
        })
        .collect();

    IndicatorSeries::new("rsi", values).mask_before(params.period)
}
