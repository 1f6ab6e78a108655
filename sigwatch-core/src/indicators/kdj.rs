//! KDJ stochastic oscillator.
//!
//! rsv = (close - lowest_low(n)) / (highest_high(n) - lowest_low(n)) * 100,
//! falling back to 50 during warmup and on a zero range.
//! k = EMA(rsv, alpha = 1/m1), d = EMA(k, alpha = 1/m2), j = 3k - 2d.
//!
//! `j` is unbounded. All lines are undefined before index `n - 1`.

use serde::{Deserialize, Serialize};

use super::ema::ema_alpha;
use super::{rolling_max, rolling_min, IndicatorSeries};
use crate::domain::Bar;

const NEUTRAL_RSV: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdjParams {
    pub n: usize,
    pub m1: usize,
    pub m2: usize,
}

impl Default for KdjParams {
    fn default() -> Self {
        Self { n: 9, m1: 3, m2: 3 }
    }
}

impl KdjParams {
    pub fn warmup(&self) -> usize {
        self.n.saturating_sub(1)
    }
}

#[derive(Debug, Clone)]
pub struct Kdj {
    pub k: IndicatorSeries,
    pub d: IndicatorSeries,
    pub j: IndicatorSeries,
}

pub fn kdj(bars: &[Bar], params: KdjParams) -> Kdj {
    let len = bars.len();
    if params.n == 0 || params.m1 == 0 || params.m2 == 0 {
        let undefined = || vec![f64::NAN; len];
        return Kdj {
            k: IndicatorSeries::new("k", undefined()),
            d: IndicatorSeries::new("d", undefined()),
            j: IndicatorSeries::new("j", undefined()),
        };
    }

    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let highest = rolling_max(&highs, params.n);
    let lowest = rolling_min(&lows, params.n);

    let rsv: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let range = highest[i] - lowest[i];
            let v = (bar.close - lowest[i]) / range * 100.0;
            if v.is_finite() {
                v
            } else {
                NEUTRAL_RSV
            }
        })
        .collect();

    let k = ema_alpha(&rsv, 1.0 / params.m1 as f64);
    let d = ema_alpha(&k, 1.0 / params.m2 as f64);
    let j: Vec<f64> = k.iter().zip(&d).map(|(k, d)| 3.0 * k - 2.0 * d).collect();

    let warmup = params.warmup();
    Kdj {
        k: IndicatorSeries::new("k", k).mask_before(warmup),
        d: IndicatorSeries::new("d", d).mask_before(warmup),
        j: IndicatorSeries::new("j", j).mask_before(warmup),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn undefined_before_n() {
        let closes: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        let out = kdj(&make_bars(&closes), KdjParams::default());
        for i in 0..8 {
            assert_eq!(out.k.get(i), None);
            assert_eq!(out.j.get(i), None);
        }
        assert!(out.k.get(8).is_some());
    }

    #[test]
    fn zero_range_is_neutral() {
        let mut bars = make_bars(&[10.0; 20]);
        for b in &mut bars {
            b.high = 10.0;
            b.low = 10.0;
            b.open = 10.0;
        }
        let out = kdj(&bars, KdjParams::default());
        assert_approx(out.k.last().unwrap(), 50.0, DEFAULT_EPSILON);
        assert_approx(out.d.last().unwrap(), 50.0, DEFAULT_EPSILON);
        assert_approx(out.j.last().unwrap(), 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn j_is_three_k_minus_two_d() {
        let closes: Vec<f64> = (0..40).map(|i| 20.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let out = kdj(&make_bars(&closes), KdjParams::default());
        for i in 8..40 {
            let (k, d, j) = (out.k.get(i).unwrap(), out.d.get(i).unwrap(), out.j.get(i).unwrap());
            assert_approx(j, 3.0 * k - 2.0 * d, 1e-9);
        }
    }

    #[test]
    fn j_can_exceed_hundred() {
        // A long steady climb pins RSV near the top while D lags behind K.
        let mut closes = vec![10.0; 12];
        closes.extend((1..=10).map(|i| 10.0 + i as f64 * 3.0));
        let out = kdj(&make_bars(&closes), KdjParams::default());
        let peak = (8..closes.len()).filter_map(|i| out.j.get(i)).fold(f64::MIN, f64::max);
        assert!(peak > 100.0, "peak J = {peak}");
    }

    #[test]
    fn zero_parameter_is_undefined() {
        let out = kdj(&make_bars(&[1.0, 2.0, 3.0]), KdjParams { n: 0, m1: 3, m2: 3 });
        assert_eq!(out.k.len(), 3);
        assert_eq!(out.k.first_defined(), None);
    }
}
