//! Latest values of every indicator, for alerts and reports.

use serde::{Deserialize, Serialize};

use super::{kdj, macd, moving_average, rsi, KdjParams, MacdParams, RsiParams};
use crate::domain::Bar;

const MA_WINDOWS: [usize; 4] = [5, 10, 20, 60];

/// Newest value of each indicator line; `None` while still in warmup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: Option<f64>,
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
    pub dif: Option<f64>,
    pub dea: Option<f64>,
    pub macd: Option<f64>,
    pub k: Option<f64>,
    pub d: Option<f64>,
    pub j: Option<f64>,
    pub rsi: Option<f64>,
}

impl IndicatorSnapshot {
    /// Snapshot with default parameters.
    pub fn latest(bars: &[Bar]) -> Self {
        let ma = moving_average(bars, &MA_WINDOWS);
        let ma_last = |w: usize| ma.get(&w).and_then(|s| s.last());
        let m = macd(bars, MacdParams::default());
        let kd = kdj(bars, KdjParams::default());

        Self {
            close: bars.last().map(|b| b.close),
            ma5: ma_last(5),
            ma10: ma_last(10),
            ma20: ma_last(20),
            ma60: ma_last(60),
            dif: m.dif.last(),
            dea: m.dea.last(),
            macd: m.histogram.last(),
            k: kd.k.last(),
            d: kd.d.last(),
            j: kd.j.last(),
            rsi: rsi(bars, RsiParams::default()).last(),
        }
    }

    /// `(label, value)` pairs for defined lines, in display order.
    pub fn lines(&self) -> Vec<(&'static str, f64)> {
        [
            ("MA5", self.ma5),
            ("MA10", self.ma10),
            ("MA20", self.ma20),
            ("MA60", self.ma60),
            ("DIF", self.dif),
            ("DEA", self.dea),
            ("MACD", self.macd),
            ("K", self.k),
            ("D", self.d),
            ("J", self.j),
            ("RSI", self.rsi),
        ]
        .into_iter()
        .filter_map(|(name, v)| v.map(|v| (name, v)))
        .collect()
    }
}
