//! Price/indicator divergence detection.
//!
//! The detector looks at a trailing window of `lookback` bars, recomputes the
//! companion indicator (MACD histogram or KDJ's J line) over that window, and
//! compares the two most recent price extrema against the indicator extrema
//! that fall within `[p1 - tolerance, p2 + tolerance]`.
//!
//! - bearish: price makes a higher high while the indicator makes a lower high
//! - bullish: price makes a lower low while the indicator makes a higher low
//!
//! At most one divergence per polarity is reported per window, bearish first.
//! Indices in results are global bar indices.
//!
//! Extrema are searched with [`DivergenceParams::effective_order`]: a turning
//! point needs `order` later bars before it is visible, so a `window` below
//! the order narrows the neighbourhood to `window` bars. The second price
//! extremum therefore becomes visible no later than its confirmation bar.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Polarity};
use crate::extrema::find_extrema;
use crate::indicators::{kdj, macd, IndicatorSeries, KdjParams, MacdParams};

/// Detection parameters shared by the DIV and COMBO families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivergenceParams {
    /// Bars after the second price extremum at which a divergence is confirmed.
    pub window: usize,
    pub lookback: usize,
    /// Neighbours on each side an extremum must strictly dominate.
    pub order: usize,
    /// Lag allowed between price and indicator turning points.
    pub tolerance: usize,
}

impl DivergenceParams {
    /// Neighbourhood actually used for extrema: `min(order, window)`, at least 1.
    pub fn effective_order(&self) -> usize {
        self.order.min(self.window).max(1)
    }
}

impl Default for DivergenceParams {
    fn default() -> Self {
        Self {
            window: 2,
            lookback: 60,
            order: 3,
            tolerance: 5,
        }
    }
}

/// The indicator a divergence is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DivergenceSource {
    Macd,
    Kdj,
}

impl DivergenceSource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Macd => "MACD",
            Self::Kdj => "KDJ",
        }
    }

    /// J has a wider native range than the MACD histogram, so it is scaled less.
    fn strength_scale(&self) -> f64 {
        match self {
            Self::Macd => 10.0,
            Self::Kdj => 5.0,
        }
    }
}

/// Companion indicator together with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Companion {
    MacdHistogram(MacdParams),
    KdjJ(KdjParams),
}

impl Companion {
    pub fn source(&self) -> DivergenceSource {
        match self {
            Self::MacdHistogram(_) => DivergenceSource::Macd,
            Self::KdjJ(_) => DivergenceSource::Kdj,
        }
    }

    pub fn compute(&self, bars: &[Bar]) -> IndicatorSeries {
        match *self {
            Self::MacdHistogram(p) => macd(bars, p).histogram,
            Self::KdjJ(p) => kdj(bars, p).j,
        }
    }
}

/// Two extrema, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtremaPair {
    pub idx1: usize,
    pub idx2: usize,
    pub val1: f64,
    pub val2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    pub polarity: Polarity,
    pub source: DivergenceSource,
    pub price: ExtremaPair,
    pub indicator: ExtremaPair,
    /// Score in `[0, 100]`.
    pub strength: f64,
}

impl Divergence {
    /// Bar at which the divergence is considered settled.
    pub fn confirmation_index(&self, window: usize) -> usize {
        self.price.idx2 + window
    }

    /// Whether `index` lies in `[idx2, idx2 + validity]`.
    pub fn is_open_at(&self, index: usize, validity: usize) -> bool {
        index >= self.price.idx2 && index <= self.price.idx2 + validity
    }
}

/// Latest divergences visible in the trailing `lookback` bars.
///
/// Returns an empty list when fewer than `lookback` bars are available.
pub fn detect_latest(bars: &[Bar], companion: Companion, params: &DivergenceParams) -> Vec<Divergence> {
    if params.lookback == 0 || bars.len() < params.lookback {
        return Vec::new();
    }
    let offset = bars.len() - params.lookback;
    let window = &bars[offset..];

    let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
    let indicator = companion.compute(window);

    detect_in(&closes, indicator.raw(), companion.source(), params, offset)
}

/// Every distinct divergence seen while sliding the live detector over the
/// whole history, in order of first detection.
pub fn detect_history(bars: &[Bar], companion: Companion, params: &DivergenceParams) -> Vec<Divergence> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    if params.lookback == 0 {
        return out;
    }
    for end in params.lookback..=bars.len() {
        for div in detect_latest(&bars[..end], companion, params) {
            if seen.insert((div.polarity, div.price.idx1, div.price.idx2)) {
                out.push(div);
            }
        }
    }
    out
}

/// Match price and indicator extrema within one window.
///
/// `offset` is added to every reported index.
pub fn detect_in(
    closes: &[f64],
    indicator: &[f64],
    source: DivergenceSource,
    params: &DivergenceParams,
    offset: usize,
) -> Vec<Divergence> {
    let order = params.effective_order();
    let (price_peaks, price_valleys) = find_extrema(closes, order);
    let (ind_peaks, ind_valleys) = find_extrema(indicator, order);

    let mut out = Vec::with_capacity(2);
    let ctx = Matcher {
        closes,
        indicator,
        source,
        tolerance: params.tolerance,
        offset,
    };
    if let Some(d) = ctx.match_pair(&price_peaks, &ind_peaks, Polarity::Bearish) {
        out.push(d);
    }
    if let Some(d) = ctx.match_pair(&price_valleys, &ind_valleys, Polarity::Bullish) {
        out.push(d);
    }
    out
}

struct Matcher<'a> {
    closes: &'a [f64],
    indicator: &'a [f64],
    source: DivergenceSource,
    tolerance: usize,
    offset: usize,
}

impl Matcher<'_> {
    fn match_pair(&self, price_ext: &[usize], ind_ext: &[usize], polarity: Polarity) -> Option<Divergence> {
        let [.., p1, p2] = *price_ext else {
            return None;
        };
        let lo = p1.saturating_sub(self.tolerance);
        let hi = p2 + self.tolerance;
        let in_range: Vec<usize> = ind_ext.iter().copied().filter(|&m| m >= lo && m <= hi).collect();
        let [.., m1, m2] = in_range[..] else {
            return None;
        };

        let (pv1, pv2) = (self.closes[p1], self.closes[p2]);
        let (iv1, iv2) = (self.indicator[m1], self.indicator[m2]);

        let (price_move, ind_move) = match polarity {
            Polarity::Bearish if pv2 > pv1 && iv2 < iv1 => (pv2 - pv1, iv1 - iv2),
            Polarity::Bullish if pv2 < pv1 && iv2 > iv1 => (pv1 - pv2, iv2 - iv1),
            _ => return None,
        };

        let price_pct = if pv1 != 0.0 { price_move / pv1.abs() * 100.0 } else { 0.0 };
        let ind_pct = if iv1 != 0.0 { ind_move / iv1.abs() * 100.0 } else { 0.0 };
        let strength = ((price_pct + ind_pct) * self.source.strength_scale()).clamp(0.0, 100.0);

        Some(Divergence {
            polarity,
            source: self.source,
            price: ExtremaPair {
                idx1: p1 + self.offset,
                idx2: p2 + self.offset,
                val1: pv1,
                val2: pv2,
            },
            indicator: ExtremaPair {
                idx1: m1 + self.offset,
                idx2: m2 + self.offset,
                val1: iv1,
                val2: iv2,
            },
            strength,
        })
    }
}
