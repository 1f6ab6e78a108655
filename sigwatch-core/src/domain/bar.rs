//! Bar and BarSeries — the fundamental market data units.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One OHLC(V) observation for a fixed time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl Bar {
    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Returns true if every OHLC field is a finite number.
    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Basic OHLC sanity check: high >= low and open/close inside the range.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// Errors raised when assembling a `BarSeries`.
#[derive(Debug, Error, PartialEq)]
pub enum BarError {
    #[error("timestamps must be strictly increasing: bar {index} at {timestamp} does not follow {previous}")]
    NonIncreasing {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },
}

/// Ordered, timestamp-unique sequence of bars, oldest first.
///
/// Immutable once built: every engine operation borrows it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Bar>", into = "Vec<Bar>")]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series, rejecting out-of-order or duplicate timestamps.
    pub fn new(bars: Vec<Bar>) -> Result<Self, BarError> {
        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(BarError::NonIncreasing {
                    index: i + 1,
                    timestamp: pair[1].timestamp,
                    previous: pair[0].timestamp,
                });
            }
        }
        Ok(Self { bars })
    }

    /// Sort oldest-first and drop duplicate timestamps, keeping the last
    /// occurrence of each.
    pub fn canonicalize(mut bars: Vec<Bar>) -> Self {
        // Stable sort keeps input order among equal timestamps, so the
        // last duplicate wins below.
        bars.sort_by_key(|b| b.timestamp);
        let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match out.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => out.push(bar),
            }
        }
        Self { bars: out }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Timestamp of the oldest bar.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.bars.first().map(|b| b.timestamp)
    }

    /// Timestamp of the newest bar.
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.bars.last().map(|b| b.timestamp)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    /// The first `len` bars (the whole series if `len` exceeds it).
    pub fn prefix(&self, len: usize) -> BarSeries {
        Self {
            bars: self.bars[..len.min(self.bars.len())].to_vec(),
        }
    }

    /// The last `len` bars (the whole series if `len` exceeds it).
    pub fn tail(&self, len: usize) -> BarSeries {
        let start = self.bars.len().saturating_sub(len);
        Self {
            bars: self.bars[start..].to_vec(),
        }
    }

    /// Bars with `timestamp >= start`.
    pub fn since(&self, start: NaiveDateTime) -> BarSeries {
        let from = self.bars.partition_point(|b| b.timestamp < start);
        Self {
            bars: self.bars[from..].to_vec(),
        }
    }
}

impl TryFrom<Vec<Bar>> for BarSeries {
    type Error = BarError;

    fn try_from(bars: Vec<Bar>) -> Result<Self, Self::Error> {
        Self::new(bars)
    }
}

impl From<BarSeries> for Vec<Bar> {
    fn from(series: BarSeries) -> Self {
        series.bars
    }
}
