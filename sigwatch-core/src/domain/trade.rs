//! Trade — a long round trip built from a buy-type and a sell-type signal.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A closed long trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    /// `(exit - entry) / entry * 100`.
    pub return_pct: f64,
}

impl Trade {
    pub fn new(
        entry_index: usize,
        entry_time: NaiveDateTime,
        entry_price: f64,
        exit_index: usize,
        exit_time: NaiveDateTime,
        exit_price: f64,
    ) -> Self {
        Self {
            entry_index,
            entry_time,
            entry_price,
            exit_index,
            exit_time,
            exit_price,
            return_pct: return_pct(entry_price, exit_price),
        }
    }

    pub fn is_winner(&self) -> bool {
        self.return_pct > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }
}

/// A position still open at the final bar, marked at the last close.
///
/// Reported for information only; never counted as a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub mark_price: f64,
    pub unrealized_pct: f64,
}

/// Percentage return of a long trade; 0.0 for a non-positive entry price.
pub fn return_pct(entry_price: f64, exit_price: f64) -> f64 {
    if entry_price <= 0.0 {
        return 0.0;
    }
    (exit_price - entry_price) / entry_price * 100.0
}
