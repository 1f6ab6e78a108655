//! BacktestEngine — replays a classifier over history and pairs trades.
//!
//! Single long position: a buy-type signal opens at that bar's close when
//! flat, the next sell-type signal closes. Signals that do not change the
//! position are ignored (no pyramiding, no shorts). A position still open at
//! the end is marked at the final close but never counted as a trade.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{trade::return_pct, Bar, OpenPosition, Signal, Trade};
use crate::signals::SignalClassifier;

/// Aggregate statistics over closed trades.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percentage of winning trades, 0 when there are none.
    pub win_rate: f64,
    /// Mean per-trade return in percent.
    pub avg_return: f64,
    /// Simple (non-compounded) sum of per-trade returns in percent.
    pub total_return: f64,
    pub open_position: Option<OpenPosition>,
}

impl TradeStats {
    pub fn from_trades(trades: &[Trade], open_position: Option<OpenPosition>) -> Self {
        let count = trades.len();
        let wins = trades.iter().filter(|t| t.is_winner()).count();
        let total_return: f64 = trades.iter().map(|t| t.return_pct).sum();
        let (win_rate, avg_return) = if count == 0 {
            (0.0, 0.0)
        } else {
            (
                wins as f64 / count as f64 * 100.0,
                total_return / count as f64,
            )
        };

        Self {
            trades: count,
            wins,
            losses: count - wins,
            win_rate,
            avg_return,
            total_return,
            open_position,
        }
    }
}

/// Result of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub bar_count: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub signals: Vec<Signal>,
    /// Distinct divergences seen over the history, 0 for crossover families.
    pub divergences: usize,
    pub trades: Vec<Trade>,
    pub stats: TradeStats,
}

#[derive(Debug, Clone)]
pub struct BacktestEngine {
    classifier: SignalClassifier,
}

impl BacktestEngine {
    pub fn new(classifier: SignalClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &SignalClassifier {
        &self.classifier
    }

    pub fn run(&self, bars: &[Bar]) -> BacktestReport {
        let replay = self.classifier.replay(bars);
        let signals = replay.signals();
        let divergences = replay.divergence_history().len();
        let (trades, open_position) = pair_trades(bars, &signals);
        let stats = TradeStats::from_trades(&trades, open_position);

        BacktestReport {
            bar_count: bars.len(),
            start: bars.first().map(|b| b.timestamp),
            end: bars.last().map(|b| b.timestamp),
            signals,
            divergences,
            trades,
            stats,
        }
    }
}

/// Pair chronologically ordered signals into long round trips.
pub fn pair_trades(bars: &[Bar], signals: &[Signal]) -> (Vec<Trade>, Option<OpenPosition>) {
    let mut trades = Vec::new();
    let mut entry: Option<&Signal> = None;

    for signal in signals {
        match (entry, signal.is_buy()) {
            (None, true) => entry = Some(signal),
            (Some(open), false) => {
                trades.push(Trade::new(
                    open.bar_index,
                    open.timestamp,
                    open.price,
                    signal.bar_index,
                    signal.timestamp,
                    signal.price,
                ));
                entry = None;
            }
            _ => {}
        }
    }

    let open_position = entry.and_then(|open| {
        let mark = bars.last()?.close;
        Some(OpenPosition {
            entry_index: open.bar_index,
            entry_time: open.timestamp,
            entry_price: open.price,
            mark_price: mark,
            unrealized_pct: return_pct(open.price, mark),
        })
    });

    (trades, open_position)
}
