//! Signal — a discrete crossover, divergence or combo event on one bar.
//!
//! Signals are pure functions of a bar series. The engine never stores them;
//! the caller decides whether a signal is new by comparing its `SignalKind`
//! with the last one it persisted.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a signal or divergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Golden cross / bottom divergence: a buy-type event.
    Bullish,
    /// Death cross / top divergence: a sell-type event.
    Bearish,
}

impl Polarity {
    pub fn is_bullish(&self) -> bool {
        matches!(self, Polarity::Bullish)
    }
}

/// How a signal family decides to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalVariant {
    Crossover,
    Divergence,
    Combo,
}

/// The supported indicator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "KDJ")]
    Kdj,
    #[serde(rename = "MA")]
    Ma,
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "MACD_DIV")]
    MacdDivergence,
    #[serde(rename = "KDJ_DIV")]
    KdjDivergence,
    #[serde(rename = "MACD_COMBO")]
    MacdCombo,
    #[serde(rename = "KDJ_COMBO")]
    KdjCombo,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 8] = [
        IndicatorKind::Macd,
        IndicatorKind::Kdj,
        IndicatorKind::Ma,
        IndicatorKind::Rsi,
        IndicatorKind::MacdDivergence,
        IndicatorKind::KdjDivergence,
        IndicatorKind::MacdCombo,
        IndicatorKind::KdjCombo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Kdj => "KDJ",
            IndicatorKind::Ma => "MA",
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::MacdDivergence => "MACD_DIV",
            IndicatorKind::KdjDivergence => "KDJ_DIV",
            IndicatorKind::MacdCombo => "MACD_COMBO",
            IndicatorKind::KdjCombo => "KDJ_COMBO",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            IndicatorKind::Macd => "DIF/DEA golden and death crosses",
            IndicatorKind::Kdj => "K/D golden and death crosses",
            IndicatorKind::Ma => "MA5/MA10 golden and death crosses",
            IndicatorKind::Rsi => "RSI leaving oversold (30) / overbought (70)",
            IndicatorKind::MacdDivergence => "price vs MACD histogram divergence",
            IndicatorKind::KdjDivergence => "price vs KDJ J-line divergence",
            IndicatorKind::MacdCombo => "MACD divergence confirmed by a DIF/DEA cross",
            IndicatorKind::KdjCombo => "KDJ divergence confirmed by a K/D cross",
        }
    }

    pub fn variant(&self) -> SignalVariant {
        match self {
            IndicatorKind::Macd | IndicatorKind::Kdj | IndicatorKind::Ma | IndicatorKind::Rsi => {
                SignalVariant::Crossover
            }
            IndicatorKind::MacdDivergence | IndicatorKind::KdjDivergence => {
                SignalVariant::Divergence
            }
            IndicatorKind::MacdCombo | IndicatorKind::KdjCombo => SignalVariant::Combo,
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a signal, used as the dedup key by monitoring callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalKind {
    pub indicator: IndicatorKind,
    pub polarity: Polarity,
}

impl SignalKind {
    pub fn new(indicator: IndicatorKind, polarity: Polarity) -> Self {
        Self {
            indicator,
            polarity,
        }
    }

    /// Stable code such as `MACD_GOLDEN` or `KDJ_COMBO_BEARISH`.
    pub fn code(&self) -> String {
        let suffix = match (self.indicator.variant(), self.polarity) {
            (SignalVariant::Crossover, Polarity::Bullish) => "GOLDEN",
            (SignalVariant::Crossover, Polarity::Bearish) => "DEATH",
            (_, Polarity::Bullish) => "BULLISH",
            (_, Polarity::Bearish) => "BEARISH",
        };
        format!("{}_{suffix}", self.indicator.name())
    }

    /// Short description for alerts and reports.
    pub fn label(&self) -> &'static str {
        match (self.indicator.variant(), self.polarity) {
            (SignalVariant::Crossover, Polarity::Bullish) => "golden cross (buy)",
            (SignalVariant::Crossover, Polarity::Bearish) => "death cross (sell)",
            (SignalVariant::Divergence, Polarity::Bullish) => "bottom divergence confirmed",
            (SignalVariant::Divergence, Polarity::Bearish) => "top divergence confirmed",
            (SignalVariant::Combo, Polarity::Bullish) => "bottom divergence + golden cross",
            (SignalVariant::Combo, Polarity::Bearish) => "top divergence + death cross",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// A signal fired on a specific bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub bar_index: usize,
    /// Close of the signal bar.
    pub price: f64,
    pub timestamp: NaiveDateTime,
}

impl Signal {
    pub fn polarity(&self) -> Polarity {
        self.kind.polarity
    }

    /// Buy-type events open a position in the backtest.
    pub fn is_buy(&self) -> bool {
        self.kind.polarity.is_bullish()
    }
}
