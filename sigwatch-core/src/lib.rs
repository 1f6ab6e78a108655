//! Sigwatch Core — indicators, divergence detection, signal classification, backtesting.
//!
//! This crate is the pure engine behind the monitor and the optimizer:
//! - Domain types (bars, periods, signals, trades)
//! - Indicator engine (MA, MACD, KDJ, RSI) over bar slices
//! - Local extrema and price/indicator divergence detection
//! - Closed `IndicatorSpec` enum and the memoryless signal classifier
//! - Backtest replay with single-position trade pairing
//!
//! Nothing here performs I/O; every function is a deterministic function of
//! the bars and parameters it is given.

pub mod backtest;
pub mod divergence;
pub mod domain;
pub mod extrema;
pub mod indicators;
pub mod signals;

pub use backtest::{BacktestEngine, BacktestReport, TradeStats};
pub use domain::{Bar, BarSeries, IndicatorKind, Period, Polarity, Signal, SignalKind};
pub use signals::{ClassifierConfig, IndicatorSpec, SignalClassifier, SpecError};
