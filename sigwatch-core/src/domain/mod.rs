//! Domain types for sigwatch

pub mod bar;
pub mod period;
pub mod signal;
pub mod trade;

pub use bar::{Bar, BarError, BarSeries};
pub use period::Period;
pub use signal::{IndicatorKind, Polarity, Signal, SignalKind, SignalVariant};
pub use trade::{OpenPosition, Trade};
