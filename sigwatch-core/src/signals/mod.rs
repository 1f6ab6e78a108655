//! Signal classification — portfolio-agnostic, memoryless.
//!
//! Signals depend only on bar data and the indicator spec. Deduplication
//! against a previously emitted signal belongs to the caller.

pub mod classifier;
pub mod crossover;
pub mod spec;

pub use classifier::{ClassifierConfig, Replay, SignalClassifier};
pub use spec::{IndicatorSpec, SpecError};
