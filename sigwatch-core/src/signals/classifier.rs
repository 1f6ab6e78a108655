//! SignalClassifier — turns indicator lines and divergences into signals.
//!
//! Three variants:
//! - crossover: a golden/death cross (or RSI threshold cross) on the bar
//! - divergence: the bar equals a divergence's confirmation index
//! - combo: a crossover while a same-polarity divergence is still open
//!
//! The classifier has no memory. Live monitoring asks for the newest bar;
//! the backtest replays every bar through the same [`Replay::signal_at`].

use serde::{Deserialize, Serialize};

use super::crossover::{series_cross, threshold_cross};
use super::spec::{IndicatorSpec, SpecError};
use crate::divergence::{detect_history, detect_latest, Divergence};
use crate::domain::{Bar, IndicatorKind, Polarity, Signal, SignalKind};
use crate::indicators::{kdj, macd, moving_average, rsi, IndicatorSeries};

/// Thresholds shared by every classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Bars after the second price extremum during which a combo may fire.
    pub combo_validity_bars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            combo_validity_bars: 10,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), String> {
        let ordered = 0.0 <= self.rsi_oversold
            && self.rsi_oversold < self.rsi_overbought
            && self.rsi_overbought <= 100.0;
        if !ordered {
            return Err(format!(
                "RSI thresholds must satisfy 0 <= oversold < overbought <= 100 (got {} / {})",
                self.rsi_oversold, self.rsi_overbought
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalClassifier {
    spec: IndicatorSpec,
    config: ClassifierConfig,
}

impl SignalClassifier {
    /// Validates the spec and thresholds.
    pub fn new(spec: IndicatorSpec, config: ClassifierConfig) -> Result<Self, SpecError> {
        spec.validate()?;
        config.validate().map_err(|reason| SpecError::Invalid {
            indicator: spec.kind().name(),
            reason,
        })?;
        Ok(Self { spec, config })
    }

    pub fn spec(&self) -> &IndicatorSpec {
        &self.spec
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Signal on the newest bar, if any.
    pub fn classify(&self, bars: &[Bar]) -> Option<Signal> {
        let last = bars.len().checked_sub(1)?;
        self.replay(bars).signal_at(last)
    }

    /// Precompute the crossover lines once for bar-by-bar evaluation.
    pub fn replay<'a>(&'a self, bars: &'a [Bar]) -> Replay<'a> {
        Replay {
            classifier: self,
            bars,
            lines: CrossLines::compute(&self.spec, bars),
        }
    }
}

/// The lines a family's crossover is read from.
#[derive(Debug)]
enum CrossLines {
    Pair { fast: IndicatorSeries, slow: IndicatorSeries },
    Threshold(IndicatorSeries),
}

impl CrossLines {
    fn compute(spec: &IndicatorSpec, bars: &[Bar]) -> Self {
        match *spec {
            IndicatorSpec::Macd(p)
            | IndicatorSpec::MacdDivergence { macd: p, .. }
            | IndicatorSpec::MacdCombo { macd: p, .. } => {
                let m = macd(bars, p);
                Self::Pair {
                    fast: m.dif,
                    slow: m.dea,
                }
            }
            IndicatorSpec::Kdj(p)
            | IndicatorSpec::KdjDivergence { kdj: p, .. }
            | IndicatorSpec::KdjCombo { kdj: p, .. } => {
                let k = kdj(bars, p);
                Self::Pair { fast: k.k, slow: k.d }
            }
            IndicatorSpec::Ma(p) => {
                let mut ma = moving_average(bars, &[p.fast, p.slow]);
                let fast = ma.remove(&p.fast).unwrap_or_default();
                let slow = ma.remove(&p.slow).unwrap_or_default();
                Self::Pair { fast, slow }
            }
            IndicatorSpec::Rsi(p) => Self::Threshold(rsi(bars, p)),
        }
    }
}

/// Bar-by-bar view of one classifier over one bar slice.
#[derive(Debug)]
pub struct Replay<'a> {
    classifier: &'a SignalClassifier,
    bars: &'a [Bar],
    lines: CrossLines,
}

impl Replay<'_> {
    /// Crossover polarity on bar `index`, ignoring the divergence part.
    pub fn crossover_at(&self, index: usize) -> Option<Polarity> {
        match &self.lines {
            CrossLines::Pair { fast, slow } => series_cross(fast, slow, index),
            CrossLines::Threshold(line) => {
                let cfg = &self.classifier.config;
                threshold_cross(line.pair(index)?, cfg.rsi_oversold, cfg.rsi_overbought)
            }
        }
    }

    /// Divergences visible from bar `index`, computed on bars `..=index` only.
    pub fn divergences_at(&self, index: usize) -> Vec<Divergence> {
        let spec = &self.classifier.spec;
        match (spec.companion(), spec.divergence()) {
            (Some(companion), Some(params)) if index < self.bars.len() => {
                detect_latest(&self.bars[..=index], companion, params)
            }
            _ => Vec::new(),
        }
    }

    /// Every distinct divergence seen while walking the slice bar by bar.
    /// Empty for crossover-only families.
    pub fn divergence_history(&self) -> Vec<Divergence> {
        let spec = &self.classifier.spec;
        match (spec.companion(), spec.divergence()) {
            (Some(companion), Some(params)) => detect_history(self.bars, companion, params),
            _ => Vec::new(),
        }
    }

    /// Signal fired on bar `index`, if any.
    pub fn signal_at(&self, index: usize) -> Option<Signal> {
        let bar = self.bars.get(index)?;
        let spec = &self.classifier.spec;
        let kind = spec.kind();

        let polarity = match kind {
            IndicatorKind::Macd | IndicatorKind::Kdj | IndicatorKind::Ma | IndicatorKind::Rsi => {
                self.crossover_at(index)?
            }
            IndicatorKind::MacdDivergence | IndicatorKind::KdjDivergence => {
                let window = spec.window()?;
                self.divergences_at(index)
                    .into_iter()
                    .find(|d| d.confirmation_index(window) == index)?
                    .polarity
            }
            IndicatorKind::MacdCombo | IndicatorKind::KdjCombo => {
                let cross = self.crossover_at(index)?;
                let validity = self.classifier.config.combo_validity_bars;
                self.divergences_at(index)
                    .into_iter()
                    .find(|d| d.polarity == cross && d.is_open_at(index, validity))?
                    .polarity
            }
        };

        Some(Signal {
            kind: SignalKind::new(kind, polarity),
            bar_index: index,
            price: bar.close,
            timestamp: bar.timestamp,
        })
    }

    /// Every signal from bar 1 onward, oldest first.
    pub fn signals(&self) -> Vec<Signal> {
        (1..self.bars.len()).filter_map(|i| self.signal_at(i)).collect()
    }
}
