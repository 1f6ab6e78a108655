//! IndicatorSpec — the closed set of indicator families a task can watch.
//!
//! Specs are built from a family name plus `key=value` parameters (the form
//! used on the command line and in task files) or deserialized from JSON,
//! and are validated before any classifier is constructed from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::divergence::{Companion, DivergenceParams};
use crate::domain::IndicatorKind;
use crate::indicators::{KdjParams, MaParams, MacdParams, RsiParams};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("unknown indicator '{0}' (expected one of MACD, KDJ, MA, RSI, MACD_DIV, KDJ_DIV, MACD_COMBO, KDJ_COMBO)")]
    UnknownIndicator(String),

    #[error("{indicator} does not take a '{key}' parameter")]
    UnknownParameter { indicator: &'static str, key: String },

    #[error("parameter '{key}' must be a positive integer, got '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("malformed parameter '{0}' (expected key=value)")]
    Malformed(String),

    #[error("invalid {indicator} parameters: {reason}")]
    Invalid {
        indicator: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IndicatorSpec {
    #[serde(rename = "MACD")]
    Macd(MacdParams),
    #[serde(rename = "KDJ")]
    Kdj(KdjParams),
    #[serde(rename = "MA")]
    Ma(MaParams),
    #[serde(rename = "RSI")]
    Rsi(RsiParams),
    #[serde(rename = "MACD_DIV")]
    MacdDivergence {
        #[serde(default)]
        macd: MacdParams,
        #[serde(default)]
        divergence: DivergenceParams,
    },
    #[serde(rename = "KDJ_DIV")]
    KdjDivergence {
        #[serde(default)]
        kdj: KdjParams,
        #[serde(default)]
        divergence: DivergenceParams,
    },
    #[serde(rename = "MACD_COMBO")]
    MacdCombo {
        #[serde(default)]
        macd: MacdParams,
        #[serde(default)]
        divergence: DivergenceParams,
    },
    #[serde(rename = "KDJ_COMBO")]
    KdjCombo {
        #[serde(default)]
        kdj: KdjParams,
        #[serde(default)]
        divergence: DivergenceParams,
    },
}

impl IndicatorSpec {
    /// Default parameters for a family.
    pub fn default_for(kind: IndicatorKind) -> Self {
        let divergence = DivergenceParams::default();
        match kind {
            IndicatorKind::Macd => Self::Macd(MacdParams::default()),
            IndicatorKind::Kdj => Self::Kdj(KdjParams::default()),
            IndicatorKind::Ma => Self::Ma(MaParams::default()),
            IndicatorKind::Rsi => Self::Rsi(RsiParams::default()),
            IndicatorKind::MacdDivergence => Self::MacdDivergence {
                macd: MacdParams::default(),
                divergence,
            },
            IndicatorKind::KdjDivergence => Self::KdjDivergence {
                kdj: KdjParams::default(),
                divergence,
            },
            IndicatorKind::MacdCombo => Self::MacdCombo {
                macd: MacdParams::default(),
                divergence,
            },
            IndicatorKind::KdjCombo => Self::KdjCombo {
                kdj: KdjParams::default(),
                divergence,
            },
        }
    }

    /// Parse a family name (case-insensitive) with `(key, value)` overrides.
    pub fn parse<K, V>(name: &str, params: impl IntoIterator<Item = (K, V)>) -> Result<Self, SpecError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let kind = parse_kind(name)?;
        let mut spec = Self::default_for(kind);
        for (key, value) in params {
            spec.set(key.as_ref(), value.as_ref())?;
        }
        spec.validate()?;
        Ok(spec)
    }

    /// Divergence-family spec with a given sensitivity window.
    pub fn with_window(kind: IndicatorKind, window: usize) -> Self {
        let mut spec = Self::default_for(kind);
        if let Some(d) = spec.divergence_mut() {
            d.window = window;
        }
        spec
    }

    pub fn kind(&self) -> IndicatorKind {
        match self {
            Self::Macd(_) => IndicatorKind::Macd,
            Self::Kdj(_) => IndicatorKind::Kdj,
            Self::Ma(_) => IndicatorKind::Ma,
            Self::Rsi(_) => IndicatorKind::Rsi,
            Self::MacdDivergence { .. } => IndicatorKind::MacdDivergence,
            Self::KdjDivergence { .. } => IndicatorKind::KdjDivergence,
            Self::MacdCombo { .. } => IndicatorKind::MacdCombo,
            Self::KdjCombo { .. } => IndicatorKind::KdjCombo,
        }
    }

    pub fn divergence(&self) -> Option<&DivergenceParams> {
        match self {
            Self::MacdDivergence { divergence, .. }
            | Self::KdjDivergence { divergence, .. }
            | Self::MacdCombo { divergence, .. }
            | Self::KdjCombo { divergence, .. } => Some(divergence),
            _ => None,
        }
    }

    fn divergence_mut(&mut self) -> Option<&mut DivergenceParams> {
        match self {
            Self::MacdDivergence { divergence, .. }
            | Self::KdjDivergence { divergence, .. }
            | Self::MacdCombo { divergence, .. }
            | Self::KdjCombo { divergence, .. } => Some(divergence),
            _ => None,
        }
    }

    /// Sensitivity window for divergence families.
    pub fn window(&self) -> Option<usize> {
        self.divergence().map(|d| d.window)
    }

    /// The indicator a divergence family compares price against.
    pub fn companion(&self) -> Option<Companion> {
        match *self {
            Self::MacdDivergence { macd, .. } | Self::MacdCombo { macd, .. } => {
                Some(Companion::MacdHistogram(macd))
            }
            Self::KdjDivergence { kdj, .. } | Self::KdjCombo { kdj, .. } => Some(Companion::KdjJ(kdj)),
            _ => None,
        }
    }

    /// Bars needed before the family can produce anything.
    pub fn min_bars(&self) -> usize {
        match self {
            Self::Macd(p) => p.warmup() + 2,
            Self::Kdj(p) => p.warmup() + 2,
            Self::Ma(p) => p.slow.max(p.fast) + 1,
            Self::Rsi(p) => p.period + 2,
            Self::MacdDivergence { divergence, .. }
            | Self::KdjDivergence { divergence, .. }
            | Self::MacdCombo { divergence, .. }
            | Self::KdjCombo { divergence, .. } => divergence.lookback,
        }
    }

    /// Reject zero counts and inverted fast/slow pairs.
    pub fn validate(&self) -> Result<(), SpecError> {
        let name = self.kind().name();
        let invalid = |reason: String| SpecError::Invalid {
            indicator: name,
            reason,
        };

        match self {
            Self::Macd(p) => validate_macd(p).map_err(invalid),
            Self::Kdj(p) => validate_kdj(p).map_err(invalid),
            Self::Ma(p) => {
                if p.fast == 0 || p.slow == 0 {
                    Err(invalid("windows must be positive".into()))
                } else if p.fast >= p.slow {
                    Err(invalid(format!("fast ({}) must be shorter than slow ({})", p.fast, p.slow)))
                } else {
                    Ok(())
                }
            }
            Self::Rsi(p) => {
                if p.period == 0 {
                    Err(invalid("period must be positive".into()))
                } else {
                    Ok(())
                }
            }
            Self::MacdDivergence { macd, divergence } | Self::MacdCombo { macd, divergence } => {
                validate_macd(macd).map_err(invalid)?;
                validate_divergence(divergence).map_err(invalid)
            }
            Self::KdjDivergence { kdj, divergence } | Self::KdjCombo { kdj, divergence } => {
                validate_kdj(kdj).map_err(invalid)?;
                validate_divergence(divergence).map_err(invalid)
            }
        }
    }

    fn set(&mut self, key: &str, raw: &str) -> Result<(), SpecError> {
        let indicator = self.kind().name();
        let key_lc = key.trim().to_ascii_lowercase();
        let value = parse_count(&key_lc, raw)?;
        let unknown = || SpecError::UnknownParameter {
            indicator,
            key: key.to_string(),
        };

        match self {
            Self::Macd(p) => set_macd(p, &key_lc, value).ok_or_else(unknown),
            Self::Kdj(p) => set_kdj(p, &key_lc, value).ok_or_else(unknown),
            Self::Ma(p) => {
                match key_lc.as_str() {
                    "fast" => p.fast = value,
                    "slow" => p.slow = value,
                    _ => return Err(unknown()),
                }
                Ok(())
            }
            Self::Rsi(p) => match key_lc.as_str() {
                "period" => {
                    p.period = value;
                    Ok(())
                }
                _ => Err(unknown()),
            },
            Self::MacdDivergence { macd, divergence } | Self::MacdCombo { macd, divergence } => {
                set_divergence(divergence, &key_lc, value)
                    .or_else(|| set_macd(macd, &key_lc, value))
                    .ok_or_else(unknown)
            }
            Self::KdjDivergence { kdj, divergence } | Self::KdjCombo { kdj, divergence } => {
                set_divergence(divergence, &key_lc, value)
                    .or_else(|| set_kdj(kdj, &key_lc, value))
                    .ok_or_else(unknown)
            }
        }
    }
}

fn parse_kind(name: &str) -> Result<IndicatorKind, SpecError> {
    let upper = name.trim().to_ascii_uppercase();
    IndicatorKind::ALL
        .into_iter()
        .find(|k| k.name() == upper)
        .ok_or_else(|| SpecError::UnknownIndicator(name.to_string()))
}

fn parse_count(key: &str, raw: &str) -> Result<usize, SpecError> {
    match raw.trim().parse::<usize>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(SpecError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn set_macd(p: &mut MacdParams, key: &str, value: usize) -> Option<()> {
    match key {
        "fast" => p.fast = value,
        "slow" => p.slow = value,
        "signal" => p.signal = value,
        _ => return None,
    }
    Some(())
}

fn set_kdj(p: &mut KdjParams, key: &str, value: usize) -> Option<()> {
    match key {
        "n" => p.n = value,
        "m1" => p.m1 = value,
        "m2" => p.m2 = value,
        _ => return None,
    }
    Some(())
}

fn set_divergence(p: &mut DivergenceParams, key: &str, value: usize) -> Option<()> {
    match key {
        "window" | "order" => p.window = value,
        "lookback" => p.lookback = value,
        "extrema_order" => p.order = value,
        "tolerance" => p.tolerance = value,
        _ => return None,
    }
    Some(())
}

fn validate_macd(p: &MacdParams) -> Result<(), String> {
    if p.fast == 0 || p.slow == 0 || p.signal == 0 {
        return Err("spans must be positive".into());
    }
    if p.fast >= p.slow {
        return Err(format!("fast ({}) must be shorter than slow ({})", p.fast, p.slow));
    }
    Ok(())
}

fn validate_kdj(p: &KdjParams) -> Result<(), String> {
    if p.n == 0 || p.m1 == 0 || p.m2 == 0 {
        return Err("n, m1 and m2 must be positive".into());
    }
    Ok(())
}

fn validate_divergence(p: &DivergenceParams) -> Result<(), String> {
    if p.window == 0 {
        return Err("window must be positive".into());
    }
    if p.order == 0 {
        return Err("extrema_order must be positive".into());
    }
    if p.lookback < 2 * p.order + 1 {
        return Err(format!(
            "lookback ({}) too short for extrema order {}",
            p.lookback, p.order
        ));
    }
    Ok(())
}

impl fmt::Display for IndicatorSpec {
    /// Canonical form: the family name, then every parameter that differs
    /// from its default. Divergence families always show `window`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().name())?;

        let mut params: Vec<(&str, usize)> = Vec::new();
        if let Some(d) = self.divergence() {
            let dd = DivergenceParams::default();
            params.push(("window", d.window));
            if d.lookback != dd.lookback {
                params.push(("lookback", d.lookback));
            }
            if d.order != dd.order {
                params.push(("extrema_order", d.order));
            }
            if d.tolerance != dd.tolerance {
                params.push(("tolerance", d.tolerance));
            }
        }
        match self {
            Self::Macd(p) | Self::MacdDivergence { macd: p, .. } | Self::MacdCombo { macd: p, .. } => {
                let dp = MacdParams::default();
                push_changed(&mut params, "fast", p.fast, dp.fast);
                push_changed(&mut params, "slow", p.slow, dp.slow);
                push_changed(&mut params, "signal", p.signal, dp.signal);
            }
            Self::Kdj(p) | Self::KdjDivergence { kdj: p, .. } | Self::KdjCombo { kdj: p, .. } => {
                let dp = KdjParams::default();
                push_changed(&mut params, "n", p.n, dp.n);
                push_changed(&mut params, "m1", p.m1, dp.m1);
                push_changed(&mut params, "m2", p.m2, dp.m2);
            }
            Self::Ma(p) => {
                let dp = MaParams::default();
                push_changed(&mut params, "fast", p.fast, dp.fast);
                push_changed(&mut params, "slow", p.slow, dp.slow);
            }
            Self::Rsi(p) => push_changed(&mut params, "period", p.period, RsiParams::default().period),
        }

        for (k, v) in params {
            write!(f, " {k}={v}")?;
        }
        Ok(())
    }
}

fn push_changed(params: &mut Vec<(&'static str, usize)>, key: &'static str, value: usize, default: usize) {
    if value != default {
        params.push((key, value));
    }
}

impl FromStr for IndicatorSpec {
    type Err = SpecError;

    /// Parses the canonical form, e.g. `MACD_DIV window=3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let name = tokens.next().unwrap_or_default();
        let params = tokens
            .map(|t| {
                t.split_once('=')
                    .ok_or_else(|| SpecError::Malformed(t.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::parse(name, params)
    }
}
