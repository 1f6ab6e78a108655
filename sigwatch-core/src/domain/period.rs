//! Bar period catalogue (1-minute through daily candles).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Time bucket of a bar series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1min")]
    Min1,
    #[serde(rename = "5min")]
    Min5,
    #[serde(rename = "15min")]
    Min15,
    #[serde(rename = "30min")]
    Min30,
    #[serde(rename = "60min")]
    Min60,
    #[serde(rename = "120min")]
    Min120,
    #[serde(rename = "240min")]
    Min240,
    #[serde(rename = "daily")]
    Daily,
}

impl Period {
    pub const ALL: [Period; 8] = [
        Period::Min1,
        Period::Min5,
        Period::Min15,
        Period::Min30,
        Period::Min60,
        Period::Min120,
        Period::Min240,
        Period::Daily,
    ];

    /// Bucket length in minutes (a daily bar counts as 1440).
    pub fn minutes(&self) -> u32 {
        match self {
            Period::Min1 => 1,
            Period::Min5 => 5,
            Period::Min15 => 15,
            Period::Min30 => 30,
            Period::Min60 => 60,
            Period::Min120 => 120,
            Period::Min240 => 240,
            Period::Daily => 1440,
        }
    }

    /// Short code used on the command line and in file names.
    pub fn code(&self) -> &'static str {
        match self {
            Period::Min1 => "1min",
            Period::Min5 => "5min",
            Period::Min15 => "15min",
            Period::Min30 => "30min",
            Period::Min60 => "60min",
            Period::Min120 => "120min",
            Period::Min240 => "240min",
            Period::Daily => "daily",
        }
    }

    /// Human-readable label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            Period::Min1 => "1-minute",
            Period::Min5 => "5-minute",
            Period::Min15 => "15-minute",
            Period::Min30 => "30-minute",
            Period::Min60 => "60-minute",
            Period::Min120 => "120-minute",
            Period::Min240 => "4-hour",
            Period::Daily => "daily",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Period::ALL
            .into_iter()
            .find(|p| p.code() == lower)
            .ok_or_else(|| {
                let valid: Vec<&str> = Period::ALL.iter().map(|p| p.code()).collect();
                format!("unknown period '{s}'. Valid: {}", valid.join(", "))
            })
    }
}
