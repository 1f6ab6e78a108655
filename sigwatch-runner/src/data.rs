//! Market data collaborators.
//!
//! A provider yields a canonical [`BarSeries`] (oldest first, one bar per
//! timestamp) for a symbol and period. Two implementations:
//! - [`CsvDataProvider`]: `<dir>/<symbol>_<period>.csv` files
//! - [`SyntheticProvider`]: deterministic random walk, for demos and tests

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use sigwatch_core::domain::{Bar, BarSeries, Period};

/// Errors from the data layer.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no data file for '{symbol}' ({period}) at {path} (use --synthetic for synthetic data)")]
    NotFound {
        symbol: String,
        period: Period,
        path: PathBuf,
    },

    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} line {line}: unparseable timestamp '{value}'")]
    Timestamp {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("{path} line {line}: non-finite price")]
    Price { path: PathBuf, line: usize },

    #[error("no bars for '{symbol}' ({period})")]
    Empty { symbol: String, period: Period },
}

/// Source of bar history for a symbol and period.
pub trait MarketDataProvider: Send + Sync {
    fn fetch(&self, symbol: &str, period: Period) -> Result<BarSeries, DataError>;
}

impl<T: MarketDataProvider + ?Sized> MarketDataProvider for Box<T> {
    fn fetch(&self, symbol: &str, period: Period) -> Result<BarSeries, DataError> {
        (**self).fetch(symbol, period)
    }
}

// ──────────────────────────────────────────────
// CSV directory
// ──────────────────────────────────────────────

/// Reads `timestamp,open,high,low,close[,volume]` files from a directory.
#[derive(Debug, Clone)]
pub struct CsvDataProvider {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl CsvDataProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a symbol/period pair.
    pub fn path_for(&self, symbol: &str, period: Period) -> PathBuf {
        self.dir.join(format!("{symbol}_{}.csv", period.code()))
    }

    /// Read one CSV file; rows may be in any order and may repeat timestamps.
    pub fn read_file(path: &Path) -> Result<BarSeries, DataError> {
        let csv_err = |source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .map_err(csv_err)?;

        let mut bars = Vec::new();
        for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
            // header is line 1
            let line = i + 2;
            let row = row.map_err(csv_err)?;
            let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| DataError::Timestamp {
                path: path.to_path_buf(),
                line,
                value: row.timestamp.clone(),
            })?;
            let bar = Bar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            };
            if !bar.is_finite() {
                return Err(DataError::Price {
                    path: path.to_path_buf(),
                    line,
                });
            }
            bars.push(bar);
        }
        Ok(BarSeries::canonicalize(bars))
    }
}

impl MarketDataProvider for CsvDataProvider {
    fn fetch(&self, symbol: &str, period: Period) -> Result<BarSeries, DataError> {
        let path = self.path_for(symbol, period);
        if !path.exists() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
                period,
                path,
            });
        }
        let series = Self::read_file(&path)?;
        if series.is_empty() {
            return Err(DataError::Empty {
                symbol: symbol.to_string(),
                period,
            });
        }
        debug!(symbol, %period, bars = series.len(), path = %path.display(), "loaded csv bars");
        Ok(series)
    }
}

// ──────────────────────────────────────────────
// Synthetic
// ──────────────────────────────────────────────

/// Deterministic random-walk bars, seeded from the symbol and period.
///
/// The same symbol/period pair always yields the same series. Every period
/// ends at the same anchor, and coarser periods reach further back, so the
/// series have different start dates like real feeds do.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    bars: usize,
    end: NaiveDateTime,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self {
            bars: 500,
            end: Self::default_end(),
        }
    }
}

impl SyntheticProvider {
    pub fn new(bars: usize, end: NaiveDateTime) -> Self {
        Self { bars, end }
    }

    /// Anchor of the default provider: 2024-12-31 15:00.
    pub fn default_end() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 31)
            .and_then(|d| d.and_hms_opt(15, 0, 0))
            .unwrap_or_default()
    }

    pub fn generate(&self, symbol: &str, period: Period) -> Vec<Bar> {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let key = format!("{symbol}:{}", period.code());
        let seed: [u8; 32] = *blake3::hash(key.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let minutes = i64::from(period.minutes());
        let step = Duration::minutes(minutes);
        let span = i64::try_from(self.bars.saturating_sub(1))
            .ok()
            .and_then(|n| n.checked_mul(minutes))
            .and_then(Duration::try_minutes);
        let Some(start) = span.and_then(|span| self.end.checked_sub_signed(span)) else {
            warn!(symbol, %period, bars = self.bars, "synthetic history does not fit the calendar");
            return Vec::new();
        };

        // Daily-scale volatility shrinks with the square root of bar length.
        let sigma = 0.03 * (f64::from(period.minutes()) / 1440.0).sqrt();

        let mut bars = Vec::with_capacity(self.bars);
        let mut price = 100.0_f64;
        let mut timestamp = start;
        for _ in 0..self.bars {
            let ret: f64 = rng.gen_range(-sigma..sigma);
            let open = price;
            let close = (price * (1.0 + ret)).max(0.01);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..sigma / 3.0));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..sigma / 3.0));
            let volume = rng.gen_range(10_000..1_000_000u64) as f64;

            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume: Some(volume),
            });
            price = close;
            timestamp = timestamp.checked_add_signed(step).unwrap_or(timestamp);
        }
        bars
    }
}

impl MarketDataProvider for SyntheticProvider {
    fn fetch(&self, symbol: &str, period: Period) -> Result<BarSeries, DataError> {
        let bars = self.generate(symbol, period);
        if bars.is_empty() {
            return Err(DataError::Empty {
                symbol: symbol.to_string(),
                period,
            });
        }
        debug!(symbol, %period, bars = bars.len(), "generated synthetic bars");
        Ok(BarSeries::canonicalize(bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("2024-03-01 09:30:00").is_some());
        assert!(parse_timestamp("2024-03-01T09:30:00").is_some());
        assert!(parse_timestamp("2024-03-01 09:30").is_some());
        assert_eq!(
            parse_timestamp("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert!(parse_timestamp("03/01/2024").is_none());
    }

    #[test]
    fn synthetic_is_deterministic() {
        let p = SyntheticProvider::default();
        let a = p.fetch("600519", Period::Min60).unwrap();
        let b = p.fetch("600519", Period::Min60).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 500);
    }

    #[test]
    fn synthetic_differs_by_symbol_and_period() {
        let p = SyntheticProvider::default();
        let a = p.fetch("AAA", Period::Min60).unwrap().closes();
        let b = p.fetch("BBB", Period::Min60).unwrap().closes();
        let c = p.fetch("AAA", Period::Daily).unwrap().closes();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn synthetic_bars_are_sane_and_share_an_end() {
        let p = SyntheticProvider::default();
        let fine = p.fetch("X", Period::Min15).unwrap();
        let coarse = p.fetch("X", Period::Daily).unwrap();
        assert!(fine.bars().iter().all(Bar::is_sane));
        assert_eq!(fine.end(), coarse.end());
        assert!(coarse.start() < fine.start());
    }

    #[test]
    fn synthetic_oversized_history_is_empty_not_a_panic() {
        let end = SyntheticProvider::default_end();
        for bars in [usize::MAX, 1 << 50] {
            let err = SyntheticProvider::new(bars, end)
                .fetch("HUGE", Period::Daily)
                .unwrap_err();
            assert!(matches!(err, DataError::Empty { .. }), "{bars}");
        }
    }

    #[test]
    fn csv_sorts_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvDataProvider::new(dir.path());
        let path = provider.path_for("TEST", Period::Daily);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "timestamp,open,high,low,close,volume").unwrap();
        writeln!(f, "2024-01-03,2,3,1,2.5,100").unwrap();
        writeln!(f, "2024-01-02,1,2,0.5,1.5,100").unwrap();
        writeln!(f, "2024-01-03,2,3,1,2.8,120").unwrap();
        drop(f);

        let series = provider.fetch("TEST", Period::Daily).unwrap();
        assert_eq!(series.closes(), vec![1.5, 2.8]);
        assert_eq!(series.last().unwrap().volume, Some(120.0));
    }

    #[test]
    fn csv_volume_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvDataProvider::new(dir.path());
        std::fs::write(
            provider.path_for("NOVOL", Period::Min60),
            "timestamp,open,high,low,close\n2024-01-02 10:00:00,1,2,0.5,1.5\n",
        )
        .unwrap();
        let series = provider.fetch("NOVOL", Period::Min60).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.first().unwrap().volume, None);
    }

    #[test]
    fn csv_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvDataProvider::new(dir.path())
            .fetch("NONE", Period::Daily)
            .unwrap_err();
        assert!(matches!(err, DataError::NotFound { .. }));
    }

    #[test]
    fn csv_rejects_infinite_prices_in_any_field() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvDataProvider::new(dir.path());
        let rows = ["inf,2,0.5,1.5", "1,inf,0.5,1.5", "1,2,-inf,1.5", "1,2,0.5,inf"];
        for (i, row) in rows.iter().enumerate() {
            let symbol = format!("INF{i}");
            std::fs::write(
                provider.path_for(&symbol, Period::Daily),
                format!("timestamp,open,high,low,close\n2024-01-02,1,2,0.5,1.5\n2024-01-03,{row}\n"),
            )
            .unwrap();
            let err = provider.fetch(&symbol, Period::Daily).unwrap_err();
            assert!(matches!(err, DataError::Price { line: 3, .. }), "{row}: {err}");
        }
    }

    #[test]
    fn csv_bad_timestamp_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvDataProvider::new(dir.path());
        std::fs::write(
            provider.path_for("BAD", Period::Daily),
            "timestamp,open,high,low,close\n2024-01-02,1,2,0.5,1.5\nyesterday,1,2,0.5,1.5\n",
        )
        .unwrap();
        let err = provider.fetch("BAD", Period::Daily).unwrap_err();
        assert!(matches!(err, DataError::Timestamp { line: 3, .. }));
    }
}
