//! CSV bar ingestion and date windowing.
//!
//! Expected header: `timestamp,open,high,low,close[,volume][,spread]`.
//! `spread` is the raw broker spread in points; `volume` and `spread`
//! default to 0 when absent. Timestamps may be RFC 3339, a naive
//! `YYYY-MM-DD HH:MM:SS` (read as UTC), or unix seconds.
//!
//! Rows must already be in strictly increasing time order. A bad row fails
//! the whole load: a replay over partially-read data is not a result.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use regimelab_core::domain::{Bar, BarError};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unrecognized timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },
    #[error("row {row}: {source}")]
    Malformed {
        row: usize,
        #[source]
        source: BarError,
    },
    #[error("row {row}: timestamp is not after the previous row")]
    OutOfOrder { row: usize },
    #[error("no bars in input")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
    #[serde(default)]
    spread: f64,
}

/// Parse one timestamp cell.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y.%m.%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Read and validate bars from any CSV source.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars: Vec<Bar> = Vec::new();
    for (i, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
        // Data rows start on line 2, after the header.
        let row = i + 2;
        let raw = record?;
        let timestamp = parse_timestamp(&raw.timestamp).ok_or_else(|| LoadError::BadTimestamp {
            row,
            value: raw.timestamp.clone(),
        })?;
        let bar = Bar::new(
            timestamp, raw.open, raw.high, raw.low, raw.close, raw.volume, raw.spread,
        );
        bar.validate()
            .map_err(|source| LoadError::Malformed { row, source })?;
        if bars.last().is_some_and(|prev| bar.timestamp <= prev.timestamp) {
            return Err(LoadError::OutOfOrder { row });
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(bars)
}

/// Load bars from a CSV file.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_bars(std::io::BufReader::new(file))?;
    info!(
        path = %path.display(),
        bars = bars.len(),
        first = %bars[0].timestamp,
        last = %bars[bars.len() - 1].timestamp,
        "loaded bars"
    );
    Ok(bars)
}

/// Bars with `start <= timestamp < end`, preceded by up to `warmup` earlier
/// bars so the first bar inside the window can be traded.
pub fn window_with_warmup(
    bars: &[Bar],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    warmup: usize,
) -> &[Bar] {
    let first_in = bars.partition_point(|b| b.timestamp < start);
    let end_idx = bars.partition_point(|b| b.timestamp < end);
    if end_idx <= first_in {
        return &[];
    }
    &bars[first_in.saturating_sub(warmup)..end_idx]
}

/// BLAKE3 over the raw bar fields, for reproducibility records.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp().to_le_bytes());
        for value in [bar.open, bar.high, bar.low, bar.close, bar.volume, bar.spread] {
            hasher.update(&value.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
