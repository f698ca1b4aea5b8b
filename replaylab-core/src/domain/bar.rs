//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single instrument over a fixed interval.
///
/// Bars are immutable once ingested. Per-instrument sequences must be strictly
/// increasing in timestamp with no duplicates; `validate_series` enforces this
/// before any simulation work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Basic OHLC sanity check: high is the top of the range, low the bottom.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && !self.open.is_nan()
            && !self.high.is_nan()
            && !self.low.is_nan()
            && !self.close.is_nan()
    }

    /// High-to-low range of the bar.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Errors raised at bar-series validation, before the run starts.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{instrument}: empty bar series")]
    EmptySeries { instrument: String },

    #[error("{instrument}: bar {index} at {timestamp} is not after its predecessor")]
    NonChronological {
        instrument: String,
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("{instrument}: bar {index} fails OHLC sanity (o={open}, h={high}, l={low}, c={close})")]
    InsaneBar {
        instrument: String,
        index: usize,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("{instrument}: bar {index} tagged for instrument {found}")]
    MislabeledBar {
        instrument: String,
        index: usize,
        found: String,
    },
}

/// Validate a per-instrument series: non-empty, strictly increasing timestamps
/// (which also rules out duplicates), OHLC-sane, and consistently labeled.
pub fn validate_series(instrument: &str, bars: &[Bar]) -> Result<(), DataError> {
    if bars.is_empty() {
        return Err(DataError::EmptySeries {
            instrument: instrument.to_string(),
        });
    }

    let mut prev: Option<DateTime<Utc>> = None;
    for (index, bar) in bars.iter().enumerate() {
        if bar.instrument != instrument {
            return Err(DataError::MislabeledBar {
                instrument: instrument.to_string(),
                index,
                found: bar.instrument.clone(),
            });
        }
        if !bar.is_sane() {
            return Err(DataError::InsaneBar {
                instrument: instrument.to_string(),
                index,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
            });
        }
        if let Some(p) = prev {
            if bar.timestamp <= p {
                return Err(DataError::NonChronological {
                    instrument: instrument.to_string(),
                    index,
                    timestamp: bar.timestamp,
                });
            }
        }
        prev = Some(bar.timestamp);
    }
    Ok(())
}
