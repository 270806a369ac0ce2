//! Bar: one closed OHLC candle for a single instrument.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLC bar with tick volume and the broker-quoted spread.
///
/// `spread` is in raw broker points; convert with [`Instrument::spread_price`]
/// before comparing against prices.
///
/// [`Instrument::spread_price`]: crate::domain::Instrument::spread_price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub spread: f64,
}

/// Why a bar failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("non-finite {field}")]
    NonFinite { field: &'static str },

    #[error("non-positive price in {field}: {value}")]
    NonPositivePrice { field: &'static str, value: f64 },

    #[error("high {high} is below low {low}")]
    HighBelowLow { high: f64, low: f64 },

    #[error("high {high} is not the bar maximum (open {open}, close {close})")]
    HighNotExtreme { high: f64, open: f64, close: f64 },

    #[error("low {low} is not the bar minimum (open {open}, close {close})")]
    LowNotExtreme { low: f64, open: f64, close: f64 },

    #[error("negative spread {spread}")]
    NegativeSpread { spread: f64 },
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        spread: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            spread,
        }
    }

    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true if any price field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .any(|v| !v.is_finite())
    }

    /// Full structural check. High and low must bound open and close.
    pub fn validate(&self) -> Result<(), BarError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
            ("spread", self.spread),
        ] {
            if !value.is_finite() {
                return Err(BarError::NonFinite { field });
            }
        }
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if value <= 0.0 {
                return Err(BarError::NonPositivePrice { field, value });
            }
        }
        if self.high < self.low {
            return Err(BarError::HighBelowLow {
                high: self.high,
                low: self.low,
            });
        }
        if self.high < self.open || self.high < self.close {
            return Err(BarError::HighNotExtreme {
                high: self.high,
                open: self.open,
                close: self.close,
            });
        }
        if self.low > self.open || self.low > self.close {
            return Err(BarError::LowNotExtreme {
                low: self.low,
                open: self.open,
                close: self.close,
            });
        }
        if self.spread < 0.0 {
            return Err(BarError::NegativeSpread {
                spread: self.spread,
            });
        }
        Ok(())
    }

    pub fn is_sane(&self) -> bool {
        self.validate().is_ok()
    }
}
