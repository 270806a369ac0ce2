//! Engine configuration and setup-time validation.
//!
//! Each component owns its parameter block; [`EngineConfig`] gathers them,
//! checks cross-field constraints and produces a stable fingerprint.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Instrument;
use crate::execution::ExecutionConfig;
use crate::gates::{BehavioralLimits, CostLimits, SessionFilter};
use crate::indicators::IndicatorConfig;
use crate::regime::RegimeThresholds;
use crate::signal::SignalConfig;
use crate::sizers::RiskLimits;

/// Invalid parameter combination, rejected before any bar is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    ZeroPeriod { field: &'static str },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} is out of range: {detail}")]
    OutOfRange { field: &'static str, detail: String },

    #[error(
        "regime thresholds must satisfy compression < expansion < extreme \
         (got {compression}, {expansion}, {extreme})"
    )]
    ThresholdOrder {
        compression: f64,
        expansion: f64,
        extreme: f64,
    },

    #[error("warm-up of {warmup_bars} bars is shorter than the required lookback of {required}")]
    WarmupTooShort { warmup_bars: usize, required: usize },
}

/// Every parameter the decision pipeline and the trade lifecycle read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub instrument: Instrument,
    /// Closed bars that must precede the first decision.
    pub warmup_bars: usize,
    pub indicators: IndicatorConfig,
    pub regime: RegimeThresholds,
    pub signal: SignalConfig,
    pub behavior: BehavioralLimits,
    pub session: SessionFilter,
    pub costs: CostLimits,
    pub risk: RiskLimits,
    pub execution: ExecutionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instrument: Instrument::default(),
            warmup_bars: 100,
            indicators: IndicatorConfig::default(),
            regime: RegimeThresholds::default(),
            signal: SignalConfig::default(),
            behavior: BehavioralLimits::default(),
            session: SessionFilter::default(),
            costs: CostLimits::default(),
            risk: RiskLimits::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.instrument.validate()?;
        self.indicators.validate()?;
        self.regime.validate()?;
        self.signal.validate()?;
        self.behavior.validate()?;
        self.session.validate()?;
        self.costs.validate()?;
        self.risk.validate()?;
        self.execution.validate()?;

        let required = self.indicators.required_lookback();
        if self.warmup_bars < required {
            return Err(ConfigError::WarmupTooShort {
                warmup_bars: self.warmup_bars,
                required,
            });
        }
        Ok(())
    }

    /// BLAKE3 hex digest of the canonical JSON form.
    ///
    /// Two configs with the same fingerprint drive identical replays.
    pub fn fingerprint(&self) -> String {
        // Plain structs and enums only; serialization cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}
