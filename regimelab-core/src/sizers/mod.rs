//! Position sizing under a fixed-fraction risk budget.
//!
//! ```text
//! risk_dollars = equity × risk_per_trade
//! raw_lots     = risk_dollars / (stop_pips × pip_value_per_lot)
//! notional     = raw_lots × contract_size × price   (capped at equity × max_leverage)
//! size         = floor_to_lot_step(raw_lots)        (zero below min_lot → veto)
//! ```
//!
//! Quantization always rounds down: rounding up would spend more than the
//! risk budget.

pub mod risk_budget;

pub use risk_budget::{apply_risk_multiplier, size_position};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Fraction of equity lost if the stop is hit, e.g. 0.005.
    pub risk_per_trade: f64,
    /// Ceiling on notional / equity.
    pub max_leverage: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.005,
            max_leverage: 5.0,
        }
    }
}

impl RiskLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.risk_per_trade > 0.0 && self.risk_per_trade < 1.0) {
            return Err(ConfigError::NonPositive {
                field: "risk.risk_per_trade",
                value: self.risk_per_trade,
            });
        }
        if !(self.max_leverage > 0.0 && self.max_leverage.is_finite()) {
            return Err(ConfigError::NonPositive {
                field: "risk.max_leverage",
                value: self.max_leverage,
            });
        }
        Ok(())
    }
}

/// Why the sizer returned no position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeVeto {
    NoEquity,
    InvalidStop,
    BelowMinLot,
}

impl fmt::Display for SizeVeto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SizeVeto::NoEquity => "no equity",
            SizeVeto::InvalidStop => "invalid stop distance",
            SizeVeto::BelowMinLot => "below minimum lot",
        })
    }
}
