//! Cost filter: spread, rollover timing, total friction.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;
use crate::domain::Instrument;

/// Daily band around the financing cutover, both ends inclusive.
///
/// A window whose `end` precedes its `start` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RolloverWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for RolloverWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(21, 59, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(22, 5, 0).unwrap_or_default(),
        }
    }
}

impl RolloverWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let t = at.time();
        if self.start <= self.end {
            self.start <= t && t <= self.end
        } else {
            t >= self.start || t <= self.end
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostLimits {
    /// Typical spread as a price distance.
    pub median_spread: f64,
    pub max_spread_multiplier: f64,
    pub expected_slippage_pips: f64,
    /// Spread plus expected slippage may not exceed this.
    pub max_friction_pips: f64,
    pub rollover: RolloverWindow,
}

impl Default for CostLimits {
    fn default() -> Self {
        Self {
            median_spread: 0.0001,
            max_spread_multiplier: 1.5,
            expected_slippage_pips: 2.0,
            max_friction_pips: 3.0,
            rollover: RolloverWindow::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostVeto {
    SpreadTooWide,
    RolloverWindow,
    FrictionBudget,
}

impl fmt::Display for CostVeto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CostVeto::SpreadTooWide => "spread too wide",
            CostVeto::RolloverWindow => "inside rollover window",
            CostVeto::FrictionBudget => "friction over budget",
        })
    }
}

impl CostLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("costs.median_spread", self.median_spread),
            ("costs.max_spread_multiplier", self.max_spread_multiplier),
            ("costs.max_friction_pips", self.max_friction_pips),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if !(self.expected_slippage_pips >= 0.0) {
            return Err(ConfigError::Negative {
                field: "costs.expected_slippage_pips",
                value: self.expected_slippage_pips,
            });
        }
        if self.rollover.start == self.rollover.end {
            return Err(ConfigError::OutOfRange {
                field: "costs.rollover",
                detail: "window start equals its end".to_string(),
            });
        }
        Ok(())
    }

    /// Short-circuits in order: spread, rollover, friction.
    ///
    /// `spread` is a price distance.
    pub fn check(
        &self,
        spread: f64,
        at: DateTime<Utc>,
        instrument: &Instrument,
    ) -> Result<(), CostVeto> {
        if spread > self.median_spread * self.max_spread_multiplier {
            return Err(CostVeto::SpreadTooWide);
        }
        if self.rollover.contains(at) {
            return Err(CostVeto::RolloverWindow);
        }
        let friction = instrument.price_to_pips(spread) + self.expected_slippage_pips;
        if friction > self.max_friction_pips {
            return Err(CostVeto::FrictionBudget);
        }
        Ok(())
    }
}
