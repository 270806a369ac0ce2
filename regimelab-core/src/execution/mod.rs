//! Execution and cost model.
//!
//! Fills are priced off a mid plus half the spread plus slippage, always
//! against the trader. Exits are evaluated on the bar's high/low with the stop
//! taking priority when both levels trade inside one bar. Commission is
//! charged per lot on both sides at settlement; swap accrues per daily
//! rollover crossed.

pub mod breakeven;
pub mod exit;
pub mod financing;
pub mod fill_model;
pub mod microstructure;

pub use breakeven::{apply_breakeven, BreakevenConfig};
pub use exit::{check_exit, ExitSignal};
pub use financing::{rollovers_crossed, swap_charge};
pub use fill_model::{commission, entry_costs, entry_fill, exit_fill, gross_pnl, EntryCosts};
pub use microstructure::{MicrostructureConfig, SessionBucket};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Base slippage per fill, before microstructure scaling.
    pub slippage_pips: f64,
    /// Charged per lot on each side.
    pub commission_per_lot: f64,
    /// Charged per lot per rollover crossed while long. Negative is a credit.
    pub swap_long_per_lot: f64,
    /// Charged per lot per rollover crossed while short. Negative is a credit.
    pub swap_short_per_lot: f64,
    /// UTC time of the daily financing cutover.
    pub swap_cutover: NaiveTime,
    pub breakeven: BreakevenConfig,
    pub microstructure: MicrostructureConfig,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            slippage_pips: 2.0,
            commission_per_lot: 0.0,
            swap_long_per_lot: 0.0,
            swap_short_per_lot: 0.0,
            swap_cutover: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            breakeven: BreakevenConfig::default(),
            microstructure: MicrostructureConfig::default(),
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("execution.slippage_pips", self.slippage_pips),
            ("execution.commission_per_lot", self.commission_per_lot),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::Negative { field, value });
            }
        }
        for (field, value) in [
            ("execution.swap_long_per_lot", self.swap_long_per_lot),
            ("execution.swap_short_per_lot", self.swap_short_per_lot),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::OutOfRange {
                    field,
                    detail: format!("{value} is not finite"),
                });
            }
        }
        self.breakeven.validate()?;
        self.microstructure.validate()
    }
}
