//! Behavioral gate: daily cap, cooldown, risk throttle, kill switch.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;
use crate::state::TradingState;

/// Discipline limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehavioralLimits {
    pub max_trades_per_day: u32,
    /// Minimum bars between the last trade event and a new entry.
    pub cooldown_bars: usize,
    /// Losing streak that raises the kill switch. `None` disables it.
    pub max_consecutive_losses: Option<u32>,
    /// Execution failures that raise the kill switch.
    pub max_execution_failures: u32,
}

impl Default for BehavioralLimits {
    fn default() -> Self {
        Self {
            max_trades_per_day: 5,
            cooldown_bars: 5,
            max_consecutive_losses: None,
            max_execution_failures: 3,
        }
    }
}

impl BehavioralLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_trades_per_day == 0 {
            return Err(ConfigError::ZeroPeriod {
                field: "behavior.max_trades_per_day",
            });
        }
        if self.max_consecutive_losses == Some(0) {
            return Err(ConfigError::ZeroPeriod {
                field: "behavior.max_consecutive_losses",
            });
        }
        if self.max_execution_failures == 0 {
            return Err(ConfigError::ZeroPeriod {
                field: "behavior.max_execution_failures",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehavioralVeto {
    DailyCap,
    Cooldown,
    RiskThrottle,
    TradingDisabled,
}

impl fmt::Display for BehavioralVeto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BehavioralVeto::DailyCap => "daily trade cap reached",
            BehavioralVeto::Cooldown => "cooldown active",
            BehavioralVeto::RiskThrottle => "risk throttle active",
            BehavioralVeto::TradingDisabled => "trading disabled",
        })
    }
}

/// All four rules must pass. Never mutates the state.
pub fn check(
    state: &TradingState,
    bar_index: usize,
    limits: &BehavioralLimits,
) -> Result<(), BehavioralVeto> {
    if state.trades_today >= limits.max_trades_per_day {
        return Err(BehavioralVeto::DailyCap);
    }
    if let Some(last) = state.last_trade_bar {
        if bar_index.saturating_sub(last) < limits.cooldown_bars {
            return Err(BehavioralVeto::Cooldown);
        }
    }
    if state.risk_throttle {
        return Err(BehavioralVeto::RiskThrottle);
    }
    if state.trading_disabled {
        return Err(BehavioralVeto::TradingDisabled);
    }
    Ok(())
}
