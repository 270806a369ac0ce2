//! Breakeven stop adjustment.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::{Bar, Instrument, OpenTrade};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakevenConfig {
    pub enabled: bool,
    /// Favorable excursion, in multiples of the stop distance, that arms the move.
    pub trigger_r: f64,
    /// Distance beyond the entry fill, in the trade's favor, for the new stop.
    pub offset_pips: f64,
}

impl Default for BreakevenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_r: 1.0,
            offset_pips: 0.0,
        }
    }
}

impl BreakevenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.trigger_r > 0.0 && self.trigger_r.is_finite()) {
            return Err(ConfigError::NonPositive {
                field: "execution.breakeven.trigger_r",
                value: self.trigger_r,
            });
        }
        if !(self.offset_pips >= 0.0) {
            return Err(ConfigError::Negative {
                field: "execution.breakeven.offset_pips",
                value: self.offset_pips,
            });
        }
        Ok(())
    }
}

/// Move the stop to entry ± offset once the bar's excursion reaches the trigger.
///
/// Only ever tightens, and at most once per trade. Returns true if the stop moved.
pub fn apply_breakeven(
    trade: &mut OpenTrade,
    bar: &Bar,
    config: &BreakevenConfig,
    instrument: &Instrument,
) -> bool {
    if !config.enabled || trade.breakeven_applied {
        return false;
    }
    if trade.favorable_excursion(bar) < trade.stop_distance * config.trigger_r {
        return false;
    }

    let sign = trade.direction.sign();
    let new_stop = trade.entry_price + sign * instrument.pips_to_price(config.offset_pips);
    if (new_stop - trade.stop_loss) * sign <= 0.0 {
        return false;
    }
    trade.stop_loss = new_stop;
    trade.breakeven_applied = true;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use crate::execution::exit::test_support::open_trade;
    use chrono::{TimeZone, Utc};

    fn bar(high: f64, low: f64) -> Bar {
        let t = Utc.with_ymd_and_hms(2025, 12, 2, 10, 2, 0).unwrap();
        Bar::new(t, low, high, low, high, 10.0, 10.0)
    }

    #[test]
    fn arms_at_one_r() {
        let mut t = open_trade(Direction::Buy);
        let cfg = BreakevenConfig::default();
        assert!(!apply_breakeven(&mut t, &bar(1.1014, 1.1000), &cfg, &Instrument::default()));
        assert!(apply_breakeven(&mut t, &bar(1.1016, 1.1000), &cfg, &Instrument::default()));
        assert_eq!(t.stop_loss, t.entry_price);
        assert!(t.breakeven_applied);
    }

    #[test]
    fn applies_only_once() {
        let mut t = open_trade(Direction::Sell);
        let cfg = BreakevenConfig {
            offset_pips: 1.0,
            ..BreakevenConfig::default()
        };
        let inst = Instrument::default();
        assert!(apply_breakeven(&mut t, &bar(1.1000, 1.0980), &cfg, &inst));
        assert!((t.stop_loss - 1.0999).abs() < 1e-12);
        let before = t.stop_loss;
        assert!(!apply_breakeven(&mut t, &bar(1.1000, 1.0950), &cfg, &inst));
        assert_eq!(t.stop_loss, before);
    }

    #[test]
    fn never_loosens() {
        let mut t = open_trade(Direction::Buy);
        // Stop already tighter than breakeven.
        t.stop_loss = 1.1005;
        let cfg = BreakevenConfig::default();
        assert!(!apply_breakeven(&mut t, &bar(1.1020, 1.1006), &cfg, &Instrument::default()));
        assert_eq!(t.stop_loss, 1.1005);
    }

    #[test]
    fn disabled_does_nothing() {
        let mut t = open_trade(Direction::Buy);
        let cfg = BreakevenConfig {
            enabled: false,
            ..BreakevenConfig::default()
        };
        assert!(!apply_breakeven(&mut t, &bar(1.1100, 1.1000), &cfg, &Instrument::default()));
    }
}
