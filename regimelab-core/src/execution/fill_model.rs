//! Fill prices and per-trade charges.

use chrono::{DateTime, Utc};

use super::ExecutionConfig;
use crate::domain::{Direction, Instrument};
use crate::regime::VolatilityState;

/// Spread and slippage charged on a trade, as price distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryCosts {
    pub spread: f64,
    pub slippage: f64,
}

/// Scale the quoted spread and configured slippage for the entry moment.
pub fn entry_costs(
    quoted_spread: f64,
    at: DateTime<Utc>,
    volatility: VolatilityState,
    config: &ExecutionConfig,
    instrument: &Instrument,
) -> EntryCosts {
    let factor = config.microstructure.multiplier(at, volatility);
    EntryCosts {
        spread: quoted_spread * factor,
        slippage: instrument.pips_to_price(config.slippage_pips) * factor,
    }
}

/// Mid plus half-spread plus slippage for BUY, minus for SELL.
pub fn entry_fill(direction: Direction, mid: f64, costs: &EntryCosts) -> f64 {
    mid + direction.sign() * (costs.spread / 2.0 + costs.slippage)
}

/// Exit level adjusted against the trader: lower for a BUY, higher for a SELL.
pub fn exit_fill(direction: Direction, level: f64, costs: &EntryCosts) -> f64 {
    level - direction.sign() * (costs.spread / 2.0 + costs.slippage)
}

/// Price PnL in account currency before commission and swap.
pub fn gross_pnl(
    direction: Direction,
    entry_price: f64,
    exit_price: f64,
    size: f64,
    instrument: &Instrument,
) -> f64 {
    direction.sign() * (exit_price - entry_price) * instrument.contract_size * size
}

/// Round-turn commission.
pub fn commission(size: f64, per_lot_per_side: f64) -> f64 {
    per_lot_per_side * size * 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::TimeZone;

    fn costs() -> EntryCosts {
        EntryCosts {
            spread: 0.00010,
            slippage: 0.00020,
        }
    }

    #[test]
    fn entry_is_adverse() {
        assert_approx(entry_fill(Direction::Buy, 1.1, &costs()), 1.10025, DEFAULT_EPSILON);
        assert_approx(entry_fill(Direction::Sell, 1.1, &costs()), 1.09975, DEFAULT_EPSILON);
    }

    #[test]
    fn exit_is_adverse() {
        assert_approx(exit_fill(Direction::Buy, 1.1030, &costs()), 1.10275, DEFAULT_EPSILON);
        assert_approx(exit_fill(Direction::Sell, 1.0970, &costs()), 1.09725, DEFAULT_EPSILON);
    }

    #[test]
    fn gross_pnl_per_lot() {
        let inst = Instrument::default();
        // 10 pips on 0.10 lots = $10
        assert_approx(gross_pnl(Direction::Buy, 1.1000, 1.1010, 0.10, &inst), 10.0, 1e-9);
        assert_approx(gross_pnl(Direction::Sell, 1.1000, 1.1010, 0.10, &inst), -10.0, 1e-9);
    }

    #[test]
    fn commission_both_sides() {
        assert_approx(commission(0.5, 3.5), 3.5, DEFAULT_EPSILON);
    }

    #[test]
    fn entry_costs_scale_both_components() {
        let config = ExecutionConfig::default();
        let at = Utc.with_ymd_and_hms(2025, 12, 2, 22, 30, 0).unwrap();
        let c = entry_costs(0.0001, at, VolatilityState::Expansion, &config, &Instrument::default());
        let factor = 1.3 * 1.3;
        assert_approx(c.spread, 0.0001 * factor, DEFAULT_EPSILON);
        assert_approx(c.slippage, 0.0002 * factor, DEFAULT_EPSILON);
    }
}
