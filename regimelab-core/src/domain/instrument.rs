//! Instrument metadata: pip size, contract size, lot step.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Static description of the traded FX pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Instrument {
    pub symbol: String,
    /// Conventional pip, e.g. 0.0001 for EURUSD.
    pub pip_size: f64,
    /// Price value of one raw spread point, e.g. 0.00001.
    pub point_size: f64,
    /// Units per standard lot.
    pub contract_size: f64,
    pub lot_step: f64,
    pub min_lot: f64,
    /// Bar aggregation in minutes.
    pub bar_minutes: u32,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            symbol: "EURUSD".into(),
            pip_size: 0.0001,
            point_size: 0.00001,
            contract_size: 100_000.0,
            lot_step: 0.01,
            min_lot: 0.01,
            bar_minutes: 2,
        }
    }
}

impl Instrument {
    /// Account-currency value of one pip on one standard lot.
    pub fn pip_value_per_lot(&self) -> f64 {
        self.contract_size * self.pip_size
    }

    pub fn price_to_pips(&self, distance: f64) -> f64 {
        distance / self.pip_size
    }

    pub fn pips_to_price(&self, pips: f64) -> f64 {
        pips * self.pip_size
    }

    /// Convert a raw broker spread (points) to a price distance.
    pub fn spread_price(&self, raw_points: f64) -> f64 {
        raw_points * self.point_size
    }

    /// Floor a lot count to the lot step. The result never exceeds `lots`.
    pub fn floor_to_lot_step(&self, lots: f64) -> f64 {
        if !lots.is_finite() || lots <= 0.0 || self.lot_step <= 0.0 {
            return 0.0;
        }
        let mut steps = (lots / self.lot_step).floor();
        // Division can land just under an integer (0.03 / 0.01 = 2.999..).
        if (steps + 1.0) * self.lot_step <= lots {
            steps += 1.0;
        }
        while steps > 0.0 && steps * self.lot_step > lots {
            steps -= 1.0;
        }
        steps * self.lot_step
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("instrument.pip_size", self.pip_size),
            ("instrument.point_size", self.point_size),
            ("instrument.contract_size", self.contract_size),
            ("instrument.lot_step", self.lot_step),
            ("instrument.min_lot", self.min_lot),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if self.bar_minutes == 0 {
            return Err(ConfigError::ZeroPeriod {
                field: "instrument.bar_minutes",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eurusd_pip_value_is_ten() {
        let inst = Instrument::default();
        assert!((inst.pip_value_per_lot() - 10.0).abs() < 1e-9);
        assert!((inst.price_to_pips(0.0015) - 15.0).abs() < 1e-9);
        assert!((inst.spread_price(15.0) - 0.00015).abs() < 1e-15);
    }

    #[test]
    fn floor_handles_exact_multiples() {
        let inst = Instrument::default();
        assert!((inst.floor_to_lot_step(0.03) - 0.03).abs() < 1e-12);
        assert!((inst.floor_to_lot_step(0.0333) - 0.03).abs() < 1e-12);
        assert!((inst.floor_to_lot_step(0.0099)).abs() < 1e-12);
        assert_eq!(inst.floor_to_lot_step(-1.0), 0.0);
        assert_eq!(inst.floor_to_lot_step(f64::NAN), 0.0);
    }

    #[test]
    fn floor_never_exceeds_input() {
        let inst = Instrument::default();
        for i in 1..5000 {
            let lots = i as f64 * 0.000731;
            assert!(inst.floor_to_lot_step(lots) <= lots);
        }
    }

    #[test]
    fn validate_rejects_zero_lot_step() {
        let inst = Instrument {
            lot_step: 0.0,
            ..Instrument::default()
        };
        assert!(matches!(
            inst.validate(),
            Err(ConfigError::NonPositive { field: "instrument.lot_step", .. })
        ));
    }
}
