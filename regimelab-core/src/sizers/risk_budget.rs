//! Risk-budget sizer.

use super::{RiskLimits, SizeVeto};
use crate::domain::Instrument;

/// Lots for a trade risking `limits.risk_per_trade` of `equity` over `stop_distance`.
///
/// `price` is the reference price for the leverage cap.
pub fn size_position(
    equity: f64,
    stop_distance: f64,
    price: f64,
    limits: &RiskLimits,
    instrument: &Instrument,
) -> Result<f64, SizeVeto> {
    if !(equity > 0.0 && equity.is_finite()) {
        return Err(SizeVeto::NoEquity);
    }
    let stop_pips = instrument.price_to_pips(stop_distance);
    if !(stop_pips > 0.0 && stop_pips.is_finite()) || !(price > 0.0) {
        return Err(SizeVeto::InvalidStop);
    }

    let risk_dollars = equity * limits.risk_per_trade;
    let mut raw_lots = risk_dollars / (stop_pips * instrument.pip_value_per_lot());

    let notional = raw_lots * instrument.contract_size * price;
    if notional / equity > limits.max_leverage {
        raw_lots = equity * limits.max_leverage / (instrument.contract_size * price);
    }

    quantize(raw_lots, instrument)
}

/// Scale a sized position by a regime/HTF risk multiplier below 1.0 and re-quantize.
///
/// Multipliers at or above 1.0 leave the size untouched.
pub fn apply_risk_multiplier(
    lots: f64,
    multiplier: f64,
    instrument: &Instrument,
) -> Result<f64, SizeVeto> {
    if multiplier >= 1.0 {
        return Ok(lots);
    }
    quantize(lots * multiplier.max(0.0), instrument)
}

fn quantize(lots: f64, instrument: &Instrument) -> Result<f64, SizeVeto> {
    let size = instrument.floor_to_lot_step(lots);
    if size < instrument.min_lot || size <= 0.0 {
        return Err(SizeVeto::BelowMinLot);
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn inst() -> Instrument {
        Instrument::default()
    }

    #[test]
    fn fifteen_pip_stop_on_thousand_dollars() {
        // risk 5 / (15 × 10) = 0.0333 → 0.03
        let size = size_position(1000.0, 0.0015, 1.1, &RiskLimits::default(), &inst()).unwrap();
        assert!((size - 0.03).abs() < 1e-12);
    }

    #[test]
    fn below_min_lot_is_a_veto_not_a_clamp() {
        // risk 5 / (100 × 10) = 0.005 → floors to 0.00
        assert_eq!(
            size_position(1000.0, 0.0100, 1.1, &RiskLimits::default(), &inst()),
            Err(SizeVeto::BelowMinLot)
        );
    }

    #[test]
    fn leverage_cap_scales_down() {
        // 1 pip stop: raw 50 / 10 = 0.5 lots = 55k notional on 1k equity (55x).
        // Cap: 1000 × 5 / (100000 × 1.1) = 0.04545 → 0.04
        let size = size_position(1000.0, 0.0001, 1.1, &RiskLimits::default(), &inst()).unwrap();
        assert!((size - 0.04).abs() < 1e-12);
        assert!(size * 100_000.0 * 1.1 / 1000.0 <= 5.0);
    }

    #[test]
    fn degenerate_inputs_veto() {
        let limits = RiskLimits::default();
        assert_eq!(size_position(0.0, 0.0015, 1.1, &limits, &inst()), Err(SizeVeto::NoEquity));
        assert_eq!(size_position(-5.0, 0.0015, 1.1, &limits, &inst()), Err(SizeVeto::NoEquity));
        assert_eq!(size_position(1000.0, 0.0, 1.1, &limits, &inst()), Err(SizeVeto::InvalidStop));
        assert_eq!(
            size_position(1000.0, f64::NAN, 1.1, &limits, &inst()),
            Err(SizeVeto::InvalidStop)
        );
    }

    #[test]
    fn multiplier_rescales_and_floors() {
        assert!((apply_risk_multiplier(0.10, 0.75, &inst()).unwrap() - 0.07).abs() < 1e-12);
        assert!((apply_risk_multiplier(0.03, 0.5, &inst()).unwrap() - 0.01).abs() < 1e-12);
        assert_eq!(apply_risk_multiplier(0.01, 0.5, &inst()), Err(SizeVeto::BelowMinLot));
        assert_eq!(apply_risk_multiplier(0.03, 1.0, &inst()), Ok(0.03));
    }

    fn arb_equity() -> impl Strategy<Value = f64> {
        100.0..1_000_000.0f64
    }

    fn arb_stop() -> impl Strategy<Value = f64> {
        0.0002..0.0100f64
    }

    proptest! {
        #[test]
        fn size_never_exceeds_risk_budget(
            equity in arb_equity(),
            stop in arb_stop(),
            risk in 0.001..0.05f64,
            price in 0.8..1.6f64,
        ) {
            let limits = RiskLimits { risk_per_trade: risk, max_leverage: 5.0 };
            let inst = inst();
            if let Ok(size) = size_position(equity, stop, price, &limits, &inst) {
                let stop_pips = inst.price_to_pips(stop);
                let spent = size * stop_pips * inst.pip_value_per_lot();
                prop_assert!(spent <= equity * risk * (1.0 + 1e-9));
                let steps = size / inst.lot_step;
                prop_assert!((steps - steps.round()).abs() < 1e-6);
                prop_assert!(size >= inst.min_lot);
                prop_assert!(size * inst.contract_size * price <= equity * 5.0 * (1.0 + 1e-9));
            }
        }
    }
}
