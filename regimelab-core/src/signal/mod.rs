//! Signal generator.
//!
//! Dispatches on the regime's strategy bias, builds stop/target levels from
//! the decision bar's close and ATR, then applies the universal
//! extended-candle filter. Every rejection is a typed [`SignalVeto`].

pub mod mean_reversion;
pub mod trend_following;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;
use crate::domain::{Direction, Strategy};
use crate::indicators::EnrichedBar;
use crate::regime::{HtfTrend, RegimeContext, StrategyBias};

/// Strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// stop_distance = ATR × this.
    pub stop_atr_multiplier: f64,
    /// target_distance = stop_distance × this.
    pub min_reward_risk: f64,
    /// Discard signals whose bar range exceeds ATR × this.
    pub extended_candle_multiplier: f64,
    /// |zscore| beyond this triggers a mean-reversion entry.
    pub mean_reversion_zscore: f64,
    /// Trend risk factor when the HTF bias is flat.
    pub htf_flat_factor: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            stop_atr_multiplier: 1.5,
            min_reward_risk: 2.0,
            extended_candle_multiplier: 1.5,
            mean_reversion_zscore: 2.0,
            htf_flat_factor: 0.5,
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("signal.stop_atr_multiplier", self.stop_atr_multiplier),
            ("signal.min_reward_risk", self.min_reward_risk),
            ("signal.extended_candle_multiplier", self.extended_candle_multiplier),
            ("signal.mean_reversion_zscore", self.mean_reversion_zscore),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.htf_flat_factor) {
            return Err(ConfigError::OutOfRange {
                field: "signal.htf_flat_factor",
                detail: format!("{} is not in [0, 1]", self.htf_flat_factor),
            });
        }
        Ok(())
    }

    /// Risk factor for a trend trade given the higher-timeframe bias.
    pub fn htf_factor(&self, direction: Direction, htf: HtfTrend) -> f64 {
        match (direction, htf) {
            (Direction::Buy, HtfTrend::Up) | (Direction::Sell, HtfTrend::Down) => 1.0,
            (_, HtfTrend::Flat) => self.htf_flat_factor,
            _ => 0.0,
        }
    }
}

/// A directional proposal with absolute price levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    pub strategy: Strategy,
    /// Close of the decision bar.
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub stop_distance: f64,
    pub target_distance: f64,
    pub risk_multiplier: f64,
    pub htf_trend: HtfTrend,
}

impl Signal {
    /// Place stop and target symmetrically around `entry_price`.
    pub fn with_levels(
        direction: Direction,
        strategy: Strategy,
        entry_price: f64,
        stop_distance: f64,
        reward_risk: f64,
        risk_multiplier: f64,
        htf_trend: HtfTrend,
    ) -> Self {
        let target_distance = stop_distance * reward_risk;
        let sign = direction.sign();
        Self {
            direction,
            strategy,
            entry_price,
            stop_loss: entry_price - sign * stop_distance,
            take_profit: entry_price + sign * target_distance,
            stop_distance,
            target_distance,
            risk_multiplier,
            htf_trend,
        }
    }
}

/// Why no signal was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalVeto {
    RegimeBlocked,
    NoSetup,
    CounterTrend,
    ExtendedCandle,
    DegenerateStop,
}

impl fmt::Display for SignalVeto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignalVeto::RegimeBlocked => "regime blocked",
            SignalVeto::NoSetup => "no setup",
            SignalVeto::CounterTrend => "counter to htf trend",
            SignalVeto::ExtendedCandle => "extended candle",
            SignalVeto::DegenerateStop => "degenerate stop distance",
        })
    }
}

/// Propose a trade for the decision bar, or say why not.
pub fn generate(
    enriched: &EnrichedBar,
    regime: &RegimeContext,
    config: &SignalConfig,
) -> Result<Signal, SignalVeto> {
    if !regime.trade_allowed {
        return Err(SignalVeto::RegimeBlocked);
    }

    let (direction, strategy, risk_multiplier) = match regime.strategy_bias {
        StrategyBias::Trend => {
            let direction = trend_following::propose(enriched).ok_or(SignalVeto::NoSetup)?;
            let multiplier = regime.risk_multiplier * config.htf_factor(direction, regime.htf_trend);
            if multiplier <= 0.0 {
                return Err(SignalVeto::CounterTrend);
            }
            (direction, Strategy::TrendFollowing, multiplier)
        }
        StrategyBias::MeanReversion => {
            let direction = mean_reversion::propose(enriched, config.mean_reversion_zscore)
                .ok_or(SignalVeto::NoSetup)?;
            (direction, Strategy::MeanReversion, regime.risk_multiplier)
        }
        StrategyBias::None => return Err(SignalVeto::NoSetup),
    };

    if enriched.range > enriched.atr * config.extended_candle_multiplier {
        return Err(SignalVeto::ExtendedCandle);
    }

    let stop_distance = enriched.atr * config.stop_atr_multiplier;
    if !(stop_distance > 0.0 && stop_distance.is_finite()) {
        return Err(SignalVeto::DegenerateStop);
    }

    Ok(Signal::with_levels(
        direction,
        strategy,
        enriched.bar.close,
        stop_distance,
        config.min_reward_risk,
        risk_multiplier,
        regime.htf_trend,
    ))
}


#[cfg(test)]
mod tests {
    use super::test_support::enriched;
    use super::*;
    use crate::domain::Strategy;
    use crate::regime::{classify_values, RegimeThresholds};
    use proptest::prelude::*;

    fn trend_regime(htf: HtfTrend) -> RegimeContext {
        let close = match htf {
            HtfTrend::Up => 1.2,
            HtfTrend::Down => 1.0,
            HtfTrend::Flat => 1.1,
        };
        classify_values(0.0, 30.0, close, 1.1, &RegimeThresholds::default())
    }

    fn range_regime() -> RegimeContext {
        classify_values(0.0, 10.0, 1.1, 1.1, &RegimeThresholds::default())
    }

    // Pullback through ema_fast 1.1000 that closes back above it.
    fn buy_pullback() -> EnrichedBar {
        enriched(1.1002, 1.1008, 1.0998, 1.1004, 0.0010, 1.1000, 1.0980, 0.0)
    }

    #[test]
    fn buy_levels_scenario() {
        let s = Signal::with_levels(
            Direction::Buy,
            Strategy::TrendFollowing,
            1.10000,
            0.00150,
            2.0,
            1.0,
            HtfTrend::Up,
        );
        assert!((s.stop_loss - 1.09850).abs() < 1e-12);
        assert!((s.take_profit - 1.10300).abs() < 1e-12);
        assert_eq!(s.target_distance, s.stop_distance * 2.0);
    }

    #[test]
    fn sell_levels_mirror() {
        let s = Signal::with_levels(
            Direction::Sell,
            Strategy::MeanReversion,
            1.10000,
            0.00150,
            2.0,
            1.0,
            HtfTrend::Flat,
        );
        assert!((s.stop_loss - 1.10150).abs() < 1e-12);
        assert!((s.take_profit - 1.09700).abs() < 1e-12);
    }

    #[test]
    fn trend_buy_on_pullback_with_aligned_htf() {
        let s = generate(&buy_pullback(), &trend_regime(HtfTrend::Up), &SignalConfig::default())
            .unwrap();
        assert_eq!(s.direction, Direction::Buy);
        assert_eq!(s.strategy, Strategy::TrendFollowing);
        assert_eq!(s.entry_price, 1.1004);
        assert!((s.stop_distance - 0.0015).abs() < 1e-12);
        assert_eq!(s.risk_multiplier, 1.0);
    }

    #[test]
    fn flat_htf_halves_risk() {
        let s = generate(&buy_pullback(), &trend_regime(HtfTrend::Flat), &SignalConfig::default())
            .unwrap();
        assert_eq!(s.risk_multiplier, 0.5);
    }

    #[test]
    fn opposed_htf_vetoes() {
        assert_eq!(
            generate(&buy_pullback(), &trend_regime(HtfTrend::Down), &SignalConfig::default()),
            Err(SignalVeto::CounterTrend)
        );
    }

    #[test]
    fn extended_candle_vetoes() {
        // Range 0.0020 > ATR 0.0010 × 1.5.
        let bar = enriched(1.1002, 1.1015, 1.0995, 1.1004, 0.0010, 1.1000, 1.0980, 0.0);
        assert_eq!(
            generate(&bar, &trend_regime(HtfTrend::Up), &SignalConfig::default()),
            Err(SignalVeto::ExtendedCandle)
        );
    }

    #[test]
    fn mean_reversion_sells_stretch_up() {
        let bar = enriched(1.1002, 1.1008, 1.0998, 1.1004, 0.0010, 1.1000, 1.1000, 2.3);
        let s = generate(&bar, &range_regime(), &SignalConfig::default()).unwrap();
        assert_eq!(s.direction, Direction::Sell);
        assert_eq!(s.strategy, Strategy::MeanReversion);
        assert!(s.stop_loss > s.entry_price && s.take_profit < s.entry_price);
    }

    #[test]
    fn mean_reversion_needs_stretch() {
        let bar = enriched(1.1002, 1.1008, 1.0998, 1.1004, 0.0010, 1.1000, 1.1000, 1.9);
        assert_eq!(
            generate(&bar, &range_regime(), &SignalConfig::default()),
            Err(SignalVeto::NoSetup)
        );
    }

    #[test]
    fn blocked_regime_yields_no_signal() {
        let regime = classify_values(-2.5, 30.0, 1.1, 1.1, &RegimeThresholds::default());
        assert_eq!(
            generate(&buy_pullback(), &regime, &SignalConfig::default()),
            Err(SignalVeto::RegimeBlocked)
        );
    }

    #[test]
    fn zero_atr_never_produces_a_signal() {
        let bar = enriched(1.1, 1.1, 1.1, 1.1, 0.0, 1.1, 1.1, -3.0);
        assert!(generate(&bar, &range_regime(), &SignalConfig::default()).is_err());
    }

    fn arb_direction() -> impl proptest::strategy::Strategy<Value = Direction> {
        prop_oneof![Just(Direction::Buy), Just(Direction::Sell)]
    }

    proptest! {
        #[test]
        fn levels_sit_on_the_correct_side(
            direction in arb_direction(),
            entry in 0.5..2.0f64,
            stop in 0.00001..0.01f64,
            rr in 0.5..5.0f64,
        ) {
            let s = Signal::with_levels(
                direction, Strategy::TrendFollowing, entry, stop, rr, 1.0, HtfTrend::Flat,
            );
            prop_assert_eq!(s.target_distance, s.stop_distance * rr);
            match direction {
                Direction::Buy => {
                    prop_assert!(s.stop_loss < s.entry_price);
                    prop_assert!(s.take_profit > s.entry_price);
                }
                Direction::Sell => {
                    prop_assert!(s.stop_loss > s.entry_price);
                    prop_assert!(s.take_profit < s.entry_price);
                }
            }
        }
    }
}
