//! The single decision call shared by replay and live trading.
//!
//! Pipeline, first veto wins:
//! regime → signal → behavioral → session → cost → size.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::gates::behavioral;
use crate::gates::{BehavioralVeto, CostVeto, SessionVeto};
use crate::indicators::EnrichedBar;
use crate::regime::{RegimeContext, RegimeVeto};
use crate::signal::{self, Signal, SignalVeto};
use crate::sizers::{apply_risk_multiplier, size_position, SizeVeto};
use crate::state::TradingState;

/// Why the pipeline stayed flat. Normal control flow, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "stage", content = "reason", rename_all = "snake_case")]
pub enum Veto {
    Regime(RegimeVeto),
    Signal(SignalVeto),
    Behavioral(BehavioralVeto),
    Session(SessionVeto),
    Cost(CostVeto),
    Size(SizeVeto),
}

impl Veto {
    pub fn stage(&self) -> &'static str {
        match self {
            Veto::Regime(_) => "regime",
            Veto::Signal(_) => "signal",
            Veto::Behavioral(_) => "behavioral",
            Veto::Session(_) => "session",
            Veto::Cost(_) => "cost",
            Veto::Size(_) => "size",
        }
    }

    /// Tally key, e.g. `"cost: spread too wide"`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Veto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = self.stage();
        match self {
            Veto::Regime(v) => write!(f, "{stage}: {v}"),
            Veto::Signal(v) => write!(f, "{stage}: {v}"),
            Veto::Behavioral(v) => write!(f, "{stage}: {v}"),
            Veto::Session(v) => write!(f, "{stage}: {v}"),
            Veto::Cost(v) => write!(f, "{stage}: {v}"),
            Veto::Size(v) => write!(f, "{stage}: {v}"),
        }
    }
}

/// A signal that passed every gate, with its lot size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizedSignal {
    pub signal: Signal,
    /// Lots, already scaled by the risk multiplier and floored to the lot step.
    pub size: f64,
    /// Quoted spread of the decision bar as a price distance.
    pub quoted_spread: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Enter(SizedSignal),
    Stay(Veto),
}

impl Decision {
    pub fn is_entry(&self) -> bool {
        matches!(self, Decision::Enter(_))
    }
}

/// Where in the replay or live session the decision is being made.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionContext {
    /// Index of the bar an entry would happen on.
    pub bar_index: usize,
    /// Time an entry would happen at.
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Internal inconsistency on one bar. Callers treat it as a veto and count it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionFault {
    #[error("indicator values are not finite at {timestamp}")]
    NonFiniteIndicators { timestamp: DateTime<Utc> },

    #[error("equity is not finite: {equity}")]
    NonFiniteEquity { equity: f64 },

    #[error("spread is not a usable price distance: {spread}")]
    BadSpread { spread: f64 },

    #[error("sized lots are not finite: {size}")]
    NonFiniteSize { size: f64 },
}

/// Run the full gate pipeline for one bar. Never mutates `state`.
pub fn decide(
    enriched: &EnrichedBar,
    regime: &RegimeContext,
    state: &TradingState,
    ctx: DecisionContext,
    config: &EngineConfig,
) -> Result<Decision, DecisionFault> {
    if !enriched.is_finite() {
        return Err(DecisionFault::NonFiniteIndicators {
            timestamp: enriched.bar.timestamp,
        });
    }
    if !ctx.equity.is_finite() {
        return Err(DecisionFault::NonFiniteEquity { equity: ctx.equity });
    }

    if let Some(reason) = regime.veto_reason {
        return Ok(Decision::Stay(Veto::Regime(reason)));
    }

    let signal = match signal::generate(enriched, regime, &config.signal) {
        Ok(signal) => signal,
        Err(veto) => return Ok(Decision::Stay(Veto::Signal(veto))),
    };

    if let Err(veto) = behavioral::check(state, ctx.bar_index, &config.behavior) {
        return Ok(Decision::Stay(Veto::Behavioral(veto)));
    }
    if let Err(veto) = config.session.check(ctx.timestamp) {
        return Ok(Decision::Stay(Veto::Session(veto)));
    }

    let quoted_spread = config.instrument.spread_price(enriched.bar.spread);
    if !(quoted_spread >= 0.0 && quoted_spread.is_finite()) {
        return Err(DecisionFault::BadSpread {
            spread: quoted_spread,
        });
    }
    if let Err(veto) = config
        .costs
        .check(quoted_spread, ctx.timestamp, &config.instrument)
    {
        return Ok(Decision::Stay(Veto::Cost(veto)));
    }

    let sized = size_position(
        ctx.equity,
        signal.stop_distance,
        signal.entry_price,
        &config.risk,
        &config.instrument,
    )
    .and_then(|lots| apply_risk_multiplier(lots, signal.risk_multiplier, &config.instrument));
    let size = match sized {
        Ok(size) => size,
        Err(veto) => return Ok(Decision::Stay(Veto::Size(veto))),
    };
    if !size.is_finite() {
        return Err(DecisionFault::NonFiniteSize { size });
    }

    Ok(Decision::Enter(SizedSignal {
        signal,
        size,
        quoted_spread,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, Strategy};
    use crate::regime::classify;
    use crate::signal::test_support::enriched;
    use chrono::TimeZone;

    /// Uptrend bar touching the fast EMA and closing above it; normal volatility, trending.
    fn trend_buy_bar() -> EnrichedBar {
        let mut bar = enriched(1.1000, 1.1008, 1.0995, 1.1005, 0.0010, 1.0998, 1.0980, 0.5);
        bar.adx = 30.0;
        bar.atr_zscore = 0.0;
        bar
    }

    fn ctx() -> DecisionContext {
        DecisionContext {
            bar_index: 200,
            timestamp: Utc.with_ymd_and_hms(2025, 12, 2, 10, 2, 0).unwrap(),
            equity: 1000.0,
        }
    }

    fn decide_default(bar: &EnrichedBar, state: &TradingState) -> Result<Decision, DecisionFault> {
        let config = EngineConfig::default();
        let regime = classify(bar, &config.regime);
        decide(bar, &regime, state, ctx(), &config)
    }

    #[test]
    fn clean_setup_enters() {
        let decision = decide_default(&trend_buy_bar(), &TradingState::default()).unwrap();
        let Decision::Enter(sized) = decision else {
            panic!("expected entry, got {decision:?}");
        };
        assert_eq!(sized.signal.direction, Direction::Buy);
        assert_eq!(sized.signal.strategy, Strategy::TrendFollowing);
        // 5 USD over a 15-pip stop at 10 USD/pip is 0.033 lots, floored.
        assert_eq!(sized.size, 0.03);
        assert!((sized.quoted_spread - 0.0001).abs() < 1e-12);
    }

    #[test]
    fn dead_market_is_a_regime_veto() {
        let mut bar = trend_buy_bar();
        bar.atr_zscore = -2.5;
        assert_eq!(
            decide_default(&bar, &TradingState::default()).unwrap(),
            Decision::Stay(Veto::Regime(RegimeVeto::DeadMarket))
        );
    }

    #[test]
    fn signal_checked_before_behavior() {
        let mut bar = trend_buy_bar();
        bar.bar.close = 1.0990; // closes below the fast EMA: no setup
        let state = TradingState {
            trading_disabled: true,
            ..TradingState::default()
        };
        assert_eq!(
            decide_default(&bar, &state).unwrap(),
            Decision::Stay(Veto::Signal(SignalVeto::NoSetup))
        );
    }

    #[test]
    fn behavior_vetoes_good_signal() {
        let state = TradingState {
            last_trade_bar: Some(198),
            ..TradingState::default()
        };
        assert_eq!(
            decide_default(&trend_buy_bar(), &state).unwrap(),
            Decision::Stay(Veto::Behavioral(BehavioralVeto::Cooldown))
        );
    }

    #[test]
    fn wide_spread_is_a_cost_veto() {
        let mut bar = trend_buy_bar();
        bar.bar.spread = 20.0; // 2 pips, over the 1.5 pip cap
        assert_eq!(
            decide_default(&bar, &TradingState::default()).unwrap(),
            Decision::Stay(Veto::Cost(CostVeto::SpreadTooWide))
        );
    }

    #[test]
    fn session_filter_runs_before_costs() {
        let mut config = EngineConfig::default();
        config.session.enabled = true;
        let bar = trend_buy_bar();
        let regime = classify(&bar, &config.regime);
        let late = DecisionContext {
            timestamp: Utc.with_ymd_and_hms(2025, 12, 2, 22, 0, 0).unwrap(),
            ..ctx()
        };
        assert_eq!(
            decide(&bar, &regime, &TradingState::default(), late, &config).unwrap(),
            Decision::Stay(Veto::Session(SessionVeto::OutsideHours))
        );
    }

    #[test]
    fn tiny_equity_is_a_size_veto() {
        let config = EngineConfig::default();
        let bar = trend_buy_bar();
        let regime = classify(&bar, &config.regime);
        let poor = DecisionContext {
            equity: 100.0,
            ..ctx()
        };
        assert_eq!(
            decide(&bar, &regime, &TradingState::default(), poor, &config).unwrap(),
            Decision::Stay(Veto::Size(SizeVeto::BelowMinLot))
        );
    }

    #[test]
    fn nan_indicator_is_a_fault() {
        let mut bar = trend_buy_bar();
        bar.adx = f64::NAN;
        assert!(matches!(
            decide_default(&bar, &TradingState::default()),
            Err(DecisionFault::NonFiniteIndicators { .. })
        ));
    }

    #[test]
    fn labels_name_stage_and_reason() {
        assert_eq!(
            Veto::Regime(RegimeVeto::WhipsawRisk).label(),
            "regime: whipsaw risk"
        );
        assert_eq!(Veto::Cost(CostVeto::SpreadTooWide).label(), "cost: spread too wide");
    }
}
