//! Trading state: the engine's memory across bars, days and restarts.
//!
//! One value is owned by whoever drives decisions (the replay loop or a live
//! orchestrator) and threaded through by `&mut`. It changes only at trade
//! events and at day rollover.

pub mod monitoring;
pub mod store;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::TradeResult;
use crate::gates::BehavioralLimits;

pub use monitoring::{FillReport, SlippageMonitor};
pub use store::{StateError, StateStore, STATE_SCHEMA_VERSION};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingState {
    /// UTC date the counters below belong to.
    pub trading_day: Option<NaiveDate>,
    pub trades_today: u32,
    /// Bar index of the last trade event, the cooldown reference.
    pub last_trade_bar: Option<usize>,
    /// Raised by slippage drift monitoring.
    pub risk_throttle: bool,
    /// Kill switch. Cleared only by a manual reset.
    pub trading_disabled: bool,
    pub consecutive_losses: u32,
    pub execution_failures: u32,
    pub last_update: Option<DateTime<Utc>>,
}

impl TradingState {
    /// Reset daily counters when `date` differs from the current trading day.
    ///
    /// The throttle, the kill switch and the cooldown reference survive.
    /// Returns true when a new day began.
    pub fn roll_day(&mut self, date: NaiveDate) -> bool {
        if self.trading_day == Some(date) {
            return false;
        }
        if let Some(previous) = self.trading_day {
            info!(
                %previous,
                %date,
                trades = self.trades_today,
                "new trading day, counters reset"
            );
        }
        self.trading_day = Some(date);
        self.trades_today = 0;
        self.consecutive_losses = 0;
        self.execution_failures = 0;
        true
    }

    /// Book a closed trade: advance the daily count, restart the cooldown
    /// from the exit bar and update the losing streak.
    pub fn record_close(
        &mut self,
        exit_bar_index: usize,
        result: TradeResult,
        at: DateTime<Utc>,
        limits: &BehavioralLimits,
    ) {
        self.trades_today += 1;
        self.last_trade_bar = Some(exit_bar_index);
        self.record_result(result, limits);
        self.last_update = Some(at);
    }

    /// Losing-streak bookkeeping and the streak kill switch.
    pub fn record_result(&mut self, result: TradeResult, limits: &BehavioralLimits) {
        match result {
            TradeResult::Win => self.consecutive_losses = 0,
            TradeResult::Loss => self.consecutive_losses += 1,
        }
        if let Some(max) = limits.max_consecutive_losses {
            if self.consecutive_losses >= max && !self.trading_disabled {
                self.trading_disabled = true;
                warn!(
                    streak = self.consecutive_losses,
                    "loss streak limit reached, trading disabled"
                );
            }
        }
    }

    /// Manual override: clear the kill switch and the throttle.
    pub fn clear_flags(&mut self) {
        self.trading_disabled = false;
        self.risk_throttle = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, d).unwrap()
    }

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn first_roll_starts_a_day() {
        let mut state = TradingState::default();
        assert!(state.roll_day(day(1)));
        assert!(!state.roll_day(day(1)));
        assert_eq!(state.trading_day, Some(day(1)));
    }

    #[test]
    fn rollover_resets_counters_but_keeps_flags() {
        let mut state = TradingState {
            trading_day: Some(day(1)),
            trades_today: 4,
            last_trade_bar: Some(300),
            risk_throttle: true,
            trading_disabled: true,
            consecutive_losses: 2,
            execution_failures: 1,
            last_update: None,
        };
        assert!(state.roll_day(day(2)));
        assert_eq!(state.trades_today, 0);
        assert_eq!(state.consecutive_losses, 0);
        assert_eq!(state.execution_failures, 0);
        assert_eq!(state.last_trade_bar, Some(300));
        assert!(state.risk_throttle);
        assert!(state.trading_disabled);
    }

    #[test]
    fn close_advances_counters() {
        let mut state = TradingState::default();
        let limits = BehavioralLimits::default();
        state.record_close(120, TradeResult::Loss, at(2), &limits);
        state.record_close(140, TradeResult::Loss, at(2), &limits);
        assert_eq!(state.trades_today, 2);
        assert_eq!(state.last_trade_bar, Some(140));
        assert_eq!(state.consecutive_losses, 2);
        state.record_close(160, TradeResult::Win, at(2), &limits);
        assert_eq!(state.consecutive_losses, 0);
        assert_eq!(state.last_update, Some(at(2)));
    }

    #[test]
    fn streak_kill_switch_is_opt_in() {
        let mut state = TradingState::default();
        for _ in 0..10 {
            state.record_result(TradeResult::Loss, &BehavioralLimits::default());
        }
        assert!(!state.trading_disabled);

        let limits = BehavioralLimits {
            max_consecutive_losses: Some(5),
            ..BehavioralLimits::default()
        };
        let mut state = TradingState::default();
        for _ in 0..4 {
            state.record_result(TradeResult::Loss, &limits);
        }
        assert!(!state.trading_disabled);
        state.record_result(TradeResult::Loss, &limits);
        assert!(state.trading_disabled);
    }

    #[test]
    fn clear_flags() {
        let mut state = TradingState {
            risk_throttle: true,
            trading_disabled: true,
            ..TradingState::default()
        };
        state.clear_flags();
        assert!(!state.risk_throttle && !state.trading_disabled);
    }
}
