//! Live-side feedback into [`TradingState`]: slippage drift, fills, failures
//! and closed-trade streaks.
//!
//! Everything here mutates the same flags the behavioral gate reads, so a
//! live orchestrator and the replay loop are held to one discipline contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{info, warn};

use super::TradingState;
use crate::domain::{Direction, Instrument, TradeResult};
use crate::gates::BehavioralLimits;

/// Rolling median of realized slippage, in pips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlippageMonitor {
    pub capacity: usize,
    /// Samples required before the throttle is evaluated.
    pub min_samples: usize,
    pub expected_pips: f64,
    pub max_drift_pips: f64,
    /// Median above this throttles regardless of expectation.
    pub absolute_cap_pips: f64,
    samples: VecDeque<f64>,
}

impl SlippageMonitor {
    pub fn new(expected_pips: f64) -> Self {
        Self {
            capacity: 20,
            min_samples: 5,
            expected_pips,
            max_drift_pips: 3.0,
            absolute_cap_pips: 5.5,
            samples: VecDeque::with_capacity(20),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn median(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        Some(if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        })
    }

    /// Add a sample and re-evaluate `risk_throttle`.
    ///
    /// Returns the median used when the window was large enough to judge.
    pub fn record(&mut self, slippage_pips: f64, state: &mut TradingState) -> Option<f64> {
        if !slippage_pips.is_finite() {
            return None;
        }
        self.samples.push_back(slippage_pips.abs());
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        if self.samples.len() < self.min_samples {
            return None;
        }
        let median = self.median()?;
        let drifting =
            median > self.expected_pips + self.max_drift_pips || median > self.absolute_cap_pips;
        if drifting && !state.risk_throttle {
            warn!(median_pips = median, "slippage drift detected, risk throttled");
        } else if !drifting && state.risk_throttle {
            info!(median_pips = median, "slippage back in range, throttle cleared");
        }
        state.risk_throttle = drifting;
        Some(median)
    }
}

/// Outcome of an order handed to an execution venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FillReport {
    Filled {
        bar_index: usize,
        at: DateTime<Utc>,
        direction: Direction,
        requested_price: f64,
        fill_price: f64,
    },
    Failed {
        at: DateTime<Utc>,
        reason: String,
    },
}

/// A confirmed entry: count it and restart the cooldown.
pub fn record_fill(state: &mut TradingState, bar_index: usize, at: DateTime<Utc>) {
    state.roll_day(at.date_naive());
    state.execution_failures = 0;
    state.trades_today += 1;
    state.last_trade_bar = Some(bar_index);
    state.last_update = Some(at);
}

/// A rejected or lost order. Raises the kill switch at the failure limit.
pub fn record_execution_failure(
    state: &mut TradingState,
    at: DateTime<Utc>,
    limits: &BehavioralLimits,
) {
    state.roll_day(at.date_naive());
    state.execution_failures += 1;
    state.last_update = Some(at);
    if state.execution_failures >= limits.max_execution_failures && !state.trading_disabled {
        state.trading_disabled = true;
        warn!(
            failures = state.execution_failures,
            "execution failure limit reached, trading disabled"
        );
    }
}

/// A live position closed. Only the losing streak moves; the fill already
/// counted the trade.
pub fn record_trade_close(
    state: &mut TradingState,
    result: TradeResult,
    at: DateTime<Utc>,
    limits: &BehavioralLimits,
) {
    state.record_result(result, limits);
    state.last_update = Some(at);
}

/// Route a venue report into the state and the slippage monitor.
pub fn apply_fill_report(
    state: &mut TradingState,
    monitor: &mut SlippageMonitor,
    report: &FillReport,
    limits: &BehavioralLimits,
    instrument: &Instrument,
) {
    match report {
        FillReport::Filled {
            bar_index,
            at,
            direction,
            requested_price,
            fill_price,
        } => {
            record_fill(state, *bar_index, *at);
            let slippage = instrument.price_to_pips((fill_price - requested_price).abs());
            info!(%direction, requested_price, fill_price, slippage_pips = slippage, "fill reported");
            monitor.record(slippage, state);
        }
        FillReport::Failed { at, reason } => {
            warn!(%reason, "order failed");
            record_execution_failure(state, *at, limits);
        }
    }
}
