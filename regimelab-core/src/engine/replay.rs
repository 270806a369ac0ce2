//! Bar-by-bar replay loop.
//!
//! At step `t` the bar `bars[t]` is the one being traded. Decisions read only
//! the closed bars `bars[t - warmup .. t]`, whose last element is the decision
//! bar. Per step:
//!
//! 1. Day rollover on the UTC date of `bars[t]`
//! 2. In trade: exit check against `bars[t]` high/low, else breakeven
//! 3. Flat: enrich → classify → [`decide`] → open at `bars[t]` time
//!
//! A trade is never exit-checked on its own entry bar, and a bar that closes
//! a trade never opens another.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::decision::{decide, Decision, DecisionContext, DecisionFault, SizedSignal};
use crate::config::{ConfigError, EngineConfig};
use crate::domain::{Bar, BarError, ClosedTradeRecord, EntrySnapshot, OpenTrade};
use crate::execution::{
    apply_breakeven, check_exit, commission, entry_costs, entry_fill, exit_fill, gross_pnl,
    rollovers_crossed, swap_charge, EntryCosts, ExitSignal,
};
use crate::indicators::EnrichedBar;
use crate::regime::{classify, RegimeContext};
use crate::state::TradingState;

/// A data or setup problem that makes the whole run meaningless.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("need more than {required} bars to make a decision, got {available}")]
    InsufficientHistory { available: usize, required: usize },

    #[error("malformed bar at index {index}: {source}")]
    MalformedBar {
        index: usize,
        #[source]
        source: BarError,
    },

    #[error("bar at index {index} is not after its predecessor")]
    OutOfOrder { index: usize },

    #[error("starting balance must be positive, got {0}")]
    InvalidBalance(f64),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything a replay produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    pub starting_balance: f64,
    pub final_balance: f64,
    pub trades: Vec<ClosedTradeRecord>,
    /// Position still open when the bars ran out. Not force-closed.
    pub unresolved_trade: Option<OpenTrade>,
    /// Veto counts keyed by [`Veto::label`](super::Veto::label).
    pub vetoes: BTreeMap<String, usize>,
    /// Bars where the decision faulted and the loop stayed flat.
    pub faults: usize,
    /// Flat bars that went through the decision pipeline.
    pub decisions: usize,
    pub bars_processed: usize,
    /// Time of the first and last traded bar.
    pub first_bar: DateTime<Utc>,
    pub last_bar: DateTime<Utc>,
    pub final_state: TradingState,
    pub config_fingerprint: String,
}

impl ReplayResult {
    pub fn total_vetoes(&self) -> usize {
        self.vetoes.values().sum()
    }
}

/// Check structure and ordering of the whole series up front.
pub fn validate_bars(bars: &[Bar]) -> Result<(), ReplayError> {
    for (index, bar) in bars.iter().enumerate() {
        bar.validate()
            .map_err(|source| ReplayError::MalformedBar { index, source })?;
        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(ReplayError::OutOfOrder { index });
        }
    }
    Ok(())
}

/// Replay `bars` from a fresh [`TradingState`].
pub fn run_replay(
    bars: &[Bar],
    starting_balance: f64,
    config: &EngineConfig,
) -> Result<ReplayResult, ReplayError> {
    run_replay_with_state(bars, starting_balance, config, TradingState::default())
}

/// Replay `bars` continuing from a persisted or pre-seeded state.
pub fn run_replay_with_state(
    bars: &[Bar],
    starting_balance: f64,
    config: &EngineConfig,
    state: TradingState,
) -> Result<ReplayResult, ReplayError> {
    config.validate()?;
    if !(starting_balance > 0.0 && starting_balance.is_finite()) {
        return Err(ReplayError::InvalidBalance(starting_balance));
    }
    let warmup = config.warmup_bars;
    if bars.len() <= warmup {
        return Err(ReplayError::InsufficientHistory {
            available: bars.len(),
            required: warmup,
        });
    }
    validate_bars(bars)?;

    let mut replay = Replay::new(config, starting_balance, state);
    for t in warmup..bars.len() {
        replay.step(bars, t);
    }

    let result = replay.finish(&bars[warmup].timestamp, &bars[bars.len() - 1].timestamp);
    info!(
        trades = result.trades.len(),
        final_balance = result.final_balance,
        vetoes = result.total_vetoes(),
        faults = result.faults,
        "replay finished"
    );
    Ok(result)
}

/// Mutable loop state. Lives for exactly one run.
struct Replay<'a> {
    config: &'a EngineConfig,
    starting_balance: f64,
    equity: f64,
    state: TradingState,
    open: Option<OpenTrade>,
    trades: Vec<ClosedTradeRecord>,
    vetoes: BTreeMap<String, usize>,
    faults: usize,
    decisions: usize,
    bars_processed: usize,
}

impl<'a> Replay<'a> {
    fn new(config: &'a EngineConfig, starting_balance: f64, state: TradingState) -> Self {
        Self {
            config,
            starting_balance,
            equity: starting_balance,
            state,
            open: None,
            trades: Vec::new(),
            vetoes: BTreeMap::new(),
            faults: 0,
            decisions: 0,
            bars_processed: 0,
        }
    }

    fn step(&mut self, bars: &[Bar], t: usize) {
        let bar = &bars[t];
        self.bars_processed += 1;
        self.state.roll_day(bar.timestamp.date_naive());

        if let Some(mut trade) = self.open.take() {
            match check_exit(&trade, bar) {
                Some(exit) => self.close(trade, exit, bar, t),
                None => {
                    if apply_breakeven(
                        &mut trade,
                        bar,
                        &self.config.execution.breakeven,
                        &self.config.instrument,
                    ) {
                        debug!(bar = t, stop = trade.stop_loss, "stop moved to breakeven");
                    }
                    self.open = Some(trade);
                }
            }
            return;
        }

        let window = &bars[t - self.config.warmup_bars..t];
        let Some(enriched) = EnrichedBar::from_window(window, &self.config.indicators) else {
            return;
        };
        let regime = classify(&enriched, &self.config.regime);
        let ctx = DecisionContext {
            bar_index: t,
            timestamp: bar.timestamp,
            equity: self.equity,
        };
        self.decisions += 1;

        match decide(&enriched, &regime, &self.state, ctx, self.config) {
            Ok(Decision::Enter(sized)) => self.enter(sized, &enriched, &regime, bar, t),
            Ok(Decision::Stay(veto)) => {
                debug!(bar = t, %veto, "stay flat");
                *self.vetoes.entry(veto.label()).or_default() += 1;
            }
            Err(fault) => self.fault(t, &fault),
        }
    }

    fn fault(&mut self, t: usize, fault: &DecisionFault) {
        warn!(bar = t, error = %fault, "decision fault, staying flat");
        self.faults += 1;
    }

    fn enter(
        &mut self,
        sized: SizedSignal,
        enriched: &EnrichedBar,
        regime: &RegimeContext,
        bar: &Bar,
        t: usize,
    ) {
        let SizedSignal {
            signal,
            size,
            quoted_spread,
        } = sized;
        let costs = entry_costs(
            quoted_spread,
            bar.timestamp,
            regime.volatility_state,
            &self.config.execution,
            &self.config.instrument,
        );
        let entry_price = entry_fill(signal.direction, signal.entry_price, &costs);

        info!(
            direction = %signal.direction,
            strategy = %signal.strategy,
            size,
            entry = entry_price,
            stop = signal.stop_loss,
            target = signal.take_profit,
            "trade opened"
        );

        self.open = Some(OpenTrade {
            direction: signal.direction,
            entry_time: bar.timestamp,
            entry_bar_index: t,
            entry_price,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            stop_distance: signal.stop_distance,
            target_distance: signal.target_distance,
            size,
            spread_at_entry: costs.spread,
            slippage_at_entry: costs.slippage,
            commission_per_lot: self.config.execution.commission_per_lot,
            balance_at_entry: self.equity,
            breakeven_applied: false,
            snapshot: EntrySnapshot {
                strategy: signal.strategy,
                regime_label: regime.label(),
                htf_trend: signal.htf_trend,
                risk_multiplier: signal.risk_multiplier,
                entry_hour: bar.timestamp.hour(),
                zscore: enriched.zscore,
                atr_zscore: enriched.atr_zscore,
            },
        });
    }

    fn close(&mut self, trade: OpenTrade, exit: ExitSignal, bar: &Bar, t: usize) {
        let costs = EntryCosts {
            spread: trade.spread_at_entry,
            slippage: trade.slippage_at_entry,
        };
        let exit_price = exit_fill(trade.direction, exit.level, &costs);
        let gross = gross_pnl(
            trade.direction,
            trade.entry_price,
            exit_price,
            trade.size,
            &self.config.instrument,
        );
        let commission = commission(trade.size, trade.commission_per_lot);
        let rollovers = rollovers_crossed(
            trade.entry_time,
            bar.timestamp,
            self.config.execution.swap_cutover,
        );
        let swap = swap_charge(trade.direction, trade.size, rollovers, &self.config.execution);
        let pnl = gross - commission - swap;

        self.equity += pnl;
        let result = exit.reason.result();
        let return_fraction = if trade.balance_at_entry > 0.0 {
            pnl / trade.balance_at_entry
        } else {
            0.0
        };

        info!(
            direction = %trade.direction,
            reason = ?exit.reason,
            exit = exit_price,
            pnl,
            balance = self.equity,
            "trade closed"
        );

        self.state
            .record_close(t, result, bar.timestamp, &self.config.behavior);

        self.trades.push(ClosedTradeRecord {
            direction: trade.direction,
            strategy: trade.snapshot.strategy,
            entry_time: trade.entry_time,
            exit_time: bar.timestamp,
            entry_bar_index: trade.entry_bar_index,
            exit_bar_index: t,
            entry_price: trade.entry_price,
            exit_price,
            size: trade.size,
            result,
            exit_reason: exit.reason,
            gross_pnl: gross,
            commission,
            swap,
            pnl,
            balance: self.equity,
            return_fraction,
            spread_at_entry: trade.spread_at_entry,
            slippage_at_entry: trade.slippage_at_entry,
            stop_distance: trade.stop_distance,
            target_distance: trade.target_distance,
            breakeven_applied: trade.breakeven_applied,
            regime_label: trade.snapshot.regime_label,
            htf_trend: trade.snapshot.htf_trend,
            entry_hour: trade.snapshot.entry_hour,
            zscore: trade.snapshot.zscore,
            atr_zscore: trade.snapshot.atr_zscore,
        });
    }

    fn finish(self, first_bar: &DateTime<Utc>, last_bar: &DateTime<Utc>) -> ReplayResult {
        if let Some(trade) = &self.open {
            warn!(
                direction = %trade.direction,
                entry_time = %trade.entry_time,
                "replay ended with an unresolved open trade"
            );
        }
        ReplayResult {
            starting_balance: self.starting_balance,
            final_balance: self.equity,
            trades: self.trades,
            unresolved_trade: self.open,
            vetoes: self.vetoes,
            faults: self.faults,
            decisions: self.decisions,
            bars_processed: self.bars_processed,
            first_bar: *first_bar,
            last_bar: *last_bar,
            final_state: self.state,
            config_fingerprint: self.config.fingerprint(),
        }
    }
}
