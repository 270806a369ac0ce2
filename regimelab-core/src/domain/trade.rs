//! Trade records: the single open position and the closed-trade history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Bar;
use crate::regime::HtfTrend;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// +1 for BUY, -1 for SELL.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// Which playbook produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    TrendFollowing,
    MeanReversion,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::TrendFollowing => write!(f, "trend_following"),
            Strategy::MeanReversion => write!(f, "mean_reversion"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeResult {
    Win,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    /// Stop hit after it was moved to breakeven.
    BreakevenStop,
}

impl ExitReason {
    /// Target hits are wins; any stop hit is booked as a loss.
    pub fn result(self) -> TradeResult {
        match self {
            ExitReason::TakeProfit => TradeResult::Win,
            ExitReason::StopLoss | ExitReason::BreakevenStop => TradeResult::Loss,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::BreakevenStop => "breakeven_stop",
        })
    }
}

/// Decision-time context captured when the trade was opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub strategy: Strategy,
    /// `"{volatility}_{structure}_{htf}"`, e.g. `normal_trend_up`.
    pub regime_label: String,
    pub htf_trend: HtfTrend,
    pub risk_multiplier: f64,
    /// UTC hour of the entry bar.
    pub entry_hour: u32,
    pub zscore: f64,
    pub atr_zscore: f64,
}

/// The single live position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTrade {
    pub direction: Direction,
    pub entry_time: DateTime<Utc>,
    pub entry_bar_index: usize,
    /// Fill price after spread and slippage.
    pub entry_price: f64,
    /// Tightened at most once by the breakeven rule.
    pub stop_loss: f64,
    pub take_profit: f64,
    pub stop_distance: f64,
    pub target_distance: f64,
    pub size: f64,
    /// Price distances, after microstructure scaling.
    pub spread_at_entry: f64,
    pub slippage_at_entry: f64,
    pub commission_per_lot: f64,
    pub balance_at_entry: f64,
    pub breakeven_applied: bool,
    pub snapshot: EntrySnapshot,
}

impl OpenTrade {
    /// Best excursion in the trade's favor reached within `bar`, measured from the fill.
    pub fn favorable_excursion(&self, bar: &Bar) -> f64 {
        match self.direction {
            Direction::Buy => bar.high - self.entry_price,
            Direction::Sell => self.entry_price - bar.low,
        }
    }
}

/// Immutable record of a finished round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTradeRecord {
    // ── Identification ──
    pub direction: Direction,
    pub strategy: Strategy,

    // ── Timing ──
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_bar_index: usize,
    pub exit_bar_index: usize,

    // ── Prices ──
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,

    // ── Outcome ──
    pub result: TradeResult,
    pub exit_reason: ExitReason,
    pub gross_pnl: f64,
    pub commission: f64,
    pub swap: f64,
    /// Net of commission and swap; spread and slippage are already in the fills.
    pub pnl: f64,
    /// Account balance after this trade settled.
    pub balance: f64,
    /// `pnl` relative to the balance before the trade.
    pub return_fraction: f64,

    // ── Entry context ──
    pub spread_at_entry: f64,
    pub slippage_at_entry: f64,
    pub stop_distance: f64,
    pub target_distance: f64,
    pub breakeven_applied: bool,
    pub regime_label: String,
    pub htf_trend: HtfTrend,
    pub entry_hour: u32,
    pub zscore: f64,
    pub atr_zscore: f64,
}

impl ClosedTradeRecord {
    pub fn is_winner(&self) -> bool {
        self.result == TradeResult::Win
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar_index.saturating_sub(self.entry_bar_index)
    }

    /// Balance immediately before this trade settled.
    pub fn balance_before(&self) -> f64 {
        self.balance - self.pnl
    }
}
