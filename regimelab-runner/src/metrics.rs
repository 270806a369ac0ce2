//! Performance metrics: pure functions over the ordered closed-trade list.
//!
//! Every metric is trade-based: one equity point per closed trade, with the
//! starting balance as the first peak. Degenerate inputs (no trades, zero
//! variance, no losses) produce 0.0 rather than NaN or infinity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use regimelab_core::domain::ClosedTradeRecord;

use crate::stats::{mean, sample_std};

/// Scale applied to the per-trade Sharpe ratio.
pub const ANNUALIZATION_FACTOR: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Balance after each closed trade, with its running peak and drawdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub trade_index: usize,
    pub time: DateTime<Utc>,
    pub balance: f64,
    pub peak: f64,
    /// Fractional distance below the peak (0.12 = 12% under).
    pub drawdown: f64,
}

/// Aggregate performance metrics for a single replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub starting_balance: f64,
    pub final_balance: f64,
    pub net_profit: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    /// Calendar days the annualization is based on (at least 1).
    pub span_days: i64,
    pub max_drawdown: f64,
    /// Longest run of consecutive trades closed below the running peak.
    pub time_under_water: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    /// Mean of losing trades' PnL (negative).
    pub avg_loss: f64,
    pub win_loss_ratio: Option<f64>,
    pub profit_factor: f64,
    pub sharpe: f64,
    pub equity_curve: Vec<EquityPoint>,
}

impl PerformanceReport {
    /// Compute the full report for trades booked between `start` and `end`.
    pub fn compute(
        trades: &[ClosedTradeRecord],
        starting_balance: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        let final_balance = trades.last().map_or(starting_balance, |t| t.balance);
        let span_days = (end - start).num_days().max(1);
        let total = total_return(starting_balance, final_balance);
        let equity_curve = equity_curve(trades, starting_balance);
        let avg_win = mean(&pnl_where(trades, |p| p > 0.0));
        let avg_loss = mean(&pnl_where(trades, |p| p < 0.0));
        let wins = trades.iter().filter(|t| t.is_winner()).count();
        let returns: Vec<f64> = trades.iter().map(|t| t.return_fraction).collect();

        Self {
            trade_count: trades.len(),
            wins,
            losses: trades.len() - wins,
            starting_balance,
            final_balance,
            net_profit: final_balance - starting_balance,
            total_return: total,
            annualized_return: annualized_return(total, span_days),
            span_days,
            max_drawdown: equity_curve.iter().map(|p| p.drawdown).fold(0.0, f64::max),
            time_under_water: time_under_water(&equity_curve),
            win_rate: win_rate(trades),
            avg_win,
            avg_loss,
            win_loss_ratio: (avg_loss != 0.0).then(|| avg_win / avg_loss.abs()),
            profit_factor: profit_factor(trades),
            sharpe: sharpe_ratio(&returns),
            equity_curve,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// (final − initial) / initial.
pub fn total_return(starting_balance: f64, final_balance: f64) -> f64 {
    if starting_balance <= 0.0 {
        return 0.0;
    }
    (final_balance - starting_balance) / starting_balance
}

/// Compound the total return to a yearly rate over `span_days`.
///
/// A wiped-out account annualizes to −100%.
pub fn annualized_return(total_return: f64, span_days: i64) -> f64 {
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(DAYS_PER_YEAR / span_days.max(1) as f64) - 1.0
}

/// Running peak and drawdown after each trade.
pub fn equity_curve(trades: &[ClosedTradeRecord], starting_balance: f64) -> Vec<EquityPoint> {
    let mut peak = starting_balance;
    trades
        .iter()
        .enumerate()
        .map(|(trade_index, t)| {
            peak = peak.max(t.balance);
            let drawdown = if peak > 0.0 {
                ((peak - t.balance) / peak).max(0.0)
            } else {
                0.0
            };
            EquityPoint {
                trade_index,
                time: t.exit_time,
                balance: t.balance,
                peak,
                drawdown,
            }
        })
        .collect()
}

/// Maximum drawdown of a balance series whose first element is the start.
pub fn max_drawdown(balances: &[f64]) -> f64 {
    let Some(&first) = balances.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &b in balances {
        peak = peak.max(b);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - b) / peak);
        }
    }
    max_dd
}

/// Longest streak of points below the peak, counting a streak still open
/// at the end of the series.
pub fn time_under_water(curve: &[EquityPoint]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for point in curve {
        if point.drawdown > 0.0 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

pub fn win_rate(trades: &[ClosedTradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Sum of profits over |sum of losses|; 0.0 when nothing was lost.
pub fn profit_factor(trades: &[ClosedTradeRecord]) -> f64 {
    let gross_profit: f64 = pnl_where(trades, |p| p > 0.0).iter().sum();
    let gross_loss: f64 = pnl_where(trades, |p| p < 0.0).iter().sum::<f64>().abs();
    if gross_loss == 0.0 {
        return 0.0;
    }
    gross_profit / gross_loss
}

/// Mean per-trade return over its sample std, scaled by √252.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    let std = sample_std(returns);
    if !std.is_finite() || std < 1e-15 {
        return 0.0;
    }
    mean(returns) / std * ANNUALIZATION_FACTOR.sqrt()
}

fn pnl_where(trades: &[ClosedTradeRecord], keep: impl Fn(f64) -> bool) -> Vec<f64> {
    trades.iter().map(|t| t.pnl).filter(|&p| keep(p)).collect()
}
