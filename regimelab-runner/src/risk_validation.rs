//! Realized risk per trade, measured in units of the configured risk budget.
//!
//! A trade that lost exactly its budget has R = −1; a full 2:1 target hit
//! is close to +2 once costs are taken out. Values far below −1 mean the
//! sizer or the execution model is leaking risk.

use serde::{Deserialize, Serialize};

use regimelab_core::domain::ClosedTradeRecord;

use crate::stats::{mean, percentile_sorted, sorted};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedRiskSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
    pub min: f64,
    pub max: f64,
}

/// R multiple of each trade. Trades with a non-positive pre-trade balance
/// are skipped.
pub fn realized_r(trades: &[ClosedTradeRecord], risk_per_trade: f64) -> Vec<f64> {
    trades
        .iter()
        .filter_map(|t| {
            let budget = t.balance_before() * risk_per_trade;
            (budget > 0.0).then(|| t.pnl / budget)
        })
        .collect()
}

/// Distribution of realized R; `None` when there is nothing to measure.
pub fn summarize_realized_risk(
    trades: &[ClosedTradeRecord],
    risk_per_trade: f64,
) -> Option<RealizedRiskSummary> {
    let values = realized_r(trades, risk_per_trade);
    if values.is_empty() {
        return None;
    }
    let s = sorted(&values);
    Some(RealizedRiskSummary {
        count: s.len(),
        mean: mean(&s),
        median: percentile_sorted(&s, 50.0),
        p10: percentile_sorted(&s, 10.0),
        p90: percentile_sorted(&s, 90.0),
        min: s[0],
        max: s[s.len() - 1],
    })
}
