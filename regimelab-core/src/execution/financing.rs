//! Overnight swap.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use super::ExecutionConfig;
use crate::domain::Direction;

/// Number of daily cutovers at `cutover` UTC in the interval (entry, exit].
pub fn rollovers_crossed(entry: DateTime<Utc>, exit: DateTime<Utc>, cutover: NaiveTime) -> u32 {
    if exit <= entry {
        return 0;
    }
    let mut next = entry.date_naive().and_time(cutover).and_utc();
    if next <= entry {
        next += Duration::days(1);
    }
    if next > exit {
        return 0;
    }
    let extra = (exit - next).num_days();
    u32::try_from(extra + 1).unwrap_or(u32::MAX)
}

/// Financing charged for holding `size` lots through `rollovers` cutovers.
///
/// Positive is a cost, negative a credit.
pub fn swap_charge(direction: Direction, size: f64, rollovers: u32, config: &ExecutionConfig) -> f64 {
    let rate = match direction {
        Direction::Buy => config.swap_long_per_lot,
        Direction::Sell => config.swap_short_per_lot,
    };
    rate * size * f64::from(rollovers)
}
