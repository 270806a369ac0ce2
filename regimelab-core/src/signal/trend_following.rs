//! Trend following: buy a rejected pullback to the fast EMA in an uptrend,
//! sell a rejected rally to it in a downtrend.

use crate::domain::Direction;
use crate::indicators::EnrichedBar;

pub fn propose(bar: &EnrichedBar) -> Option<Direction> {
    let b = &bar.bar;
    if bar.ema_fast > bar.ema_slow {
        (b.low <= bar.ema_fast && b.close > bar.ema_fast).then_some(Direction::Buy)
    } else if bar.ema_fast < bar.ema_slow {
        (b.high >= bar.ema_fast && b.close < bar.ema_fast).then_some(Direction::Sell)
    } else {
        None
    }
}
