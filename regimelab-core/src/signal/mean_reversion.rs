//! Mean reversion: fade price stretched beyond a z-score threshold.

use crate::domain::Direction;
use crate::indicators::EnrichedBar;

pub fn propose(bar: &EnrichedBar, threshold: f64) -> Option<Direction> {
    if bar.zscore > threshold {
        Some(Direction::Sell)
    } else if bar.zscore < -threshold {
        Some(Direction::Buy)
    } else {
        None
    }
}
