//! Directional movement index over a single window.
//!
//! +DM = up-move when it exceeds the down-move and is positive, -DM symmetric.
//! Both, and the true range, are summed over the last `period` bar pairs:
//! +DI = 100 * sum(+DM) / sum(TR), -DI likewise,
//! DX = 100 * |+DI - -DI| / (+DI + -DI).
//!
//! This is the unsmoothed single-window variant; it reacts faster than
//! Wilder's ADX on short bars.

use super::atr::true_ranges;
use crate::domain::Bar;

/// Trend strength on 0..=100. 0.0 with fewer than `2 * period` bars.
pub fn adx(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.len() < period * 2 {
        return 0.0;
    }

    let mut plus_dm = Vec::with_capacity(bars.len() - 1);
    let mut minus_dm = Vec::with_capacity(bars.len() - 1);
    for w in bars.windows(2) {
        let up = w[1].high - w[0].high;
        let down = w[0].low - w[1].low;
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
    }
    let tr = true_ranges(bars);

    let tail = |v: &[f64]| -> f64 { v[v.len() - period..].iter().sum() };
    let tr_sum = tail(&tr);
    if tr_sum <= 0.0 {
        return 0.0;
    }
    let plus_di = 100.0 * tail(&plus_dm) / tr_sum;
    let minus_di = 100.0 * tail(&minus_dm) / tr_sum;
    let di_sum = plus_di + minus_di;
    if di_sum <= 0.0 {
        return 0.0;
    }
    100.0 * (plus_di - minus_di).abs() / di_sum
}
