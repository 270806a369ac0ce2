//! Z-scores: price stretch and volatility-of-volatility.

use super::atr::atr;
use crate::domain::Bar;

/// Standard deviations below this count as zero.
const STD_EPSILON: f64 = 1e-15;

/// (last - mean) / population std over the last `period` values.
///
/// 0.0 if the window is short or the deviation is zero.
pub fn zscore(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period {
        return 0.0;
    }
    let window = &values[values.len() - period..];
    let n = period as f64;
    let mean = window.iter().sum::<f64>() / n;
    let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std < STD_EPSILON {
        return 0.0;
    }
    (window[period - 1] - mean) / std
}

/// Z-score of the last `lookback` ATR readings, each computed on a prefix of
/// `bars` ending one bar later than the previous. The newest reading uses the
/// full window.
pub fn atr_zscore(bars: &[Bar], atr_period: usize, lookback: usize) -> f64 {
    if lookback == 0 || bars.len() < lookback {
        return 0.0;
    }
    let n = bars.len();
    let series: Vec<f64> = (n - lookback + 1..=n)
        .map(|end| atr(&bars[..end], atr_period))
        .collect();
    zscore(&series, lookback)
}
