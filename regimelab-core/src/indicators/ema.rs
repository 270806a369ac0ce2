//! Exponential Moving Average (EMA).
//!
//! Seeded with the first value of the window, then blended forward with
//! alpha = 2 / (period + 1). The result therefore depends on the window start,
//! so callers must use a fixed-length trailing window for reproducibility.

/// EMA of `values` as of the last element. 0.0 if the window is shorter than `period`.
pub fn ema(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period {
        return 0.0;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    values[1..]
        .iter()
        .fold(values[0], |acc, &v| v * alpha + acc * (1.0 - alpha))
}
