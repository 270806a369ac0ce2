//! Indicator engine.
//!
//! Every indicator is a pure function of a trailing window of closed bars and
//! returns a scalar for the newest bar in that window. Insufficient history or
//! a zero denominator yields 0.0 rather than an error; the regime and signal
//! layers treat those zeros as "no information".
//!
//! [`EnrichedBar::from_window`] bundles all of them for the decision bar.

pub mod adx;
pub mod atr;
pub mod ema;
pub mod zscore;

pub use adx::adx;
pub use atr::{atr, true_ranges};
pub use ema::ema;
pub use zscore::{atr_zscore, zscore};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::Bar;

/// Indicator periods. All are runtime parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub atr_period: usize,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    pub adx_period: usize,
    pub zscore_period: usize,
    /// Length of the rolling ATR series whose z-score measures volatility-of-volatility.
    pub atr_zscore_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            ema_fast_period: 20,
            ema_slow_period: 50,
            adx_period: 14,
            zscore_period: 20,
            atr_zscore_period: 20,
        }
    }
}

impl IndicatorConfig {
    /// Smallest window for which no indicator falls back to its zero default.
    pub fn required_lookback(&self) -> usize {
        [
            self.atr_period + 1,
            self.ema_fast_period,
            self.ema_slow_period,
            self.adx_period * 2,
            self.zscore_period,
            self.atr_period + self.atr_zscore_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, period) in [
            ("indicators.atr_period", self.atr_period),
            ("indicators.ema_fast_period", self.ema_fast_period),
            ("indicators.ema_slow_period", self.ema_slow_period),
            ("indicators.adx_period", self.adx_period),
            ("indicators.zscore_period", self.zscore_period),
            ("indicators.atr_zscore_period", self.atr_zscore_period),
        ] {
            if period == 0 {
                return Err(ConfigError::ZeroPeriod { field });
            }
        }
        Ok(())
    }
}

/// The decision bar plus every indicator the pipeline reads.
///
/// Built by explicit field assignment so a missing indicator is a compile error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBar {
    pub bar: Bar,
    pub atr: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub adx: f64,
    pub zscore: f64,
    pub atr_zscore: f64,
    pub range: f64,
}

impl EnrichedBar {
    /// Enrich the last bar of `window` using the whole window as history.
    ///
    /// Returns `None` for an empty window.
    pub fn from_window(window: &[Bar], config: &IndicatorConfig) -> Option<Self> {
        let bar = window.last()?.clone();
        let closes: Vec<f64> = window.iter().map(|b| b.close).collect();

        Some(Self {
            atr: atr(window, config.atr_period),
            ema_fast: ema(&closes, config.ema_fast_period),
            ema_slow: ema(&closes, config.ema_slow_period),
            adx: adx(window, config.adx_period),
            zscore: zscore(&closes, config.zscore_period),
            atr_zscore: atr_zscore(window, config.atr_period, config.atr_zscore_period),
            range: bar.range(),
            bar,
        })
    }

    /// False if any derived value is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        [
            self.atr,
            self.ema_fast,
            self.ema_slow,
            self.adx,
            self.zscore,
            self.atr_zscore,
            self.range,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Create synthetic 2-minute bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high/low pad the body by
/// 5 pips, spread = 10 points.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2025, 12, 1, 8, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base + Duration::minutes(2 * i as i64),
                open,
                open.max(close) + 0.0005,
                open.min(close) - 0.0005,
                close,
                100.0,
                10.0,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_lookback_defaults() {
        // ema_slow dominates atr + atr-z (34).
        assert_eq!(IndicatorConfig::default().required_lookback(), 50);
    }

    #[test]
    fn required_lookback_tracks_longest_period() {
        let cfg = IndicatorConfig {
            adx_period: 40,
            ..IndicatorConfig::default()
        };
        assert_eq!(cfg.required_lookback(), 80);
    }

    #[test]
    fn zero_period_rejected() {
        let cfg = IndicatorConfig {
            zscore_period: 0,
            ..IndicatorConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroPeriod {
                field: "indicators.zscore_period"
            })
        );
    }

    #[test]
    fn enriched_bar_uses_last_bar() {
        let closes: Vec<f64> = (0..100).map(|i| 1.1 + (i as f64 * 0.2).sin() * 0.002).collect();
        let bars = make_bars(&closes);
        let enriched = EnrichedBar::from_window(&bars, &IndicatorConfig::default()).unwrap();
        assert_eq!(enriched.bar, bars[99]);
        assert_approx(enriched.range, bars[99].range(), DEFAULT_EPSILON);
        assert!(enriched.atr > 0.0);
        assert!(enriched.ema_fast > 0.0 && enriched.ema_slow > 0.0);
        assert!(enriched.is_finite());
    }

    #[test]
    fn enriched_bar_empty_window_is_none() {
        assert!(EnrichedBar::from_window(&[], &IndicatorConfig::default()).is_none());
    }

    #[test]
    fn enrichment_ignores_bars_after_window() {
        let closes: Vec<f64> = (0..120).map(|i| 1.1 + i as f64 * 0.0001).collect();
        let full = make_bars(&closes);
        let cfg = IndicatorConfig::default();
        let a = EnrichedBar::from_window(&full[..100], &cfg).unwrap();

        let mut altered = full.clone();
        for bar in altered.iter_mut().skip(100) {
            bar.high += 0.01;
            bar.close += 0.005;
        }
        let b = EnrichedBar::from_window(&altered[..100], &cfg).unwrap();
        assert_eq!(a, b);
    }
}
