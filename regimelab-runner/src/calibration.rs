//! Cost calibration from bar history.
//!
//! Spread statistics come straight from the bars' raw spread column.
//! Slippage has no direct observation in bar data, so it is proxied by half
//! the 90th percentile of absolute bar-to-bar moves of the (high + low) / 2
//! mid price.

use serde::{Deserialize, Serialize};

use regimelab_core::domain::{Bar, Instrument};
use regimelab_core::EngineConfig;

use crate::stats::{mean, percentile_sorted, sorted};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub bars: usize,
    pub spread_pips_median: f64,
    pub spread_pips_mean: f64,
    pub spread_pips_p90: f64,
    pub slippage_pips_proxy: f64,
}

impl CalibrationReport {
    /// Median spread as a price distance, the unit the cost filter uses.
    pub fn median_spread_price(&self, instrument: &Instrument) -> f64 {
        instrument.pips_to_price(self.spread_pips_median)
    }

    /// Copy the calibrated costs into an engine config.
    pub fn apply(&self, config: &mut EngineConfig) {
        config.costs.median_spread = self.median_spread_price(&config.instrument);
        config.costs.expected_slippage_pips = self.slippage_pips_proxy;
        config.execution.slippage_pips = self.slippage_pips_proxy;
    }
}

/// Derive spread and slippage statistics; `None` for an empty history.
pub fn calibrate(bars: &[Bar], instrument: &Instrument) -> Option<CalibrationReport> {
    if bars.is_empty() {
        return None;
    }
    let spreads: Vec<f64> = bars
        .iter()
        .map(|b| instrument.price_to_pips(instrument.spread_price(b.spread)))
        .collect();
    let spreads_sorted = sorted(&spreads);

    let moves: Vec<f64> = bars
        .windows(2)
        .map(|w| {
            let prev = (w[0].high + w[0].low) / 2.0;
            let next = (w[1].high + w[1].low) / 2.0;
            instrument.price_to_pips((next - prev).abs())
        })
        .collect();
    let slippage_pips_proxy = if moves.is_empty() {
        0.0
    } else {
        percentile_sorted(&sorted(&moves), 90.0) * 0.5
    };

    Some(CalibrationReport {
        bars: bars.len(),
        spread_pips_median: percentile_sorted(&spreads_sorted, 50.0),
        spread_pips_mean: mean(&spreads),
        spread_pips_p90: percentile_sorted(&spreads_sorted, 90.0),
        slippage_pips_proxy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bar(i: i64, mid: f64, spread: f64) -> Bar {
        let base = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap();
        Bar::new(
            base + Duration::minutes(2 * i),
            mid,
            mid + 0.0002,
            mid - 0.0002,
            mid,
            10.0,
            spread,
        )
    }

    #[test]
    fn empty_history_is_none() {
        assert_eq!(calibrate(&[], &Instrument::default()), None);
    }

    #[test]
    fn spread_points_convert_to_pips() {
        let bars = vec![bar(0, 1.1, 8.0), bar(1, 1.1, 10.0), bar(2, 1.1, 12.0)];
        let report = calibrate(&bars, &Instrument::default()).unwrap();
        assert_eq!(report.bars, 3);
        assert!((report.spread_pips_median - 1.0).abs() < 1e-9);
        assert!((report.spread_pips_mean - 1.0).abs() < 1e-9);
        // rank 1.8 -> 1.0 + 0.8 * 0.2
        assert!((report.spread_pips_p90 - 1.16).abs() < 1e-9);
        // Flat mid: no movement, no slippage.
        assert!(report.slippage_pips_proxy.abs() < 1e-9);
    }

    #[test]
    fn slippage_proxy_is_half_p90_move() {
        // Mid moves of exactly 2 pips every bar.
        let bars: Vec<Bar> = (0..20).map(|i| bar(i, 1.1 + 0.0002 * i as f64, 10.0)).collect();
        let report = calibrate(&bars, &Instrument::default()).unwrap();
        assert!((report.slippage_pips_proxy - 1.0).abs() < 1e-6);
    }

    #[test]
    fn single_bar_has_no_slippage_estimate() {
        let report = calibrate(&[bar(0, 1.1, 10.0)], &Instrument::default()).unwrap();
        assert_eq!(report.slippage_pips_proxy, 0.0);
    }

    #[test]
    fn apply_updates_cost_parameters() {
        let bars = vec![bar(0, 1.1, 20.0), bar(1, 1.1004, 20.0)];
        let report = calibrate(&bars, &Instrument::default()).unwrap();
        let mut config = EngineConfig::default();
        report.apply(&mut config);
        assert!((config.costs.median_spread - 0.0002).abs() < 1e-12);
        assert_eq!(config.execution.slippage_pips, report.slippage_pips_proxy);
        assert_eq!(config.costs.expected_slippage_pips, report.slippage_pips_proxy);
        assert!(config.validate().is_ok());
    }
}
