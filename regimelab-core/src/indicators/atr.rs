//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), defined
//! from the second bar of the window onward.
//! ATR is the simple mean of the last `period` true ranges.

use crate::domain::Bar;

/// True range for every bar after the first; length is `bars.len() - 1`.
pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            (cur.high - cur.low)
                .max((cur.high - prev.close).abs())
                .max((cur.low - prev.close).abs())
        })
        .collect()
}

/// Simple-mean ATR over the last `period` true ranges. 0.0 if fewer exist.
pub fn atr(bars: &[Bar], period: usize) -> f64 {
    let tr = true_ranges(bars);
    if period == 0 || tr.len() < period {
        return 0.0;
    }
    tr[tr.len() - period..].iter().sum::<f64>() / period as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};
    use chrono::{TimeZone, Utc};

    #[test]
    fn true_range_uses_previous_close_gap() {
        let t = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap();
        let bars = vec![
            Bar::new(t, 1.1000, 1.1010, 1.0990, 1.1000, 1.0, 0.0),
            // Gap up: |high - prev_close| dominates.
            Bar::new(t, 1.1030, 1.1040, 1.1025, 1.1035, 1.0, 0.0),
        ];
        let tr = true_ranges(&bars);
        assert_eq!(tr.len(), 1);
        assert_approx(tr[0], 0.0040, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_is_mean_of_last_period() {
        // Constant body of 1 pip and 5-pip wicks each side: TR = 11 pips.
        let closes: Vec<f64> = (0..30).map(|i| 1.1 + i as f64 * 0.0001).collect();
        let bars = make_bars(&closes);
        assert_approx(atr(&bars, 14), 0.0011, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_insufficient_history_is_zero() {
        let bars = make_bars(&[1.1; 14]);
        // 14 bars give 13 true ranges.
        assert_eq!(atr(&bars, 14), 0.0);
        assert_eq!(atr(&bars, 0), 0.0);
        assert_eq!(atr(&[], 3), 0.0);
    }

    #[test]
    fn atr_only_reads_the_tail() {
        let mut closes = vec![1.0; 10];
        closes.extend((0..20).map(|i| 1.1 + i as f64 * 0.0001));
        let bars = make_bars(&closes);
        let tail_only = atr(&bars[15..], 14);
        assert_approx(atr(&bars, 14), tail_only, DEFAULT_EPSILON);
    }
}
