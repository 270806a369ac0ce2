//! Walk-forward evaluation over calendar windows.
//!
//! The first test window starts `train_days` after the simulation start.
//! Windows are `test_days` long and advance by `step_days`; a window is
//! only used if it ends on or before the simulation end. Every window is an
//! independent replay (fresh trading state, fresh balance) over its own
//! bars plus the warm-up bars that precede it, so windows run in parallel.

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use regimelab_core::domain::Bar;
use regimelab_core::{run_replay, EngineConfig, ReplayError};

use crate::config::{BacktestConfig, WalkForwardConfig};
use crate::data_loader::window_with_warmup;
use crate::metrics::PerformanceReport;

#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("no walk-forward window fits between {start} and {end}")]
    NoWindows { start: NaiveDate, end: NaiveDate },
    #[error("replay failed in window {window}: {source}")]
    Replay {
        window: usize,
        #[source]
        source: ReplayError,
    },
}

/// Test range of one window: `[test_start, test_end)` in UTC days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub index: usize,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WindowOutcome {
    Completed {
        report: PerformanceReport,
        bars: usize,
        unresolved_trade: bool,
        faults: usize,
    },
    /// Not enough bars to warm up and trade inside the window.
    Skipped { available: usize, required: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub spec: WindowSpec,
    pub outcome: WindowOutcome,
}

impl WindowResult {
    pub fn report(&self) -> Option<&PerformanceReport> {
        match &self.outcome {
            WindowOutcome::Completed { report, .. } => Some(report),
            WindowOutcome::Skipped { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub windows: Vec<WindowResult>,
}

impl WalkForwardResult {
    pub fn completed(&self) -> impl Iterator<Item = &PerformanceReport> {
        self.windows.iter().filter_map(WindowResult::report)
    }

    /// Completed windows that finished with a net profit.
    pub fn profitable_windows(&self) -> usize {
        self.completed().filter(|r| r.net_profit > 0.0).count()
    }

    pub fn mean_total_return(&self) -> f64 {
        let returns: Vec<f64> = self.completed().map(|r| r.total_return).collect();
        crate::stats::mean(&returns)
    }
}

/// Lay out the test windows for `[start, end)`.
pub fn plan_windows(start: NaiveDate, end: NaiveDate, config: &WalkForwardConfig) -> Vec<WindowSpec> {
    let test = Duration::days(i64::from(config.test_days));
    let step = Duration::days(i64::from(config.step_days.max(1)));
    let mut windows = Vec::new();
    let mut test_start = start + Duration::days(i64::from(config.train_days));
    while test_start + test <= end {
        windows.push(WindowSpec {
            index: windows.len(),
            test_start,
            test_end: test_start + test,
        });
        test_start += step;
    }
    windows
}

/// Replay every window of `config.walk_forward` over `bars`.
pub fn run_walk_forward(
    bars: &[Bar],
    config: &BacktestConfig,
) -> Result<WalkForwardResult, WalkForwardError> {
    let sim = &config.simulation;
    let specs = plan_windows(sim.start, sim.end, &config.walk_forward);
    if specs.is_empty() {
        return Err(WalkForwardError::NoWindows {
            start: sim.start,
            end: sim.end,
        });
    }
    let engine = config.engine_config();

    let windows = specs
        .par_iter()
        .map(|spec| run_window(bars, spec, sim.starting_balance, &engine))
        .collect::<Result<Vec<_>, _>>()?;

    let result = WalkForwardResult { windows };
    info!(
        windows = result.windows.len(),
        completed = result.completed().count(),
        profitable = result.profitable_windows(),
        "walk-forward finished"
    );
    Ok(result)
}

fn run_window(
    bars: &[Bar],
    spec: &WindowSpec,
    starting_balance: f64,
    engine: &EngineConfig,
) -> Result<WindowResult, WalkForwardError> {
    let start = spec.test_start.and_time(chrono::NaiveTime::MIN).and_utc();
    let end = spec.test_end.and_time(chrono::NaiveTime::MIN).and_utc();
    let slice = window_with_warmup(bars, start, end, engine.warmup_bars);

    let outcome = match run_replay(slice, starting_balance, engine) {
        Ok(replay) => WindowOutcome::Completed {
            report: PerformanceReport::compute(&replay.trades, starting_balance, start, end),
            bars: slice.len(),
            unresolved_trade: replay.unresolved_trade.is_some(),
            faults: replay.faults,
        },
        Err(ReplayError::InsufficientHistory {
            available,
            required,
        }) => {
            warn!(
                window = spec.index,
                test_start = %spec.test_start,
                available,
                required,
                "skipping walk-forward window"
            );
            WindowOutcome::Skipped {
                available,
                required,
            }
        }
        Err(source) => {
            return Err(WalkForwardError::Replay {
                window: spec.index,
                source,
            })
        }
    };
    Ok(WindowResult {
        spec: *spec,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, d).unwrap()
    }

    #[test]
    fn default_layout_over_december() {
        let end = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let windows = plan_windows(day(1), end, &WalkForwardConfig::default());
        // Test starts: Dec 21 and Dec 26; Dec 31 + 5 days overshoots.
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].test_start, day(21));
        assert_eq!(windows[0].test_end, day(26));
        assert_eq!(windows[1].test_start, day(26));
        assert_eq!(windows[1].test_end, day(31));
        assert_eq!(windows[1].index, 1);
    }

    #[test]
    fn window_may_end_exactly_on_the_boundary() {
        let config = WalkForwardConfig {
            train_days: 0,
            test_days: 5,
            step_days: 5,
        };
        let windows = plan_windows(day(1), day(11), &config);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].test_end, day(11));
    }

    #[test]
    fn overlapping_steps() {
        let config = WalkForwardConfig {
            train_days: 2,
            test_days: 4,
            step_days: 1,
        };
        let windows = plan_windows(day(1), day(10), &config);
        let starts: Vec<u32> = windows
            .iter()
            .map(|w| chrono::Datelike::day(&w.test_start))
            .collect();
        assert_eq!(starts, vec![3, 4, 5, 6]);
    }

    #[test]
    fn training_offset_past_the_end_yields_nothing() {
        let config = WalkForwardConfig {
            train_days: 40,
            ..WalkForwardConfig::default()
        };
        assert!(plan_windows(day(1), day(31), &config).is_empty());
    }

    #[test]
    fn no_windows_is_an_error() {
        let mut config = BacktestConfig::default();
        config.walk_forward.train_days = 400;
        let err = run_walk_forward(&[], &config).unwrap_err();
        assert!(matches!(err, WalkForwardError::NoWindows { .. }));
    }

    #[test]
    fn windows_without_data_are_skipped() {
        let config = BacktestConfig::default();
        let result = run_walk_forward(&[], &config).unwrap();
        assert_eq!(result.windows.len(), 2);
        assert!(result
            .windows
            .iter()
            .all(|w| matches!(w.outcome, WindowOutcome::Skipped { .. })));
        assert_eq!(result.completed().count(), 0);
        assert_eq!(result.mean_total_return(), 0.0);
    }
}
