//! Backtest runner: wires together data loading, the replay and metrics.
//!
//! Two entry points:
//! - `run_backtest()`: loads the CSV named by the config (or an override), then runs.
//! - `run_backtest_on_bars()`: takes pre-loaded bars. Used by tests and the
//!   Monte Carlo / walk-forward commands, which share one load.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use regimelab_core::domain::Bar;
use regimelab_core::{run_replay, ReplayError, ReplayResult};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{dataset_hash, load_bars_csv, window_with_warmup, LoadError};
use crate::metrics::PerformanceReport;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),
    #[error("no data file: set simulation.data_path or pass one explicitly")]
    NoDataPath,
    #[error("no bars between {start} and {end}")]
    EmptyWindow { start: NaiveDate, end: NaiveDate },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dataset_hash: String,
    /// Bars handed to the replay, warm-up included.
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub report: PerformanceReport,
    pub replay: ReplayResult,
}

/// Default schema version for JSON written before the field existed.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load bars from `data_path` (or the config's) and run the backtest.
pub fn run_backtest(
    config: &BacktestConfig,
    data_path: Option<&Path>,
) -> Result<BacktestResult, RunError> {
    let bars = load_configured_bars(config, data_path)?;
    run_backtest_on_bars(config, &bars)
}

/// Resolve the data path and load the full bar file.
pub fn load_configured_bars(
    config: &BacktestConfig,
    data_path: Option<&Path>,
) -> Result<Vec<Bar>, RunError> {
    let path = data_path
        .or(config.simulation.data_path.as_deref())
        .ok_or(RunError::NoDataPath)?;
    Ok(load_bars_csv(path)?)
}

/// Run a backtest over pre-loaded bars with no I/O.
///
/// Bars outside the simulation window are ignored, except for the warm-up
/// bars immediately before its start.
pub fn run_backtest_on_bars(
    config: &BacktestConfig,
    bars: &[Bar],
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let sim = &config.simulation;
    let engine = config.engine_config();
    let slice = window_with_warmup(bars, sim.start_time(), sim.end_time(), engine.warmup_bars);
    if slice.is_empty() {
        return Err(RunError::EmptyWindow {
            start: sim.start,
            end: sim.end,
        });
    }

    let replay = run_replay(slice, sim.starting_balance, &engine)?;
    let report = PerformanceReport::compute(
        &replay.trades,
        sim.starting_balance,
        sim.start_time(),
        sim.end_time(),
    );
    info!(
        symbol = %sim.symbol,
        trades = report.trade_count,
        net_profit = report.net_profit,
        max_drawdown = report.max_drawdown,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        symbol: sim.symbol.clone(),
        start_date: sim.start,
        end_date: sim.end,
        dataset_hash: dataset_hash(slice),
        bar_count: slice.len(),
        warmup_bars: engine.warmup_bars,
        report,
        replay,
    })
}
