//! regimelab runner: backtest orchestration on top of `regimelab-core`.
//!
//! This crate provides:
//! - TOML configuration loading and validation
//! - CSV bar ingestion with date windowing
//! - Single-backtest runner producing a schema-versioned result
//! - Trade-based performance metrics
//! - Monte Carlo return resampling and walk-forward evaluation
//! - Realized-risk validation and cost calibration
//! - JSON / CSV / Markdown artifact export

pub mod calibration;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod monte_carlo;
pub mod risk_validation;
pub mod runner;
pub mod stats;
pub mod walk_forward;

pub use calibration::{calibrate, CalibrationReport};
pub use config::{BacktestConfig, ConfigError, MonteCarloConfig, SimulationConfig, WalkForwardConfig};
pub use data_loader::{load_bars_csv, read_bars, window_with_warmup, LoadError};
pub use metrics::{EquityPoint, PerformanceReport};
pub use monte_carlo::{run_monte_carlo, MonteCarloError, MonteCarloSummary, PercentileSummary};
pub use risk_validation::{summarize_realized_risk, RealizedRiskSummary};
pub use runner::{
    load_configured_bars, run_backtest, run_backtest_on_bars, BacktestResult, RunError,
    SCHEMA_VERSION,
};
pub use walk_forward::{
    plan_windows, run_walk_forward, WalkForwardError, WalkForwardResult, WindowOutcome,
    WindowResult, WindowSpec,
};
