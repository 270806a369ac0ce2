//! TOML backtest configuration.
//!
//! A config file has four sections, all optional:
//!
//! ```toml
//! [simulation]
//! symbol = "EURUSD"
//! bar_minutes = 2
//! start = "2025-12-01"
//! end = "2026-01-01"
//! starting_balance = 1000.0
//! data_path = "data/eurusd_m2.csv"
//!
//! [engine.risk]
//! risk_per_trade = 0.005
//!
//! [monte_carlo]
//! iterations = 10000
//! seed = 42
//!
//! [walk_forward]
//! train_days = 20
//! test_days = 5
//! step_days = 5
//! ```
//!
//! Missing keys fall back to the production defaults.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use regimelab_core::EngineConfig;

/// Errors from loading or validating a [`BacktestConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("engine config: {0}")]
    Engine(#[from] regimelab_core::ConfigError),
    #[error("simulation window is empty: start {start} is not before end {end}")]
    EmptyWindow { start: NaiveDate, end: NaiveDate },
    #[error("starting balance must be positive, got {0}")]
    InvalidBalance(f64),
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
    #[error("symbol must not be empty")]
    EmptySymbol,
}

/// Date range, account and data source of one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub symbol: String,
    pub bar_minutes: u32,
    /// First UTC day of the window (inclusive).
    pub start: NaiveDate,
    /// UTC day the window stops at (exclusive).
    pub end: NaiveDate,
    pub starting_balance: f64,
    /// CSV bar file. The CLI's `--data` flag takes precedence.
    pub data_path: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            symbol: "EURUSD".to_string(),
            bar_minutes: 2,
            start: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default(),
            starting_balance: 1000.0,
            data_path: None,
        }
    }
}

impl SimulationConfig {
    /// Start of the window as a UTC instant.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// End of the window as a UTC instant (exclusive).
    pub fn end_time(&self) -> DateTime<Utc> {
        self.end.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

/// Return-resampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub iterations: usize,
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            seed: 42,
        }
    }
}

/// Calendar layout of walk-forward windows, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Offset from the simulation start before the first test window.
    pub train_days: u32,
    pub test_days: u32,
    pub step_days: u32,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_days: 20,
            test_days: 5,
            step_days: 5,
        }
    }
}

/// Everything needed to reproduce one backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub simulation: SimulationConfig,
    pub engine: EngineConfig,
    pub monte_carlo: MonteCarloConfig,
    pub walk_forward: WalkForwardConfig,
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: BacktestConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Engine parameters with the simulation's symbol and bar size applied.
    pub fn engine_config(&self) -> EngineConfig {
        let mut engine = self.engine.clone();
        engine.instrument.symbol = self.simulation.symbol.clone();
        engine.instrument.bar_minutes = self.simulation.bar_minutes;
        engine
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if sim.bar_minutes == 0 {
            return Err(ConfigError::Zero {
                field: "simulation.bar_minutes",
            });
        }
        if sim.start >= sim.end {
            return Err(ConfigError::EmptyWindow {
                start: sim.start,
                end: sim.end,
            });
        }
        if !(sim.starting_balance.is_finite() && sim.starting_balance > 0.0) {
            return Err(ConfigError::InvalidBalance(sim.starting_balance));
        }
        if self.monte_carlo.iterations == 0 {
            return Err(ConfigError::Zero {
                field: "monte_carlo.iterations",
            });
        }
        let wf = &self.walk_forward;
        for (field, value) in [
            ("walk_forward.test_days", wf.test_days),
            ("walk_forward.step_days", wf.step_days),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        self.engine_config().validate()?;
        Ok(())
    }
}
