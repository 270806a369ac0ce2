//! regimelab core: deterministic single-instrument FX replay engine.
//!
//! This crate contains the decision pipeline and the trade lifecycle:
//! - Domain records (bars, instrument, open and closed trades)
//! - Indicator engine over a trailing window of closed bars
//! - Regime classifier and signal generator
//! - Behavioral, session and cost gates, then the risk-budget sizer
//! - Execution cost model (fills, breakeven, commission, swap, microstructure)
//! - Trading state with crash-safe persistence and live-side monitoring
//! - The bar-by-bar replay loop

pub mod config;
pub mod domain;
pub mod engine;
pub mod execution;
pub mod gates;
pub mod indicators;
pub mod regime;
pub mod rng;
pub mod signal;
pub mod sizers;
pub mod state;

pub use config::{ConfigError, EngineConfig};
pub use engine::{decide, run_replay, Decision, ReplayError, ReplayResult, Veto};
