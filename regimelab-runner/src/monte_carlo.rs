//! Monte Carlo resampling of per-trade returns.
//!
//! Each trial draws, with replacement, as many returns as the replay booked
//! and compounds them from the starting balance. Trials run on rayon; trial
//! `i` always uses the RNG derived from `(seed, "monte_carlo", i)`, so the
//! summary does not depend on the thread count.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use regimelab_core::rng::RngHierarchy;

use crate::config::MonteCarloConfig;
use crate::stats::{percentile_sorted, sorted};

const STREAM: &str = "monte_carlo";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MonteCarloError {
    #[error("no trade returns to resample")]
    NoTrades,
    #[error("iterations must be at least 1")]
    NoIterations,
    #[error("starting balance must be positive, got {0}")]
    InvalidBalance(f64),
    #[error("return at index {index} is not finite")]
    NonFiniteReturn { index: usize },
}

/// 5th, 50th and 95th percentiles of one trial statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileSummary {
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
}

impl PercentileSummary {
    fn from_values(values: &[f64]) -> Self {
        let s = sorted(values);
        Self {
            p5: percentile_sorted(&s, 5.0),
            p50: percentile_sorted(&s, 50.0),
            p95: percentile_sorted(&s, 95.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub iterations: usize,
    pub trades_per_trial: usize,
    pub seed: u64,
    pub final_balance: PercentileSummary,
    /// Fractional max drawdown (0.2 = 20%).
    pub max_drawdown: PercentileSummary,
    /// Share of trials that finished below the starting balance.
    pub probability_of_loss: f64,
}

#[derive(Debug, Clone, Copy)]
struct TrialOutcome {
    final_balance: f64,
    max_drawdown: f64,
}

/// Resample `returns` over `config.iterations` trials.
pub fn run_monte_carlo(
    returns: &[f64],
    starting_balance: f64,
    config: &MonteCarloConfig,
) -> Result<MonteCarloSummary, MonteCarloError> {
    if returns.is_empty() {
        return Err(MonteCarloError::NoTrades);
    }
    if config.iterations == 0 {
        return Err(MonteCarloError::NoIterations);
    }
    if !(starting_balance.is_finite() && starting_balance > 0.0) {
        return Err(MonteCarloError::InvalidBalance(starting_balance));
    }
    if let Some(index) = returns.iter().position(|r| !r.is_finite()) {
        return Err(MonteCarloError::NonFiniteReturn { index });
    }

    let hierarchy = RngHierarchy::new(config.seed);
    let outcomes: Vec<TrialOutcome> = (0..config.iterations)
        .into_par_iter()
        .map(|trial| simulate_trial(returns, starting_balance, &hierarchy, trial as u64))
        .collect();

    let finals: Vec<f64> = outcomes.iter().map(|o| o.final_balance).collect();
    let drawdowns: Vec<f64> = outcomes.iter().map(|o| o.max_drawdown).collect();
    let losing = finals.iter().filter(|&&b| b < starting_balance).count();

    Ok(MonteCarloSummary {
        iterations: config.iterations,
        trades_per_trial: returns.len(),
        seed: config.seed,
        final_balance: PercentileSummary::from_values(&finals),
        max_drawdown: PercentileSummary::from_values(&drawdowns),
        probability_of_loss: losing as f64 / config.iterations as f64,
    })
}

fn simulate_trial(
    returns: &[f64],
    starting_balance: f64,
    hierarchy: &RngHierarchy,
    trial: u64,
) -> TrialOutcome {
    let mut rng = hierarchy.rng_for(STREAM, trial);
    let mut equity = starting_balance;
    let mut peak = starting_balance;
    let mut max_drawdown = 0.0_f64;
    for _ in 0..returns.len() {
        let r = returns[rng.gen_range(0..returns.len())];
        equity *= 1.0 + r;
        peak = peak.max(equity);
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - equity) / peak);
        }
    }
    TrialOutcome {
        final_balance: equity,
        max_drawdown,
    }
}
