//! regimelab CLI: replay, robustness and state commands.
//!
//! Commands:
//! - `run`: replay a TOML config over a CSV bar file and print the report
//! - `walk-forward`: replay each calendar test window independently
//! - `monte-carlo`: replay, then resample the per-trade returns
//! - `calibrate`: derive spread/slippage cost parameters from bar history
//! - `state show|reset`: inspect or reset a persisted trading state

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use regimelab_core::domain::Instrument;
use regimelab_core::state::store::StateStore;
use regimelab_runner::export::{generate_report, save_artifacts};
use regimelab_runner::{
    calibrate, load_bars_csv, load_configured_bars, run_backtest, run_backtest_on_bars,
    run_monte_carlo, run_walk_forward, summarize_realized_risk, BacktestConfig, BacktestResult,
    WindowOutcome,
};

#[derive(Parser)]
#[command(
    name = "regimelab",
    about = "regimelab CLI: deterministic regime-gated FX replay engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a config over a bar file and print the performance report.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// CSV bar file. Overrides simulation.data_path.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Directory for report.json, trades.csv and equity.csv.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replay every walk-forward test window and print one line per window.
    WalkForward {
        #[arg(long)]
        config: PathBuf,

        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Replay, then resample per-trade returns.
    MonteCarlo {
        #[arg(long)]
        config: PathBuf,

        #[arg(long)]
        data: Option<PathBuf>,

        /// Number of resampling trials. Overrides monte_carlo.iterations.
        #[arg(long)]
        iterations: Option<usize>,

        /// Master seed. Overrides monte_carlo.seed.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Derive spread and slippage assumptions from a bar file.
    Calibrate {
        /// CSV bar file.
        #[arg(long)]
        data: PathBuf,

        /// Optional config whose instrument is used for pip conversion.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Persisted trading state commands.
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

#[derive(Subcommand)]
enum StateAction {
    /// Print the saved state, or the defaults if none is readable.
    Show {
        #[arg(long)]
        path: PathBuf,
    },
    /// Overwrite the saved state with a fresh one.
    Reset {
        #[arg(long)]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, data, out } => run_cmd(&config, data.as_deref(), out.as_deref()),
        Commands::WalkForward { config, data } => walk_forward_cmd(&config, data.as_deref()),
        Commands::MonteCarlo {
            config,
            data,
            iterations,
            seed,
        } => monte_carlo_cmd(&config, data.as_deref(), iterations, seed),
        Commands::Calibrate { data, config } => calibrate_cmd(&data, config.as_deref()),
        Commands::State { action } => match action {
            StateAction::Show { path } => state_show(&path),
            StateAction::Reset { path } => state_reset(&path),
        },
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<BacktestConfig> {
    let config =
        BacktestConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?;
    info!(
        config = %path.display(),
        symbol = %config.simulation.symbol,
        fingerprint = %config.engine_config().fingerprint(),
        "config loaded"
    );
    Ok(config)
}

fn run_cmd(config_path: &Path, data: Option<&Path>, out: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let result = run_backtest(&config, data)?;

    print_summary(&result, &config);

    if let Some(dir) = out {
        save_artifacts(&result, dir)?;
        println!("Artifacts saved to: {}", dir.display());
    }
    Ok(())
}

fn walk_forward_cmd(config_path: &Path, data: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let bars = load_configured_bars(&config, data)?;
    let result = run_walk_forward(&bars, &config)?;

    println!(
        "{:<4} {:<23} {:>6} {:>10} {:>9} {:>8} {:>7}",
        "#", "Test Window", "Trades", "Net", "Return", "MaxDD", "Sharpe"
    );
    println!("{}", "-".repeat(73));
    for window in &result.windows {
        let range = format!("{} → {}", window.spec.test_start, window.spec.test_end);
        match &window.outcome {
            WindowOutcome::Completed { report, .. } => println!(
                "{:<4} {:<23} {:>6} {:>10.2} {:>8.2}% {:>7.2}% {:>7.2}",
                window.spec.index,
                range,
                report.trade_count,
                report.net_profit,
                report.total_return * 100.0,
                report.max_drawdown * 100.0,
                report.sharpe
            ),
            WindowOutcome::Skipped {
                available,
                required,
            } => println!(
                "{:<4} {:<23} skipped: {available} bars, need more than {required}",
                window.spec.index, range
            ),
        }
    }
    println!();
    println!(
        "Profitable windows: {}/{}   Mean return: {:.2}%",
        result.profitable_windows(),
        result.completed().count(),
        result.mean_total_return() * 100.0
    );
    Ok(())
}

fn monte_carlo_cmd(
    config_path: &Path,
    data: Option<&Path>,
    iterations: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(n) = iterations {
        config.monte_carlo.iterations = n;
    }
    if let Some(s) = seed {
        config.monte_carlo.seed = s;
    }
    let bars = load_configured_bars(&config, data)?;
    let result = run_backtest_on_bars(&config, &bars)?;
    let returns: Vec<f64> = result
        .replay
        .trades
        .iter()
        .map(|t| t.return_fraction)
        .collect();
    if returns.is_empty() {
        bail!("the replay closed no trades; nothing to resample");
    }

    let summary = run_monte_carlo(&returns, config.simulation.starting_balance, &config.monte_carlo)?;
    println!("=== Monte Carlo ===");
    println!("Iterations:       {}", summary.iterations);
    println!("Trades per trial: {}", summary.trades_per_trial);
    println!("Seed:             {}", summary.seed);
    println!();
    println!("{:<16} {:>12} {:>12} {:>12}", "", "p5", "p50", "p95");
    let fb = summary.final_balance;
    println!(
        "{:<16} {:>12.2} {:>12.2} {:>12.2}",
        "Final balance", fb.p5, fb.p50, fb.p95
    );
    let dd = summary.max_drawdown;
    println!(
        "{:<16} {:>11.2}% {:>11.2}% {:>11.2}%",
        "Max drawdown",
        dd.p5 * 100.0,
        dd.p50 * 100.0,
        dd.p95 * 100.0
    );
    println!();
    println!(
        "Probability of loss: {:.1}%",
        summary.probability_of_loss * 100.0
    );
    Ok(())
}

fn calibrate_cmd(data: &Path, config_path: Option<&Path>) -> Result<()> {
    let instrument = match config_path {
        Some(path) => load_config(path)?.engine_config().instrument,
        None => Instrument::default(),
    };
    let bars = load_bars_csv(data)?;
    let Some(report) = calibrate(&bars, &instrument) else {
        bail!("no bars in {}", data.display());
    };

    println!("=== Calibration ({} bars) ===", report.bars);
    println!("Spread median:    {:.2} pips", report.spread_pips_median);
    println!("Spread mean:      {:.2} pips", report.spread_pips_mean);
    println!("Spread p90:       {:.2} pips", report.spread_pips_p90);
    println!("Slippage proxy:   {:.2} pips", report.slippage_pips_proxy);
    println!();
    println!("Suggested config:");
    println!();
    println!("[engine.costs]");
    println!(
        "median_spread = {:.6}",
        report.median_spread_price(&instrument)
    );
    println!("expected_slippage_pips = {:.2}", report.slippage_pips_proxy);
    println!();
    println!("[engine.execution]");
    println!("slippage_pips = {:.2}", report.slippage_pips_proxy);
    Ok(())
}

fn state_show(path: &Path) -> Result<()> {
    let store = StateStore::new(path);
    match store.read() {
        Ok(envelope) => {
            println!("Saved at: {}", envelope.saved_at.to_rfc3339());
            println!("Schema:   v{}", envelope.schema_version);
            println!("{}", serde_json::to_string_pretty(&envelope.state)?);
        }
        Err(err) => {
            println!("No usable state at {} ({err}); defaults apply:", path.display());
            println!("{}", serde_json::to_string_pretty(&store.load())?);
        }
    }
    Ok(())
}

fn state_reset(path: &Path) -> Result<()> {
    let store = StateStore::new(path);
    store
        .reset()
        .with_context(|| format!("resetting {}", path.display()))?;
    println!("Trading state reset: {}", path.display());
    Ok(())
}

fn print_summary(result: &BacktestResult, config: &BacktestConfig) {
    print!("{}", generate_report(result));

    match summarize_realized_risk(&result.replay.trades, config.engine.risk.risk_per_trade) {
        Some(r) => {
            println!("## Realized Risk (R)\n");
            println!("| Stat | Value |");
            println!("| --- | --- |");
            println!("| Count | {} |", r.count);
            println!("| Mean | {:.2} |", r.mean);
            println!("| Median | {:.2} |", r.median);
            println!("| p10 / p90 | {:.2} / {:.2} |", r.p10, r.p90);
            println!("| Min / Max | {:.2} / {:.2} |", r.min, r.max);
            println!();
        }
        None => println!("No closed trades to measure realized risk.\n"),
    }

    if result.replay.unresolved_trade.is_some() {
        println!("WARNING: a trade was still open when the data ended; it is not in the totals.");
    }
}
