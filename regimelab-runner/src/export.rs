//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! An artifact directory holds:
//! - `report.json`: the full [`BacktestResult`], schema-versioned
//! - `trades.csv`: the closed-trade tape
//! - `equity.csv`: balance, peak and drawdown after each closed trade
//!
//! Results written by a newer schema are rejected on load.

use std::path::Path;

use anyhow::{bail, Context, Result};

use regimelab_core::domain::ClosedTradeRecord;

use crate::metrics::EquityPoint;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

pub const REPORT_FILE: &str = "report.json";
pub const TRADES_FILE: &str = "trades.csv";
pub const EQUITY_FILE: &str = "equity.csv";

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the closed-trade tape.
pub fn export_trades_csv(trades: &[ClosedTradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "entry_time",
        "exit_time",
        "direction",
        "strategy",
        "entry_bar",
        "exit_bar",
        "entry_price",
        "exit_price",
        "size",
        "exit_reason",
        "result",
        "gross_pnl",
        "commission",
        "swap",
        "pnl",
        "balance",
        "return_fraction",
        "regime",
        "entry_hour",
        "zscore",
        "atr_zscore",
        "spread_at_entry",
        "slippage_at_entry",
        "stop_distance",
        "target_distance",
        "breakeven_applied",
    ])?;

    for t in trades {
        let row: Vec<String> = vec![
            t.entry_time.to_rfc3339(),
            t.exit_time.to_rfc3339(),
            t.direction.to_string(),
            t.strategy.to_string(),
            t.entry_bar_index.to_string(),
            t.exit_bar_index.to_string(),
            format!("{:.5}", t.entry_price),
            format!("{:.5}", t.exit_price),
            format!("{:.2}", t.size),
            t.exit_reason.to_string(),
            if t.is_winner() { "WIN" } else { "LOSS" }.to_string(),
            format!("{:.2}", t.gross_pnl),
            format!("{:.2}", t.commission),
            format!("{:.2}", t.swap),
            format!("{:.2}", t.pnl),
            format!("{:.2}", t.balance),
            format!("{:.6}", t.return_fraction),
            t.regime_label.clone(),
            t.entry_hour.to_string(),
            format!("{:.3}", t.zscore),
            format!("{:.3}", t.atr_zscore),
            format!("{:.6}", t.spread_at_entry),
            format!("{:.6}", t.slippage_at_entry),
            format!("{:.6}", t.stop_distance),
            format!("{:.6}", t.target_distance),
            t.breakeven_applied.to_string(),
        ];
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the per-trade equity curve, starting with the opening balance.
pub fn export_equity_csv(starting_balance: f64, curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["trade", "time", "balance", "peak", "drawdown"])?;
    let opening = format!("{:.2}", starting_balance);
    wtr.write_record(["0", "", opening.as_str(), opening.as_str(), "0.000000"])?;
    for p in curve {
        wtr.write_record([
            &(p.trade_index + 1).to_string(),
            &p.time.to_rfc3339(),
            &format!("{:.2}", p.balance),
            &format!("{:.2}", p.peak),
            &format!("{:.6}", p.drawdown),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `report.json`, `trades.csv` and `equity.csv` into `dir`.
pub fn save_artifacts(result: &BacktestResult, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))?;

    std::fs::write(dir.join(REPORT_FILE), export_json(result)?)
        .with_context(|| format!("failed to write {REPORT_FILE}"))?;
    std::fs::write(dir.join(TRADES_FILE), export_trades_csv(&result.replay.trades)?)
        .with_context(|| format!("failed to write {TRADES_FILE}"))?;
    std::fs::write(
        dir.join(EQUITY_FILE),
        export_equity_csv(result.report.starting_balance, &result.report.equity_curve)?,
    )
    .with_context(|| format!("failed to write {EQUITY_FILE}"))?;
    Ok(())
}

/// Load a `BacktestResult` from an artifact directory's `report.json`.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join(REPORT_FILE);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Human-readable summary of one run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    let r = &result.report;
    let replay = &result.replay;

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Run\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", result.symbol));
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        result.start_date, result.end_date
    ));
    md.push_str(&format!(
        "| Bars | {} ({} warmup) |\n",
        result.bar_count, result.warmup_bars
    ));
    md.push_str(&format!("| Dataset Hash | {} |\n", short_hash(&result.dataset_hash)));
    md.push_str(&format!(
        "| Config Fingerprint | {} |\n",
        short_hash(&replay.config_fingerprint)
    ));
    md.push('\n');

    md.push_str("## Returns\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Starting Balance | ${:.2} |\n", r.starting_balance));
    md.push_str(&format!("| Final Balance | ${:.2} |\n", r.final_balance));
    md.push_str(&format!("| Net Profit | ${:.2} |\n", r.net_profit));
    md.push_str(&format!("| Total Return | {:.2}% |\n", r.total_return * 100.0));
    md.push_str(&format!(
        "| Annualized Return | {:.2}% |\n",
        r.annualized_return * 100.0
    ));
    md.push('\n');

    md.push_str("## Risk\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", r.max_drawdown * 100.0));
    md.push_str(&format!("| Sharpe | {:.2} |\n", r.sharpe));
    md.push_str(&format!(
        "| Time Under Water | {} trades |\n",
        r.time_under_water
    ));
    md.push('\n');

    md.push_str("## Trades\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Trades | {} |\n", r.trade_count));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", r.win_rate * 100.0));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", r.profit_factor));
    md.push_str(&format!("| Avg Win | ${:.2} |\n", r.avg_win));
    md.push_str(&format!("| Avg Loss | ${:.2} |\n", r.avg_loss));
    match r.win_loss_ratio {
        Some(ratio) => md.push_str(&format!("| Win/Loss Ratio | {ratio:.2} |\n")),
        None => md.push_str("| Win/Loss Ratio | n/a |\n"),
    }
    md.push('\n');

    if let Some(open) = &replay.unresolved_trade {
        md.push_str("## Unresolved Trade\n\n");
        md.push_str(&format!(
            "{} {:.2} lots opened {} at {:.5} (SL {:.5}, TP {:.5}), still open when the data ended.\n\n",
            open.direction,
            open.size,
            open.entry_time.to_rfc3339(),
            open.entry_price,
            open.stop_loss,
            open.take_profit
        ));
    }

    md.push_str("## Decisions\n\n");
    md.push_str(&format!(
        "{} flat bars evaluated, {} vetoed, {} faults.\n\n",
        replay.decisions,
        replay.total_vetoes(),
        replay.faults
    ));
    if !replay.vetoes.is_empty() {
        md.push_str("| Veto | Count |\n");
        md.push_str("| --- | --- |\n");
        let mut vetoes: Vec<(&String, &usize)> = replay.vetoes.iter().collect();
        vetoes.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (label, count) in vetoes {
            md.push_str(&format!("| {label} | {count} |\n"));
        }
        md.push('\n');
    }

    md
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
