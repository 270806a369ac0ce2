//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Single position: closed trades never overlap in time
//! 2. Risk budget: every size is a lot-step multiple within equity × risk
//! 3. Level placement: stops on the loss side, targets on the profit side
//! 4. Equity chain: each trade's balance follows from the previous one

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use regimelab_core::domain::{Bar, Direction};
use regimelab_core::{run_replay, EngineConfig, ReplayResult};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// Step size of the walk in price units (1.5 to 6 pips max move per bar).
fn arb_volatility() -> impl Strategy<Value = f64> {
    0.0003..0.0012_f64
}

fn make_walk_bars(n: usize, seed: u64, step: f64) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2025, 12, 1, 6, 0, 0).unwrap();
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };
    let mut price = 1.1000;
    (0..n)
        .map(|i| {
            let open = price;
            let close = open + (next() - 0.5) * step * 2.0;
            let high = open.max(close) + 0.0001 + next() * step;
            let low = open.min(close) - 0.0001 - next() * step;
            price = close;
            Bar::new(
                base + Duration::minutes(2 * i as i64),
                open,
                high,
                low,
                close,
                100.0,
                8.0,
            )
        })
        .collect()
}

fn active_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.regime.compression = -1.5;
    config.regime.expansion = 5.0;
    config.regime.extreme = 10.0;
    config.regime.adx_trend = 100.0;
    config.signal.mean_reversion_zscore = 1.5;
    config.signal.extended_candle_multiplier = 3.0;
    config
}

fn replay(seed: u64, step: f64) -> (ReplayResult, EngineConfig) {
    let config = active_config();
    let bars = make_walk_bars(700, seed, step);
    let result = run_replay(&bars, 1000.0, &config).expect("synthetic series is valid");
    (result, config)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // ── 1. Single position ──────────────────────────────────────────

    #[test]
    fn trades_never_overlap(seed in arb_seed(), step in arb_volatility()) {
        let (result, _) = replay(seed, step);
        for pair in result.trades.windows(2) {
            prop_assert!(pair[0].exit_time < pair[1].entry_time);
            prop_assert!(pair[0].exit_bar_index < pair[1].entry_bar_index);
        }
        if let (Some(last), Some(open)) = (result.trades.last(), &result.unresolved_trade) {
            prop_assert!(last.exit_time < open.entry_time);
        }
    }

    // ── 2. Risk budget ──────────────────────────────────────────────

    #[test]
    fn sizes_respect_lot_step_and_budget(seed in arb_seed(), step in arb_volatility()) {
        let (result, config) = replay(seed, step);
        let inst = &config.instrument;
        for trade in &result.trades {
            let steps = trade.size / inst.lot_step;
            prop_assert!((steps - steps.round()).abs() < 1e-6, "size {} off step", trade.size);
            prop_assert!(trade.size >= inst.min_lot);

            let stop_pips = inst.price_to_pips(trade.stop_distance);
            let risked = trade.size * stop_pips * inst.pip_value_per_lot();
            let budget = trade.balance_before() * config.risk.risk_per_trade;
            prop_assert!(risked <= budget + 1e-9, "risked {risked} over budget {budget}");
        }
    }

    // ── 3. Level placement ──────────────────────────────────────────

    #[test]
    fn exits_are_on_the_right_side(seed in arb_seed(), step in arb_volatility()) {
        let (result, _) = replay(seed, step);
        for trade in &result.trades {
            prop_assert!(trade.stop_distance > 0.0);
            prop_assert!(
                (trade.target_distance - trade.stop_distance * 2.0).abs() < 1e-12
            );
        }
        if let Some(open) = &result.unresolved_trade {
            match open.direction {
                Direction::Buy => {
                    prop_assert!(open.stop_loss < open.entry_price);
                    prop_assert!(open.take_profit > open.entry_price);
                }
                Direction::Sell => {
                    prop_assert!(open.stop_loss > open.entry_price);
                    prop_assert!(open.take_profit < open.entry_price);
                }
            }
        }
    }

    // ── 4. Equity chain ─────────────────────────────────────────────

    #[test]
    fn balances_chain(seed in arb_seed(), step in arb_volatility()) {
        let (result, _) = replay(seed, step);
        let mut balance = result.starting_balance;
        for trade in &result.trades {
            prop_assert!((trade.balance - (balance + trade.pnl)).abs() < 1e-9);
            balance = trade.balance;
        }
        prop_assert!((result.final_balance - balance).abs() < 1e-9);
    }
}
