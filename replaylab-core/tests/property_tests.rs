//! Property tests for the accounting and determinism invariants.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

use replaylab_core::config::{AccountConfig, BacktestConfig, SizingKind, StrategyConfig};
use replaylab_core::domain::{Bar, Direction, OrderIntent};
use replaylab_core::engine::{run_backtest_with, BacktestReport};
// Aliased: proptest's prelude exports its own `Strategy` trait.
use replaylab_core::strategy::Strategy as TradingStrategy;
use replaylab_core::strategy::{StrategyContext, StrategyError};

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 4, 0, 0, 0).unwrap()
}

fn config(hedging: bool) -> BacktestConfig {
    BacktestConfig {
        strategy: StrategyConfig {
            name: "scripted".into(),
            watchlist: vec!["FX".into()],
            sizing: SizingKind::Risk,
            risk_pc: 1.5,
            fixed_size: None,
            params: BTreeMap::new(),
        },
        account: AccountConfig {
            initial_balance: 1000.0,
            leverage: 30.0,
            spread: 0.0001,
            commission_rate: 0.001,
            hedging_enabled: hedging,
        },
        start: start_time(),
        end: start_time() + Duration::days(365),
        min_units: BTreeMap::new(),
    }
}

/// One scripted action: emit an intent on this call, or stay quiet.
#[derive(Debug, Clone)]
enum Action {
    Quiet,
    Enter {
        long: bool,
        risk_pc: f64,
        stop_distance: f64,
    },
}

struct Scripted {
    actions: Vec<Action>,
    call: usize,
}

impl TradingStrategy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn on_bar(&mut self, ctx: &StrategyContext<'_>) -> Result<Vec<OrderIntent>, StrategyError> {
        let action = self.actions.get(self.call).cloned().unwrap_or(Action::Quiet);
        self.call += 1;
        Ok(match action {
            Action::Quiet => Vec::new(),
            Action::Enter {
                long,
                risk_pc,
                stop_distance,
            } => vec![OrderIntent::risk(
                ctx.instrument.symbol.clone(),
                if long { Direction::Long } else { Direction::Short },
                risk_pc,
                stop_distance,
                1.5,
            )],
        })
    }
}

fn bars_from_deltas(deltas: &[f64]) -> Vec<Bar> {
    let mut close = 1.2000_f64;
    deltas
        .iter()
        .enumerate()
        .map(|(i, &delta)| {
            let open = close;
            close = (close + delta).max(0.1);
            Bar {
                instrument: "FX".into(),
                timestamp: start_time() + Duration::hours(4 * i as i64),
                open,
                high: open.max(close) + 0.0008,
                low: open.min(close) - 0.0008,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

fn run(
    deltas: &[f64],
    actions: &[Action],
    hedging: bool,
) -> BacktestReport {
    let mut data = HashMap::new();
    data.insert("FX".to_string(), bars_from_deltas(deltas));
    let cfg = config(hedging);
    let mut strategies: Vec<Box<dyn TradingStrategy>> = vec![Box::new(Scripted {
        actions: actions.to_vec(),
        call: 0,
    })];
    run_backtest_with(&cfg, &data, &mut strategies).unwrap()
}

fn action_strategy() -> impl proptest::strategy::Strategy<Value = Action> {
    prop_oneof![
        2 => Just(Action::Quiet),
        3 => (any::<bool>(), 0.5f64..3.0, 0.0005f64..0.01).prop_map(
            |(long, risk_pc, stop_distance)| Action::Enter {
                long,
                risk_pc,
                stop_distance,
            }
        ),
    ]
}

proptest! {
    #[test]
    fn direction_counts_partition_total(
        deltas in prop::collection::vec(-0.004f64..0.004, 10..50),
        actions in prop::collection::vec(action_strategy(), 10..50),
        hedging in any::<bool>(),
    ) {
        let report = run(&deltas, &actions, hedging);
        prop_assert_eq!(
            report.summary.no_trades,
            report.summary.long_trades.no_trades + report.summary.short_trades.no_trades
        );
    }

    #[test]
    fn balance_identity_holds_at_every_sample(
        deltas in prop::collection::vec(-0.004f64..0.004, 10..50),
        actions in prop::collection::vec(action_strategy(), 10..50),
        hedging in any::<bool>(),
    ) {
        let report = run(&deltas, &actions, hedging);
        // Balance mutates only on close: at every equity sample the balance
        // equals initial + net PnL of trades closed at or before it.
        for sample in &report.equity {
            let expected: f64 = 1000.0
                + report
                    .trades
                    .iter()
                    .filter(|t| t.exit_time <= sample.timestamp)
                    .map(|t| t.net_pnl())
                    .sum::<f64>();
            prop_assert!(
                (sample.balance - expected).abs() < 1e-6,
                "balance {} != expected {} at {}",
                sample.balance,
                expected,
                sample.timestamp
            );
        }
        // And the summary reconstructs the same ending balance.
        let ending: f64 = 1000.0 + report.trades.iter().map(|t| t.net_pnl()).sum::<f64>();
        prop_assert!((report.summary.ending_balance - ending).abs() < 1e-6);
    }

    #[test]
    fn identical_runs_produce_identical_reports(
        deltas in prop::collection::vec(-0.004f64..0.004, 10..40),
        actions in prop::collection::vec(action_strategy(), 10..40),
        hedging in any::<bool>(),
    ) {
        let a = run(&deltas, &actions, hedging);
        let b = run(&deltas, &actions, hedging);
        let json_a = serde_json::to_string(&a).unwrap();
        let json_b = serde_json::to_string(&b).unwrap();
        prop_assert_eq!(json_a, json_b);
    }

    #[test]
    fn level_exits_land_on_stop_or_target(
        deltas in prop::collection::vec(-0.004f64..0.004, 10..50),
        actions in prop::collection::vec(action_strategy(), 10..50),
    ) {
        // Hedging on: no netting, so every exit is a stop or target fill.
        let report = run(&deltas, &actions, true);
        for trade in &report.trades {
            let sign = trade.direction.sign();
            let loss_per_unit = (trade.entry_price - trade.exit_price) * sign;
            let gain_per_unit = (trade.exit_price - trade.entry_price) * sign;
            let is_stop = trade.realized_pnl <= 0.0 && loss_per_unit > 0.0;
            let is_target = trade.realized_pnl > 0.0 && gain_per_unit > 0.0;
            prop_assert!(
                is_stop || is_target,
                "exit neither stop nor target: {trade:?}"
            );
        }
    }

    #[test]
    fn trades_are_well_formed(
        deltas in prop::collection::vec(-0.004f64..0.004, 10..50),
        actions in prop::collection::vec(action_strategy(), 10..50),
        hedging in any::<bool>(),
    ) {
        let report = run(&deltas, &actions, hedging);
        for trade in &report.trades {
            prop_assert!(trade.size > 0.0);
            prop_assert!(trade.exit_time >= trade.entry_time);
            prop_assert!(trade.commission_paid >= 0.0);
        }
    }
}
