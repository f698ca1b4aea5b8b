//! Trade result aggregation — pure functions over the trade log and equity series.
//!
//! `summarize` performs no side effects and is safe to call repeatedly,
//! including on the partial log of an aborted run.

use serde::{Deserialize, Serialize};

use crate::account::EquitySample;
use crate::domain::{Direction, Trade};

/// Per-direction slice of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionSummary {
    pub no_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
}

/// Aggregate result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSummary {
    pub no_trades: usize,
    pub ending_balance: f64,
    pub total_net_pnl: f64,
    pub commission_paid: f64,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Max drawdown of the equity series as a negative fraction.
    pub max_drawdown: f64,
    pub long_trades: DirectionSummary,
    pub short_trades: DirectionSummary,
    /// Orders rejected by sizing or margin. No silent data loss: every one is
    /// an arena position, individually inspectable.
    pub no_rejected: usize,
    pub no_cancelled: usize,
    /// Positions still open when the run ended.
    pub no_open: usize,
}

/// Counts carried from the position book into the summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookCounts {
    pub rejected: usize,
    pub cancelled: usize,
    pub open: usize,
}

/// Derive the summary. Ending balance is reconstructed from the accounting
/// identity `initial + Σ(realized_pnl − commission)`, which the engine's
/// atomic close transitions guarantee matches the account.
pub fn summarize(
    initial_balance: f64,
    trades: &[Trade],
    equity: &[EquitySample],
    counts: BookCounts,
) -> TradeSummary {
    let total_net_pnl: f64 = trades.iter().map(Trade::net_pnl).sum();
    let commission_paid: f64 = trades.iter().map(|t| t.commission_paid).sum();

    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.realized_pnl)
        .collect();
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| !t.is_winner())
        .map(|t| t.realized_pnl)
        .collect();

    TradeSummary {
        no_trades: trades.len(),
        ending_balance: initial_balance + total_net_pnl,
        total_net_pnl,
        commission_paid,
        win_rate: win_rate(trades),
        avg_win: mean(&wins),
        avg_loss: mean(&losses),
        max_drawdown: max_drawdown(equity),
        long_trades: direction_summary(trades, Direction::Long),
        short_trades: direction_summary(trades, Direction::Short),
        no_rejected: counts.rejected,
        no_cancelled: counts.cancelled,
        no_open: counts.open,
    }
}

fn direction_summary(trades: &[Trade], direction: Direction) -> DirectionSummary {
    let slice: Vec<&Trade> = trades.iter().filter(|t| t.direction == direction).collect();
    let winners = slice.iter().filter(|t| t.is_winner()).count();
    DirectionSummary {
        no_trades: slice.len(),
        win_rate: if slice.is_empty() {
            0.0
        } else {
            winners as f64 / slice.len() as f64
        },
        total_pnl: slice.iter().map(|t| t.net_pnl()).sum(),
    }
}

/// Fraction of trades with positive realized PnL. 0.0 for an empty log.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Maximum drawdown of the equity series as a negative fraction.
/// 0.0 for constant or monotonically rising equity.
pub fn max_drawdown(equity: &[EquitySample]) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }
    let mut peak = equity[0].equity();
    let mut max_dd = 0.0_f64;
    for sample in equity.iter().skip(1) {
        let eq = sample.equity();
        if eq > peak {
            peak = eq;
        } else if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
