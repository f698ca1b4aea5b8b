//! Multi-instrument scheduler — merges bar series into one global event
//! stream and drives the simulation.
//!
//! Events are ordered by timestamp; ties between instruments at the same
//! timestamp break by watchlist position. That fixed order is load-bearing:
//! the account's balance and margin are shared across instruments, so any
//! other interleaving changes sizing and fill/rejection outcomes.
//!
//! Per event, in order: fill pendings at the bar's open, invoke the strategy
//! on causal history, size and submit its intents, sweep stop/target breaches
//! against the bar's range, append an equity sample. The whole loop is
//! single-threaded and strictly sequential.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::account::{EquitySample, VirtualAccount};
use crate::config::{BacktestConfig, ConfigError};
use crate::domain::{validate_series, Bar, DataError, Trade};
use crate::engine::book::PositionBook;
use crate::engine::result::{BacktestReport, RunOutcome};
use crate::engine::sizing::size_intent;
use crate::fingerprint::RunFingerprint;
use crate::stats::{summarize, BookCounts};
use crate::strategy::{create_strategy, FactoryError, Strategy, StrategyContext};

/// Pre-run failures. Configuration and data problems fail fast and loudly;
/// nothing here can surface once the loop has started.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error("expected {expected} strategies for the watchlist, got {got}")]
    StrategyCount { expected: usize, got: usize },
}

/// Run a backtest, building one strategy instance per watchlist instrument
/// from the configured registry.
pub fn run_backtest(
    config: &BacktestConfig,
    data: &HashMap<String, Vec<Bar>>,
) -> Result<BacktestReport, RunError> {
    let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();
    for _ in &config.strategy.watchlist {
        strategies.push(create_strategy(&config.strategy)?);
    }
    run_backtest_with(config, data, &mut strategies)
}

/// Run a backtest with caller-supplied strategy instances, one per watchlist
/// entry in watchlist order.
pub fn run_backtest_with(
    config: &BacktestConfig,
    data: &HashMap<String, Vec<Bar>>,
    strategies: &mut [Box<dyn Strategy>],
) -> Result<BacktestReport, RunError> {
    config.validate()?;

    let watchlist = &config.strategy.watchlist;
    if strategies.len() != watchlist.len() {
        return Err(RunError::StrategyCount {
            expected: watchlist.len(),
            got: strategies.len(),
        });
    }

    // Validate and window every series before any simulation work.
    let mut series: Vec<&[Bar]> = Vec::with_capacity(watchlist.len());
    for instrument in watchlist {
        let bars = data
            .get(instrument)
            .ok_or_else(|| ConfigError::MissingData(instrument.clone()))?;
        validate_series(instrument, bars)?;
        let windowed = window(bars, config.start, config.end);
        if windowed.is_empty() {
            return Err(DataError::EmptySeries {
                instrument: instrument.clone(),
            }
            .into());
        }
        series.push(windowed);
    }

    let instruments: Vec<crate::domain::Instrument> =
        watchlist.iter().map(|s| config.instrument(s)).collect();

    let mut account = VirtualAccount::new(&config.account);
    let mut book = PositionBook::new();
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity: Vec<EquitySample> = Vec::new();
    let mut last_close: HashMap<String, f64> = HashMap::new();
    let mut cursors = vec![0usize; watchlist.len()];
    let mut outcome = RunOutcome::Completed;

    loop {
        // Next event: earliest timestamp; ties go to the lowest watchlist
        // index because `<` never replaces an equal best.
        let mut next: Option<(DateTime<Utc>, usize)> = None;
        for (k, &cursor) in cursors.iter().enumerate() {
            if cursor < series[k].len() {
                let ts = series[k][cursor].timestamp;
                if next.map_or(true, |(best, _)| ts < best) {
                    next = Some((ts, k));
                }
            }
        }
        let Some((clock, k)) = next else { break };

        let index = cursors[k];
        let bar = &series[k][index];
        let instrument = &instruments[k];

        // 1. Fill pending positions at this bar's open.
        book.fill_pending(&mut account, &instrument.symbol, bar.open, clock, &mut trades);

        // 2. Strategy sees history truncated at the current bar, plus its
        //    open positions. Never a bar beyond `index`.
        let open_positions = book.open_positions(&instrument.symbol);
        let ctx = StrategyContext {
            instrument,
            bars: &series[k][..=index],
            open_positions: &open_positions,
        };
        let intents = match strategies[k].on_bar(&ctx) {
            Ok(intents) => intents,
            Err(err) => {
                // Fatal: keep everything processed so far, mark partial.
                book.cancel_all_pending("run aborted");
                outcome = RunOutcome::Aborted {
                    reason: err.to_string(),
                };
                break;
            }
        };

        // 3. Size and submit. Sizing failures become REJECTED positions.
        for intent in &intents {
            match size_intent(intent, account.balance(), instrument) {
                Ok(sized) => {
                    book.submit(sized, account.hedging_enabled, clock);
                }
                Err(reason) => {
                    book.record_rejected_intent(intent, reason, clock);
                }
            }
        }

        // 4. Stop/target sweep against this bar's range.
        book.sweep_stop_target(
            &mut account,
            &instrument.symbol,
            bar.high,
            bar.low,
            clock,
            &mut trades,
        );

        // 5. Equity sample after all updates for the bar.
        last_close.insert(instrument.symbol.clone(), bar.close);
        let unrealized = book.unrealized_pnl(|sym| last_close.get(sym).copied());
        equity.push(EquitySample {
            timestamp: clock,
            balance: account.balance(),
            unrealized_pnl: unrealized,
        });

        cursors[k] += 1;
    }

    if outcome == RunOutcome::Completed {
        book.cancel_all_pending("run ended");
    }

    let counts = BookCounts {
        rejected: book.count_rejected(),
        cancelled: book.count_cancelled(),
        open: book.count_open(),
    };
    let summary = summarize(config.account.initial_balance, &trades, &equity, counts);
    let fingerprint = RunFingerprint::compute(config, data).hash();

    Ok(BacktestReport {
        summary,
        trades,
        equity,
        outcome,
        fingerprint,
    })
}

/// Slice a sorted series to `[start, end)`.
fn window(bars: &[Bar], start: DateTime<Utc>, end: DateTime<Utc>) -> &[Bar] {
    let lo = bars.partition_point(|b| b.timestamp < start);
    let hi = bars.partition_point(|b| b.timestamp < end);
    &bars[lo..hi]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(instrument: &str, day: u32, hour: u32) -> Bar {
        let close = 1.2;
        Bar {
            instrument: instrument.into(),
            timestamp: Utc.with_ymd_and_hms(2021, 6, day, hour, 0, 0).unwrap(),
            open: close,
            high: close + 0.001,
            low: close - 0.001,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn window_clips_to_range() {
        let bars = vec![bar("X", 1, 0), bar("X", 2, 0), bar("X", 3, 0)];
        let start = Utc.with_ymd_and_hms(2021, 6, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 6, 3, 0, 0, 0).unwrap();
        let clipped = window(&bars, start, end);
        assert_eq!(clipped.len(), 1);
        assert_eq!(clipped[0].timestamp, start);
    }

    #[test]
    fn window_can_be_empty() {
        let bars = vec![bar("X", 1, 0)];
        let start = Utc.with_ymd_and_hms(2021, 7, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 8, 1, 0, 0, 0).unwrap();
        assert!(window(&bars, start, end).is_empty());
    }
}
