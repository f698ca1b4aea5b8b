//! Strategy adapter contract and registry.
//!
//! Strategies are trait objects built by `create_strategy` from a validated
//! `StrategyConfig` — a fixed compile-time registry, no runtime reflection.
//! One instance is created per watchlist instrument; incremental indicator
//! state lives inside the instance and is advanced once per bar.

pub mod macd;

pub use macd::MacdCrossover;

use thiserror::Error;

use crate::config::StrategyConfig;
use crate::domain::{Bar, Instrument, OrderIntent, Position};

/// What a strategy sees on each bar: causal history only, plus its open
/// positions. `bars` never extends past the bar being processed.
pub struct StrategyContext<'a> {
    pub instrument: &'a Instrument,
    /// History up to and including the current bar.
    pub bars: &'a [Bar],
    /// Open positions on this instrument, FIFO by entry (snapshots).
    pub open_positions: &'a [Position],
}

impl StrategyContext<'_> {
    /// The bar being processed.
    pub fn current_bar(&self) -> &Bar {
        self.bars.last().expect("context always holds >= 1 bar")
    }
}

/// An unrecoverable strategy failure. Aborts the run; the engine returns
/// whatever trade log and equity series exist so far as a partial result.
#[derive(Debug, Error)]
#[error("strategy failed at {instrument}: {message}")]
pub struct StrategyError {
    pub instrument: String,
    pub message: String,
}

/// The strategy adapter contract.
///
/// `on_bar` must not mutate simulation state — it only observes the context
/// and returns intents. Malformed intents are rejected downstream by sizing,
/// not here.
pub trait Strategy {
    fn name(&self) -> &str;

    fn on_bar(&mut self, ctx: &StrategyContext<'_>) -> Result<Vec<OrderIntent>, StrategyError>;
}

/// Errors that can occur during strategy construction.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
}

/// Build one strategy instance from a config. Call once per watchlist
/// instrument so each instance carries its own indicator state.
pub fn create_strategy(config: &StrategyConfig) -> Result<Box<dyn Strategy>, FactoryError> {
    match config.name.as_str() {
        "macd_crossover" => Ok(Box::new(MacdCrossover::from_config(config))),
        other => Err(FactoryError::UnknownStrategy(other.to_string())),
    }
}
