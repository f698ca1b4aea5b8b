//! Validated run configuration.
//!
//! Loosely-typed parameter maps from the outside world become explicit structs
//! here; `validate()` runs before any simulation work and every failure is a
//! `ConfigError` — no run is attempted on bad configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Account parameters for the virtual brokerage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub initial_balance: f64,
    pub leverage: f64,
    /// Full bid/ask spread in price units; half is applied per entry side.
    pub spread: f64,
    /// Commission as a fraction of notional, charged per side.
    pub commission_rate: f64,
    pub hedging_enabled: bool,
}

impl AccountConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_balance <= 0.0 {
            return Err(ConfigError::NonPositiveBalance(self.initial_balance));
        }
        if self.leverage <= 0.0 {
            return Err(ConfigError::NonPositiveLeverage(self.leverage));
        }
        if self.spread < 0.0 {
            return Err(ConfigError::NegativeSpread(self.spread));
        }
        if self.commission_rate < 0.0 {
            return Err(ConfigError::NegativeCommission(self.commission_rate));
        }
        Ok(())
    }
}

/// How the strategy sizes its orders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizingKind {
    Risk,
    Fixed,
}

/// Strategy descriptor: identifier, parameter map, watchlist.
///
/// `params` is a BTreeMap so canonical serialization (and the run fingerprint
/// derived from it) is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub watchlist: Vec<String>,
    pub sizing: SizingKind,
    /// Percent of balance risked per trade (risk sizing).
    #[serde(default)]
    pub risk_pc: f64,
    /// Explicit size (fixed sizing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_size: Option<f64>,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watchlist.is_empty() {
            return Err(ConfigError::EmptyWatchlist);
        }
        for (i, instrument) in self.watchlist.iter().enumerate() {
            if self.watchlist[..i].contains(instrument) {
                return Err(ConfigError::DuplicateWatchlistEntry(instrument.clone()));
            }
        }
        match self.sizing {
            SizingKind::Risk if self.risk_pc <= 0.0 => {
                Err(ConfigError::NonPositiveRisk(self.risk_pc))
            }
            SizingKind::Fixed if self.fixed_size.unwrap_or(0.0) <= 0.0 => {
                Err(ConfigError::MissingFixedSize)
            }
            _ => Ok(()),
        }
    }

    /// Named f64 parameter with a fallback.
    pub fn param(&self, name: &str, default: f64) -> f64 {
        self.params.get(name).copied().unwrap_or(default)
    }

    /// Named parameter coerced to usize with a fallback.
    pub fn param_usize(&self, name: &str, default: usize) -> usize {
        self.params
            .get(name)
            .copied()
            .map(|v| v as usize)
            .unwrap_or(default)
    }
}

/// Full run configuration: strategy + account + simulation window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub strategy: StrategyConfig,
    pub account: AccountConfig,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Minimum tradable unit per instrument; instruments not listed trade in
    /// whole units (1.0).
    #[serde(default)]
    pub min_units: BTreeMap<String, f64>,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.account.validate()?;
        self.strategy.validate()?;
        if self.start >= self.end {
            return Err(ConfigError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        for (instrument, &unit) in &self.min_units {
            if unit <= 0.0 {
                return Err(ConfigError::NonPositiveMinUnit {
                    instrument: instrument.clone(),
                    min_unit: unit,
                });
            }
        }
        Ok(())
    }

    /// Instrument metadata for a watchlist entry.
    pub fn instrument(&self, symbol: &str) -> crate::domain::Instrument {
        let min_unit = self.min_units.get(symbol).copied().unwrap_or(1.0);
        crate::domain::Instrument::new(symbol, min_unit)
    }
}

/// Invalid parameter combinations, raised before simulation start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("initial balance must be positive, got {0}")]
    NonPositiveBalance(f64),

    #[error("leverage must be positive, got {0}")]
    NonPositiveLeverage(f64),

    #[error("spread must be non-negative, got {0}")]
    NegativeSpread(f64),

    #[error("commission rate must be non-negative, got {0}")]
    NegativeCommission(f64),

    #[error("watchlist is empty")]
    EmptyWatchlist,

    #[error("watchlist lists {0} more than once")]
    DuplicateWatchlistEntry(String),

    #[error("risk_pc must be positive for risk sizing, got {0}")]
    NonPositiveRisk(f64),

    #[error("fixed sizing requires a positive fixed_size")]
    MissingFixedSize,

    #[error("start {start} is not before end {end}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("{instrument}: min_unit must be positive, got {min_unit}")]
    NonPositiveMinUnit { instrument: String, min_unit: f64 },

    #[error("watchlist instrument {0} has no bar series")]
    MissingData(String),
}
