//! ReplayLab Core — deterministic event-driven backtesting engine.
//!
//! This crate contains the simulation core:
//! - Domain types (bars, intents, positions, trades, instruments)
//! - Multi-instrument scheduler with a fixed, deterministic event order
//! - Order/position state machine with margin checks and FIFO netting
//! - Virtual account (balance, leverage, spread/commission cost model)
//! - Trade result aggregation as pure functions
//! - Strategy trait + compile-time registry, incremental indicators
//! - BLAKE3 run fingerprint for reproducibility checks

pub mod account;
pub mod config;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod indicators;
pub mod stats;
pub mod strategy;
