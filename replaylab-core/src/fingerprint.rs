//! Deterministic run fingerprint.
//!
//! BLAKE3 over the canonical JSON of the configuration plus a content digest
//! of the bar data, in watchlist order. Identical inputs produce an identical
//! fingerprint across runs and platforms, which makes the determinism
//! requirement checkable instead of hoped-for.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::BacktestConfig;
use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub config_hash: String,
    pub dataset_hash: String,
}

impl RunFingerprint {
    pub fn compute(config: &BacktestConfig, data: &HashMap<String, Vec<Bar>>) -> Self {
        Self {
            config_hash: config_hash(config),
            dataset_hash: dataset_hash(&config.strategy.watchlist, data),
        }
    }

    /// Combined run hash.
    pub fn hash(&self) -> String {
        let canonical = json!({
            "config_hash": &self.config_hash,
            "dataset_hash": &self.dataset_hash,
        });
        blake3::hash(canonical.to_string().as_bytes())
            .to_hex()
            .to_string()
    }
}

fn config_hash(config: &BacktestConfig) -> String {
    // Struct field order is fixed and params is a BTreeMap, so this
    // serialization is canonical.
    let text = serde_json::to_string(config).expect("config serializes");
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

fn dataset_hash(watchlist: &[String], data: &HashMap<String, Vec<Bar>>) -> String {
    let mut hasher = blake3::Hasher::new();
    for instrument in watchlist {
        hasher.update(instrument.as_bytes());
        if let Some(bars) = data.get(instrument) {
            for bar in bars {
                hasher.update(&bar.timestamp.timestamp().to_le_bytes());
                for value in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
                    hasher.update(&value.to_bits().to_le_bytes());
                }
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}
