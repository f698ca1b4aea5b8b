//! Run result types.
//!
//! An aborted run is data, not an escaping error: the report carries whatever
//! trade log and equity series existed when the loop stopped, with the
//! outcome marking it partial.

use serde::{Deserialize, Serialize};

use crate::account::EquitySample;
use crate::domain::Trade;
use crate::stats::TradeSummary;

/// How the run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// All instrument sequences were exhausted.
    Completed,
    /// A fatal strategy error stopped the loop early; state for
    /// already-processed bars is kept, nothing is rolled back.
    Aborted { reason: String },
}

/// Complete output of a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub summary: TradeSummary,
    pub trades: Vec<Trade>,
    pub equity: Vec<EquitySample>,
    pub outcome: RunOutcome,
    /// BLAKE3 hash of (configuration, dataset); equal inputs, equal hash.
    pub fingerprint: String,
}

impl BacktestReport {
    pub fn is_partial(&self) -> bool {
        matches!(self.outcome, RunOutcome::Aborted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_is_partial() {
        let outcome = RunOutcome::Aborted {
            reason: "strategy failed".into(),
        };
        assert!(matches!(outcome, RunOutcome::Aborted { .. }));
    }

    #[test]
    fn outcome_serialization_roundtrip() {
        let outcome = RunOutcome::Aborted {
            reason: "boom".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        let deser: RunOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(outcome, deser);
    }
}
