//! Order intents — what a strategy wants, before sizing and margin checks.

use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for long, -1.0 for short. Multiplies into PnL.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

/// How the order size is determined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Sizing {
    /// Caller-specified size, used verbatim.
    Fixed { size: f64 },
    /// Size derived from a fixed percentage of balance risked per trade and
    /// the stop distance. Requires a positive stop distance.
    Risk { risk_pc: f64 },
}

/// An order intent produced fresh each bar by the strategy adapter.
///
/// Intents are not persisted: the engine turns each into a PENDING position
/// (or a REJECTED one) and the intent itself is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    pub instrument: String,
    pub direction: Direction,
    pub sizing: Sizing,
    /// Stop distance in account-currency price units. `None` opens an
    /// unprotected position (no stop, no target).
    pub stop_distance: Option<f64>,
    /// Reward:risk ratio converting stop distance into target distance.
    pub reward_risk: f64,
}

impl OrderIntent {
    /// Risk-sized intent with a stop and derived target.
    pub fn risk(
        instrument: impl Into<String>,
        direction: Direction,
        risk_pc: f64,
        stop_distance: f64,
        reward_risk: f64,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            direction,
            sizing: Sizing::Risk { risk_pc },
            stop_distance: Some(stop_distance),
            reward_risk,
        }
    }

    /// Fixed-size intent.
    pub fn fixed(
        instrument: impl Into<String>,
        direction: Direction,
        size: f64,
        stop_distance: Option<f64>,
        reward_risk: f64,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            direction,
            sizing: Sizing::Fixed { size },
            stop_distance,
            reward_risk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_sign() {
        assert_eq!(Direction::Long.sign(), 1.0);
        assert_eq!(Direction::Short.sign(), -1.0);
    }

    #[test]
    fn direction_opposite() {
        assert_eq!(Direction::Long.opposite(), Direction::Short);
        assert_eq!(Direction::Short.opposite(), Direction::Long);
    }

    #[test]
    fn risk_intent_carries_stop() {
        let intent = OrderIntent::risk("EUR_USD", Direction::Long, 1.5, 0.002, 1.5);
        assert_eq!(intent.stop_distance, Some(0.002));
        assert!(matches!(intent.sizing, Sizing::Risk { risk_pc } if risk_pc == 1.5));
    }
}
