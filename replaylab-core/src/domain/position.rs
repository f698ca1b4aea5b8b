//! Position — the order/position state machine's unit of state.

use super::ids::PositionId;
use super::intent::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a PENDING position was rejected instead of filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Required margin exceeds free margin at fill time.
    InsufficientMargin,
    /// Risk-based sizing with a non-positive stop distance.
    InvalidStopDistance,
    /// Sizing rounded down to zero at the instrument's minimum unit.
    ZeroSize,
}

/// Position lifecycle states.
///
/// Transitions are monotonic: PENDING → OPEN → CLOSED, PENDING → REJECTED,
/// PENDING/OPEN → CANCELLED. Terminal states are never left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositionState {
    /// Submitted, fills at the next bar's open.
    Pending,
    /// Filled and margined; live against stop/target sweeps.
    Open,
    /// Exited; a Trade record exists for it.
    Closed,
    /// Never filled (margin or sizing), with the reason.
    Rejected { reason: RejectReason },
    /// Withdrawn before or after fill (netting, end of run), with a reason.
    Cancelled { reason: String },
}

impl PositionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PositionState::Pending | PositionState::Open)
    }
}

#[derive(Debug, Error)]
#[error("position {id}: illegal transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub id: PositionId,
    pub from: PositionState,
    pub to: PositionState,
}

/// A simulated position, owned exclusively by the position book and referenced
/// by id elsewhere.
///
/// `entry_price`, `entry_time`, `stop_level` and `target_level` are set at
/// fill time: levels are anchored at the actual spread-adjusted fill price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub instrument: String,
    pub direction: Direction,
    /// Requested size while PENDING; remaining live size once OPEN.
    pub size: f64,
    pub stop_distance: Option<f64>,
    pub reward_risk: f64,
    pub submitted_time: DateTime<Utc>,
    pub entry_price: Option<f64>,
    pub entry_time: Option<DateTime<Utc>>,
    pub stop_level: Option<f64>,
    pub target_level: Option<f64>,
    pub state: PositionState,
}

impl Position {
    /// Transition the state machine, enforcing monotonicity.
    pub fn transition(&mut self, to: PositionState) -> Result<(), TransitionError> {
        let legal = matches!(
            (&self.state, &to),
            (PositionState::Pending, PositionState::Open)
                | (PositionState::Pending, PositionState::Rejected { .. })
                | (PositionState::Pending, PositionState::Cancelled { .. })
                | (PositionState::Open, PositionState::Closed)
                | (PositionState::Open, PositionState::Cancelled { .. })
        );
        if !legal {
            return Err(TransitionError {
                id: self.id,
                from: self.state.clone(),
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.state == PositionState::Open
    }

    pub fn is_pending(&self) -> bool {
        self.state == PositionState::Pending
    }

    /// Mark-to-market PnL of an OPEN position at the given price.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.entry_price {
            Some(entry) => (price - entry) * self.size * self.direction.sign(),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pending_position() -> Position {
        Position {
            id: PositionId(0),
            instrument: "EUR_USD".into(),
            direction: Direction::Long,
            size: 1000.0,
            stop_distance: Some(0.002),
            reward_risk: 1.5,
            submitted_time: Utc.with_ymd_and_hms(2021, 1, 4, 0, 0, 0).unwrap(),
            entry_price: None,
            entry_time: None,
            stop_level: None,
            target_level: None,
            state: PositionState::Pending,
        }
    }

    #[test]
    fn pending_to_open_to_closed() {
        let mut pos = pending_position();
        assert!(pos.transition(PositionState::Open).is_ok());
        assert!(pos.transition(PositionState::Closed).is_ok());
    }

    #[test]
    fn pending_to_rejected_is_terminal() {
        let mut pos = pending_position();
        pos.transition(PositionState::Rejected {
            reason: RejectReason::InsufficientMargin,
        })
        .unwrap();
        assert!(pos.state.is_terminal());
        assert!(pos.transition(PositionState::Open).is_err());
    }

    #[test]
    fn closed_is_never_revisited() {
        let mut pos = pending_position();
        pos.transition(PositionState::Open).unwrap();
        pos.transition(PositionState::Closed).unwrap();
        assert!(pos.transition(PositionState::Open).is_err());
        assert!(pos
            .transition(PositionState::Cancelled {
                reason: "late cancel".into()
            })
            .is_err());
    }

    #[test]
    fn open_cannot_be_rejected() {
        let mut pos = pending_position();
        pos.transition(PositionState::Open).unwrap();
        assert!(pos
            .transition(PositionState::Rejected {
                reason: RejectReason::ZeroSize
            })
            .is_err());
    }

    #[test]
    fn unrealized_pnl_signed_by_direction() {
        let mut long = pending_position();
        long.entry_price = Some(1.2000);
        assert!((long.unrealized_pnl(1.2100) - 10.0).abs() < 1e-9);

        let mut short = pending_position();
        short.direction = Direction::Short;
        short.entry_price = Some(1.2000);
        assert!((short.unrealized_pnl(1.2100) + 10.0).abs() < 1e-9);
    }
}
