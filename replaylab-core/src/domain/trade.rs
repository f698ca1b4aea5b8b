//! Trade — an immutable closed-position record.

use super::ids::PositionId;
use super::intent::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed round trip: entry → exit.
///
/// Created exactly once, at the moment a position transitions to CLOSED.
/// A partial close from netting produces a Trade for the closed portion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub position_id: PositionId,
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_time: DateTime<Utc>,
    pub size: f64,
    pub realized_pnl: f64,
    /// Round-trip commission: entry side + exit side.
    pub commission_paid: f64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.realized_pnl > 0.0
    }

    /// PnL net of commission.
    pub fn net_pnl(&self) -> f64 {
        self.realized_pnl - self.commission_paid
    }
}
