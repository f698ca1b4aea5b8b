//! Sequential ids for arena-held positions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position id — an index-like handle into the position arena.
///
/// Positions are referenced by id everywhere outside the engine; no shared
/// mutable references to positions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Monotonic id generator. Ids are assigned in submission order, which makes
/// them a deterministic tiebreaker.
#[derive(Debug, Default, Clone)]
pub struct IdGen {
    next_position: u64,
}

impl IdGen {
    pub fn next_position_id(&mut self) -> PositionId {
        let id = PositionId(self.next_position);
        self.next_position += 1;
        id
    }
}
