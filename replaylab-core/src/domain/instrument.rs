//! Instrument metadata: minimum tradable unit and size rounding.

use serde::{Deserialize, Serialize};

/// Tradable instrument metadata.
///
/// `min_unit` is the minimum tradable size increment (1.0 for unit-sized
/// instruments, e.g. 1000.0 for FX micro-lots). Risk-based sizes are floored
/// to a multiple of it; an explicit fixed size is used verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub min_unit: f64,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, min_unit: f64) -> Self {
        Self {
            symbol: symbol.into(),
            min_unit,
        }
    }

    /// Unit-sized instrument (min_unit = 1.0).
    pub fn units(symbol: impl Into<String>) -> Self {
        Self::new(symbol, 1.0)
    }

    /// Floor a raw size down to a multiple of the minimum tradable unit.
    pub fn floor_size(&self, size: f64) -> f64 {
        if self.min_unit <= 0.0 {
            return size;
        }
        (size / self.min_unit).floor() * self.min_unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_size_to_unit() {
        let inst = Instrument::units("EUR_USD");
        assert_eq!(inst.floor_size(153.7), 153.0);
    }

    #[test]
    fn floor_size_to_lot() {
        let inst = Instrument::new("EUR_USD", 1000.0);
        assert_eq!(inst.floor_size(2499.0), 2000.0);
        assert_eq!(inst.floor_size(999.0), 0.0);
    }

    #[test]
    fn floor_size_exact_multiple_unchanged() {
        let inst = Instrument::new("EUR_USD", 1000.0);
        assert_eq!(inst.floor_size(3000.0), 3000.0);
    }
}
