//! Position sizing — turns an intent into a concrete order size.
//!
//! Risk-based sizing risks a fixed percentage of the current balance per
//! trade: `size = (balance * risk_pc / 100) / stop_distance`, floored to the
//! instrument's minimum tradable unit. Sizing failures are per-order and
//! non-fatal; the engine records them as REJECTED positions.

use crate::domain::{Instrument, OrderIntent, RejectReason, Sizing};

/// A sized order, ready for submission to the position book.
#[derive(Debug, Clone)]
pub struct SizedOrder {
    pub intent: OrderIntent,
    pub size: f64,
}

/// Size an intent against the current balance.
///
/// Returns the rejection reason for malformed intents: non-positive stop
/// distance under risk sizing, or a size that floors to zero.
pub fn size_intent(
    intent: &OrderIntent,
    balance: f64,
    instrument: &Instrument,
) -> Result<SizedOrder, RejectReason> {
    let size = match intent.sizing {
        Sizing::Fixed { size } => {
            if size <= 0.0 {
                return Err(RejectReason::ZeroSize);
            }
            // Caller-specified size is used verbatim, no unit rounding.
            size
        }
        Sizing::Risk { risk_pc } => {
            let stop_distance = match intent.stop_distance {
                Some(d) if d > 0.0 => d,
                _ => return Err(RejectReason::InvalidStopDistance),
            };
            let risk_amount = balance * risk_pc / 100.0;
            let raw = risk_amount / stop_distance;
            let floored = instrument.floor_size(raw);
            if floored <= 0.0 {
                return Err(RejectReason::ZeroSize);
            }
            floored
        }
    };

    Ok(SizedOrder {
        intent: intent.clone(),
        size,
    })
}

/// Stop and target levels anchored at the actual fill price.
///
/// Stop sits `stop_distance` against the position; the target sits
/// `stop_distance * reward_risk` in favor of it.
pub fn protective_levels(
    fill_price: f64,
    direction: crate::domain::Direction,
    stop_distance: Option<f64>,
    reward_risk: f64,
) -> (Option<f64>, Option<f64>) {
    match stop_distance {
        Some(d) if d > 0.0 => {
            let sign = direction.sign();
            let stop = fill_price - d * sign;
            let target = fill_price + d * reward_risk * sign;
            (Some(stop), Some(target))
        }
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    #[test]
    fn risk_sizing_formula() {
        // balance 1000, risk 1.5% = 15, stop 0.0025 -> 6000 units
        let intent = OrderIntent::risk("EUR_USD", Direction::Long, 1.5, 0.0025, 1.5);
        let sized = size_intent(&intent, 1000.0, &Instrument::units("EUR_USD")).unwrap();
        assert!((sized.size - 6000.0).abs() < 1e-9);
    }

    #[test]
    fn risk_sizing_floors_to_min_unit() {
        let intent = OrderIntent::risk("EUR_USD", Direction::Long, 1.0, 0.003, 1.5);
        // raw = 10 / 0.003 = 3333.33..., floored to 3000
        let sized = size_intent(&intent, 1000.0, &Instrument::new("EUR_USD", 1000.0)).unwrap();
        assert_eq!(sized.size, 3000.0);
    }

    #[test]
    fn non_positive_stop_rejected() {
        let intent = OrderIntent::risk("EUR_USD", Direction::Long, 1.0, 0.0, 1.5);
        assert_eq!(
            size_intent(&intent, 1000.0, &Instrument::units("EUR_USD")).unwrap_err(),
            RejectReason::InvalidStopDistance
        );

        let mut missing = intent;
        missing.stop_distance = None;
        assert_eq!(
            size_intent(&missing, 1000.0, &Instrument::units("EUR_USD")).unwrap_err(),
            RejectReason::InvalidStopDistance
        );
    }

    #[test]
    fn size_rounding_to_zero_rejected() {
        // raw = 10 / 0.02 = 500, floored at lot 1000 -> 0
        let intent = OrderIntent::risk("EUR_USD", Direction::Long, 1.0, 0.02, 1.5);
        assert_eq!(
            size_intent(&intent, 1000.0, &Instrument::new("EUR_USD", 1000.0)).unwrap_err(),
            RejectReason::ZeroSize
        );
    }

    #[test]
    fn fixed_size_used_verbatim() {
        let intent = OrderIntent::fixed("EUR_USD", Direction::Short, 1234.5, None, 1.5);
        let sized = size_intent(&intent, 1000.0, &Instrument::new("EUR_USD", 1000.0)).unwrap();
        assert_eq!(sized.size, 1234.5);
    }

    #[test]
    fn levels_signed_by_direction() {
        let (stop, target) = protective_levels(1.2000, Direction::Long, Some(0.0020), 1.5);
        assert!((stop.unwrap() - 1.1980).abs() < 1e-12);
        assert!((target.unwrap() - 1.2030).abs() < 1e-12);

        let (stop, target) = protective_levels(1.2000, Direction::Short, Some(0.0020), 1.5);
        assert!((stop.unwrap() - 1.2020).abs() < 1e-12);
        assert!((target.unwrap() - 1.1970).abs() < 1e-12);
    }

    #[test]
    fn no_stop_means_no_levels() {
        let (stop, target) = protective_levels(1.2, Direction::Long, None, 1.5);
        assert!(stop.is_none() && target.is_none());
    }
}
