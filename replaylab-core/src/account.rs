//! Virtual account — balance, leverage, margin and the cost model.
//!
//! All mutation is serialized through the position book's transition logic;
//! there are no concurrent writers. Balance changes only when a position
//! closes; margin_used changes on open and close.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AccountConfig;

/// The simulated brokerage account, a singleton for the run.
#[derive(Debug, Clone)]
pub struct VirtualAccount {
    balance: f64,
    pub leverage: f64,
    pub spread: f64,
    /// Commission as a fraction of notional, charged per side.
    pub commission_rate: f64,
    pub hedging_enabled: bool,
    margin_used: f64,
    commission_total: f64,
}

impl VirtualAccount {
    pub fn new(config: &AccountConfig) -> Self {
        Self {
            balance: config.initial_balance,
            leverage: config.leverage,
            spread: config.spread,
            commission_rate: config.commission_rate,
            hedging_enabled: config.hedging_enabled,
            margin_used: 0.0,
            commission_total: 0.0,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn margin_used(&self) -> f64 {
        self.margin_used
    }

    /// Commission paid over the whole run so far.
    pub fn commission_total(&self) -> f64 {
        self.commission_total
    }

    /// Margin that must be reserved to carry the given notional.
    pub fn required_margin(&self, notional: f64) -> f64 {
        notional / self.leverage
    }

    /// Margin headroom: `balance * leverage - margin_used`.
    pub fn free_margin(&self) -> f64 {
        self.balance * self.leverage - self.margin_used
    }

    /// Whether a position of the given notional can be margined right now.
    pub fn can_open(&self, notional: f64) -> bool {
        self.required_margin(notional) <= self.free_margin()
    }

    /// Reserve margin for a newly opened notional.
    pub fn reserve_margin(&mut self, notional: f64) {
        self.margin_used += self.required_margin(notional);
    }

    /// Release the margin held against a closing notional.
    pub fn release_margin(&mut self, notional: f64) {
        self.margin_used = (self.margin_used - self.required_margin(notional)).max(0.0);
    }

    /// Charge commission on a fill notional. Returns the amount charged.
    pub fn apply_commission(&mut self, notional: f64) -> f64 {
        let commission = notional * self.commission_rate;
        self.balance -= commission;
        self.commission_total += commission;
        commission
    }

    /// Realize a closed trade's PnL into the balance.
    pub fn realize(&mut self, pnl: f64) {
        self.balance += pnl;
    }

    /// Half-spread-adjusted fill price: longs pay the ask, shorts receive the bid.
    pub fn entry_fill_price(&self, raw_open: f64, direction: crate::domain::Direction) -> f64 {
        match direction {
            crate::domain::Direction::Long => raw_open + self.spread / 2.0,
            crate::domain::Direction::Short => raw_open - self.spread / 2.0,
        }
    }
}

/// One equity observation, appended once per processed bar event.
///
/// Invariant at every sample: `balance + unrealized_pnl` equals the
/// mark-to-market equity of the account plus open positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquitySample {
    pub timestamp: DateTime<Utc>,
    pub balance: f64,
    pub unrealized_pnl: f64,
}

impl EquitySample {
    pub fn equity(&self) -> f64 {
        self.balance + self.unrealized_pnl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    fn account() -> VirtualAccount {
        VirtualAccount::new(&AccountConfig {
            initial_balance: 1000.0,
            leverage: 30.0,
            spread: 0.0001,
            commission_rate: 0.005,
            hedging_enabled: true,
        })
    }

    #[test]
    fn free_margin_shrinks_on_reserve() {
        let mut acct = account();
        assert_eq!(acct.free_margin(), 30_000.0);
        acct.reserve_margin(3000.0);
        assert_eq!(acct.margin_used(), 100.0);
        assert_eq!(acct.free_margin(), 29_900.0);
    }

    #[test]
    fn can_open_respects_headroom() {
        let mut acct = account();
        assert!(acct.can_open(30_000.0 * 30.0)); // exactly at the cap
        acct.reserve_margin(30_000.0 * 30.0);
        assert!(!acct.can_open(30.0)); // 1 unit of margin over
    }

    #[test]
    fn release_matches_reserve() {
        let mut acct = account();
        acct.reserve_margin(6000.0);
        acct.release_margin(6000.0);
        assert_eq!(acct.margin_used(), 0.0);
    }

    #[test]
    fn commission_reduces_balance() {
        let mut acct = account();
        let charged = acct.apply_commission(2000.0);
        assert!((charged - 10.0).abs() < 1e-12);
        assert!((acct.balance() - 990.0).abs() < 1e-12);
        assert!((acct.commission_total() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn realize_moves_balance_both_ways() {
        let mut acct = account();
        acct.realize(25.0);
        acct.realize(-40.0);
        assert!((acct.balance() - 985.0).abs() < 1e-12);
    }

    #[test]
    fn entry_fill_price_half_spread_per_side() {
        let acct = account();
        assert!((acct.entry_fill_price(1.2000, Direction::Long) - 1.20005).abs() < 1e-12);
        assert!((acct.entry_fill_price(1.2000, Direction::Short) - 1.19995).abs() < 1e-12);
    }

    #[test]
    fn equity_sample_sum() {
        let sample = EquitySample {
            timestamp: Utc::now(),
            balance: 1000.0,
            unrealized_pnl: -12.5,
        };
        assert!((sample.equity() - 987.5).abs() < 1e-12);
    }
}
