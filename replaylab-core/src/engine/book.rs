//! Position book — the order/position state machine.
//!
//! Owns every position for the run in an arena indexed by `PositionId`.
//! All account mutation (margin, commission, realized PnL) happens inside the
//! transition methods here, so the balance/margin invariants hold after every
//! call, never just at bar boundaries.
//!
//! Fill convention: PENDING positions fill at the processed bar's open with
//! half the configured spread applied against the position. Exits fill at the
//! breached level. When one bar breaches both stop and target, the stop is
//! assumed to execute first.

use chrono::{DateTime, Utc};

use crate::account::VirtualAccount;
use crate::domain::{
    Direction, IdGen, OrderIntent, Position, PositionId, PositionState, RejectReason, Trade,
};
use crate::engine::sizing::{protective_levels, SizedOrder};

pub struct PositionBook {
    arena: Vec<Position>,
    id_gen: IdGen,
}

impl PositionBook {
    pub fn new() -> Self {
        Self {
            arena: Vec::new(),
            id_gen: IdGen::default(),
        }
    }

    /// Submit a sized order as a PENDING position; it fills at the next
    /// processed bar's open for its instrument.
    ///
    /// With hedging disabled, an opposite-direction submission supersedes any
    /// still-PENDING positions on the instrument: they are cancelled before
    /// the new one queues.
    pub fn submit(
        &mut self,
        order: SizedOrder,
        hedging_enabled: bool,
        time: DateTime<Utc>,
    ) -> PositionId {
        if !hedging_enabled {
            let opposite = order.intent.direction.opposite();
            let stale: Vec<usize> = self
                .arena
                .iter()
                .enumerate()
                .filter(|(_, p)| {
                    p.is_pending()
                        && p.instrument == order.intent.instrument
                        && p.direction == opposite
                })
                .map(|(i, _)| i)
                .collect();
            for i in stale {
                self.arena[i]
                    .transition(PositionState::Cancelled {
                        reason: "superseded by opposite intent".into(),
                    })
                    .expect("pending position accepts cancellation");
            }
        }

        let id = self.id_gen.next_position_id();
        self.arena.push(Position {
            id,
            instrument: order.intent.instrument.clone(),
            direction: order.intent.direction,
            size: order.size,
            stop_distance: order.intent.stop_distance,
            reward_risk: order.intent.reward_risk,
            submitted_time: time,
            entry_price: None,
            entry_time: None,
            stop_level: None,
            target_level: None,
            state: PositionState::Pending,
        });
        id
    }

    /// Record a sizing failure as a REJECTED position so no order is silently
    /// dropped.
    pub fn record_rejected_intent(
        &mut self,
        intent: &OrderIntent,
        reason: RejectReason,
        time: DateTime<Utc>,
    ) -> PositionId {
        let id = self.id_gen.next_position_id();
        self.arena.push(Position {
            id,
            instrument: intent.instrument.clone(),
            direction: intent.direction,
            size: 0.0,
            stop_distance: intent.stop_distance,
            reward_risk: intent.reward_risk,
            submitted_time: time,
            entry_price: None,
            entry_time: None,
            stop_level: None,
            target_level: None,
            state: PositionState::Rejected { reason },
        });
        id
    }

    /// Fill every PENDING position on `instrument` at this bar's open.
    ///
    /// With hedging disabled the fill first nets against opposite OPEN
    /// positions FIFO by entry time; only the residual is margined and opened.
    /// Margin shortfalls reject; a fully-netted fill leaves no new position.
    pub fn fill_pending(
        &mut self,
        account: &mut VirtualAccount,
        instrument: &str,
        bar_open: f64,
        time: DateTime<Utc>,
        trades: &mut Vec<Trade>,
    ) {
        let pending: Vec<usize> = self
            .arena
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_pending() && p.instrument == instrument)
            .map(|(i, _)| i)
            .collect();

        for idx in pending {
            let direction = self.arena[idx].direction;
            let fill_price = account.entry_fill_price(bar_open, direction);
            let mut remaining = self.arena[idx].size;

            if !account.hedging_enabled {
                remaining = self.net_against_open(account, idx, fill_price, time, trades);
            }

            if remaining <= 0.0 {
                self.arena[idx]
                    .transition(PositionState::Cancelled {
                        reason: "fully netted against open positions".into(),
                    })
                    .expect("pending position accepts cancellation");
                continue;
            }

            let notional = remaining * fill_price;
            if !account.can_open(notional) {
                self.arena[idx]
                    .transition(PositionState::Rejected {
                        reason: RejectReason::InsufficientMargin,
                    })
                    .expect("pending position accepts rejection");
                continue;
            }

            account.reserve_margin(notional);
            let (stop, target) = protective_levels(
                fill_price,
                direction,
                self.arena[idx].stop_distance,
                self.arena[idx].reward_risk,
            );
            let pos = &mut self.arena[idx];
            pos.size = remaining;
            pos.entry_price = Some(fill_price);
            pos.entry_time = Some(time);
            pos.stop_level = stop;
            pos.target_level = target;
            pos.transition(PositionState::Open)
                .expect("pending position accepts fill");
        }
    }

    /// Net a filling position against opposite OPEN positions, FIFO by entry
    /// time (id order equals submission order equals entry order here).
    /// Returns the residual size still to be opened.
    fn net_against_open(
        &mut self,
        account: &mut VirtualAccount,
        filling_idx: usize,
        fill_price: f64,
        time: DateTime<Utc>,
        trades: &mut Vec<Trade>,
    ) -> f64 {
        let instrument = self.arena[filling_idx].instrument.clone();
        let opposite = self.arena[filling_idx].direction.opposite();
        let mut remaining = self.arena[filling_idx].size;

        let targets: Vec<usize> = self
            .arena
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_open() && p.instrument == instrument && p.direction == opposite)
            .map(|(i, _)| i)
            .collect();

        for idx in targets {
            if remaining <= 0.0 {
                break;
            }
            let closable = self.arena[idx].size.min(remaining);
            self.close_portion(account, idx, closable, fill_price, time, trades);
            remaining -= closable;
        }
        remaining
    }

    /// Sweep OPEN positions on `instrument` against this bar's range.
    ///
    /// Stop first when both levels sit inside the bar: the conservative
    /// tie-break that keeps backtested profitability honest.
    pub fn sweep_stop_target(
        &mut self,
        account: &mut VirtualAccount,
        instrument: &str,
        bar_high: f64,
        bar_low: f64,
        time: DateTime<Utc>,
        trades: &mut Vec<Trade>,
    ) {
        let open: Vec<usize> = self
            .arena
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_open() && p.instrument == instrument)
            .map(|(i, _)| i)
            .collect();

        for idx in open {
            let pos = &self.arena[idx];
            let (stop, target) = (pos.stop_level, pos.target_level);

            let stop_hit = stop.is_some_and(|level| match pos.direction {
                Direction::Long => bar_low <= level,
                Direction::Short => bar_high >= level,
            });
            let target_hit = target.is_some_and(|level| match pos.direction {
                Direction::Long => bar_high >= level,
                Direction::Short => bar_low <= level,
            });

            let exit_level = match (stop_hit, target_hit) {
                (true, _) => stop,
                (false, true) => target,
                (false, false) => None,
            };

            if let Some(level) = exit_level {
                let size = self.arena[idx].size;
                self.close_portion(account, idx, size, level, time, trades);
            }
        }
    }

    /// Close `quantity` of an OPEN position at `exit_price`.
    ///
    /// Realized PnL, per-side commissions and margin release apply to the
    /// account atomically with the transition; the Trade record is emitted in
    /// the same step. A partial quantity leaves the position OPEN with the
    /// residual size.
    fn close_portion(
        &mut self,
        account: &mut VirtualAccount,
        idx: usize,
        quantity: f64,
        exit_price: f64,
        time: DateTime<Utc>,
        trades: &mut Vec<Trade>,
    ) {
        let (id, instrument, direction, entry_price, entry_time, full_size) = {
            let pos = &self.arena[idx];
            (
                pos.id,
                pos.instrument.clone(),
                pos.direction,
                pos.entry_price.expect("open position has entry price"),
                pos.entry_time.expect("open position has entry time"),
                pos.size,
            )
        };

        let realized_pnl = (exit_price - entry_price) * quantity * direction.sign();
        let entry_commission = account.apply_commission(quantity * entry_price);
        let exit_commission = account.apply_commission(quantity * exit_price);
        account.realize(realized_pnl);
        account.release_margin(quantity * entry_price);

        if quantity >= full_size {
            self.arena[idx]
                .transition(PositionState::Closed)
                .expect("open position accepts close");
        } else {
            self.arena[idx].size = full_size - quantity;
        }

        trades.push(Trade {
            position_id: id,
            instrument,
            direction,
            entry_price,
            entry_time,
            exit_price,
            exit_time: time,
            size: quantity,
            realized_pnl,
            commission_paid: entry_commission + exit_commission,
        });
    }

    /// Cancel every still-PENDING position (end of run, or abort).
    pub fn cancel_all_pending(&mut self, reason: &str) {
        for pos in self.arena.iter_mut().filter(|p| p.is_pending()) {
            pos.transition(PositionState::Cancelled {
                reason: reason.into(),
            })
            .expect("pending position accepts cancellation");
        }
    }

    /// Mark-to-market PnL of all OPEN positions, priced per instrument.
    pub fn unrealized_pnl(&self, price_of: impl Fn(&str) -> Option<f64>) -> f64 {
        self.arena
            .iter()
            .filter(|p| p.is_open())
            .map(|p| match price_of(&p.instrument) {
                Some(price) => p.unrealized_pnl(price),
                None => 0.0,
            })
            .sum()
    }

    /// Snapshots of OPEN positions on an instrument, FIFO by entry.
    pub fn open_positions(&self, instrument: &str) -> Vec<Position> {
        self.arena
            .iter()
            .filter(|p| p.is_open() && p.instrument == instrument)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: PositionId) -> Option<&Position> {
        self.arena.get(id.0 as usize)
    }

    pub fn positions(&self) -> &[Position] {
        &self.arena
    }

    pub fn count_open(&self) -> usize {
        self.arena.iter().filter(|p| p.is_open()).count()
    }

    pub fn count_rejected(&self) -> usize {
        self.arena
            .iter()
            .filter(|p| matches!(p.state, PositionState::Rejected { .. }))
            .count()
    }

    pub fn count_cancelled(&self) -> usize {
        self.arena
            .iter()
            .filter(|p| matches!(p.state, PositionState::Cancelled { .. }))
            .count()
    }
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::new()
    }
}
