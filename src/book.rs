//! C2: counts-only, K-level limit order book.

use crate::error::{QrsdpError, Result};
use crate::rng::Rng;
use crate::types::{BookFeatures, BookState, EventType, Side};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub price_ticks: i32,
    pub depth: u32,
}

/// A simulated event with fully-resolved attributes, ready to `apply`.
#[derive(Debug, Clone, Copy)]
pub struct SimEvent {
    pub event_type: EventType,
    pub side: Side,
    pub price_ticks: i32,
    pub qty: u32,
}

/// Result of applying an event: whether it forced a shift, and on which
/// side. Used to set in-memory-only event flags; never persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOutcome {
    pub shift_up: bool,
    pub shift_down: bool,
}

pub struct OrderBook {
    levels_per_side: usize,
    bids: VecDeque<Level>,
    asks: VecDeque<Level>,
}

impl OrderBook {
    pub fn new(levels_per_side: usize) -> Self {
        OrderBook {
            levels_per_side,
            bids: VecDeque::with_capacity(levels_per_side),
            asks: VecDeque::with_capacity(levels_per_side),
        }
    }

    /// Initializes K bid and K ask levels so that `best_ask - best_bid ==
    /// initial_spread` exactly, not merely as a floor or average target.
    pub fn seed(&mut self, p0_ticks: i32, initial_spread: u32, initial_depth: u32) {
        self.bids.clear();
        self.asks.clear();
        let k = self.levels_per_side as i32;
        let half_spread_floor = (initial_spread as i32) / 2;
        let best_bid = p0_ticks - (initial_spread as i32 - half_spread_floor);
        let best_ask = best_bid + initial_spread as i32;
        for i in 0..k {
            self.bids.push_back(Level {
                price_ticks: best_bid - i,
                depth: initial_depth,
            });
            self.asks.push_back(Level {
                price_ticks: best_ask + i,
                depth: initial_depth,
            });
        }
    }

    pub fn levels_per_side(&self) -> usize {
        self.levels_per_side
    }

    pub fn best_bid(&self) -> i32 {
        self.bids[0].price_ticks
    }

    pub fn best_ask(&self) -> i32 {
        self.asks[0].price_ticks
    }

    pub fn best_bid_depth(&self) -> u32 {
        self.bids[0].depth
    }

    pub fn best_ask_depth(&self) -> u32 {
        self.asks[0].depth
    }

    pub fn close_mid_ticks(&self) -> i32 {
        (self.best_bid() + self.best_ask()) / 2
    }

    pub fn features(&self) -> BookFeatures {
        let total_bid_depth: u64 = self.bids.iter().map(|l| l.depth as u64).sum();
        let total_ask_depth: u64 = self.asks.iter().map(|l| l.depth as u64).sum();
        let bbd = self.best_bid_depth() as f64;
        let bad = self.best_ask_depth() as f64;
        let imbalance = if bbd + bad > 0.0 {
            (bbd - bad) / (bbd + bad)
        } else {
            0.0
        };
        BookFeatures {
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
            spread: self.best_ask() - self.best_bid(),
            best_bid_depth: self.best_bid_depth(),
            best_ask_depth: self.best_ask_depth(),
            imbalance,
            total_bid_depth,
            total_ask_depth,
        }
    }

    pub fn state(&self) -> BookState {
        BookState {
            features: self.features(),
            bid_depths: self.bids.iter().map(|l| l.depth).collect(),
            ask_depths: self.asks.iter().map(|l| l.depth).collect(),
        }
    }

    pub fn depth_at_level(&self, side: Side, level: usize) -> Option<u32> {
        match side {
            Side::Bid => self.bids.get(level).map(|l| l.depth),
            Side::Ask => self.asks.get(level).map(|l| l.depth),
            Side::Na => None,
        }
    }

    pub fn price_at_level(&self, side: Side, level: usize) -> Option<i32> {
        match side {
            Side::Bid => self.bids.get(level).map(|l| l.price_ticks),
            Side::Ask => self.asks.get(level).map(|l| l.price_ticks),
            Side::Na => None,
        }
    }

    /// Applies a resolved event, mutating the book in place. Returns the
    /// shift outcome on success. If the result would violate a book
    /// invariant, that is surfaced as an error so the producer can abort
    /// the session cleanly.
    pub fn apply(&mut self, ev: SimEvent, rng: &mut Rng, initial_depth: u32) -> Result<ApplyOutcome> {
        let mut outcome = ApplyOutcome::default();
        match ev.event_type {
            EventType::AddBid => self.add(Side::Bid, ev.price_ticks, ev.qty),
            EventType::AddAsk => self.add(Side::Ask, ev.price_ticks, ev.qty),
            EventType::CancelBid => {
                if self.cancel(Side::Bid, ev.price_ticks, ev.qty) {
                    self.shift_down(rng, initial_depth);
                    outcome.shift_down = true;
                }
            }
            EventType::CancelAsk => {
                if self.cancel(Side::Ask, ev.price_ticks, ev.qty) {
                    self.shift_up(rng, initial_depth);
                    outcome.shift_up = true;
                }
            }
            EventType::ExecuteBuy => {
                let depleted = self.decrement_best(Side::Ask, ev.qty);
                if depleted {
                    self.shift_up(rng, initial_depth);
                    outcome.shift_up = true;
                }
            }
            EventType::ExecuteSell => {
                let depleted = self.decrement_best(Side::Bid, ev.qty);
                if depleted {
                    self.shift_down(rng, initial_depth);
                    outcome.shift_down = true;
                }
            }
        }
        self.check_invariants()?;
        Ok(outcome)
    }

    fn add(&mut self, side: Side, price_ticks: i32, qty: u32) {
        let levels = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
            Side::Na => return,
        };
        let better = |p: i32, best: i32| match side {
            Side::Bid => p > best,
            _ => p < best,
        };
        if let Some(l) = levels.iter_mut().find(|l| l.price_ticks == price_ticks) {
            l.depth += qty;
            return;
        }
        let worst = levels.back().map(|l| l.price_ticks);
        let best = levels.front().map(|l| l.price_ticks);
        if let Some(best) = best {
            if better(price_ticks, best) {
                levels.push_front(Level { price_ticks, depth: qty });
                levels.pop_back();
                return;
            }
        }
        if let Some(worst) = worst {
            let outside = match side {
                Side::Bid => price_ticks < worst,
                _ => price_ticks > worst,
            };
            if outside {
                // Outside the modelled depth window: ignore.
                return;
            }
        }
        // Matches no existing level, between best and worst: shouldn't
        // happen given how AttributeSampler picks prices, but if it does,
        // drop it rather than violate the fixed-K invariant.
    }

    /// Returns true if the best level was emptied by this cancel.
    fn cancel(&mut self, side: Side, price_ticks: i32, qty: u32) -> bool {
        let levels = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
            Side::Na => return false,
        };
        let Some(idx) = levels.iter().position(|l| l.price_ticks == price_ticks) else {
            return false;
        };
        let l = &mut levels[idx];
        l.depth = l.depth.saturating_sub(qty.min(l.depth));
        idx == 0 && l.depth == 0
    }

    /// Returns true if the best level was emptied.
    fn decrement_best(&mut self, side: Side, qty: u32) -> bool {
        let levels = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
            Side::Na => return false,
        };
        let l = &mut levels[0];
        l.depth = l.depth.saturating_sub(qty.min(l.depth));
        l.depth == 0
    }

    fn shift_up(&mut self, rng: &mut Rng, initial_depth: u32) {
        self.asks.pop_front();
        let worst = self.asks.back().copied();
        let new_price = worst.map(|l| l.price_ticks + 1).unwrap_or(self.best_bid() + 1);
        let depth = (rng.next_poisson(initial_depth as f64).max(1)) as u32;
        self.asks.push_back(Level {
            price_ticks: new_price,
            depth,
        });
    }

    fn shift_down(&mut self, rng: &mut Rng, initial_depth: u32) {
        self.bids.pop_front();
        let worst = self.bids.back().copied();
        let new_price = worst.map(|l| l.price_ticks - 1).unwrap_or(self.best_ask() - 1);
        let depth = (rng.next_poisson(initial_depth as f64).max(1)) as u32;
        self.bids.push_back(Level {
            price_ticks: new_price,
            depth,
        });
    }

    fn check_invariants(&self) -> Result<()> {
        if self.bids.len() != self.levels_per_side || self.asks.len() != self.levels_per_side {
            return Err(QrsdpError::InvariantViolation(format!(
                "expected {} levels per side, got bids={} asks={}",
                self.levels_per_side,
                self.bids.len(),
                self.asks.len()
            )));
        }
        if self.best_bid() >= self.best_ask() {
            return Err(QrsdpError::InvariantViolation(format!(
                "best_bid {} >= best_ask {}",
                self.best_bid(),
                self.best_ask()
            )));
        }
        if self.best_ask() - self.best_bid() < 1 {
            return Err(QrsdpError::InvariantViolation("spread < 1 tick".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(levels: usize, p0: i32, spread: u32, depth: u32) -> OrderBook {
        let mut b = OrderBook::new(levels);
        b.seed(p0, spread, depth);
        b
    }

    #[test]
    fn seed_produces_exact_spread() {
        let b = fresh(5, 10_000, 2, 5);
        assert_eq!(b.best_ask() - b.best_bid(), 2);
        assert_eq!(b.close_mid_ticks(), (b.best_bid() + b.best_ask()) / 2);
        assert_eq!(b.bids.len(), 5);
        assert_eq!(b.asks.len(), 5);
        for l in b.bids.iter().chain(b.asks.iter()) {
            assert_eq!(l.depth, 5);
        }
    }

    #[test]
    fn execute_buy_depletes_best_ask_and_shifts() {
        let mut rng = Rng::new(1);
        let mut b = fresh(3, 10_000, 2, 5);
        let before_ask = b.best_ask();
        let before_depth = b.best_ask_depth();
        let outcome = b
            .apply(
                SimEvent {
                    event_type: EventType::ExecuteBuy,
                    side: Side::Na,
                    price_ticks: before_ask,
                    qty: before_depth,
                },
                &mut rng,
                5,
            )
            .unwrap();
        assert!(outcome.shift_up);
        assert!(b.best_ask() > before_ask);
        assert_eq!(b.asks.len(), 3);
    }

    #[test]
    fn execute_sell_depletes_best_bid_and_shifts() {
        let mut rng = Rng::new(2);
        let mut b = fresh(3, 10_000, 2, 5);
        let before_bid = b.best_bid();
        let before_depth = b.best_bid_depth();
        let outcome = b
            .apply(
                SimEvent {
                    event_type: EventType::ExecuteSell,
                    side: Side::Na,
                    price_ticks: before_bid,
                    qty: before_depth,
                },
                &mut rng,
                5,
            )
            .unwrap();
        assert!(outcome.shift_down);
        assert!(b.best_bid() < before_bid);
    }

    #[test]
    fn partial_execute_does_not_shift() {
        let mut rng = Rng::new(3);
        let mut b = fresh(3, 10_000, 2, 5);
        let before_ask = b.best_ask();
        b.apply(
            SimEvent {
                event_type: EventType::ExecuteBuy,
                side: Side::Na,
                price_ticks: before_ask,
                qty: 1,
            },
            &mut rng,
            5,
        )
        .unwrap();
        assert_eq!(b.best_ask(), before_ask);
        assert_eq!(b.best_ask_depth(), 4);
    }

    #[test]
    fn add_inside_spread_prepends_level() {
        let mut rng = Rng::new(4);
        let mut b = fresh(3, 10_000, 4, 5);
        let improved = b.best_bid() + 1;
        b.apply(
            SimEvent {
                event_type: EventType::AddBid,
                side: Side::Bid,
                price_ticks: improved,
                qty: 2,
            },
            &mut rng,
            5,
        )
        .unwrap();
        assert_eq!(b.best_bid(), improved);
        assert_eq!(b.bids.len(), 3);
    }

    #[test]
    fn cancel_non_best_level_persists_at_zero() {
        let mut rng = Rng::new(5);
        let mut b = fresh(3, 10_000, 2, 5);
        let mid_price = b.bids[1].price_ticks;
        b.apply(
            SimEvent {
                event_type: EventType::CancelBid,
                side: Side::Bid,
                price_ticks: mid_price,
                qty: 5,
            },
            &mut rng,
            5,
        )
        .unwrap();
        assert_eq!(b.bids[1].depth, 0);
        assert_eq!(b.bids.len(), 3);
    }

    #[test]
    fn invariants_hold_after_many_random_events() {
        let mut rng = Rng::new(42);
        let mut b = fresh(5, 10_000, 2, 5);
        for i in 0..2000 {
            let ev = match i % 4 {
                0 => SimEvent {
                    event_type: EventType::ExecuteBuy,
                    side: Side::Na,
                    price_ticks: b.best_ask(),
                    qty: b.best_ask_depth(),
                },
                1 => SimEvent {
                    event_type: EventType::ExecuteSell,
                    side: Side::Na,
                    price_ticks: b.best_bid(),
                    qty: b.best_bid_depth(),
                },
                2 => SimEvent {
                    event_type: EventType::AddBid,
                    side: Side::Bid,
                    price_ticks: b.best_bid() - 1,
                    qty: 3,
                },
                _ => SimEvent {
                    event_type: EventType::AddAsk,
                    side: Side::Ask,
                    price_ticks: b.best_ask() + 1,
                    qty: 3,
                },
            };
            b.apply(ev, &mut rng, 5).unwrap();
            assert!(b.best_bid() < b.best_ask());
            assert_eq!(b.bids.len(), 5);
            assert_eq!(b.asks.len(), 5);
        }
    }
}
