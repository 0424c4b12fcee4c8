//! C5: `AttributeSampler` — given an event type and book, chooses the
//! side/price level/quantity for the event the producer is about to apply.

use crate::book::{OrderBook, SimEvent};
use crate::rng::Rng;
use crate::sampler::EventSampler;
use crate::types::{EventType, Side};

#[derive(Debug, Clone, Copy)]
pub struct AttributeSampler {
    /// Geometric decay rate for unconditioned ADD level choice.
    pub alpha: f64,
    /// Spread-improvement coefficient; 0 disables inside-spread quotes.
    pub spread_improve_coeff: f64,
}

impl Default for AttributeSampler {
    fn default() -> Self {
        AttributeSampler {
            alpha: 0.6,
            spread_improve_coeff: 0.1,
        }
    }
}

impl AttributeSampler {
    /// Quantity is always 1 (unit-size policy; a deliberate simplification).
    const QTY: u32 = 1;

    pub fn sample(
        &self,
        event_type: EventType,
        book: &OrderBook,
        rng: &mut Rng,
        level_hint: Option<usize>,
    ) -> SimEvent {
        match event_type {
            EventType::AddBid => self.sample_add(Side::Bid, book, rng, level_hint),
            EventType::AddAsk => self.sample_add(Side::Ask, book, rng, level_hint),
            EventType::CancelBid => self.sample_cancel(Side::Bid, book, rng, level_hint),
            EventType::CancelAsk => self.sample_cancel(Side::Ask, book, rng, level_hint),
            EventType::ExecuteBuy => SimEvent {
                event_type,
                side: Side::Na,
                price_ticks: book.best_ask(),
                qty: Self::QTY,
            },
            EventType::ExecuteSell => SimEvent {
                event_type,
                side: Side::Na,
                price_ticks: book.best_bid(),
                qty: Self::QTY,
            },
        }
    }

    fn sample_add(&self, side: Side, book: &OrderBook, rng: &mut Rng, level_hint: Option<usize>) -> SimEvent {
        let event_type = match side {
            Side::Bid => EventType::AddBid,
            _ => EventType::AddAsk,
        };
        let spread = book.best_ask() - book.best_bid();
        if level_hint.is_none() && self.spread_improve_coeff > 0.0 && spread > 1 {
            let p = (((spread - 1) as f64) * self.spread_improve_coeff).min(1.0);
            if rng.next_f64() < p {
                let price = match side {
                    Side::Bid => book.best_bid() + 1,
                    _ => book.best_ask() - 1,
                };
                return SimEvent {
                    event_type,
                    side,
                    price_ticks: price,
                    qty: Self::QTY,
                };
            }
        }
        let k = level_hint.unwrap_or_else(|| self.geometric_level(rng, book.levels_per_side()));
        let price = book
            .price_at_level(side, k)
            .unwrap_or_else(|| book.price_at_level(side, 0).unwrap());
        SimEvent {
            event_type,
            side,
            price_ticks: price,
            qty: Self::QTY,
        }
    }

    fn sample_cancel(&self, side: Side, book: &OrderBook, rng: &mut Rng, level_hint: Option<usize>) -> SimEvent {
        let event_type = match side {
            Side::Bid => EventType::CancelBid,
            _ => EventType::CancelAsk,
        };
        let k = level_hint.unwrap_or_else(|| {
            let weights: Vec<f64> = (0..book.levels_per_side())
                .map(|i| book.depth_at_level(side, i).unwrap_or(0) as f64)
                .collect();
            EventSampler::sample_index_from_weights(rng, &weights)
        });
        let price = book
            .price_at_level(side, k)
            .unwrap_or_else(|| book.price_at_level(side, 0).unwrap());
        SimEvent {
            event_type,
            side,
            price_ticks: price,
            qty: Self::QTY,
        }
    }

    /// Level `k` chosen with probability proportional to `exp(-alpha*k)`.
    fn geometric_level(&self, rng: &mut Rng, levels_per_side: usize) -> usize {
        let weights: Vec<f64> = (0..levels_per_side).map(|k| (-self.alpha * k as f64).exp()).collect();
        EventSampler::sample_index_from_weights(rng, &weights)
    }
}
