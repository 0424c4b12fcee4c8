//! C6: the producer loop — competing-risk sampling tying together the RNG,
//! order book, intensity model, event sampler and attribute sampler into a
//! sequence of `EventRecord`s written to a sink.

use crate::attributes::AttributeSampler;
use crate::book::OrderBook;
use crate::error::Result;
use crate::model::IntensityModel;
use crate::rng::Rng;
use crate::sampler::EventSampler;
use crate::sink::EventSink;
use crate::types::{EventFlags, EventRecord, EventType, TradingSession};

/// Decodes a joint (type, level) index from a `4K+2`-length weight vector
/// in the order: add_bid[K], add_ask[K], cancel_bid[K], cancel_ask[K],
/// exec_buy, exec_sell.
fn decode_joint_index(idx: usize, k: usize) -> (EventType, Option<usize>) {
    if idx < k {
        (EventType::AddBid, Some(idx))
    } else if idx < 2 * k {
        (EventType::AddAsk, Some(idx - k))
    } else if idx < 3 * k {
        (EventType::CancelBid, Some(idx - 2 * k))
    } else if idx < 4 * k {
        (EventType::CancelAsk, Some(idx - 3 * k))
    } else if idx == 4 * k {
        (EventType::ExecuteBuy, None)
    } else {
        (EventType::ExecuteSell, None)
    }
}

pub struct SessionResult {
    pub close_ticks: i32,
    pub events_written: u64,
}

pub struct Producer {
    rng: Rng,
    book: OrderBook,
    model: Box<dyn IntensityModel>,
    attr_sampler: AttributeSampler,
    session: TradingSession,
    t_seconds: f64,
    next_order_id: u64,
    events_written: u64,
}

impl Producer {
    /// `startSession`: seeds the RNG and book from `session`, taking
    /// ownership of the intensity model for the session's lifetime.
    pub fn start_session(session: TradingSession, model: Box<dyn IntensityModel>) -> Self {
        let mut book = OrderBook::new(session.levels_per_side as usize);
        book.seed(session.p0_ticks, session.initial_spread_ticks, session.initial_depth);
        Producer {
            rng: Rng::new(session.seed),
            book,
            model,
            attr_sampler: AttributeSampler::default(),
            session,
            t_seconds: 0.0,
            next_order_id: 1,
            events_written: 0,
        }
    }

    pub fn events_written(&self) -> u64 {
        self.events_written
    }

    pub fn close_ticks(&self) -> i32 {
        self.book.close_mid_ticks()
    }

    /// Simulated-time clock, in seconds since market open. Used by realtime
    /// pacing in the session runner.
    pub fn elapsed_seconds(&self) -> f64 {
        self.t_seconds
    }

    /// Runs one competing-risk step. Returns `Ok(false)` once the session
    /// clock has been exhausted; no event is emitted on that final call.
    pub fn step_one_event(&mut self, sink: &mut dyn EventSink) -> Result<bool> {
        if self.t_seconds >= self.session.session_seconds as f64 {
            return Ok(false);
        }

        let state = self.book.state();
        let intensities = self.model.compute(&state)?;

        let dt = EventSampler::sample_delta_t(&mut self.rng, intensities.total());
        let t_new = self.t_seconds + dt;
        if t_new >= self.session.session_seconds as f64 {
            self.t_seconds = self.session.session_seconds as f64;
            return Ok(false);
        }

        let (event_type, level_hint) = match self.model.level_weights(&state) {
            Some(weights) => {
                let idx = EventSampler::sample_index_from_weights(&mut self.rng, &weights);
                decode_joint_index(idx, self.session.levels_per_side as usize)
            }
            None => (EventSampler::sample_type(&mut self.rng, &intensities), None),
        };

        let sim_event = self.attr_sampler.sample(event_type, &self.book, &mut self.rng, level_hint);
        let outcome = self.book.apply(sim_event, &mut self.rng, self.session.initial_depth)?;

        let mut flags = EventFlags::empty();
        if outcome.shift_up {
            flags.set(EventFlags::SHIFT_UP);
        }
        if outcome.shift_down {
            flags.set(EventFlags::SHIFT_DOWN);
        }

        let ts_ns = self.session.market_open_ns + (t_new * 1e9) as u64;
        let order_id = self.next_order_id;
        self.next_order_id += 1;

        let record = EventRecord {
            ts_ns,
            event_type: sim_event.event_type,
            side: sim_event.side,
            price_ticks: sim_event.price_ticks,
            qty: sim_event.qty,
            order_id,
            flags,
        };
        sink.append(&record)?;

        self.t_seconds = t_new;
        self.events_written += 1;
        Ok(true)
    }

    /// `runSession`: drives `step_one_event` to exhaustion, then flushes
    /// (but does not close) the sink.
    pub fn run_session(session: TradingSession, model: Box<dyn IntensityModel>, sink: &mut dyn EventSink) -> Result<SessionResult> {
        let mut producer = Producer::start_session(session, model);
        while producer.step_one_event(sink)? {}
        sink.flush()?;
        Ok(SessionResult {
            close_ticks: producer.close_ticks(),
            events_written: producer.events_written(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SimpleImbalance;
    use crate::model::{CurveIntensity};
    use crate::sink::InMemorySink;

    fn short_session() -> TradingSession {
        TradingSession {
            seed: 1,
            p0_ticks: 10_000,
            session_seconds: 5,
            levels_per_side: 5,
            tick_size: 100,
            initial_spread_ticks: 2,
            initial_depth: 5,
            market_open_ns: 0,
            chunk_capacity: 64,
        }
    }

    #[test]
    fn run_session_with_simple_model_emits_monotonic_timestamps() {
        let mut sink = InMemorySink::default();
        let result = Producer::run_session(short_session(), Box::new(SimpleImbalance::default()), &mut sink).unwrap();
        assert!(result.events_written > 0);
        assert_eq!(sink.records.len() as u64, result.events_written);
        let mut last_ts = 0u64;
        for r in &sink.records {
            assert!(r.ts_ns >= last_ts);
            last_ts = r.ts_ns;
        }
    }

    #[test]
    fn run_session_never_emits_past_session_end() {
        let mut sink = InMemorySink::default();
        let session = short_session();
        let session_ns = session.session_seconds as u64 * 1_000_000_000;
        Producer::run_session(session, Box::new(SimpleImbalance::default()), &mut sink).unwrap();
        for r in &sink.records {
            assert!(r.ts_ns < session_ns);
        }
    }

    #[test]
    fn step_one_event_returns_false_once_clock_is_exhausted() {
        let mut sink = InMemorySink::default();
        let mut producer = Producer::start_session(short_session(), Box::new(SimpleImbalance::default()));
        let mut last = true;
        let mut steps = 0;
        while last {
            last = producer.step_one_event(&mut sink).unwrap();
            steps += 1;
            assert!(steps < 1_000_000, "did not terminate");
        }
        assert_eq!(producer.step_one_event(&mut sink).unwrap(), false);
    }

    #[test]
    fn order_ids_are_unique_and_monotonic() {
        let mut sink = InMemorySink::default();
        Producer::run_session(short_session(), Box::new(SimpleImbalance::default()), &mut sink).unwrap();
        let mut last = 0u64;
        for r in &sink.records {
            assert!(r.order_id > last);
            last = r.order_id;
        }
    }

    #[test]
    fn close_ticks_matches_final_book_state() {
        let mut sink = InMemorySink::default();
        let result = Producer::run_session(short_session(), Box::new(SimpleImbalance::default()), &mut sink).unwrap();
        assert!(result.close_ticks > 0);
    }

    #[test]
    fn runs_with_curve_model_using_joint_level_sampling() {
        let mut sink = InMemorySink::default();
        let model = CurveIntensity::defaults(5, 5);
        let result = Producer::run_session(short_session(), Box::new(model), &mut sink).unwrap();
        assert!(result.events_written > 0);
    }

    #[test]
    fn decode_joint_index_covers_all_regions() {
        let k = 3;
        assert_eq!(decode_joint_index(0, k), (EventType::AddBid, Some(0)));
        assert_eq!(decode_joint_index(2, k), (EventType::AddBid, Some(2)));
        assert_eq!(decode_joint_index(3, k), (EventType::AddAsk, Some(0)));
        assert_eq!(decode_joint_index(6, k), (EventType::CancelBid, Some(0)));
        assert_eq!(decode_joint_index(9, k), (EventType::CancelAsk, Some(0)));
        assert_eq!(decode_joint_index(12, k), (EventType::ExecuteBuy, None));
        assert_eq!(decode_joint_index(13, k), (EventType::ExecuteSell, None));
    }
}
