use super::{validate_book_state, IntensityModel};
use crate::error::Result;
use crate::types::{BookState, Intensities};

/// 4.3.1 SimpleImbalance: a closed-form, imbalance- and spread-reactive
/// intensity model with no per-level structure.
#[derive(Debug, Clone, Copy)]
pub struct SimpleImbalance {
    pub base_l: f64,
    pub base_c: f64,
    pub base_m: f64,
    pub s_i: f64,
    pub s_c: f64,
    pub epsilon: f64,
    pub s_s: f64,
    pub levels_per_side: usize,
}

impl Default for SimpleImbalance {
    fn default() -> Self {
        SimpleImbalance {
            base_l: 8.0,
            base_c: 0.02,
            base_m: 2.0,
            s_i: 0.5,
            s_c: 1.0,
            epsilon: 0.05,
            s_s: 0.3,
            levels_per_side: 5,
        }
    }
}

impl IntensityModel for SimpleImbalance {
    fn name(&self) -> &str {
        "simple_imbalance"
    }

    fn compute(&self, state: &BookState) -> Result<Intensities> {
        validate_book_state(state, self.levels_per_side)?;
        let f = state.features;
        let i = f.imbalance;
        let spread = f.spread as f64;

        let add_mult = (self.s_s * (spread - 2.0)).exp();
        let exec_mult = (-self.s_s * (spread - 2.0)).exp();

        let add_bid = self.base_l * (1.0 - self.s_i * i) * add_mult;
        let add_ask = self.base_l * (1.0 + self.s_i * i) * add_mult;
        let cancel_bid = self.base_c * self.s_c * f.total_bid_depth as f64;
        let cancel_ask = self.base_c * self.s_c * f.total_ask_depth as f64;
        let exec_sell = self.base_m * (self.epsilon + (self.s_i * i).max(0.0)) * exec_mult;
        let exec_buy = self.base_m * (self.epsilon + (-self.s_i * i).max(0.0)) * exec_mult;

        Ok(Intensities {
            add_bid,
            add_ask,
            cancel_bid,
            cancel_ask,
            exec_buy,
            exec_sell,
        }
        .clamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookFeatures;

    fn state(imbalance: f64, spread: i32, bid_depth: u64, ask_depth: u64) -> BookState {
        BookState {
            features: BookFeatures {
                best_bid: 10_000,
                best_ask: 10_000 + spread,
                spread,
                best_bid_depth: bid_depth as u32,
                best_ask_depth: ask_depth as u32,
                imbalance,
                total_bid_depth: bid_depth,
                total_ask_depth: ask_depth,
            },
            bid_depths: vec![bid_depth as u32; 5],
            ask_depths: vec![ask_depth as u32; 5],
        }
    }

    #[test]
    fn bid_heavy_book_pushes_more_exec_sell() {
        let m = SimpleImbalance::default();
        let out = m.compute(&state(0.8, 2, 100, 10)).unwrap();
        assert!(out.exec_sell > out.exec_buy);
        assert!(out.add_ask > out.add_bid);
    }

    #[test]
    fn ask_heavy_book_pushes_more_exec_buy() {
        let m = SimpleImbalance::default();
        let out = m.compute(&state(-0.8, 2, 10, 100)).unwrap();
        assert!(out.exec_buy > out.exec_sell);
        assert!(out.add_bid > out.add_ask);
    }

    #[test]
    fn wide_spread_boosts_adds_and_dampens_execs() {
        let m = SimpleImbalance::default();
        let narrow = m.compute(&state(0.0, 2, 50, 50)).unwrap();
        let wide = m.compute(&state(0.0, 8, 50, 50)).unwrap();
        assert!(wide.add_bid > narrow.add_bid);
        assert!(wide.exec_buy < narrow.exec_buy);
    }

    #[test]
    fn all_outputs_finite_and_positive() {
        let m = SimpleImbalance::default();
        let out = m.compute(&state(0.0, 1, 0, 0)).unwrap();
        for v in out.in_scan_order() {
            assert!(v.is_finite());
            assert!(v > 0.0);
        }
        assert!(out.total() > 0.0);
    }

    #[test]
    fn rejects_wrong_level_count() {
        let m = SimpleImbalance::default();
        let mut s = state(0.0, 2, 10, 10);
        s.bid_depths.pop();
        assert!(m.compute(&s).is_err());
    }
}
