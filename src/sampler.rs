//! C4: competing-risk event sampler — exponential inter-arrival time plus
//! categorical event-type (or joint type+level) sampling.

use crate::rng::Rng;
use crate::types::{EventType, Intensities};

/// Large safe sentinel returned by `sample_delta_t` when `lambda_total` is
/// non-finite or non-positive, so the session ends cleanly rather than
/// looping forever or dividing by zero.
pub const SAFE_DELTA_T_SENTINEL: f64 = 1e9;

pub struct EventSampler;

impl EventSampler {
    /// Inverse-CDF exponential: `Δt = -ln(u)/λ_total`.
    pub fn sample_delta_t(rng: &mut Rng, lambda_total: f64) -> f64 {
        if !lambda_total.is_finite() || lambda_total <= 0.0 {
            return SAFE_DELTA_T_SENTINEL;
        }
        let u = rng.next_open01();
        -u.ln() / lambda_total
    }

    /// Cumulative scan over `EventType::SCAN_ORDER`; the first type whose
    /// cumulative probability exceeds a fresh uniform wins. Ties and the
    /// `u -> 1` boundary yield the last type — this is a stable part of
    /// the design, fixing the correspondence between draws and outcomes.
    pub fn sample_type(rng: &mut Rng, intensities: &Intensities) -> EventType {
        let total = intensities.total();
        let u = rng.next_f64();
        let weights = intensities.in_scan_order();
        let mut cumulative = 0.0;
        for (idx, w) in weights.iter().enumerate() {
            cumulative += w / total;
            if u < cumulative {
                return EventType::SCAN_ORDER[idx];
            }
        }
        *EventType::SCAN_ORDER.last().unwrap()
    }

    /// Same cumulative scan for an arbitrary-length non-negative weight
    /// vector; used by the curve model for joint (type, level) sampling.
    pub fn sample_index_from_weights(rng: &mut Rng, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        if total <= 0.0 || weights.is_empty() {
            return weights.len().saturating_sub(1);
        }
        let u = rng.next_f64();
        let mut cumulative = 0.0;
        for (idx, w) in weights.iter().enumerate() {
            cumulative += w / total;
            if u < cumulative {
                return idx;
            }
        }
        weights.len() - 1
    }
}
