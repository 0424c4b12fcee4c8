//! C1: deterministic, reseedable uniform-[0,1) source.
//!
//! The canonical generator is `ChaCha8Rng`, matching the seeded-determinism
//! pattern used elsewhere for hermetic backtests. Byte-for-byte
//! reproducibility of `.qrsdp` files is only guaranteed across runs using
//! this same generator.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub struct Rng {
    inner: ChaCha8Rng,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Discards the current stream and starts a fresh one from `seed`.
    /// `ChaCha8Rng` has no incremental reseed, so this reconstructs it.
    pub fn reseed(&mut self, seed: u64) {
        self.inner = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Uniform draw in (0, 1) — never exactly 0, so `ln(u)` stays finite.
    pub fn next_open01(&mut self) -> f64 {
        loop {
            let u = (self.inner.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64);
            if u > 0.0 {
                return u;
            }
        }
    }

    /// Uniform draw in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.inner.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Knuth's multiplication-based Poisson sampler. Adequate for the small
    /// means (`initial_depth`, typically single/low-double digits) this
    /// crate uses it for; no `rand_distr` dependency is pulled in for a
    /// handful of lines.
    pub fn next_poisson(&mut self, mean: f64) -> u64 {
        if mean <= 0.0 {
            return 0;
        }
        let l = (-mean).exp();
        let mut k: u64 = 0;
        let mut p = 1.0;
        loop {
            k += 1;
            p *= self.next_f64().max(f64::MIN_POSITIVE);
            if p <= l {
                return k - 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        let seq_a: Vec<f64> = (0..50).map(|_| a.next_f64()).collect();
        let seq_b: Vec<f64> = (0..50).map(|_| b.next_f64()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Rng::new(1);
        let mut b = Rng::new(2);
        let seq_a: Vec<f64> = (0..20).map(|_| a.next_f64()).collect();
        let seq_b: Vec<f64> = (0..20).map(|_| b.next_f64()).collect();
        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn reseed_resets_stream() {
        let mut r = Rng::new(7);
        let first: Vec<f64> = (0..10).map(|_| r.next_f64()).collect();
        r.reseed(7);
        let second: Vec<f64> = (0..10).map(|_| r.next_f64()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn open01_never_zero() {
        let mut r = Rng::new(99);
        for _ in 0..10_000 {
            assert!(r.next_open01() > 0.0);
        }
    }

    #[test]
    fn poisson_zero_mean_is_zero() {
        let mut r = Rng::new(1);
        assert_eq!(r.next_poisson(0.0), 0);
    }

    #[test]
    fn poisson_reproducible_for_seed() {
        let mut a = Rng::new(123);
        let mut b = Rng::new(123);
        let draws_a: Vec<u64> = (0..20).map(|_| a.next_poisson(5.0)).collect();
        let draws_b: Vec<u64> = (0..20).map(|_| b.next_poisson(5.0)).collect();
        assert_eq!(draws_a, draws_b);
    }
}
