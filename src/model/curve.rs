use super::{validate_book_state, IntensityModel};
use crate::error::{QrsdpError, Result};
use crate::types::{BookState, Intensities};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single `λ(n)` curve: index `n` directly, using the **flat (last
/// value) tail** for `n >= table.len()` — the only out-of-range policy
/// this crate supports; there is no zero-tail variant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CurveTable(pub Vec<f64>);

impl CurveTable {
    pub fn at(&self, n: u32) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        let idx = (n as usize).min(self.0.len() - 1);
        self.0[idx]
    }

    fn flat(value: f64, n_max: usize) -> Self {
        CurveTable(vec![value; n_max + 1])
    }

    fn decaying(base: f64, scale: f64, n_max: usize) -> Self {
        CurveTable((0..=n_max).map(|n| base * (-(n as f64) / scale).exp()).collect())
    }
}

/// The six per-level/best-only tables, plus the curve model's own
/// spread-reactivity parameters (shared shape with `SimpleImbalance`'s
/// `add_mult`/`exec_mult`, since both variants model the same spread
/// effect on arrival rates).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveIntensity {
    pub add_bid: Vec<CurveTable>,
    pub add_ask: Vec<CurveTable>,
    pub cancel_bid: Vec<CurveTable>,
    pub cancel_ask: Vec<CurveTable>,
    pub exec_buy: CurveTable,
    pub exec_sell: CurveTable,
    pub s_s: f64,
    pub s_i: f64,
    #[serde(skip)]
    levels_per_side: usize,
}

impl CurveIntensity {
    pub fn load_from_json(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut parsed: CurveIntensity =
            serde_json::from_slice(&bytes).map_err(|e| QrsdpError::Configuration(format!("bad curve json: {e}")))?;
        parsed.levels_per_side = parsed.add_bid.len();
        Ok(parsed)
    }

    pub fn defaults(levels_per_side: usize, n_max: usize) -> Self {
        let per_level = |base: f64| -> Vec<CurveTable> {
            (0..levels_per_side)
                .map(|k| CurveTable::decaying(base / (1.0 + k as f64), 8.0, n_max))
                .collect()
        };
        CurveIntensity {
            add_bid: per_level(4.0),
            add_ask: per_level(4.0),
            cancel_bid: per_level(0.5),
            cancel_ask: per_level(0.5),
            exec_buy: CurveTable::flat(1.0, n_max),
            exec_sell: CurveTable::flat(1.0, n_max),
            s_s: 0.3,
            s_i: 0.5,
            levels_per_side,
        }
    }

    fn mults(&self, spread: i32) -> (f64, f64) {
        let s = spread as f64;
        ((self.s_s * (s - 2.0)).exp(), (-self.s_s * (s - 2.0)).exp())
    }
}

impl IntensityModel for CurveIntensity {
    fn name(&self) -> &str {
        "curve_intensity"
    }

    fn compute(&self, state: &BookState) -> Result<Intensities> {
        validate_book_state(state, self.levels_per_side)?;
        let f = state.features;
        let (add_mult, exec_mult) = self.mults(f.spread);

        let sum_curve = |tables: &[CurveTable], depths: &[u32]| -> f64 {
            tables.iter().zip(depths).map(|(t, &n)| t.at(n)).sum()
        };

        let add_bid = add_mult * sum_curve(&self.add_bid, &state.bid_depths);
        let add_ask = add_mult * sum_curve(&self.add_ask, &state.ask_depths);
        let cancel_bid = sum_curve(&self.cancel_bid, &state.bid_depths);
        let cancel_ask = sum_curve(&self.cancel_ask, &state.ask_depths);

        let i = f.imbalance;
        let exec_buy = self.exec_buy.at(f.best_ask_depth) * exec_mult * (1.0 + self.s_i * (-i).max(0.0));
        let exec_sell = self.exec_sell.at(f.best_bid_depth) * exec_mult * (1.0 + self.s_i * i.max(0.0));

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

    fn level_weights(&self, state: &BookState) -> Option<Vec<f64>> {
        if validate_book_state(state, self.levels_per_side).is_err() {
            return None;
        }
        let (add_mult, _exec_mult) = self.mults(state.features.spread);
        let mut w = Vec::with_capacity(4 * self.levels_per_side + 2);
        for (t, &n) in self.add_bid.iter().zip(&state.bid_depths) {
            w.push((add_mult * t.at(n)).max(0.0));
        }
        for (t, &n) in self.add_ask.iter().zip(&state.ask_depths) {
            w.push((add_mult * t.at(n)).max(0.0));
        }
        for (t, &n) in self.cancel_bid.iter().zip(&state.bid_depths) {
            w.push(t.at(n).max(0.0));
        }
        for (t, &n) in self.cancel_ask.iter().zip(&state.ask_depths) {
            w.push(t.at(n).max(0.0));
        }
        let intens = self.compute(state).ok()?;
        w.push(intens.exec_buy.max(0.0));
        w.push(intens.exec_sell.max(0.0));
        Some(w)
    }
}
