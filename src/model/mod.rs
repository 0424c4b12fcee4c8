//! C3: `IntensityModel` capability set — a pure function from book state to
//! six event-type rates. Two concrete variants are provided.

pub mod curve;
pub mod simple;

pub use curve::{CurveIntensity, CurveTable};
pub use simple::SimpleImbalance;

use crate::error::{QrsdpError, Result};
use crate::types::{BookState, Intensities, ModelChoice};

/// Any model supporting `compute` satisfies the contract; the per-level
/// weight extension (`level_weights`) is an optional capability the
/// sampler queries at runtime to draw a joint (event type, level) outcome
/// in one step instead of two.
pub trait IntensityModel: Send {
    fn name(&self) -> &str;

    fn compute(&self, state: &BookState) -> Result<Intensities>;

    /// `Some(weights)` of length `4K+2`, ordered `[add_bid_0..add_bid_{K-1},
    /// add_ask_0..add_ask_{K-1}, cancel_bid_0..cancel_bid_{K-1},
    /// cancel_ask_0..cancel_ask_{K-1}, exec_buy, exec_sell]`, or `None` if
    /// this model has no per-level decomposition (e.g. `SimpleImbalance`).
    fn level_weights(&self, _state: &BookState) -> Option<Vec<f64>> {
        None
    }
}

/// Builds the concrete model a `ModelChoice` names. `CurveIntensity` loads
/// its tables from `curve_table_path` when given, otherwise falls back to
/// `CurveIntensity::defaults(levels_per_side, n_max)`.
pub fn build(choice: &ModelChoice, levels_per_side: u32) -> Result<Box<dyn IntensityModel>> {
    match choice {
        ModelChoice::SimpleImbalance => Ok(Box::new(SimpleImbalance {
            levels_per_side: levels_per_side as usize,
            ..SimpleImbalance::default()
        })),
        ModelChoice::CurveIntensity { curve_table_path, n_max } => match curve_table_path {
            Some(path) => Ok(Box::new(CurveIntensity::load_from_json(path)?)),
            None => Ok(Box::new(CurveIntensity::defaults(levels_per_side as usize, *n_max))),
        },
    }
}

pub(crate) fn validate_book_state(state: &BookState, levels_per_side: usize) -> Result<()> {
    if state.bid_depths.len() != levels_per_side || state.ask_depths.len() != levels_per_side {
        return Err(QrsdpError::InvariantViolation(format!(
            "INVALID_BOOK: expected {levels_per_side} depths per side, got bid={} ask={}",
            state.bid_depths.len(),
            state.ask_depths.len()
        )));
    }
    Ok(())
}
