//! Local (non-diffusive) source terms of the tumor and nutrient equations.
//!
//! All functions are pure and act on single cell values. Extreme parameters
//! may produce NaN or infinities; those are left to the integrator's
//! divergence check.

use growth_common::{CouplingMode, ModelParams};

/// Double-well force `phi * (1 - phi) * (phi - 0.5)` driving `phi` towards 0 or 1.
#[inline(always)]
pub fn double_well(phi: f64) -> f64 {
    phi * (1.0 - phi) * (phi - 0.5)
}

/// Reaction part of `d(phi)/dt`.
#[inline(always)]
pub fn tumor_reaction(phi: f64, nutrient: f64, params: &ModelParams, coupling: CouplingMode) -> f64 {
    let coupling_term = match coupling {
        CouplingMode::Multiplicative => nutrient * phi,
        CouplingMode::Additive => nutrient,
    };
    double_well(phi) / params.tau + params.chi * coupling_term - params.a * phi
}

/// Reaction part of `d(nutrient)/dt`; `phi_reference` is the tumor value the
/// caller chose to consume against (start-of-step or already advanced).
#[inline(always)]
pub fn nutrient_reaction(phi_reference: f64, nutrient: f64, source: f64, params: &ModelParams) -> f64 {
    source - params.delta * phi_reference - params.gamma * nutrient
}
