use serde::{Deserialize, Serialize};

/// Reaction-diffusion coefficients, fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Tumor diffusion coefficient.
    pub lambda: f64,
    /// Phase-separation timescale; the double-well force is scaled by `1 / tau`.
    pub tau: f64,
    /// Strength of nutrient-driven tumor growth.
    pub chi: f64,
    /// Tumor decay (apoptosis) rate.
    #[serde(rename = "A")]
    pub a: f64,
    /// Nutrient diffusion coefficient.
    pub epsilon: f64,
    /// Nutrient consumption rate by tumor tissue.
    pub delta: f64,
    /// Nutrient decay rate.
    pub gamma: f64,
}

impl ModelParams {
    /// Pure phase separation: every coefficient except `tau` is zero.
    pub fn double_well_only(tau: f64) -> Self {
        Self {
            lambda: 0.0,
            tau,
            chi: 0.0,
            a: 0.0,
            epsilon: 0.0,
            delta: 0.0,
            gamma: 0.0,
        }
    }
}

/// Lattice edge handling, applied to both fields for the whole run.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Periodic: indices wrap modulo the extent of the axis.
    #[default]
    Wrap,
    /// Nearest: out-of-range indices are clamped to the closest edge cell.
    Clamp,
}

/// How nutrient enters the tumor growth term `chi * coupling`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CouplingMode {
    /// `chi * nutrient * phi`
    #[default]
    Multiplicative,
    /// `chi * nutrient`
    Additive,
}

/// Which tumor value the nutrient consumption term reads within a step.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NutrientReference {
    /// Tumor field as it was at the start of the step (forward-Euler consistent).
    #[default]
    PreUpdate,
    /// Tumor field already advanced within the same step.
    PostUpdate,
}
