use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::{BoundaryPolicy, CouplingMode, ModelParams, NutrientReference};
use std::path::Path;

// Lattice geometry and discretization
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GridConfig {
    /// Number of cells along each axis (1 to 3 axes).
    pub shape: Vec<usize>,
    /// Lattice spacing `h`.
    pub spacing: f64,
    /// 0, 1, 2, 3 -> 2nd, 4th, 6th, 8th order accurate Laplacian.
    #[serde(default)]
    pub stencil_order: usize,
    #[serde(default)]
    pub boundary: BoundaryPolicy,
}

// Time stepping
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub dt: f64,
    pub total_steps: usize,
    /// Steps between observer reports; 0 disables reporting.
    pub report_interval: usize,
}

// Reaction-diffusion coefficients and the two coupling choices
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ModelConfig {
    pub lambda: f64,
    pub tau: f64,
    pub chi: f64,
    #[serde(rename = "A")]
    pub a: f64,
    pub epsilon: f64,
    pub delta: f64,
    pub gamma: f64,
    #[serde(default)]
    pub coupling: CouplingMode,
    #[serde(default)]
    pub nutrient_reference: NutrientReference,
}

/// Where the nutrient supply comes from.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Same supply rate in every cell.
    Uniform { value: f64 },
    /// Supply only at distance `>= radius` from the tumor center.
    Exterior { value: f64, radius: f64 },
}

// Initial tumor and nutrient fields, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InitialConditions {
    pub tumor_radius: f64,
    /// Defaults to the lattice midpoint.
    #[serde(default)]
    pub tumor_center: Option<Vec<f64>>,
    /// Scale each cell's radius by `sin(u)`, `u ~ U[0, 1)`.
    #[serde(default)]
    pub radius_jitter: bool,
    #[serde(default)]
    pub seed: u64,
    pub nutrient_initial: f64,
    /// Standard deviation of Gaussian noise added to the initial nutrient.
    #[serde(default)]
    pub nutrient_noise: f64,
    pub source: SourceConfig,
}

// Optional run-time checks; both disabled when the section is missing
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SafeguardConfig {
    #[serde(default)]
    pub divergence_bound: Option<f64>,
    #[serde(default)]
    pub steady_tolerance: Option<f64>,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_snapshots: bool,
    pub save_final_fields: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    pub timing: TimingConfig,
    pub model: ModelConfig,
    pub initial_conditions: InitialConditions,
    #[serde(default)]
    pub safeguards: SafeguardConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let ndim = self.grid.shape.len();
        if !(1..=3).contains(&ndim) {
            anyhow::bail!("grid.shape must have 1 to 3 axes, got {}.", ndim);
        }
        if self.grid.shape.iter().any(|&n| n == 0) {
            anyhow::bail!("grid.shape extents must be non-zero.");
        }
        if !(self.grid.spacing > 0.0 && self.grid.spacing.is_finite()) {
            anyhow::bail!("grid.spacing must be positive.");
        }
        if self.grid.stencil_order > 3 {
            anyhow::bail!("grid.stencil_order must be in 0..=3, got {}.", self.grid.stencil_order);
        }
        if !(self.timing.dt > 0.0 && self.timing.dt.is_finite()) {
            anyhow::bail!("timing.dt must be positive.");
        }
        if !(self.model.tau > 0.0 && self.model.tau.is_finite()) {
            anyhow::bail!("model.tau must be positive.");
        }
        if self.model.lambda < 0.0 || self.model.epsilon < 0.0 {
            anyhow::bail!("Diffusion coefficients (lambda, epsilon) must be non-negative.");
        }
        if let Some(center) = &self.initial_conditions.tumor_center {
            if center.len() != ndim {
                anyhow::bail!(
                    "initial_conditions.tumor_center has {} coordinates but the grid has {} axes.",
                    center.len(),
                    ndim
                );
            }
        }
        if self.initial_conditions.nutrient_noise < 0.0 {
            anyhow::bail!("initial_conditions.nutrient_noise must be non-negative.");
        }
        if let Some(bound) = self.safeguards.divergence_bound {
            if bound <= 0.0 {
                anyhow::bail!("safeguards.divergence_bound must be positive.");
            }
        }
        Ok(())
    }

    /// Extracts the coefficient bundle used by the reaction terms.
    pub fn get_model_params(&self) -> ModelParams {
        ModelParams {
            lambda: self.model.lambda,
            tau: self.model.tau,
            chi: self.model.chi,
            a: self.model.a,
            epsilon: self.model.epsilon,
            delta: self.model.delta,
            gamma: self.model.gamma,
        }
    }

    /// Lattice midpoint, or the configured tumor center.
    pub fn tumor_center(&self) -> Vec<f64> {
        self.initial_conditions
            .tumor_center
            .clone()
            .unwrap_or_else(|| midpoint(&self.grid.shape))
    }
}

/// Lattice midpoint, `shape / 2` along each axis.
pub fn midpoint(shape: &[usize]) -> Vec<f64> {
    shape.iter().map(|&n| n as f64 / 2.0).collect()
}
