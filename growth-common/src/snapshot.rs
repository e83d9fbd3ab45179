use serde::{Serialize, Deserialize};

/// The state of both fields at an observer report.
#[derive(Debug, Clone, Serialize, Deserialize)] // Derive traits for easy saving/loading
pub struct Snapshot {
    /// Number of updates applied to reach this state (0 for the initial fields).
    pub step: usize,
    /// Simulated time after that update.
    pub time: f64,
    /// Lattice extents, one per axis.
    pub shape: Vec<usize>,
    /// Tumor order parameter, flattened in row-major order.
    pub phi: Vec<f64>,
    /// Nutrient concentration, flattened in row-major order.
    pub nutrient: Vec<f64>,
    pub stats: FieldStats,
}

/// Summary metrics of a snapshot, cheap to log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub phi_mean: f64,
    pub phi_max: f64,
    pub nutrient_mean: f64,
    pub nutrient_min: f64,
    /// Number of cells with `phi >= 0.5`.
    pub tumor_cells: usize,
}

impl FieldStats {
    pub fn from_fields(phi: &[f64], nutrient: &[f64]) -> Self {
        let mean = |v: &[f64]| if v.is_empty() { 0.0 } else { v.iter().sum::<f64>() / v.len() as f64 };
        Self {
            phi_mean: mean(phi),
            phi_max: phi.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            nutrient_mean: mean(nutrient),
            nutrient_min: nutrient.iter().copied().fold(f64::INFINITY, f64::min),
            tumor_cells: phi.iter().filter(|&&p| p >= 0.5).count(),
        }
    }
}

impl Snapshot {
    pub fn new(step: usize, time: f64, shape: Vec<usize>, phi: Vec<f64>, nutrient: Vec<f64>) -> Self {
        let stats = FieldStats::from_fields(&phi, &nutrient);
        Self { step, time, shape, phi, nutrient, stats }
    }

    /// Number of spatial axes.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}
