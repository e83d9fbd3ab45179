pub mod config;
pub mod sim_params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{midpoint, SimulationConfig, GridConfig, TimingConfig, ModelConfig, InitialConditions, SourceConfig, SafeguardConfig, OutputConfig};
pub use sim_params::{ModelParams, BoundaryPolicy, CouplingMode, NutrientReference};
pub use snapshot::{Snapshot, FieldStats};
