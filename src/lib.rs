//! Phase-field tumor growth coupled to a diffusing nutrient, integrated with
//! explicit finite differences.

pub mod error;
pub mod field_init;
pub mod integrator;
pub mod laplace;
pub mod output;
pub mod reaction;
pub mod recorder;
pub mod stencil;

pub use error::ModelError;
pub use integrator::{
    integrate, FieldKind, Integration, Integrator, NoopObserver, Observer, Report, RunStatus, Settings, Source,
};
pub use laplace::{laplace_lookup, Laplacian};
pub use recorder::SnapshotRecorder;
pub use stencil::Stencil;

// Shared configuration and data types
pub use growth_common::{BoundaryPolicy, CouplingMode, ModelParams, NutrientReference, SimulationConfig, Snapshot};
