//! Explicit forward-Euler integration of the coupled tumor/nutrient system.
//!
//! Each update reads both fields as they were at the start of the step:
//!
//! ```text
//! phi'      = phi      + dt * (lambda  * L(phi)      + R_phi(phi, nutrient))
//! nutrient' = nutrient + dt * (epsilon * L(nutrient) + R_n(phi_ref, nutrient, source))
//! ```
//!
//! where `phi_ref` is the start-of-step tumor field by default
//! ([`NutrientReference::PreUpdate`]). Stability requires roughly
//! `dt * max(lambda, epsilon) * 2 * ndim / h^2 <= 1`; this is not enforced.

use crate::error::{ensure_positive, ModelError};
use crate::laplace::Laplacian;
use crate::reaction::{nutrient_reaction, tumor_reaction};
use crate::stencil::Stencil;
use growth_common::{
    BoundaryPolicy, CouplingMode, ModelParams, NutrientReference, SimulationConfig,
};
use log::{info, trace, warn};
use ndarray::{ArrayD, IxDyn, Zip};
use std::fmt;
use std::time::Instant;

/// Run-level numerical settings, fixed once the integrator is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub dt: f64,
    /// Lattice spacing `h`.
    pub spacing: f64,
    /// The loop performs `total_steps + 1` updates.
    pub total_steps: usize,
    /// Steps between observer calls; 0 disables them.
    pub report_interval: usize,
    pub stencil_order: usize,
    pub boundary: BoundaryPolicy,
    pub coupling: CouplingMode,
    pub nutrient_reference: NutrientReference,
    /// Stop with [`RunStatus::Diverged`] once any value is non-finite or exceeds this magnitude.
    pub divergence_bound: Option<f64>,
    /// Stop with [`RunStatus::Converged`] once the largest per-step change falls below this.
    pub steady_tolerance: Option<f64>,
}

impl Settings {
    /// Second-order stencil, periodic boundary, default coupling, no reporting or safeguards.
    pub fn new(dt: f64, spacing: f64, total_steps: usize) -> Self {
        Self {
            dt,
            spacing,
            total_steps,
            report_interval: 0,
            stencil_order: 0,
            boundary: BoundaryPolicy::default(),
            coupling: CouplingMode::default(),
            nutrient_reference: NutrientReference::default(),
            divergence_bound: None,
            steady_tolerance: None,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            dt: config.timing.dt,
            spacing: config.grid.spacing,
            total_steps: config.timing.total_steps,
            report_interval: config.timing.report_interval,
            stencil_order: config.grid.stencil_order,
            boundary: config.grid.boundary,
            coupling: config.model.coupling,
            nutrient_reference: config.model.nutrient_reference,
            divergence_bound: config.safeguards.divergence_bound,
            steady_tolerance: config.safeguards.steady_tolerance,
        }
    }

    /// `dt * max(lambda, epsilon) * rho / 2`, where `rho` is the sum of the
    /// absolute stencil weights. For these centered stencils `rho` is the
    /// spectral radius of the discrete Laplacian (reached by the checkerboard
    /// mode), so explicit Euler diffusion is unstable above 1. For the
    /// second-order stencil this reduces to `dt * D * 2 * ndim / h^2`.
    pub fn stability_hint(&self, params: &ModelParams, stencil: &Stencil) -> f64 {
        let rho: f64 = stencil.weights().iter().map(|w| w.abs()).sum();
        self.dt * params.lambda.max(params.epsilon) * rho / 2.0
    }
}

/// Nutrient supply rate.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Same rate in every cell.
    Uniform(f64),
    /// Per-cell rate; must match the field shape.
    Field(ArrayD<f64>),
}

impl Source {
    fn into_array(self, shape: &[usize]) -> Result<ArrayD<f64>, ModelError> {
        match self {
            Source::Uniform(value) => Ok(ArrayD::from_elem(IxDyn(shape), value)),
            Source::Field(field) if field.shape() == shape => Ok(field),
            Source::Field(field) => Err(ModelError::ShapeMismatch {
                name: "source",
                expected: shape.to_vec(),
                actual: field.shape().to_vec(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Phi,
    Nutrient,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Phi => write!(f, "phi"),
            FieldKind::Nutrient => write!(f, "nutrient"),
        }
    }
}

/// How a call to [`Integrator::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// All `total_steps + 1` updates were performed.
    Completed { steps: usize },
    /// The largest per-cell change after update `step` fell below the steady tolerance.
    Converged { step: usize },
    /// `field` left the divergence bound after update `step`.
    Diverged { step: usize, field: FieldKind },
}

/// State handed to an [`Observer`] after an update.
#[derive(Debug)]
pub struct Report<'a> {
    /// 0-based index of the update just applied; `step + 1` updates have run.
    pub step: usize,
    pub time: f64,
    pub phi: &'a ArrayD<f64>,
    pub nutrient: &'a ArrayD<f64>,
}

/// Receives periodic reports from the integrator (plotting, logging, recording).
pub trait Observer {
    fn observe(&mut self, report: &Report<'_>) -> anyhow::Result<()>;
}

impl<F> Observer for F
where
    F: FnMut(&Report<'_>) -> anyhow::Result<()>,
{
    fn observe(&mut self, report: &Report<'_>) -> anyhow::Result<()> {
        self(report)
    }
}

/// Observer that ignores every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn observe(&mut self, _report: &Report<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Owns both fields for the duration of a run and advances them in time.
#[derive(Debug)]
pub struct Integrator {
    phi: ArrayD<f64>,
    nutrient: ArrayD<f64>,
    source: ArrayD<f64>,
    params: ModelParams,
    settings: Settings,
    laplacian: Laplacian,
    steps_taken: usize,
    time: f64,
}

impl Integrator {
    /// Validates the inputs and builds the stencil; no stepping happens here.
    pub fn new(
        phi0: ArrayD<f64>,
        nutrient0: ArrayD<f64>,
        source: Source,
        params: ModelParams,
        settings: Settings,
    ) -> Result<Self, ModelError> {
        ensure_positive("dt", settings.dt)?;
        ensure_positive("h", settings.spacing)?;
        if let Some(bound) = settings.divergence_bound {
            ensure_positive("divergence_bound", bound)?;
        }
        if let Some(tolerance) = settings.steady_tolerance {
            ensure_positive("steady_tolerance", tolerance)?;
        }
        if nutrient0.shape() != phi0.shape() {
            return Err(ModelError::ShapeMismatch {
                name: "nutrient",
                expected: phi0.shape().to_vec(),
                actual: nutrient0.shape().to_vec(),
            });
        }
        let source = source.into_array(phi0.shape())?;

        let stencil = Stencil::build(phi0.ndim(), settings.stencil_order, settings.spacing)?;
        let laplacian = Laplacian::new(stencil, settings.boundary);

        Ok(Self {
            phi: phi0,
            nutrient: nutrient0,
            source,
            params,
            settings,
            laplacian,
            steps_taken: 0,
            time: 0.0,
        })
    }

    /// One update with the configured `dt`. Returns the largest absolute
    /// per-cell change of either field.
    pub fn step(&mut self) -> Result<f64, ModelError> {
        self.advance(self.settings.dt)
    }

    /// One forward-Euler update with an explicit `dt`. Zero is allowed and
    /// leaves both fields unchanged; negative or non-finite values are rejected.
    pub fn advance(&mut self, dt: f64) -> Result<f64, ModelError> {
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(ModelError::InvalidTimeStep(dt));
        }
        let lap_phi = self.laplacian.apply(&self.phi)?;
        let lap_nutrient = self.laplacian.apply(&self.nutrient)?;

        let params = self.params;
        let coupling = self.settings.coupling;

        let mut phi_next = ArrayD::<f64>::zeros(self.phi.raw_dim());
        Zip::from(&mut phi_next)
            .and(&self.phi)
            .and(&self.nutrient)
            .and(&lap_phi)
            .for_each(|next, &phi, &nutrient, &lap| {
                *next = phi + dt * (params.lambda * lap + tumor_reaction(phi, nutrient, &params, coupling));
            });

        // `self.phi` still holds the start-of-step values at this point.
        let phi_reference = match self.settings.nutrient_reference {
            NutrientReference::PreUpdate => &self.phi,
            NutrientReference::PostUpdate => &phi_next,
        };
        let mut nutrient_next = ArrayD::<f64>::zeros(self.nutrient.raw_dim());
        Zip::from(&mut nutrient_next)
            .and(&self.nutrient)
            .and(&lap_nutrient)
            .and(phi_reference)
            .and(&self.source)
            .for_each(|next, &nutrient, &lap, &phi, &source| {
                *next = nutrient + dt * (params.epsilon * lap + nutrient_reaction(phi, nutrient, source, &params));
            });

        let max_change = |new: &ArrayD<f64>, old: &ArrayD<f64>| {
            Zip::from(new).and(old).fold(0.0f64, |acc, &a, &b| acc.max((a - b).abs()))
        };
        let change = max_change(&phi_next, &self.phi).max(max_change(&nutrient_next, &self.nutrient));

        self.phi = phi_next;
        self.nutrient = nutrient_next;
        self.steps_taken += 1;
        self.time += dt;
        Ok(change)
    }

    /// Runs `total_steps + 1` updates, reporting every `report_interval` steps.
    ///
    /// An observer error stops the run; the fields then hold the state after
    /// the update that was being reported.
    pub fn run<O: Observer + ?Sized>(&mut self, observer: &mut O) -> Result<RunStatus, ModelError> {
        let total_steps = self.settings.total_steps;
        let report_interval = self.settings.report_interval;
        info!(
            "Integrating {:?} lattice for {} steps (dt = {}, h = {}, boundary = {:?})",
            self.phi.shape(),
            total_steps + 1,
            self.settings.dt,
            self.settings.spacing,
            self.settings.boundary
        );

        for step in 0..=total_steps {
            let step_start_time = Instant::now();
            let change = self.step()?;
            trace!(
                "Step [{}/{}] completed in {:.3} ms (max change {:.3e})",
                step,
                total_steps,
                step_start_time.elapsed().as_secs_f64() * 1000.0,
                change
            );

            if let Some(bound) = self.settings.divergence_bound {
                if let Some(field) = self.diverged_field(bound) {
                    warn!("Field '{}' diverged at step {} (t = {:.4}).", field, step, self.time);
                    return Ok(RunStatus::Diverged { step, field });
                }
            }

            if report_interval > 0 && step % report_interval == 0 {
                let report = Report {
                    step,
                    time: self.time,
                    phi: &self.phi,
                    nutrient: &self.nutrient,
                };
                observer
                    .observe(&report)
                    .map_err(|e| ModelError::Observer { step, source: e.into() })?;
            }

            if let Some(tolerance) = self.settings.steady_tolerance {
                if change < tolerance {
                    info!("Steady state reached at step {} (max change {:.3e}).", step, change);
                    return Ok(RunStatus::Converged { step });
                }
            }
        }

        Ok(RunStatus::Completed { steps: total_steps + 1 })
    }

    fn diverged_field(&self, bound: f64) -> Option<FieldKind> {
        let out_of_bounds = |field: &ArrayD<f64>| field.iter().any(|v| !v.is_finite() || v.abs() > bound);
        if out_of_bounds(&self.phi) {
            Some(FieldKind::Phi)
        } else if out_of_bounds(&self.nutrient) {
            Some(FieldKind::Nutrient)
        } else {
            None
        }
    }

    pub fn phi(&self) -> &ArrayD<f64> {
        &self.phi
    }

    pub fn nutrient(&self) -> &ArrayD<f64> {
        &self.nutrient
    }

    pub fn source(&self) -> &ArrayD<f64> {
        &self.source
    }

    pub fn stencil(&self) -> &Stencil {
        self.laplacian.stencil()
    }

    /// Updates performed so far.
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Simulated time elapsed so far.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Consumes the integrator, returning `(phi, nutrient)`.
    pub fn into_fields(self) -> (ArrayD<f64>, ArrayD<f64>) {
        (self.phi, self.nutrient)
    }
}

/// Final fields of a completed [`integrate`] call.
#[derive(Debug, Clone)]
pub struct Integration {
    pub phi: ArrayD<f64>,
    pub nutrient: ArrayD<f64>,
    pub status: RunStatus,
}

/// Builds an [`Integrator`], runs it, and returns both final fields.
pub fn integrate<O: Observer + ?Sized>(
    phi0: ArrayD<f64>,
    nutrient0: ArrayD<f64>,
    source: Source,
    params: ModelParams,
    settings: Settings,
    observer: &mut O,
) -> Result<Integration, ModelError> {
    let mut integrator = Integrator::new(phi0, nutrient0, source, params, settings)?;
    let status = integrator.run(observer)?;
    let (phi, nutrient) = integrator.into_fields();
    Ok(Integration { phi, nutrient, status })
}
