use anyhow::Result;
use std::time::Instant;
use log::{info, warn, error, debug};
use rand::rngs::StdRng;
use rand::SeedableRng;

use tumor_growth::field_init::{add_noise, init_chemical_field, init_tumor};
use tumor_growth::output::{save_final_fields, save_snapshots};
use tumor_growth::{Integrator, RunStatus, Settings, SimulationConfig, SnapshotRecorder};

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting Tumor Growth Integrator...");

    // --- Load Configuration ---
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = SimulationConfig::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);

    info!("Using {} Rayon threads for the Laplacian.", rayon::current_num_threads());

    let params = config.get_model_params();
    let settings = Settings::from_config(&config);
    debug!("Model Parameters: {:#?}", params);
    debug!("Run Settings: {:#?}", settings);

    // --- Initialize Fields ---
    info!("Initializing tumor and nutrient fields on a {:?} lattice...", config.grid.shape);
    let ic = &config.initial_conditions;
    let center = config.tumor_center();
    let mut rng = StdRng::seed_from_u64(ic.seed);
    let jitter = if ic.radius_jitter { Some(&mut rng) } else { None };
    let phi0 = init_tumor(&config.grid.shape, ic.tumor_radius, &center, jitter)?;
    let (nutrient0, source) = init_chemical_field(&config.grid.shape, ic.nutrient_initial, &ic.source, &center)?;
    let nutrient0 = add_noise(&nutrient0, ic.nutrient_noise, &mut rng)?;
    info!("Initial tumor occupies {} cells.", phi0.iter().filter(|&&v| v >= 0.5).count());

    let mut integrator = Integrator::new(phi0, nutrient0, source, params, settings.clone())?;

    let stencil = integrator.stencil();
    debug!("Laplacian stencil (order {}, h = {}): {:?}", stencil.order(), stencil.spacing(), stencil.weights());
    let stability = settings.stability_hint(&params, stencil);
    if stability > 1.0 {
        warn!(
            "dt = {} is likely unstable for h = {} (dt * D * rho / 2 = {:.3} > 1). Expect divergence.",
            settings.dt, settings.spacing, stability
        );
    }

    // --- Initial Snapshot (time = 0) ---
    let mut recorder = SnapshotRecorder::new(config.timing.total_steps);
    recorder.record(0, 0.0, integrator.phi(), integrator.nutrient());

    // --- Simulation Loop ---
    let start_time = Instant::now();
    let status = match integrator.run(&mut recorder) {
        Ok(status) => status,
        Err(e) => {
            error!("Error during integration after {} updates: {}", integrator.steps_taken(), e);
            anyhow::bail!("Integration failed.");
        }
    };

    match status {
        RunStatus::Completed { steps } => info!("Completed all {} updates.", steps),
        RunStatus::Converged { step } => info!("Stopped early at step {}: fields reached a steady state.", step),
        RunStatus::Diverged { step, field } => {
            warn!("Stopped at step {}: '{}' diverged. Reduce dt or the diffusion coefficients.", step, field)
        }
    }

    // Make sure the final state is part of the record
    if recorder.last_recorded() != Some(integrator.steps_taken()) {
        recorder.record(integrator.steps_taken(), integrator.time(), integrator.phi(), integrator.nutrient());
    }

    let total_duration = start_time.elapsed();
    info!(
        "Simulation finished in {:.3} seconds ({} updates, t = {:.4}).",
        total_duration.as_secs_f64(),
        integrator.steps_taken(),
        integrator.time()
    );

    // --- Save Recorded Data ---
    info!("Saving recorded data...");
    if config.output.save_snapshots {
        let output_format = config.output.format.as_deref().unwrap_or("json");
        save_snapshots(recorder.snapshots(), &config.output.base_filename, output_format)?;
    } else {
        info!("Skipping saving snapshots as per config (save_snapshots is false).");
    }

    if config.output.save_final_fields {
        save_final_fields(&config.output.base_filename, integrator.phi(), integrator.nutrient())?;
    } else {
        info!("Skipping saving final fields as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}
