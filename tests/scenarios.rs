use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use tumor_growth::field_init::{init_chemical_field, init_tumor};
use tumor_growth::{
    integrate, BoundaryPolicy, ModelParams, NoopObserver, Report, RunStatus, Settings, SimulationConfig, Source,
    SnapshotRecorder,
};

fn reference_params() -> ModelParams {
    ModelParams {
        lambda: 0.01,
        tau: 100.0,
        chi: 2.0,
        a: 1.9,
        epsilon: 0.1,
        delta: 1.0,
        gamma: 0.1,
    }
}

#[test]
fn nutrient_rises_towards_source_over_gamma_without_tumor() {
    let shape = [10, 10];
    let mut settings = Settings::new(0.001, 1.0, 100);
    settings.boundary = BoundaryPolicy::Wrap;
    settings.report_interval = 1;

    let mut means = Vec::new();
    let mut observer = |report: &Report<'_>| -> anyhow::Result<()> {
        means.push(report.nutrient.mean().unwrap_or(0.0));
        Ok(())
    };
    let result = integrate(
        ArrayD::zeros(IxDyn(&shape)),
        ArrayD::zeros(IxDyn(&shape)),
        Source::Field(ArrayD::from_elem(IxDyn(&shape), 0.1)),
        reference_params(),
        settings,
        &mut observer,
    )
    .unwrap();

    assert_eq!(result.status, RunStatus::Completed { steps: 101 });
    assert!(result.phi.iter().all(|&p| p == 0.0));

    assert_eq!(means.len(), 101);
    assert!(means.windows(2).all(|w| w[1] > w[0]));
    let steady = 0.1 / 0.1;
    assert!(means.iter().all(|&m| m < steady));

    // n_{k+1} = n_k + dt * (s - gamma * n_k), starting from 0.
    let expected = steady * (1.0 - (1.0 - 0.001 * 0.1f64).powi(101));
    let first = result.nutrient[[0, 0]];
    assert_relative_eq!(first, expected, max_relative = 1e-9);
    for &n in result.nutrient.iter() {
        assert_abs_diff_eq!(n, first, epsilon = 1e-15);
    }
}

#[test]
fn wrap_and_clamp_runs_diverge_at_the_edge() {
    let shape = [8, 8];
    let phi0 = ArrayD::from_shape_fn(IxDyn(&shape), |i| if i[0] == 0 { 1.0 } else { 0.0 });
    let run = |boundary| {
        let mut settings = Settings::new(0.01, 1.0, 5);
        settings.boundary = boundary;
        integrate(
            phi0.clone(),
            ArrayD::from_elem(IxDyn(&shape), 0.5),
            Source::Uniform(0.05),
            ModelParams { lambda: 1.0, ..reference_params() },
            settings,
            &mut NoopObserver,
        )
        .unwrap()
    };
    let wrap = run(BoundaryPolicy::Wrap);
    let clamp = run(BoundaryPolicy::Clamp);
    // Row 7 neighbors the tumor row only under periodic wrapping.
    assert!(wrap.phi[[7, 3]] > clamp.phi[[7, 3]]);
    assert!((wrap.phi[[0, 3]] - clamp.phi[[0, 3]]).abs() > 1e-6);
}

#[test]
fn three_dimensional_fourth_order_run_keeps_shape() {
    let shape = [6, 7, 8];
    let mut settings = Settings::new(0.001, 0.5, 20);
    settings.stencil_order = 1;
    settings.boundary = BoundaryPolicy::Clamp;
    settings.divergence_bound = Some(1e3);

    let center = [3.0, 3.5, 4.0];
    let phi0 = init_tumor::<StdRng>(&shape, 2.0, &center, None).unwrap();
    let result = integrate(
        phi0,
        ArrayD::from_elem(IxDyn(&shape), 1.0),
        Source::Uniform(0.1),
        reference_params(),
        settings,
        &mut NoopObserver,
    )
    .unwrap();
    assert_eq!(result.status, RunStatus::Completed { steps: 21 });
    assert_eq!(result.phi.shape(), &shape);
    assert_eq!(result.nutrient.shape(), &shape);
    assert!(result.phi.iter().chain(result.nutrient.iter()).all(|v| v.is_finite()));
}

#[test]
fn configuration_drives_a_complete_run() {
    let config = SimulationConfig::from_toml_str(
        r#"
        [grid]
        shape = [24, 24]
        spacing = 1.0
        stencil_order = 1
        boundary = "clamp"

        [timing]
        dt = 0.001
        total_steps = 50
        report_interval = 10

        [model]
        lambda = 1.0
        tau = 5.0
        chi = 0.2
        A = 4.0
        epsilon = 10.0
        delta = 0.1
        gamma = 0.1

        [initial_conditions]
        tumor_radius = 5.0
        nutrient_initial = 2.75
        source = { kind = "exterior", value = 2.75, radius = 8.0 }

        [output]
        base_filename = "unused"
        save_snapshots = false
        save_final_fields = false
        "#,
    )
    .unwrap();

    let ic = &config.initial_conditions;
    let center = config.tumor_center();
    let phi0 = init_tumor::<StdRng>(&config.grid.shape, ic.tumor_radius, &center, None).unwrap();
    let (nutrient0, source) =
        init_chemical_field(&config.grid.shape, ic.nutrient_initial, &ic.source, &center).unwrap();
    let initial_tumor: f64 = phi0.sum();

    let mut recorder = SnapshotRecorder::new(config.timing.total_steps);
    let result = integrate(
        phi0,
        nutrient0,
        source,
        config.get_model_params(),
        Settings::from_config(&config),
        &mut recorder,
    )
    .unwrap();

    assert_eq!(result.status, RunStatus::Completed { steps: 51 });
    let steps: Vec<usize> = recorder.snapshots().iter().map(|s| s.step).collect();
    assert_eq!(steps, vec![1, 11, 21, 31, 41, 51]);
    // Decay (A = 4) dominates nutrient-driven growth (chi * nutrient = 0.55).
    assert!(result.phi.sum() < initial_tumor);
    assert!(result.nutrient.iter().all(|&n| n > 0.0));
}
