//! Full runs of the bundled demo model
//!
//! These exercise the whole pipeline: library lookup, configuration,
//! RK4 integration, region aggregation, sweeps, and CSV export.

mod common;

use common::*;
use pbpk_rs::PbpkError;
use pbpk_rs::configure::ConfigurationBundle;
use pbpk_rs::engine::{Rk4Engine, TimeSpan};
use pbpk_rs::models::{ModelLibrary, ModelSource};
use pbpk_rs::output::{CsvConfig, CsvExporter, Exporter, export_tacs_csv};
use pbpk_rs::run::{RunOutput, RunRequest, run_model_with};
use pbpk_rs::sweep::{SweepOptions, SweepPlan};
use tempfile::TempDir;

fn demo_request() -> RunRequest {
    RunRequest::new(ModelSource::named("psma_demo"))
        .with_span(TimeSpan::until(500.0, 1000))
        .with_bundle(
            ConfigurationBundle::new(0.005)
                .with_cold_amount(3.995)
                .with_parameter("lambdaPhys", 0.00632),
        )
        .with_observables(["Tumor1", "SG", "Kidney"])
}

fn run(request: &RunRequest) -> RunOutput {
    run_model_with(request, &ModelLibrary::bundled(), &Rk4Engine::default()).unwrap()
}

#[test]
fn test_single_run_shape_and_values() {
    let output = run(&demo_request());

    assert_eq!(output.tacs.dim(), (1, 1000, 3));
    assert_eq!(output.time.len(), 1000);
    assert_eq!(output.time[0], 0.0);
    assert_close(output.time[999], 500.0, 1e-12, "last instant");
    assert_eq!(output.model_name, "psma_demo");
    assert_eq!(output.engine_name, "RK4");
    assert!(output.swept_parameters.is_empty());
    assert!(output.report.is_complete());

    assert!(output.tacs.iter().all(|v| v.is_finite() && *v >= 0.0));

    // Nothing has reached the organs at t = 0
    for column in 0..3 {
        assert_eq!(output.tacs[[0, 0, column]], 0.0);
    }

    let tumor = output.series(0, "Tumor1").unwrap();
    assert!(tumor[500] > 0.0);
    assert!(tumor[999] > 0.0);
}

#[test]
fn test_kidney_uptake_rises_then_falls() {
    let output = run(&demo_request());
    let kidney = output.series(0, "Kidney").unwrap();

    let (peak, max) = kidney
        .iter()
        .enumerate()
        .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });

    assert!(peak > 0 && peak < 999);
    assert!(kidney[999] < max);
}

#[test]
fn test_volume_and_density_grid() {
    let volumes: Vec<f64> = (0..6).map(|i| 0.1 + 0.08 * i as f64).collect();
    let densities = vec![0.1, 0.2, 0.3, 0.4];
    let plan = SweepPlan::grid(vec![
        ("Tumor1Volume", volumes.clone()),
        ("Rden_Tumor1", densities.clone()),
    ])
    .unwrap();
    let request = demo_request()
        .with_span(TimeSpan::until(500.0, 200))
        .with_observables(["Tumor1"])
        .with_sweep(plan);

    let output = run(&request);

    assert_eq!(output.tacs.dim(), (24, 200, 1));
    assert_eq!(output.swept_parameters, names(&["Tumor1Volume", "Rden_Tumor1"]));
    assert!(output.tacs.iter().all(|v| v.is_finite() && *v >= 0.0));

    // Within each volume block, more receptors retain more activity at the end
    for block in 0..volumes.len() {
        let finals: Vec<f64> = (0..densities.len())
            .map(|j| output.tacs[[block * densities.len() + j, 199, 0]])
            .collect();
        assert!(
            finals.windows(2).all(|w| w[1] > w[0]),
            "final Tumor1 activity should grow with Rden_Tumor1: {finals:?}"
        );
    }
}

#[test]
fn test_sweep_worker_limit_does_not_change_results() {
    let plan = SweepPlan::grid(vec![("Rden_Tumor1", vec![0.1, 0.3, 0.5])]).unwrap();
    let request = demo_request()
        .with_span(TimeSpan::until(120.0, 61))
        .with_sweep(plan);

    let parallel = run(&request);
    let sequential = run(&request.clone().with_options(SweepOptions::default().with_max_workers(1)));

    assert_eq!(parallel.tacs, sequential.tacs);
}

#[test]
fn test_unknown_model_name() {
    let request = RunRequest::new(ModelSource::named("no_such_model"));
    let result = run_model_with(&request, &ModelLibrary::bundled(), &Rk4Engine::default());
    assert!(matches!(result, Err(PbpkError::ModelNotFound(_))));
}

#[test]
fn test_model_loaded_from_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("copy.json");
    demo_document().write_to_file(&path).unwrap();

    let request = demo_request()
        .with_span(TimeSpan::until(60.0, 31))
        .with_observables(["Kidney"]);
    let from_library = run(&request);
    let from_path = run(&RunRequest {
        model: ModelSource::path(&path),
        ..request
    });

    assert_eq!(from_library.tacs, from_path.tacs);
}

#[test]
fn test_csv_export_of_sweep() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tacs.csv");
    let plan = SweepPlan::grid(vec![("Rden_Tumor1", vec![0.1, 0.2])]).unwrap();
    let output = run(
        &demo_request()
            .with_span(TimeSpan::until(60.0, 25))
            .with_sweep(plan),
    );

    export_tacs_csv(&output.time, &output.tacs, &output.observables, &path, None).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 25 + 1);
    assert!(lines[0].starts_with("Time (min)"));
    assert!(lines[0].contains("Tumor1[0] (MBq)"));
    assert!(lines[0].contains("Kidney[1] (MBq)"));
    assert_eq!(lines[1].split(',').count(), 1 + 2 * 3);
}

#[test]
fn test_exporter_writes_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("single.csv");
    let output = run(&demo_request().with_span(TimeSpan::until(30.0, 16)));

    let config = CsvConfig {
        include_metadata: true,
        ..CsvConfig::default()
    };
    CsvExporter::new(config).export(&output, &path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with('#'));
    assert!(content.contains("psma_demo"));
    let data_lines = content.lines().filter(|line| !line.starts_with('#')).count();
    assert_eq!(data_lines, 16 + 1);
}
