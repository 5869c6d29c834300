//! pbpk - Runs a PBPK model and prints or exports its time-activity curves
//!
//! ```text
//! pbpk psma_demo --stop 500 --steps 1000 --hot 0.005 --cold 3.995 \
//!      -p lambdaPhys=0.00632 -o Tumor1 -o SG -o Kidney --csv tacs.csv
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pbpk_rs::aggregate::{AggregationSettings, RegionMatch, SizeSource};
use pbpk_rs::configure::ConfigurationBundle;
use pbpk_rs::engine::TimeSpan;
use pbpk_rs::models::ModelSource;
use pbpk_rs::output::{CsvConfig, CsvExporter, Exporter};
use pbpk_rs::run::{RunOutput, RunRequest, run_model};
use pbpk_rs::sweep::{SweepOptions, SweepPlan};

#[derive(Parser, Debug)]
#[command(name = "pbpk")]
#[command(about = "Simulate a radioligand PBPK model and report time-activity curves")]
struct Cli {
    /// Bundled model name or path to a model document
    model: String,

    /// First sampled instant (min)
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// Last sampled instant (min)
    #[arg(long, default_value_t = 60.0)]
    stop: f64,

    /// Number of sampled instants
    #[arg(long, default_value_t = 100)]
    steps: usize,

    /// Injected labelled ligand (nmol)
    #[arg(long, default_value_t = ConfigurationBundle::DEFAULT_HOT_AMOUNT)]
    hot: f64,

    /// Injected unlabelled ligand (nmol)
    #[arg(long, default_value_t = ConfigurationBundle::DEFAULT_COLD_AMOUNT)]
    cold: f64,

    /// Leave the cold species at its declared amount
    #[arg(long, conflicts_with = "cold")]
    no_cold: bool,

    /// Parameter override
    #[arg(short = 'p', long = "parameter", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    parameters: Vec<(String, f64)>,

    /// Compartment volume override (L)
    #[arg(short = 'V', long = "volume", value_name = "COMPARTMENT=LITRES", value_parser = parse_assignment)]
    volumes: Vec<(String, f64)>,

    /// Initial species amount (nmol)
    #[arg(short = 's', long = "species", value_name = "COMP.SPECIES=AMOUNT", value_parser = parse_assignment)]
    species: Vec<(String, f64)>,

    /// Region to report (repeatable); every default region when omitted
    #[arg(short = 'o', long = "observable", value_name = "REGION")]
    observables: Vec<String>,

    /// Swept parameter values; several --sweep flags form a grid
    #[arg(long = "sweep", value_name = "NAME=V1,V2,...", value_parser = parse_sweep_axis)]
    sweep: Vec<(String, Vec<f64>)>,

    /// Maximum number of concurrent sweep workers (capped at available cores)
    #[arg(long)]
    workers: Option<usize>,

    /// Match regions anywhere in compartment names instead of as a prefix
    #[arg(long)]
    contains: bool,

    /// Weight concentrations by declared rather than simulated volumes
    #[arg(long)]
    declared_sizes: bool,

    /// Write the curves to a CSV file
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,
}

fn parse_assignment(text: &str) -> Result<(String, f64), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{text}'"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value in '{text}': {e}"))?;
    Ok((name.trim().to_string(), value))
}

fn parse_sweep_axis(text: &str) -> Result<(String, Vec<f64>), String> {
    let (name, values) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=V1,V2,..., got '{text}'"))?;
    let values = values
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("invalid value '{v}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((name.trim().to_string(), values))
}

impl Cli {
    fn request(&self) -> pbpk_rs::Result<RunRequest> {
        let mut bundle = ConfigurationBundle::new(self.hot);
        if !self.no_cold {
            bundle = bundle.with_cold_amount(self.cold);
        }
        bundle.parameters.extend(self.parameters.iter().cloned());
        bundle.compartment_volumes.extend(self.volumes.iter().cloned());
        bundle.species.extend(self.species.iter().cloned());

        let mut aggregation = AggregationSettings::default();
        if self.contains {
            aggregation = aggregation.with_matching(RegionMatch::Contains);
        }
        if self.declared_sizes {
            aggregation = aggregation.with_size_source(SizeSource::Declared);
        }
        let mut options = SweepOptions::default().with_aggregation(aggregation);
        if let Some(workers) = self.workers {
            options = options.with_max_workers(workers);
        }

        let mut request = RunRequest::new(ModelSource::parse(&self.model))
            .with_span(TimeSpan::new(self.start, self.stop, self.steps))
            .with_bundle(bundle)
            .with_options(options);
        if !self.observables.is_empty() {
            request = request.with_observables(self.observables.iter().cloned());
        }
        if !self.sweep.is_empty() {
            request = request.with_sweep(SweepPlan::grid(self.sweep.clone())?);
        }
        Ok(request)
    }
}

/// Final value of every curve, one line per (curve, region)
fn print_summary(output: &RunOutput) {
    let last = output.steps() - 1;
    println!(
        "{} curve(s) of {} region(s) at t = {} min",
        output.curves(),
        output.observables.len(),
        output.time[last]
    );
    for curve in 0..output.curves() {
        for name in &output.observables {
            if let Some(series) = output.series(curve, name) {
                println!("  [{curve}] {name:<12} {:>14.6} MBq", series[last]);
            }
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pbpk=info,pbpk_rs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let request = match cli.request() {
        Ok(request) => request,
        Err(e) => {
            error!("Invalid arguments: {e}");
            return ExitCode::FAILURE;
        }
    };

    let output = match run_model(&request) {
        Ok(output) => output,
        Err(e) => {
            error!("Run failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    for name in output.report.unresolved() {
        warn!("Ignored override: {name}");
    }

    if let Some(path) = &cli.csv {
        let exporter = CsvExporter::new(CsvConfig {
            include_metadata: true,
            ..CsvConfig::default()
        });
        if let Err(e) = exporter.export(&output, path) {
            error!("Export failed: {e}");
            return ExitCode::FAILURE;
        }
        info!("Curves written to {}", path.display());
    }

    print_summary(&output);
    ExitCode::SUCCESS
}
