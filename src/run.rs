//! Run orchestration
//!
//! [`run_model`] is the one-call entry point: load a model, configure it,
//! simulate it once or over a sweep, and return the time-activity curves.
//! [`Session`] keeps a loaded model around for repeated reconfiguration
//! and simulation without reloading it.

use std::path::Path;

use ndarray::{Array1, Array3, ArrayView1, ArrayView2, Axis, s};

use crate::configure::{ConfigurationBundle, ConfigurationReport, ConfiguredModel, configure};
use crate::engine::{Rk4Engine, SimulationEngine, TimeSpan};
use crate::error::Result;
use crate::models::{ModelDocument, ModelLibrary, ModelSource};
use crate::sweep::{SweepOptions, SweepPlan, simulate_single, sweep};

/// Regions reported when the caller names none
pub const DEFAULT_OBSERVABLES: [&str; 18] = [
    "Tumor1", "Tumor2", "Kidney", "Heart", "SG", "Bone", "TumorRest", "Spleen", "Liver",
    "Prostate", "GI", "Rest", "Skin", "Muscle", "Brain", "RedMarrow", "Lungs", "Adipose",
];

/// [`DEFAULT_OBSERVABLES`] as owned strings
pub fn default_observables() -> Vec<String> {
    DEFAULT_OBSERVABLES.iter().map(|name| name.to_string()).collect()
}

// =================================================================================================
// Request
// =================================================================================================

/// Everything needed for one call to [`run_model`]
///
/// # Example
///
/// ```rust
/// use pbpk_rs::run::RunRequest;
/// use pbpk_rs::engine::TimeSpan;
/// use pbpk_rs::models::ModelSource;
///
/// let request = RunRequest::new(ModelSource::named("psma_demo"))
///     .with_span(TimeSpan::until(500.0, 1000))
///     .with_observables(["Tumor1", "SG", "Kidney"]);
///
/// assert_eq!(request.bundle.hot_amount, 10.0);
/// assert_eq!(request.observables.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub model: ModelSource,
    pub span: TimeSpan,
    pub bundle: ConfigurationBundle,
    pub observables: Vec<String>,
    pub sweep: Option<SweepPlan>,
    pub options: SweepOptions,
}

impl RunRequest {
    /// Request with defaults: 0-60 min on 100 points, 10 nmol hot,
    /// 100 nmol cold, every default region
    pub fn new(model: ModelSource) -> Self {
        Self {
            model,
            span: TimeSpan::default(),
            bundle: ConfigurationBundle::default(),
            observables: default_observables(),
            sweep: None,
            options: SweepOptions::default(),
        }
    }

    pub fn with_span(mut self, span: TimeSpan) -> Self {
        self.span = span;
        self
    }

    pub fn with_bundle(mut self, bundle: ConfigurationBundle) -> Self {
        self.bundle = bundle;
        self
    }

    pub fn with_observables<I, S>(mut self, observables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observables = observables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sweep(mut self, plan: SweepPlan) -> Self {
        self.sweep = Some(plan);
        self
    }

    pub fn with_options(mut self, options: SweepOptions) -> Self {
        self.options = options;
        self
    }
}

// =================================================================================================
// Output
// =================================================================================================

/// Time-activity curves of a run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub model_name: String,
    pub engine_name: String,
    pub span: TimeSpan,

    /// Sampled instants **\[min\]**
    pub time: Array1<f64>,

    /// `[curves, steps, observables]` **\[MBq\]**; one curve per sweep combination
    pub tacs: Array3<f64>,

    pub observables: Vec<String>,

    /// Names of the swept parameters; empty for a single run
    pub swept_parameters: Vec<String>,

    pub bundle: ConfigurationBundle,
    pub report: ConfigurationReport,
}

impl RunOutput {
    /// Number of curves (sweep combinations, or 1)
    pub fn curves(&self) -> usize {
        self.tacs.len_of(Axis(0))
    }

    pub fn steps(&self) -> usize {
        self.tacs.len_of(Axis(1))
    }

    /// `[steps, observables]` table of one curve
    pub fn curve(&self, index: usize) -> Option<ArrayView2<'_, f64>> {
        (index < self.curves()).then(|| self.tacs.index_axis(Axis(0), index))
    }

    /// Series of `observable` in curve `index`
    pub fn series(&self, index: usize, observable: &str) -> Option<ArrayView1<'_, f64>> {
        let column = self.observables.iter().position(|name| name == observable)?;
        (index < self.curves()).then(|| self.tacs.slice(s![index, .., column]))
    }
}

// =================================================================================================
// Entry points
// =================================================================================================

/// Load, configure and simulate with the library from the environment and the RK4 engine
pub fn run_model(request: &RunRequest) -> Result<RunOutput> {
    run_model_with(request, &ModelLibrary::from_env(), &Rk4Engine::default())
}

/// [`run_model`] with an explicit library and engine
pub fn run_model_with<E>(request: &RunRequest, library: &ModelLibrary, engine: &E) -> Result<RunOutput>
where
    E: SimulationEngine + ?Sized,
{
    let base = request.model.load(library)?;
    let configured = configure(&base, &request.bundle)?;
    log::info!(
        "Running model {} over [{}, {}] min on {} points",
        base.name(),
        request.span.start,
        request.span.stop,
        request.span.steps
    );
    simulate_configured(
        &configured,
        &request.bundle,
        &request.span,
        &request.observables,
        request.sweep.as_ref(),
        engine,
        &request.options,
    )
}

fn simulate_configured<E>(
    configured: &ConfiguredModel,
    bundle: &ConfigurationBundle,
    span: &TimeSpan,
    observables: &[String],
    plan: Option<&SweepPlan>,
    engine: &E,
    options: &SweepOptions,
) -> Result<RunOutput>
where
    E: SimulationEngine + ?Sized,
{
    let tacs = match plan {
        Some(plan) => sweep(configured, plan, span, observables, engine, options)?,
        None => simulate_single(configured, span, observables, engine, &options.aggregation)?,
    };

    Ok(RunOutput {
        model_name: configured.document().name().to_string(),
        engine_name: engine.name().to_string(),
        span: *span,
        time: span.time_vector(),
        tacs,
        observables: observables.to_vec(),
        swept_parameters: plan.map(|p| p.parameters().to_vec()).unwrap_or_default(),
        bundle: bundle.clone(),
        report: configured.report().clone(),
    })
}

// =================================================================================================
// Session
// =================================================================================================

/// A loaded model kept ready for repeated runs
///
/// The pristine base document is kept aside; every reconfiguration starts
/// from it, so overrides never accumulate across calls.
#[derive(Debug, Clone)]
pub struct Session<E = Rk4Engine> {
    base: ModelDocument,
    bundle: ConfigurationBundle,
    configured: ConfiguredModel,
    engine: E,
    options: SweepOptions,
}

impl Session<Rk4Engine> {
    /// Load a model and configure it
    pub fn open(source: &ModelSource, library: &ModelLibrary, bundle: ConfigurationBundle) -> Result<Self> {
        Self::from_document(source.load(library)?, bundle)
    }

    /// Session over an in-memory document
    pub fn from_document(base: ModelDocument, bundle: ConfigurationBundle) -> Result<Self> {
        let configured = configure(&base, &bundle)?;
        Ok(Self {
            base,
            bundle,
            configured,
            engine: Rk4Engine::default(),
            options: SweepOptions::default(),
        })
    }
}

impl<E: SimulationEngine> Session<E> {
    /// Swap the simulation engine
    pub fn with_engine<F: SimulationEngine>(self, engine: F) -> Session<F> {
        Session {
            base: self.base,
            bundle: self.bundle,
            configured: self.configured,
            engine,
            options: self.options,
        }
    }

    pub fn with_options(mut self, options: SweepOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base(&self) -> &ModelDocument {
        &self.base
    }

    pub fn bundle(&self) -> &ConfigurationBundle {
        &self.bundle
    }

    pub fn configured(&self) -> &ConfiguredModel {
        &self.configured
    }

    pub fn report(&self) -> &ConfigurationReport {
        self.configured.report()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Replace the configuration
    ///
    /// On error the session keeps its previous configuration.
    pub fn reconfigure(&mut self, bundle: ConfigurationBundle) -> Result<&ConfigurationReport> {
        let configured = configure(&self.base, &bundle)?;
        self.configured = configured;
        self.bundle = bundle;
        Ok(self.configured.report())
    }

    /// Simulate the current configuration, once or over `plan`
    pub fn simulate(
        &self,
        span: &TimeSpan,
        observables: &[String],
        plan: Option<&SweepPlan>,
    ) -> Result<RunOutput> {
        simulate_configured(
            &self.configured,
            &self.bundle,
            span,
            observables,
            plan,
            &self.engine,
            &self.options,
        )
    }

    /// Write the configured document to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.configured.save(path)?;
        log::info!("Saved configured model {} to {}", self.base.name(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = RunRequest::new(ModelSource::named("psma_demo"));

        assert_eq!(request.span, TimeSpan::new(0.0, 60.0, 100));
        assert_eq!(request.bundle.hot_amount, 10.0);
        assert_eq!(request.bundle.cold_amount, Some(100.0));
        assert_eq!(request.observables.len(), 18);
        assert_eq!(request.observables[0], "Tumor1");
        assert!(request.sweep.is_none());
    }

    #[test]
    fn test_default_observables_are_distinct() {
        let mut names = default_observables();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), DEFAULT_OBSERVABLES.len());
    }
}
