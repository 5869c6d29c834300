//! Fixture documents and instrumented engines for integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use pbpk_rs::engine::{Rk4Engine, SimulationEngine, SimulationRun, TimeSpan};
use pbpk_rs::error::{PbpkError, Result};
use pbpk_rs::models::{EntityIndex, ModelDocument, Reaction};

// =================================================================================================
// Documents
// =================================================================================================

/// Vein and three regions with no reactions
///
/// Concentrations stay at their initial values, so every time-activity
/// curve is flat and proportional to `lambdaPhys`.
pub fn static_document(lambda: f64) -> ModelDocument {
    ModelDocument::new("static")
        .with_parameter("p_lambda", "lambdaPhys", lambda)
        .with_parameter("p_tvol", "Tumor1Volume", 0.2)
        .with_parameter("p_tcoeff", "Tumor1VolumeCoeff", 0.5)
        .with_compartment("c_vein", "Vein", 3.0)
        .with_computed_compartment("c_t1", "Tumor1", 0.1, &["p_tvol", "p_tcoeff"])
        .with_compartment("c_tr", "TumorRest", 0.4)
        .with_compartment("c_rest", "Rest", 5.0)
        .with_species("s_vein_hot", "Hot", "c_vein", 0.0)
        .with_species("s_vein_cold", "Cold", "c_vein", 0.0)
        .with_species("s_t1_hot", "Hot", "c_t1", 1.0)
        .with_species("s_t1_bound", "HotBound", "c_t1", 0.5)
        .with_species("s_t1_cold", "Cold", "c_t1", 7.0)
        .with_species("s_tr_hot", "Hot", "c_tr", 2.0)
        .with_species("s_rest_hot", "Hot", "c_rest", 4.0)
}

/// Small PBPK network: vein exchanging with a tumour and a kidney
///
/// The tumour binds ligand at a rate proportional to `Rden_Tumor1`; the
/// kidney clears it.
pub fn exchange_document() -> ModelDocument {
    ModelDocument::new("exchange")
        .with_parameter("p_lambda", "lambdaPhys", 0.00632)
        .with_parameter("p_kon", "k_on", 0.04)
        .with_parameter("p_rden", "Rden_Tumor1", 0.3)
        .with_parameter("p_tvol", "Tumor1Volume", 0.2)
        .with_parameter("p_tcoeff", "Tumor1VolumeCoeff", 0.5)
        .with_parameter("p_qt", "Q_Tumor1", 0.01)
        .with_parameter("p_qk", "Q_Kidney", 0.6)
        .with_parameter("p_clk", "CL_Kidney", 0.1)
        .with_compartment("c_vein", "Vein", 3.0)
        .with_computed_compartment("c_t1", "Tumor1", 0.1, &["p_tvol", "p_tcoeff"])
        .with_compartment("c_kid", "Kidney", 0.3)
        .with_species("s_vein_hot", "Hot", "c_vein", 0.0)
        .with_species("s_vein_cold", "Cold", "c_vein", 0.0)
        .with_species("s_t1_hot", "Hot", "c_t1", 0.0)
        .with_species("s_t1_bound", "HotBound", "c_t1", 0.0)
        .with_species("s_kid_hot", "Hot", "c_kid", 0.0)
        .with_reaction(Reaction::flow("r_t_in", "s_vein_hot", "s_t1_hot", &["p_qt"]))
        .with_reaction(Reaction::flow("r_t_out", "s_t1_hot", "s_vein_hot", &["p_qt"]))
        .with_reaction(Reaction::mass_action(
            "r_t_bind",
            &["s_t1_hot"],
            &["s_t1_bound"],
            &["p_kon", "p_rden"],
        ))
        .with_reaction(Reaction::flow("r_k_in", "s_vein_hot", "s_kid_hot", &["p_qk"]))
        .with_reaction(Reaction::flow("r_k_out", "s_kid_hot", "s_vein_hot", &["p_qk"]))
        .with_reaction(Reaction::mass_action("r_k_clear", &["s_kid_hot"], &[], &["p_clk"]))
}

/// Value of the parameter called `name` in a serialised document
pub fn parameter_in(serialized: &str, name: &str) -> Result<f64> {
    let document = ModelDocument::from_json(serialized)?;
    let index = EntityIndex::build(&document);
    index
        .parameter_id(name)
        .and_then(|id| document.parameter(id))
        .map(|p| p.value)
        .ok_or_else(|| PbpkError::MissingParameter(name.to_string()))
}

// =================================================================================================
// Engines
// =================================================================================================

/// RK4 engine that sleeps longer for smaller values of a parameter
///
/// Early combinations of an increasing sweep finish last, so the result
/// order only matches the plan if the sweep reorders completions.
pub struct DelayEngine {
    pub inner: Rk4Engine,
    pub parameter: String,
    pub scale_ms: f64,
}

impl DelayEngine {
    pub fn new(parameter: &str, scale_ms: f64) -> Self {
        Self {
            inner: Rk4Engine::default(),
            parameter: parameter.to_string(),
            scale_ms,
        }
    }
}

impl SimulationEngine for DelayEngine {
    fn simulate(&self, serialized: &str, span: &TimeSpan) -> Result<SimulationRun> {
        let value = parameter_in(serialized, &self.parameter)?;
        let delay = (self.scale_ms / value.max(1e-9)).min(200.0);
        thread::sleep(Duration::from_micros((delay * 1000.0) as u64));
        self.inner.simulate(serialized, span)
    }

    fn name(&self) -> &str {
        "Delayed RK4"
    }
}

/// RK4 engine counting its calls
#[derive(Default)]
pub struct CountingEngine {
    pub inner: Rk4Engine,
    pub calls: AtomicUsize,
}

impl CountingEngine {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SimulationEngine for CountingEngine {
    fn simulate(&self, serialized: &str, span: &TimeSpan) -> Result<SimulationRun> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.simulate(serialized, span)
    }

    fn name(&self) -> &str {
        "Counting RK4"
    }
}

/// Engine failing whenever a parameter equals a given value
pub struct FailingEngine {
    pub inner: Rk4Engine,
    pub parameter: String,
    pub poison: f64,
}

impl FailingEngine {
    pub fn new(parameter: &str, poison: f64) -> Self {
        Self {
            inner: Rk4Engine::default(),
            parameter: parameter.to_string(),
            poison,
        }
    }
}

impl SimulationEngine for FailingEngine {
    fn simulate(&self, serialized: &str, span: &TimeSpan) -> Result<SimulationRun> {
        if parameter_in(serialized, &self.parameter)? == self.poison {
            return Err(PbpkError::Integration("poisoned parameter value".to_string()));
        }
        self.inner.simulate(serialized, span)
    }

    fn name(&self) -> &str {
        "Failing RK4"
    }
}
