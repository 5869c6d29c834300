//! Simulation engines
//!
//! An engine turns a serialised [`ModelDocument`] and a [`TimeSpan`] into a
//! [`SimulationRun`]: one concentration series per species on the sampled
//! time grid, plus the volume every compartment had during the run.
//!
//! The serialised form is the contract. Sweep workers never share a
//! document: each one deserialises its own copy, edits it, and hands the
//! text back to the engine.

use std::collections::HashMap;

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{PbpkError, Result};
use crate::models::{CompartmentalSystem, ModelDocument};
use crate::solver::{RK4Solver, Solver, SolverConfiguration};

// =================================================================================================
// Time span
// =================================================================================================

/// Sampled time grid **\[min\]**
///
/// `steps` evenly spaced instants from `start` to `stop`, both included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan {
    pub start: f64,
    pub stop: f64,
    pub steps: usize,
}

impl TimeSpan {
    pub fn new(start: f64, stop: f64, steps: usize) -> Self {
        Self { start, stop, steps }
    }

    /// Grid starting at t = 0
    pub fn until(stop: f64, steps: usize) -> Self {
        Self::new(0.0, stop, steps)
    }

    pub fn validate(&self) -> Result<()> {
        self.solver_configuration(1).validate()
    }

    /// The sampled instants
    pub fn time_vector(&self) -> Array1<f64> {
        Array1::linspace(self.start, self.stop, self.steps)
    }

    pub(crate) fn solver_configuration(&self, substeps: usize) -> SolverConfiguration {
        SolverConfiguration::time_evolution(self.start, self.stop, self.steps).with_substeps(substeps)
    }
}

impl Default for TimeSpan {
    fn default() -> Self {
        Self::until(60.0, 100)
    }
}

// =================================================================================================
// Simulation run
// =================================================================================================

/// Output of one simulation
#[derive(Debug, Clone)]
pub struct SimulationRun {
    time: Array1<f64>,
    species_ids: Vec<String>,
    columns: HashMap<String, usize>,
    /// `[steps, species]`
    concentrations: Array2<f64>,
    compartment_sizes: HashMap<String, f64>,
}

impl SimulationRun {
    /// Assemble a run from its parts
    ///
    /// # Errors
    ///
    /// [`PbpkError::Integration`] when the table shape does not match the
    /// time grid and species list.
    pub fn new(
        time: Array1<f64>,
        species_ids: Vec<String>,
        concentrations: Array2<f64>,
        compartment_sizes: HashMap<String, f64>,
    ) -> Result<Self> {
        if concentrations.dim() != (time.len(), species_ids.len()) {
            return Err(PbpkError::Integration(format!(
                "concentration table is {:?}, expected ({}, {})",
                concentrations.dim(),
                time.len(),
                species_ids.len()
            )));
        }
        let columns = species_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Ok(Self {
            time,
            species_ids,
            columns,
            concentrations,
            compartment_sizes,
        })
    }

    pub fn time(&self) -> &Array1<f64> {
        &self.time
    }

    /// Number of sampled instants
    pub fn steps(&self) -> usize {
        self.time.len()
    }

    pub fn species_ids(&self) -> &[String] {
        &self.species_ids
    }

    /// Concentration series of a species **\[nmol/L\]**
    pub fn concentration(&self, species_id: &str) -> Option<ArrayView1<'_, f64>> {
        self.columns
            .get(species_id)
            .map(|&i| self.concentrations.column(i))
    }

    /// Series by column label; accepts `[id]` as well as the bare id
    pub fn column(&self, label: &str) -> Option<ArrayView1<'_, f64>> {
        let id = label
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(label);
        self.concentration(id)
    }

    /// Volume of a compartment during the run **\[L\]**
    pub fn compartment_size(&self, compartment_id: &str) -> Option<f64> {
        self.compartment_sizes.get(compartment_id).copied()
    }

    pub fn compartment_sizes(&self) -> &HashMap<String, f64> {
        &self.compartment_sizes
    }
}

// =================================================================================================
// Engine trait
// =================================================================================================

/// Anything that can simulate a serialised model
///
/// Engines are shared by every sweep worker, hence `Send + Sync`.
pub trait SimulationEngine: Send + Sync {
    /// Simulate the model over `span`
    fn simulate(&self, serialized: &str, span: &TimeSpan) -> Result<SimulationRun>;

    /// Engine name (used to display and logging)
    fn name(&self) -> &str;

    /// Simulate a document directly
    fn simulate_document(&self, document: &ModelDocument, span: &TimeSpan) -> Result<SimulationRun> {
        self.simulate(&document.to_json()?, span)
    }
}

/// Built-in engine: RK4 on the compiled [`CompartmentalSystem`]
///
/// Every output interval is split into at least `substeps` internal steps,
/// and into more when needed to keep the step under `max_step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rk4Engine {
    substeps: usize,
    max_step: f64,
}

impl Rk4Engine {
    /// Internal RK4 steps per output interval unless told otherwise
    pub const DEFAULT_SUBSTEPS: usize = 10;

    /// Largest internal step unless told otherwise **\[min\]**
    pub const DEFAULT_MAX_STEP: f64 = 0.1;

    pub fn new(substeps: usize) -> Self {
        Self {
            substeps,
            max_step: Self::DEFAULT_MAX_STEP,
        }
    }

    /// Builder pattern: cap the internal step
    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.max_step = max_step;
        self
    }

    pub fn substeps(&self) -> usize {
        self.substeps
    }

    pub fn max_step(&self) -> f64 {
        self.max_step
    }

    /// Internal steps per output interval for `span`
    pub fn substeps_for(&self, span: &TimeSpan) -> usize {
        let interval = (span.stop - span.start) / (span.steps.max(2) as f64 - 1.0);
        let needed = if self.max_step > 0.0 && interval.is_finite() {
            (interval / self.max_step).ceil() as usize
        } else {
            0
        };
        self.substeps.max(needed)
    }
}

impl Default for Rk4Engine {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SUBSTEPS)
    }
}

impl SimulationEngine for Rk4Engine {
    fn simulate(&self, serialized: &str, span: &TimeSpan) -> Result<SimulationRun> {
        let document = ModelDocument::from_json(serialized)?;
        let system = CompartmentalSystem::compile(&document)?;
        let config = span.solver_configuration(self.substeps_for(span));

        let result = RK4Solver::new().solve(&system, &config)?;

        let concentrations = Array2::from_shape_fn(
            (result.len(), system.species_ids().len()),
            |(t, s)| result.trajectory[t].amounts()[s] / system.species_volume(s),
        );

        SimulationRun::new(
            Array1::from_vec(result.time_points),
            system.species_ids().to_vec(),
            concentrations,
            system.compartment_sizes().clone(),
        )
    }

    fn name(&self) -> &str {
        "RK4"
    }
}

// =================================================================================================
// Tests
// =================================================================================================
