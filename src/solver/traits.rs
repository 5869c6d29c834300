//! Numerical solver traits and types
//!
//! - `Solver`: the interface every time integrator implements
//! - `SolverConfiguration`: output grid and internal step refinement
//! - `SimulationResult`: sampled trajectory plus free-form metadata

use std::collections::HashMap;

use crate::error::{PbpkError, Result};
use crate::physics::{PhysicalModel, PhysicalState};

// =================================================================================================
// Solver configuration
// =================================================================================================

/// Configuration for a time integration
///
/// The trajectory is sampled on `output_points` evenly spaced instants from
/// `start` to `stop`, both included. Between two samples the solver takes
/// `substeps` internal steps, so the effective step is
/// `(stop - start) / (output_points - 1) / substeps`.
///
/// # Example
///
/// ```rust
/// use pbpk_rs::solver::SolverConfiguration;
///
/// let config = SolverConfiguration::time_evolution(0.0, 500.0, 1000).with_substeps(4);
/// assert!(config.validate().is_ok());
/// assert!((config.output_interval() - 500.0 / 999.0).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfiguration {
    /// First sampled instant (min)
    pub start: f64,

    /// Last sampled instant (min)
    pub stop: f64,

    /// Number of sampled instants, including both ends
    pub output_points: usize,

    /// Internal steps per output interval
    pub substeps: usize,
}

impl SolverConfiguration {
    /// Create a time evolution configuration with one internal step per sample
    pub fn time_evolution(start: f64, stop: f64, output_points: usize) -> Self {
        Self {
            start,
            stop,
            output_points,
            substeps: 1,
        }
    }

    /// Builder pattern: set internal refinement
    pub fn with_substeps(mut self, substeps: usize) -> Self {
        self.substeps = substeps;
        self
    }

    /// Spacing between two sampled instants
    pub fn output_interval(&self) -> f64 {
        (self.stop - self.start) / (self.output_points as f64 - 1.0)
    }

    /// Internal integration step
    pub fn dt(&self) -> f64 {
        self.output_interval() / self.substeps as f64
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || !self.stop.is_finite() {
            return Err(PbpkError::InvalidConfiguration(
                "start and stop times must be finite".to_string(),
            ));
        }
        if self.stop <= self.start {
            return Err(PbpkError::InvalidConfiguration(format!(
                "stop time ({}) must be greater than start time ({})",
                self.stop, self.start
            )));
        }
        if self.output_points < 2 {
            return Err(PbpkError::InvalidConfiguration(format!(
                "at least 2 output points are required, got {}",
                self.output_points
            )));
        }
        if self.substeps == 0 {
            return Err(PbpkError::InvalidConfiguration(
                "substeps must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =================================================================================================
// Simulation result
// =================================================================================================

/// Sampled trajectory of a time integration
#[derive(Clone, Debug)]
pub struct SimulationResult {
    /// Sampled instants
    pub time_points: Vec<f64>,

    /// State at every sampled instant
    pub trajectory: Vec<PhysicalState>,

    /// Solver-provided details (method, step size, evaluations)
    pub metadata: HashMap<String, String>,
}

impl SimulationResult {
    pub fn new(time_points: Vec<f64>, trajectory: Vec<PhysicalState>) -> Self {
        Self {
            time_points,
            trajectory,
            metadata: HashMap::new(),
        }
    }

    /// Number of sampled instants
    pub fn len(&self) -> usize {
        self.time_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_points.is_empty()
    }

    /// State at the last sampled instant
    pub fn final_state(&self) -> Option<&PhysicalState> {
        self.trajectory.last()
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }
}

// =================================================================================================
// Solver trait
// =================================================================================================

/// Time integrator for a [`PhysicalModel`]
///
/// Solvers are stateless: the same instance can integrate any number of
/// models, from any number of threads.
pub trait Solver: Send + Sync {
    /// Integrate `model` from its initial state over the configured grid
    fn solve(&self, model: &dyn PhysicalModel, config: &SolverConfiguration)
    -> Result<SimulationResult>;

    /// Solver name (used to display and logging)
    fn name(&self) -> &'static str;
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_configuration() {
        let config = SolverConfiguration::time_evolution(0.0, 60.0, 100);
        assert!(config.validate().is_ok());
        assert_eq!(config.substeps, 1);
    }

    #[test]
    fn test_rejects_reversed_span() {
        let config = SolverConfiguration::time_evolution(10.0, 10.0, 100);
        assert!(matches!(
            config.validate(),
            Err(PbpkError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_single_point() {
        let config = SolverConfiguration::time_evolution(0.0, 10.0, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_substeps() {
        let config = SolverConfiguration::time_evolution(0.0, 10.0, 11).with_substeps(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_step_sizes() {
        let config = SolverConfiguration::time_evolution(0.0, 10.0, 11).with_substeps(5);
        assert!((config.output_interval() - 1.0).abs() < 1e-12);
        assert!((config.dt() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_result_accessors() {
        let mut result = SimulationResult::new(
            vec![0.0, 1.0],
            vec![
                PhysicalState::from_vec(vec![1.0]),
                PhysicalState::from_vec(vec![2.0]),
            ],
        );
        result.add_metadata("solver", "test");

        assert_eq!(result.len(), 2);
        assert_eq!(result.final_state().unwrap().amounts()[0], 2.0);
        assert_eq!(result.metadata["solver"], "test");
    }
}
