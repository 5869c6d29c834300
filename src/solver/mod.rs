//! Numerical solvers
//!
//! A numerical solver applies a time-stepping scheme to the equations
//! provided by a [`PhysicalModel`](crate::physics::PhysicalModel).
//!
//! # The Architecture (WHAT vs HOW)
//!
//! 1. **Model** (`PhysicalModel`) - WHAT to integrate
//!    - Rate laws, initial amounts
//!
//! 2. **Configuration** (`SolverConfiguration`) - HOW to sample it
//!    - Time span, number of output points, internal refinement
//!
//! 3. **Solver** (`Solver` trait) - The numerical method
//!    - Applies the numerical scheme
//!    - Returns the sampled trajectory
//!    - Independent of physiology
//!
//! # Workflow Diagram
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────────┐
//! │  Physical Model │     │ Solver Configuration │
//! └────────┬────────┘     └──────────┬───────────┘
//!          └──────────┬──────────────┘
//!            ┌────────▼────────┐
//!            │ Numerical Solver│ ← RK4
//!            └────────┬────────┘
//!            ┌────────▼────────────┐
//!            │ Simulation Result   │ ← sampled trajectory + metadata
//!            └─────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! Solvers return [`PbpkError::Integration`](crate::error::PbpkError::Integration)
//! when a state turns NaN or infinite, and
//! [`PbpkError::InvalidConfiguration`](crate::error::PbpkError::InvalidConfiguration)
//! for an unusable time grid.

// =================================================================================================
// Module Declarations
// =================================================================================================
mod traits;
mod methods;

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use traits::{SimulationResult, Solver, SolverConfiguration};

pub use methods::RK4Solver;

// =================================================================================================
// Helper Functions
// =================================================================================================

use crate::error::{PbpkError, Result};
use crate::physics::PhysicalState;

/// Validate physical state for numerical issues
///
/// # Arguments
///
/// * `state` - Physical state to validate
/// * `step` - Current output step (for error reporting)
///
/// # Returns
///
/// `Ok(())` if every amount is finite, `Err` with diagnostic information otherwise
pub(crate) fn validate_state(state: &PhysicalState, step: usize) -> Result<()> {
    match state.first_non_finite() {
        None => Ok(()),
        Some(index) => {
            let value = state.amounts()[index];
            let kind = if value.is_nan() { "NaN" } else { "Infinity" };
            Err(PbpkError::Integration(format!(
                "{} detected in state variable {} at step {}. \
                 Try increasing the number of substeps or check the rate parameters.",
                kind, index, step
            )))
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================
