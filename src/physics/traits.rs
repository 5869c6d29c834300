//! Physical model traits and types
//!
//! This module defines the contract between a kinetic system and the
//! numerical solvers:
//! - `PhysicalModel`: trait for every system the solvers can integrate
//! - `PhysicalState`: species amounts at one instant

use nalgebra::DVector;

// =================================================================================================
// Physical State
// =================================================================================================

/// State of a compartmental system at a given time
///
/// Holds one amount per species (nmol), in the order the owning model
/// declares them. Arithmetic operators let the solvers build intermediate
/// stages without knowing what the entries mean.
///
/// # Example
/// ```
/// use pbpk_rs::physics::PhysicalState;
///
/// let state = PhysicalState::from_vec(vec![1.0, 2.0]);
/// let doubled = state.clone() + state;
/// assert_eq!(doubled.amounts()[1], 4.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalState {
    amounts: DVector<f64>,
}

impl PhysicalState {
    /// Create a state from an amount vector
    pub fn new(amounts: DVector<f64>) -> Self {
        Self { amounts }
    }

    /// Create a state from a plain vector
    pub fn from_vec(amounts: Vec<f64>) -> Self {
        Self::new(DVector::from_vec(amounts))
    }

    /// All-zero state with `size` species
    pub fn zeros(size: usize) -> Self {
        Self::new(DVector::zeros(size))
    }

    /// Number of species tracked
    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Species amounts
    pub fn amounts(&self) -> &DVector<f64> {
        &self.amounts
    }

    /// Mutable species amounts
    pub fn amounts_mut(&mut self) -> &mut DVector<f64> {
        &mut self.amounts
    }

    /// Index of the first non-finite entry, if any
    pub fn first_non_finite(&self) -> Option<usize> {
        self.amounts.iter().position(|x| !x.is_finite())
    }
}

// Operator overloading for numerical operations

impl std::ops::Add for PhysicalState {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self.amounts += rhs.amounts;
        self
    }
}

impl std::ops::Mul<f64> for PhysicalState {
    type Output = Self;

    fn mul(mut self, scalar: f64) -> Self::Output {
        self.amounts *= scalar;
        self
    }
}

// =================================================================================================
// Physical Model Trait
// =================================================================================================

/// Trait for kinetic systems
///
/// # Responsibility
/// Computes the right-hand side of dA/dt = f(A) for a given state.
/// Does NOT integrate it (that's the Solver's job).
///
/// The model provides the "physics" (rate laws), the Solver provides
/// the "numerics" (method to integrate them).
pub trait PhysicalModel: Send + Sync {
    /// Number of state variables
    ///
    /// Used by the solver to check state dimensions
    fn dimension(&self) -> usize;

    /// Time derivative of every species amount at `state`
    ///
    /// The returned state has the same layout as the input.
    fn compute_physics(&self, state: &PhysicalState) -> PhysicalState;

    /// Amounts at the start of the simulation
    fn setup_initial_state(&self) -> PhysicalState;

    /// Name of the model (used to display and logging)
    fn name(&self) -> &str;
}
