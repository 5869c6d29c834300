//! Physical models
//!
//! This module provides the trait every integrable system implements and the
//! state container the solvers advance.
//!
//! # Architecture
//!
//! Physical models are **separate from numerical solvers**:
//! - The model provides the **equations** (reaction and flow rates)
//! - The solver provides the **method** to integrate them
//!
//! In this crate the only production model is
//! [`CompartmentalSystem`](crate::models::CompartmentalSystem), compiled from a
//! model document. Tests use small hand-written models with known solutions.
//!
//! # Example
//!
//! ```rust
//! use pbpk_rs::physics::{PhysicalModel, PhysicalState};
//!
//! struct Decay;
//! impl PhysicalModel for Decay {
//!     fn dimension(&self) -> usize { 1 }
//!     fn compute_physics(&self, state: &PhysicalState) -> PhysicalState {
//!         state.clone() * -0.1
//!     }
//!     fn setup_initial_state(&self) -> PhysicalState { PhysicalState::from_vec(vec![1.0]) }
//!     fn name(&self) -> &str { "Decay" }
//! }
//!
//! let model = Decay;
//! let slope = model.compute_physics(&model.setup_initial_state());
//! assert!((slope.amounts()[0] + 0.1).abs() < 1e-12);
//! ```

pub mod traits;

pub use traits::{PhysicalModel, PhysicalState};
