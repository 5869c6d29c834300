//! Numerical methods for integrating kinetic systems
//!
//! This module contains concrete implementations of the [`Solver`](crate::solver::Solver) trait.
//!
//! # Available Methods
//!
//! - **[`RK4Solver`]**: Classical fourth-order Runge-Kutta
//!   - Order: Fourth-order O(dt⁴)
//!   - Cost: 4 function evaluations per step
//!   - Use: compartmental PBPK models with moderate stiffness
//!
//! Each solver is self-contained and stateless, so one instance can serve
//! every worker of a parameter sweep.

mod rk4;

pub use rk4::RK4Solver;
