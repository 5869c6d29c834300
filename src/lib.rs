//! pbpk-rs: Radioligand PBPK Simulation Framework
//!
//! Runs whole-body physiologically based pharmacokinetic (PBPK) models of
//! radioligand therapy and reports time-activity curves (TACs) per body
//! region, for a single configuration or over a parameter sweep.
//!
//! # Architecture
//!
//! 1. **Separation of Physics and Numerics**
//!    - Compartmental models define the kinetics ([`models`], [`physics`])
//!    - Numerical solvers integrate them ([`solver`])
//!
//! 2. **Documents as the exchange format**
//!    - A model is a serialisable [`ModelDocument`](models::ModelDocument)
//!    - Configuration edits a copy, never the loaded base
//!    - Engines and sweep workers only ever see the serialised text
//!
//! ```text
//! ModelSource ─▶ ModelDocument ─configure─▶ ConfiguredModel ─serialize─┐
//!                                                                      ▼
//!      TACs ◀─aggregate─ SimulationRun ◀─simulate─ SimulationEngine ◀─ (per sweep point)
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use pbpk_rs::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let request = RunRequest::new(ModelSource::named("psma_demo"))
//!     .with_span(TimeSpan::until(120.0, 241))
//!     .with_bundle(ConfigurationBundle::new(0.005).with_cold_amount(3.995))
//!     .with_observables(["Tumor1", "Kidney"]);
//!
//! let output = run_model_with(&request, &ModelLibrary::bundled(), &Rk4Engine::default())?;
//!
//! assert_eq!(output.tacs.dim(), (1, 241, 2));
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`models`]: model documents, lookup, injection site, compiled kinetics
//! - [`physics`]: state and model traits the solvers integrate
//! - [`solver`]: numerical solvers
//! - [`engine`]: simulation engines and their output
//! - [`configure`]: applying overrides and the injected dose
//! - [`aggregate`]: region time-activity curves
//! - [`sweep`]: parallel parameter sweeps
//! - [`run`]: one-call runs and reusable sessions
//! - [`output`]: result export

// Core modules
pub mod error;
pub mod physics;
pub mod solver;
pub mod models;

// Simulation pipeline
pub mod aggregate;
pub mod configure;
pub mod engine;
pub mod run;
pub mod sweep;
pub mod units;

pub mod output;

pub use error::{PbpkError, Result};

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //! use pbpk_rs::prelude::*;
    //! ```
    pub use crate::aggregate::{AggregationSettings, RegionAggregator, RegionMatch, SizeSource};
    pub use crate::configure::{ConfigurationBundle, ConfigurationReport, ConfiguredModel, configure};
    pub use crate::engine::{Rk4Engine, SimulationEngine, SimulationRun, TimeSpan};
    pub use crate::error::{PbpkError, Result};
    pub use crate::models::{ModelDocument, ModelLibrary, ModelSource};
    pub use crate::run::{RunOutput, RunRequest, Session, run_model, run_model_with};
    pub use crate::sweep::{SweepOptions, SweepPlan, simulate_single, sweep};
    pub use crate::units::ActivityConversion;
}
