//! Compartmental PBPK models
//!
//! A model starts life as a [`ModelDocument`] (read from the library or a
//! file), is looked up by name through an [`EntityIndex`], receives its dose
//! at the [`InjectionSite`], and is finally compiled into a
//! [`CompartmentalSystem`] that the solvers integrate.
//!
//! ```text
//! ModelSource ──load──▶ ModelDocument ──compile──▶ CompartmentalSystem
//!                           ▲    │                      (PhysicalModel)
//!               overrides ──┘    └── EntityIndex (name → id)
//! ```

// =================================================================================================
// Module Declarations
// =================================================================================================

pub mod compartmental;
pub mod document;
pub mod index;
pub mod injection;
pub mod library;

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use compartmental::CompartmentalSystem;
pub use document::{Compartment, Kinetics, ModelDocument, Parameter, Reaction, Species};
pub use index::{EntityIndex, EntityKind, Overrides, Resolution, ResolvedOverride, split_species_name};
pub use injection::{COLD_SPECIES, HOT_SPECIES, InjectionSite, VASCULAR_COMPARTMENTS};
pub use library::{MODEL_DIR_ENV, ModelLibrary, ModelSource};
