//! Output of simulation results
//!
//! ```text
//! output/
//! ├── mod.rs
//! └── export/          ← Data export
//!     ├── mod.rs       ← Exporter trait
//!     └── csv.rs
//! ```
//!
//! ```rust,ignore
//! use pbpk_rs::output::export::{export_tacs_csv, CsvConfig};
//!
//! export_tacs_csv(&output.time, &output.tacs, &output.observables, "tacs.csv", None)?;
//! ```

pub mod export;

pub use export::{CsvConfig, CsvExporter, CsvMetadata, Exporter, export_tacs_csv};
