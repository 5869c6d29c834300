//! Export of run results
//!
//! The [`Exporter`] trait abstracts the file format. Each format lives in
//! its own sub-module; adding one means adding a file.
//!
//! | Format | Module  |
//! |--------|---------|
//! | CSV    | [`csv`] |

pub mod csv;

pub use csv::{CsvConfig, CsvExporter, CsvMetadata, export_tacs_csv};

use std::path::Path;

use crate::run::RunOutput;

/// Abstraction over export formats
///
/// Each format reports failures through its own error type.
pub trait Exporter {
    type Error: std::error::Error;

    /// Write every curve of `output` to `path`
    fn export(&self, output: &RunOutput, path: &Path) -> Result<(), Self::Error>;
}
