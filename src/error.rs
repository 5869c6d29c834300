//! Crate-wide error type
//!
//! Fatal conditions only. Names that fail to resolve during ordinary
//! configuration are not errors: they are reported through
//! [`ConfigurationReport`](crate::configure::ConfigurationReport) and the run
//! continues.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, PbpkError>;

/// Errors raised while loading, configuring, simulating or exporting a model
#[derive(Debug, Error)]
pub enum PbpkError {
    /// Neither a bundled model name nor an existing file path
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed document or dangling reference inside it
    #[error("invalid model document: {0}")]
    Document(String),

    /// No vascular compartment to load the dose into
    #[error("no injection site: model declares neither a 'Vein' nor a 'Blood' compartment")]
    MissingInjectionSite,

    /// A parameter the computation cannot do without
    #[error("required parameter '{0}' not found in the model")]
    MissingParameter(String),

    /// Swept names that do not exist; fatal for the whole sweep
    #[error("swept parameter(s) not found in the model: {}", .0.join(", "))]
    UnknownSweepParameters(Vec<String>),

    #[error("sweep combination {index} has {found} value(s), expected {expected}")]
    SweepShape {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Numerical failure or misuse of the integrator
    #[error("integration failed: {0}")]
    Integration(String),

    /// The engine returned no series for an entity the aggregation needs
    #[error("simulation output has no entry for {0}")]
    MissingOutput(String),

    /// A single sweep point failed; the sweep is aborted
    #[error("sweep point {index} failed: {source}")]
    Worker {
        index: usize,
        #[source]
        source: Box<PbpkError>,
    },

    #[error("export failed: {0}")]
    Export(String),
}

impl From<serde_json::Error> for PbpkError {
    fn from(error: serde_json::Error) -> Self {
        PbpkError::Document(error.to_string())
    }
}
