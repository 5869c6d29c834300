//! CSV export of time-activity curves
//!
//! One row per sampled instant, one column per (curve, region) pair. With a
//! single curve the region name alone labels the column; a sweep labels
//! them `Region[k]` where `k` is the combination index.
//!
//! # Example output
//!
//! ```csv
//! # PBPK Simulation Data
//! # Generated: 2026-10-17T09:12:44+00:00
//! # Model: psma_demo
//! # Engine: RK4
//! # Time Span: 0 - 60 min
//! # Time Steps: 100
//! # Hot Amount: 10 nmol
//! #
//! Time (min),Tumor1 (MBq),Kidney (MBq)
//! 0.000000,0.000000,0.000000
//! 0.606061,0.412781,1.870325
//! ...
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use ndarray::{Array1, Array3, Axis};

use crate::error::{PbpkError, Result};
use crate::output::export::Exporter;
use crate::run::RunOutput;

// =============================================================================
// Configuration Structures
// =============================================================================

/// Configuration for CSV export
///
/// # Example
///
/// ```rust
/// use pbpk_rs::output::export::CsvConfig;
///
/// let config = CsvConfig::european().precision(10);
/// assert_eq!(config.delimiter, ';');
/// assert_eq!(config.decimal_separator, ',');
/// ```
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Column delimiter (default: ',')
    pub delimiter: char,

    /// Decimal separator (default: '.')
    pub decimal_separator: char,

    /// Number of decimal places (default: 6)
    pub precision: usize,

    /// Include metadata header comments (default: false)
    pub include_metadata: bool,

    pub metadata: Option<CsvMetadata>,

    /// Header of the time column (default: "Time (min)")
    pub time_header: String,

    /// Unit appended to every curve header (default: "MBq")
    pub unit: String,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            decimal_separator: '.',
            precision: 6,
            include_metadata: false,
            metadata: None,
            time_header: "Time (min)".to_string(),
            unit: "MBq".to_string(),
        }
    }
}

impl CsvConfig {
    /// Semicolon-delimited, comma decimal separator
    pub fn european() -> Self {
        Self {
            delimiter: ';',
            decimal_separator: ',',
            ..Default::default()
        }
    }

    /// Builder pattern: set delimiter
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Builder pattern: set precision
    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Builder pattern: enable metadata
    pub fn with_metadata(mut self, metadata: CsvMetadata) -> Self {
        self.include_metadata = true;
        self.metadata = Some(metadata);
        self
    }
}

/// Metadata for CSV header comments
///
/// Only the fields that are set are written.
#[derive(Debug, Clone, Default)]
pub struct CsvMetadata {
    pub model_name: Option<String>,
    pub engine_name: Option<String>,
    /// (start, stop) in minutes
    pub time_span: Option<(f64, f64)>,
    pub time_steps: Option<usize>,
    pub hot_amount: Option<f64>,
    pub cold_amount: Option<f64>,
    /// Swept parameter names, when the file holds a sweep
    pub swept_parameters: Vec<String>,
    pub custom: Vec<(String, String)>,
}

impl CsvMetadata {
    /// Metadata describing a run
    pub fn from_run(output: &RunOutput) -> Self {
        Self {
            model_name: Some(output.model_name.clone()),
            engine_name: Some(output.engine_name.clone()),
            time_span: Some((output.span.start, output.span.stop)),
            time_steps: Some(output.span.steps),
            hot_amount: Some(output.bundle.hot_amount),
            cold_amount: output.bundle.cold_amount,
            swept_parameters: output.swept_parameters.clone(),
            ..Default::default()
        }
    }

    pub fn add_custom(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom.push((key.into(), value.into()));
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn write_metadata_header(out: &mut String, metadata: &CsvMetadata) -> std::fmt::Result {
    writeln!(out, "# PBPK Simulation Data")?;
    writeln!(out, "# Generated: {}", chrono::Utc::now().to_rfc3339())?;

    if let Some(model) = &metadata.model_name {
        writeln!(out, "# Model: {model}")?;
    }
    if let Some(engine) = &metadata.engine_name {
        writeln!(out, "# Engine: {engine}")?;
    }
    if let Some((start, stop)) = metadata.time_span {
        writeln!(out, "# Time Span: {start} - {stop} min")?;
    }
    if let Some(steps) = metadata.time_steps {
        writeln!(out, "# Time Steps: {steps}")?;
    }
    if let Some(hot) = metadata.hot_amount {
        writeln!(out, "# Hot Amount: {hot} nmol")?;
    }
    if let Some(cold) = metadata.cold_amount {
        writeln!(out, "# Cold Amount: {cold} nmol")?;
    }
    if !metadata.swept_parameters.is_empty() {
        writeln!(out, "# Swept Parameters: {}", metadata.swept_parameters.join(", "))?;
    }
    for (key, value) in &metadata.custom {
        writeln!(out, "# {key}: {value}")?;
    }

    writeln!(out, "#")
}

/// Format number with configured precision and decimal separator
fn format_number(value: f64, config: &CsvConfig) -> String {
    let formatted = format!("{:.prec$}", value, prec = config.precision);
    if config.decimal_separator != '.' {
        formatted.replace('.', &config.decimal_separator.to_string())
    } else {
        formatted
    }
}

fn column_headers(curves: usize, observables: &[String], config: &CsvConfig) -> Vec<String> {
    (0..curves)
        .flat_map(|curve| {
            observables.iter().map(move |name| {
                if curves == 1 {
                    format!("{name} ({})", config.unit)
                } else {
                    format!("{name}[{curve}] ({})", config.unit)
                }
            })
        })
        .collect()
}

// =============================================================================
// Export Functions
// =============================================================================

/// Export time-activity curves to CSV
///
/// # Arguments
///
/// * `time` - Sampled instants (min)
/// * `tacs` - `[curves, steps, observables]` activities (MBq)
/// * `observables` - Region names, one per last-axis entry
/// * `output_path` - Output file path
/// * `configuration` - Optional CSV configuration (default if `None`)
///
/// # Errors
///
/// - [`PbpkError::Export`] for empty data, mismatched shapes or non-finite values
/// - [`PbpkError::Io`] when the file cannot be written
pub fn export_tacs_csv(
    time: &Array1<f64>,
    tacs: &Array3<f64>,
    observables: &[String],
    output_path: impl AsRef<Path>,
    configuration: Option<&CsvConfig>,
) -> Result<()> {
    // ============================= Validation =============================

    let (curves, steps, regions) = tacs.dim();
    if time.is_empty() || curves == 0 {
        return Err(PbpkError::Export("empty data: nothing to export".to_string()));
    }
    if steps != time.len() {
        return Err(PbpkError::Export(format!(
            "data length mismatch: {} time points versus {} rows",
            time.len(),
            steps
        )));
    }
    if regions != observables.len() {
        return Err(PbpkError::Export(format!(
            "data length mismatch: {} region columns versus {} names",
            regions,
            observables.len()
        )));
    }
    if time.iter().chain(tacs.iter()).any(|v| !v.is_finite()) {
        return Err(PbpkError::Export(
            "invalid data: NaN or Inf detected".to_string(),
        ));
    }

    let binding = CsvConfig::default();
    let configuration = configuration.unwrap_or(&binding);

    // ============================= Render =================================

    let mut out = String::new();
    render(&mut out, time, tacs, observables, configuration)
        .map_err(|e| PbpkError::Export(e.to_string()))?;

    // ============================= Write ==================================

    let path = output_path.as_ref();
    fs::write(path, out).map_err(|source| PbpkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Exported {curves} curve(s) × {regions} region(s) to {}", path.display());
    Ok(())
}

fn render(
    out: &mut String,
    time: &Array1<f64>,
    tacs: &Array3<f64>,
    observables: &[String],
    config: &CsvConfig,
) -> std::fmt::Result {
    if config.include_metadata {
        if let Some(metadata) = &config.metadata {
            write_metadata_header(out, metadata)?;
        }
    }

    let delimiter = config.delimiter.to_string();
    let mut header = vec![config.time_header.clone()];
    header.extend(column_headers(tacs.len_of(Axis(0)), observables, config));
    writeln!(out, "{}", header.join(&delimiter))?;

    for (step, t) in time.iter().enumerate() {
        out.push_str(&format_number(*t, config));
        for curve in tacs.axis_iter(Axis(0)) {
            for value in curve.row(step) {
                out.push(config.delimiter);
                out.push_str(&format_number(*value, config));
            }
        }
        out.push('\n');
    }
    Ok(())
}

// =============================================================================
// Exporter
// =============================================================================

/// [`Exporter`] writing CSV files
#[derive(Debug, Clone, Default)]
pub struct CsvExporter {
    config: CsvConfig,
}

impl CsvExporter {
    pub fn new(config: CsvConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CsvConfig {
        &self.config
    }
}

impl Exporter for CsvExporter {
    type Error = PbpkError;

    fn export(&self, output: &RunOutput, path: &Path) -> Result<()> {
        let mut config = self.config.clone();
        if config.include_metadata && config.metadata.is_none() {
            config.metadata = Some(CsvMetadata::from_run(output));
        }
        export_tacs_csv(&output.time, &output.tacs, &output.observables, path, Some(&config))
    }
}

// =================================================================================================
// Tests
// =================================================================================================
