//! Helper functions for integration tests

use pbpk_rs::models::{ModelDocument, ModelLibrary, ModelSource};
use pbpk_rs::units::ActivityConversion;

/// Owned region names
pub fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// The demo model shipped in `models/`
pub fn demo_document() -> ModelDocument {
    ModelSource::named("psma_demo")
        .load(&ModelLibrary::bundled())
        .expect("bundled demo model loads")
}

/// nmol → MBq factor for a decay constant
pub fn mbq_per_nmol(lambda: f64) -> f64 {
    ActivityConversion::from_decay_constant(lambda)
        .expect("valid decay constant")
        .factor()
}

/// Compute relative error: |actual - expected| / |expected|
pub fn relative_error(actual: f64, expected: f64) -> f64 {
    if expected.abs() < 1e-10 {
        (actual - expected).abs()
    } else {
        (actual - expected).abs() / expected.abs()
    }
}

/// Assert that two values agree within a relative tolerance
pub fn assert_close(actual: f64, expected: f64, tolerance: f64, message: &str) {
    let error = relative_error(actual, expected);
    assert!(
        error < tolerance,
        "{}: got {}, expected {} (relative error {:.3e}, tolerance {:.1e})",
        message, actual, expected, error, tolerance
    );
}
