//! Common utilities for integration tests

#![allow(dead_code, unused_imports)]

pub mod mock_models;
pub mod test_helpers;

// Re-export commonly used items
pub use mock_models::{
    CountingEngine, DelayEngine, FailingEngine, exchange_document, parameter_in, static_document,
};
pub use test_helpers::{assert_close, demo_document, mbq_per_nmol, names, relative_error};
