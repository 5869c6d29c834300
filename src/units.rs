//! Amount → activity conversion
//!
//! Species amounts are tracked in nmol. Time-activity curves are reported
//! in MBq: for a radionuclide with decay constant λ (per minute),
//!
//! $$A\,[\text{MBq}] = n\,[\text{nmol}] \cdot \frac{\lambda}{60} \cdot \frac{N_A}{10^9} \cdot 10^{-6}$$

use crate::error::{PbpkError, Result};
use crate::models::{EntityIndex, ModelDocument};

/// Avogadro constant, as used by the activity conversion **\[1/mol\]**
pub const AVOGADRO: f64 = 6.022e23;

/// Name of the physical decay constant parameter
pub const DECAY_CONSTANT_PARAMETER: &str = "lambdaPhys";

const SECONDS_PER_MINUTE: f64 = 60.0;
const NMOL_PER_MOL: f64 = 1e9;
const BQ_PER_MBQ: f64 = 1e6;

/// nmol → MBq factor for one radionuclide
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityConversion {
    decay_constant: f64,
    factor: f64,
}

impl ActivityConversion {
    /// Conversion for a decay constant given per minute
    pub fn from_decay_constant(decay_constant: f64) -> Result<Self> {
        if !decay_constant.is_finite() || decay_constant < 0.0 {
            return Err(PbpkError::InvalidConfiguration(format!(
                "decay constant must be finite and non-negative, got {decay_constant}"
            )));
        }
        Ok(Self {
            decay_constant,
            factor: decay_constant / SECONDS_PER_MINUTE * AVOGADRO / NMOL_PER_MOL / BQ_PER_MBQ,
        })
    }

    /// Conversion using the value of the parameter called `parameter_name`
    ///
    /// # Errors
    ///
    /// [`PbpkError::MissingParameter`] when the document has no such parameter.
    pub fn from_document(
        document: &ModelDocument,
        index: &EntityIndex,
        parameter_name: &str,
    ) -> Result<Self> {
        let value = index
            .parameter_id(parameter_name)
            .and_then(|id| document.parameter(id))
            .map(|parameter| parameter.value)
            .ok_or_else(|| PbpkError::MissingParameter(parameter_name.to_string()))?;
        Self::from_decay_constant(value)
    }

    /// Decay constant **\[1/min\]**
    pub fn decay_constant(&self) -> f64 {
        self.decay_constant
    }

    /// MBq per nmol
    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn to_mbq(&self, nmol: f64) -> f64 {
        nmol * self.factor
    }
}
