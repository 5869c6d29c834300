//! Injection site of the radioligand dose
//!
//! The dose enters the vascular compartment of the model. Whole-body PBPK
//! models name it either `Vein` or `Blood`; the site is the compartment
//! whose `Hot` (labelled) and `Cold` (unlabelled) species receive the
//! injected amounts at t = 0.
//!
//! # Example
//!
//! ```rust
//! use pbpk_rs::models::{InjectionSite, ModelDocument};
//!
//! let document = ModelDocument::new("demo").with_compartment("c_blood", "Blood", 5.0);
//! let site = InjectionSite::locate(&document).unwrap();
//!
//! assert_eq!(site.compartment(), "Blood");
//! assert_eq!(site.species_name("Hot"), "Blood.Hot");
//! ```

use crate::error::{PbpkError, Result};
use crate::models::{ModelDocument, Overrides};

/// Candidate compartment names, in order of preference
pub const VASCULAR_COMPARTMENTS: [&str; 2] = ["Vein", "Blood"];

/// Local name of the labelled ligand species
pub const HOT_SPECIES: &str = "Hot";

/// Local name of the unlabelled ligand species
pub const COLD_SPECIES: &str = "Cold";

/// Compartment receiving the injected dose
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionSite {
    compartment: String,
}

impl InjectionSite {
    /// Find the vascular compartment of `document`
    ///
    /// `Vein` takes precedence over `Blood`. A model declaring both is
    /// accepted with a warning.
    ///
    /// # Errors
    ///
    /// [`PbpkError::MissingInjectionSite`] when neither name is declared.
    pub fn locate(document: &ModelDocument) -> Result<Self> {
        let present: Vec<&str> = VASCULAR_COMPARTMENTS
            .iter()
            .copied()
            .filter(|name| document.compartments().iter().any(|c| c.name == *name))
            .collect();

        match present.as_slice() {
            [] => Err(PbpkError::MissingInjectionSite),
            [site] => Ok(Self::named(site)),
            [site, others @ ..] => {
                log::warn!(
                    "Model {} declares {} besides {}; injecting into {}.",
                    document.name(),
                    others.join(", "),
                    site,
                    site
                );
                Ok(Self::named(site))
            }
        }
    }

    fn named(compartment: &str) -> Self {
        Self {
            compartment: compartment.to_string(),
        }
    }

    /// Name of the injection compartment
    pub fn compartment(&self) -> &str {
        &self.compartment
    }

    /// Dotted name of a species in the injection compartment
    pub fn species_name(&self, local: &str) -> String {
        format!("{}.{}", self.compartment, local)
    }

    /// Initial-amount overrides for the injected dose
    ///
    /// The cold amount is left alone when `cold_amount` is `None`.
    pub fn dose(&self, hot_amount: f64, cold_amount: Option<f64>) -> Overrides {
        let mut dose = Overrides::new();
        dose.insert(self.species_name(HOT_SPECIES), hot_amount);
        if let Some(cold) = cold_amount {
            dose.insert(self.species_name(COLD_SPECIES), cold);
        }
        dose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vein_is_found() {
        let document = ModelDocument::new("m")
            .with_compartment("c1", "Kidney", 0.3)
            .with_compartment("c2", "Vein", 3.0);
        assert_eq!(InjectionSite::locate(&document).unwrap().compartment(), "Vein");
    }

    #[test]
    fn test_blood_is_fallback() {
        let document = ModelDocument::new("m").with_compartment("c1", "Blood", 5.0);
        assert_eq!(InjectionSite::locate(&document).unwrap().compartment(), "Blood");
    }

    #[test]
    fn test_vein_wins_over_blood() {
        let document = ModelDocument::new("m")
            .with_compartment("c1", "Blood", 5.0)
            .with_compartment("c2", "Vein", 3.0);
        assert_eq!(InjectionSite::locate(&document).unwrap().compartment(), "Vein");
    }

    #[test]
    fn test_missing_site_is_an_error() {
        let document = ModelDocument::new("m").with_compartment("c1", "Plasma", 3.0);
        assert!(matches!(
            InjectionSite::locate(&document),
            Err(PbpkError::MissingInjectionSite)
        ));
    }

    #[test]
    fn test_dose_overrides() {
        let site = InjectionSite::named("Vein");

        let dose = site.dose(0.005, Some(3.995));
        assert_eq!(dose.get("Vein.Hot"), Some(&0.005));
        assert_eq!(dose.get("Vein.Cold"), Some(&3.995));

        let hot_only = site.dose(10.0, None);
        assert_eq!(hot_only.len(), 1);
        assert!(!hot_only.contains_key("Vein.Cold"));
    }
}
