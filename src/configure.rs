//! Model configuration
//!
//! [`configure`] turns a pristine base document and a
//! [`ConfigurationBundle`] into a [`ConfiguredModel`]. The base document is
//! never touched: every run, and every reconfiguration of a
//! [`Session`](crate::run::Session), starts again from it.
//!
//! # Order of application
//!
//! 1. injection site lookup (`Vein`, else `Blood`; fatal when absent)
//! 2. parameter overrides
//! 3. compartment volume overrides
//! 4. species initial-amount overrides
//! 5. injected dose (`<site>.Hot`, and `<site>.Cold` when given)
//!
//! The dose goes last, so it wins over a species override of the same name.
//! Names that match nothing are logged and collected in the
//! [`ConfigurationReport`]; they never abort the configuration.

use std::path::Path;

use crate::error::{PbpkError, Result};
use crate::models::{EntityIndex, InjectionSite, ModelDocument, Overrides};
use crate::units::ActivityConversion;

// =================================================================================================
// Bundle
// =================================================================================================

/// Everything a run may change in a model
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationBundle {
    /// Parameter name → value
    pub parameters: Overrides,

    /// `Compartment.Species` → initial amount **\[nmol\]**
    pub species: Overrides,

    /// Compartment name → declared volume **\[L\]**
    pub compartment_volumes: Overrides,

    /// Labelled ligand injected at t = 0 **\[nmol\]**
    pub hot_amount: f64,

    /// Unlabelled ligand injected at t = 0 **\[nmol\]**; left as declared when `None`
    pub cold_amount: Option<f64>,
}

impl ConfigurationBundle {
    pub const DEFAULT_HOT_AMOUNT: f64 = 10.0;
    pub const DEFAULT_COLD_AMOUNT: f64 = 100.0;

    /// Bundle injecting `hot_amount` only, with no other override
    pub fn new(hot_amount: f64) -> Self {
        Self {
            parameters: Overrides::new(),
            species: Overrides::new(),
            compartment_volumes: Overrides::new(),
            hot_amount,
            cold_amount: None,
        }
    }

    pub fn with_cold_amount(mut self, cold_amount: f64) -> Self {
        self.cold_amount = Some(cold_amount);
        self
    }

    pub fn without_cold_amount(mut self) -> Self {
        self.cold_amount = None;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_species_amount(mut self, dotted: impl Into<String>, amount: f64) -> Self {
        self.species.insert(dotted.into(), amount);
        self
    }

    pub fn with_compartment_volume(mut self, name: impl Into<String>, volume: f64) -> Self {
        self.compartment_volumes.insert(name.into(), volume);
        self
    }

    /// Reject non-finite values and negative amounts or volumes
    pub fn validate(&self) -> Result<()> {
        let check = |what: &str, name: &str, value: f64, allow_negative: bool| -> Result<()> {
            if !value.is_finite() || (!allow_negative && value < 0.0) {
                return Err(PbpkError::InvalidConfiguration(format!(
                    "{what} '{name}' has invalid value {value}"
                )));
            }
            Ok(())
        };

        check("injected amount", "hot", self.hot_amount, false)?;
        if let Some(cold) = self.cold_amount {
            check("injected amount", "cold", cold, false)?;
        }
        for (name, value) in &self.parameters {
            check("parameter", name, *value, true)?;
        }
        for (name, value) in &self.species {
            check("species amount", name, *value, false)?;
        }
        for (name, value) in &self.compartment_volumes {
            check("compartment volume", name, *value, false)?;
        }
        Ok(())
    }
}

impl Default for ConfigurationBundle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HOT_AMOUNT).with_cold_amount(Self::DEFAULT_COLD_AMOUNT)
    }
}

// =================================================================================================
// Report
// =================================================================================================

/// Override names that matched nothing in the model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationReport {
    pub unresolved_parameters: Vec<String>,
    pub unresolved_species: Vec<String>,
    pub unresolved_compartments: Vec<String>,
}

impl ConfigurationReport {
    /// Whether every override found its target
    pub fn is_complete(&self) -> bool {
        self.unresolved_parameters.is_empty()
            && self.unresolved_species.is_empty()
            && self.unresolved_compartments.is_empty()
    }

    /// Every unresolved name
    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.unresolved_parameters
            .iter()
            .chain(&self.unresolved_species)
            .chain(&self.unresolved_compartments)
            .map(String::as_str)
    }
}

// =================================================================================================
// Configured model
// =================================================================================================

/// Base document with a bundle applied
#[derive(Debug, Clone)]
pub struct ConfiguredModel {
    document: ModelDocument,
    index: EntityIndex,
    injection_site: InjectionSite,
    report: ConfigurationReport,
}

impl ConfiguredModel {
    pub fn document(&self) -> &ModelDocument {
        &self.document
    }

    pub fn index(&self) -> &EntityIndex {
        &self.index
    }

    pub fn injection_site(&self) -> &InjectionSite {
        &self.injection_site
    }

    pub fn report(&self) -> &ConfigurationReport {
        &self.report
    }

    /// Current value of the parameter called `name`
    pub fn parameter_value(&self, name: &str) -> Option<f64> {
        self.index
            .parameter_id(name)
            .and_then(|id| self.document.parameter(id))
            .map(|parameter| parameter.value)
    }

    /// Current initial amount of `Compartment.Species`
    pub fn species_amount(&self, dotted: &str) -> Option<f64> {
        self.index
            .species_id(dotted)
            .and_then(|id| self.document.species_by_id(id))
            .map(|species| species.initial_amount)
    }

    /// Activity conversion driven by the parameter called `decay_parameter`
    pub fn activity_conversion(&self, decay_parameter: &str) -> Result<ActivityConversion> {
        ActivityConversion::from_document(&self.document, &self.index, decay_parameter)
    }

    /// Serialised form handed to engines
    pub fn serialize(&self) -> Result<String> {
        self.document.to_json()
    }

    /// Write the configured document to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.document.write_to_file(path)
    }
}

/// Apply `bundle` to a copy of `base`
///
/// # Errors
///
/// - [`PbpkError::InvalidConfiguration`] for an invalid bundle
/// - [`PbpkError::MissingInjectionSite`] when the model has no `Vein` nor `Blood`
pub fn configure(base: &ModelDocument, bundle: &ConfigurationBundle) -> Result<ConfiguredModel> {
    bundle.validate()?;
    let injection_site = InjectionSite::locate(base)?;

    let mut document = base.clone();
    let index = EntityIndex::build(&document);

    let unresolved_parameters = index.apply_parameters(&mut document, &bundle.parameters);
    let unresolved_compartments =
        index.apply_compartment_sizes(&mut document, &bundle.compartment_volumes);
    let mut unresolved_species = index.apply_species_amounts(&mut document, &bundle.species);
    let dose = injection_site.dose(bundle.hot_amount, bundle.cold_amount);
    unresolved_species.extend(index.apply_species_amounts(&mut document, &dose));

    let report = ConfigurationReport {
        unresolved_parameters,
        unresolved_species,
        unresolved_compartments,
    };
    if !report.is_complete() {
        log::debug!(
            "Model {} configured with {} unresolved name(s)",
            document.name(),
            report.unresolved().count()
        );
    }

    Ok(ConfiguredModel {
        document,
        index,
        injection_site,
        report,
    })
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ModelDocument {
        ModelDocument::new("base")
            .with_parameter("p_r", "Rden_Tumor1", 0.2)
            .with_compartment("c_vein", "Vein", 3.0)
            .with_compartment("c_t1", "Tumor1", 0.1)
            .with_species("s_vh", "Hot", "c_vein", 0.0)
            .with_species("s_vc", "Cold", "c_vein", 0.0)
            .with_species("s_th", "Hot", "c_t1", 0.0)
    }

    #[test]
    fn test_default_bundle() {
        let bundle = ConfigurationBundle::default();
        assert_eq!(bundle.hot_amount, 10.0);
        assert_eq!(bundle.cold_amount, Some(100.0));
        assert!(bundle.parameters.is_empty());
    }

    #[test]
    fn test_dose_lands_in_vein() {
        let bundle = ConfigurationBundle::new(0.005).with_cold_amount(3.995);
        let configured = configure(&base(), &bundle).unwrap();

        assert_eq!(configured.species_amount("Vein.Hot"), Some(0.005));
        assert_eq!(configured.species_amount("Vein.Cold"), Some(3.995));
        assert_eq!(configured.injection_site().compartment(), "Vein");
        assert!(configured.report().is_complete());
    }

    #[test]
    fn test_base_document_is_untouched() {
        let base = base();
        let snapshot = base.clone();
        let bundle = ConfigurationBundle::default()
            .with_parameter("Rden_Tumor1", 0.9)
            .with_compartment_volume("Vein", 5.0);

        let configured = configure(&base, &bundle).unwrap();

        assert_eq!(base, snapshot);
        assert_eq!(configured.parameter_value("Rden_Tumor1"), Some(0.9));
        assert_eq!(configured.document().compartment("c_vein").unwrap().size, 5.0);
    }

    #[test]
    fn test_dose_overrides_species_override() {
        let bundle = ConfigurationBundle::new(1.0)
            .with_species_amount("Vein.Hot", 50.0)
            .with_species_amount("Tumor1.Hot", 2.0);
        let configured = configure(&base(), &bundle).unwrap();

        assert_eq!(configured.species_amount("Vein.Hot"), Some(1.0));
        assert_eq!(configured.species_amount("Tumor1.Hot"), Some(2.0));
    }

    #[test]
    fn test_unknown_names_are_reported() {
        let bundle = ConfigurationBundle::new(1.0)
            .with_parameter("kX", 1.0)
            .with_species_amount("Liver.Hot", 1.0)
            .with_compartment_volume("Spleen", 0.2);
        let configured = configure(&base(), &bundle).unwrap();
        let report = configured.report();

        assert!(!report.is_complete());
        assert_eq!(report.unresolved_parameters, vec!["kX".to_string()]);
        assert_eq!(report.unresolved_species, vec!["Liver.Hot".to_string()]);
        assert_eq!(report.unresolved_compartments, vec!["Spleen".to_string()]);
        assert_eq!(report.unresolved().count(), 3);
    }

    #[test]
    fn test_missing_cold_species_is_reported() {
        let document = ModelDocument::new("hot_only")
            .with_compartment("c", "Blood", 5.0)
            .with_species("s", "Hot", "c", 0.0);
        let configured = configure(&document, &ConfigurationBundle::default()).unwrap();

        assert_eq!(configured.injection_site().compartment(), "Blood");
        assert_eq!(
            configured.report().unresolved_species,
            vec!["Blood.Cold".to_string()]
        );
    }

    #[test]
    fn test_missing_injection_site_fails() {
        let document = ModelDocument::new("no_site").with_compartment("c", "Liver", 1.0);
        assert!(matches!(
            configure(&document, &ConfigurationBundle::default()),
            Err(PbpkError::MissingInjectionSite)
        ));
    }

    #[test]
    fn test_invalid_bundle_fails() {
        let bundle = ConfigurationBundle::new(-1.0);
        assert!(matches!(
            configure(&base(), &bundle),
            Err(PbpkError::InvalidConfiguration(_))
        ));

        let bundle = ConfigurationBundle::new(1.0).with_parameter("Rden_Tumor1", f64::NAN);
        assert!(configure(&base(), &bundle).is_err());
    }

    #[test]
    fn test_serialized_form_round_trips() {
        let configured = configure(&base(), &ConfigurationBundle::default()).unwrap();
        let text = configured.serialize().unwrap();
        assert_eq!(&ModelDocument::from_json(&text).unwrap(), configured.document());
    }
}
