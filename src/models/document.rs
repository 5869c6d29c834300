//! Model documents
//!
//! A [`ModelDocument`] is the serialisable description of a compartmental
//! PBPK model: named parameters, compartments with volumes, species living in
//! compartments, and the reactions (flows, binding, clearance, decay) that
//! move amount between species.
//!
//! Documents are plain values. Configuration clones and edits them, and the
//! JSON form returned by [`ModelDocument::to_json`] is the only thing handed
//! to a simulation engine or a sweep worker.
//!
//! # JSON layout
//!
//! ```json
//! {
//!   "name": "two_pool",
//!   "parameters":   [{ "id": "p_q", "name": "Q_Tumor1", "value": 0.05 }],
//!   "compartments": [{ "id": "c_vein", "name": "Vein", "size": 3.0 },
//!                    { "id": "c_t1", "name": "Tumor1", "size": 0.01, "size_from": ["p_vol"] }],
//!   "species":      [{ "id": "s_vein_hot", "name": "Hot", "compartment": "c_vein" }],
//!   "reactions":    [{ "id": "r_in", "reactants": ["s_vein_hot"], "products": ["s_t1_hot"],
//!                      "kinetics": { "type": "flow", "parameters": ["p_q"] } }]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PbpkError, Result};

// =================================================================================================
// Entities
// =================================================================================================

/// Named scalar constant of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Engine identifier, unique within the document
    pub id: String,

    /// Human-readable name used by overrides and sweeps
    pub name: String,

    pub value: f64,
}

/// Physiological region with a volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    pub id: String,
    pub name: String,

    /// Declared volume **\[L\]**
    pub size: f64,

    /// Parameter ids whose product gives the volume at run time
    ///
    /// When non-empty the declared `size` is ignored by the engine: the
    /// volume follows the parameters, including swept ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub size_from: Vec<String>,
}

impl Compartment {
    /// Whether the run-time volume is computed from parameters
    pub fn is_computed(&self) -> bool {
        !self.size_from.is_empty()
    }
}

/// Tracked pool of substance inside one compartment
///
/// Identity is the pair (compartment, name): `Vein.Hot` and `Kidney.Hot` are
/// different species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub id: String,

    /// Local name inside its compartment (e.g. `Hot`, `Cold`, `HotBound`)
    pub name: String,

    /// Id of the containing compartment
    pub compartment: String,

    /// Amount at t = 0 **\[nmol\]**
    #[serde(default)]
    pub initial_amount: f64,
}

/// Rate law of a reaction
///
/// Rate constants are the product of the listed parameter values (1 when
/// the list is empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kinetics {
    /// Plasma or lymph flow: `flux = Q · C(reactant)`; exactly one reactant
    Flow { parameters: Vec<String> },

    /// Mass action on concentrations:
    /// `flux = k · V(first reactant) · Π C(reactants)`
    ///
    /// With one reactant this is first-order kinetics on the amount.
    MassAction { parameters: Vec<String> },
}

impl Kinetics {
    /// Parameter ids entering the rate constant
    pub fn parameters(&self) -> &[String] {
        match self {
            Kinetics::Flow { parameters } | Kinetics::MassAction { parameters } => parameters,
        }
    }
}

/// Transfer of amount from reactant species to product species
///
/// An empty product list removes amount from the system (clearance, decay).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    pub reactants: Vec<String>,
    #[serde(default)]
    pub products: Vec<String>,
    pub kinetics: Kinetics,
}

impl Reaction {
    /// Flow reaction `reactant → product` driven by `parameters`
    pub fn flow(id: &str, reactant: &str, product: &str, parameters: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            reactants: vec![reactant.to_string()],
            products: vec![product.to_string()],
            kinetics: Kinetics::Flow {
                parameters: to_strings(parameters),
            },
        }
    }

    /// Mass-action reaction
    pub fn mass_action(
        id: &str,
        reactants: &[&str],
        products: &[&str],
        parameters: &[&str],
    ) -> Self {
        Self {
            id: id.to_string(),
            reactants: to_strings(reactants),
            products: to_strings(products),
            kinetics: Kinetics::MassAction {
                parameters: to_strings(parameters),
            },
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

// =================================================================================================
// Document
// =================================================================================================

/// Complete compartmental model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelDocument {
    name: String,
    #[serde(default)]
    parameters: Vec<Parameter>,
    #[serde(default)]
    compartments: Vec<Compartment>,
    #[serde(default)]
    species: Vec<Species>,
    #[serde(default)]
    reactions: Vec<Reaction>,
}

impl ModelDocument {
    /// Create an empty document
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    // ====================================== Builders ======================================

    /// Builder pattern: declare a parameter
    pub fn with_parameter(mut self, id: &str, name: &str, value: f64) -> Self {
        self.parameters.push(Parameter {
            id: id.to_string(),
            name: name.to_string(),
            value,
        });
        self
    }

    /// Builder pattern: declare a compartment with a fixed volume
    pub fn with_compartment(mut self, id: &str, name: &str, size: f64) -> Self {
        self.compartments.push(Compartment {
            id: id.to_string(),
            name: name.to_string(),
            size,
            size_from: Vec::new(),
        });
        self
    }

    /// Builder pattern: declare a compartment whose volume is the product of parameters
    pub fn with_computed_compartment(
        mut self,
        id: &str,
        name: &str,
        declared_size: f64,
        size_from: &[&str],
    ) -> Self {
        self.compartments.push(Compartment {
            id: id.to_string(),
            name: name.to_string(),
            size: declared_size,
            size_from: to_strings(size_from),
        });
        self
    }

    /// Builder pattern: declare a species
    pub fn with_species(mut self, id: &str, name: &str, compartment: &str, initial_amount: f64) -> Self {
        self.species.push(Species {
            id: id.to_string(),
            name: name.to_string(),
            compartment: compartment.to_string(),
            initial_amount,
        });
        self
    }

    /// Builder pattern: declare a reaction
    pub fn with_reaction(mut self, reaction: Reaction) -> Self {
        self.reactions.push(reaction);
        self
    }

    // ====================================== Queries ======================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn parameter(&self, id: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.id == id)
    }

    pub fn parameter_mut(&mut self, id: &str) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.id == id)
    }

    pub fn compartment(&self, id: &str) -> Option<&Compartment> {
        self.compartments.iter().find(|c| c.id == id)
    }

    pub fn compartment_mut(&mut self, id: &str) -> Option<&mut Compartment> {
        self.compartments.iter_mut().find(|c| c.id == id)
    }

    pub fn species_by_id(&self, id: &str) -> Option<&Species> {
        self.species.iter().find(|s| s.id == id)
    }

    pub fn species_mut(&mut self, id: &str) -> Option<&mut Species> {
        self.species.iter_mut().find(|s| s.id == id)
    }

    /// Species living in the compartment with id `compartment_id`
    pub fn species_in<'a>(&'a self, compartment_id: &'a str) -> impl Iterator<Item = &'a Species> + 'a {
        self.species
            .iter()
            .filter(move |s| s.compartment == compartment_id)
    }

    // ===================================== Validation =====================================

    /// Check identifiers and references
    ///
    /// # Rules
    ///
    /// - every id is non-empty and unique across the whole document
    /// - parameter values, sizes and initial amounts are finite
    /// - species reference an existing compartment
    /// - reactions reference existing species and parameters,
    ///   have at least one reactant, and flows have exactly one
    /// - `size_from` references existing parameters
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let all_ids = self
            .parameters
            .iter()
            .map(|p| &p.id)
            .chain(self.compartments.iter().map(|c| &c.id))
            .chain(self.species.iter().map(|s| &s.id))
            .chain(self.reactions.iter().map(|r| &r.id));
        for id in all_ids {
            if id.is_empty() {
                return Err(invalid(format!("empty identifier in model '{}'", self.name)));
            }
            if !ids.insert(id.as_str()) {
                return Err(invalid(format!("duplicate identifier '{id}'")));
            }
        }

        let parameter_ids: HashSet<&str> = self.parameters.iter().map(|p| p.id.as_str()).collect();
        let compartment_ids: HashSet<&str> =
            self.compartments.iter().map(|c| c.id.as_str()).collect();
        let species_ids: HashSet<&str> = self.species.iter().map(|s| s.id.as_str()).collect();

        for parameter in &self.parameters {
            if !parameter.value.is_finite() {
                return Err(invalid(format!(
                    "parameter '{}' has a non-finite value",
                    parameter.name
                )));
            }
        }

        for compartment in &self.compartments {
            if !compartment.size.is_finite() {
                return Err(invalid(format!(
                    "compartment '{}' has a non-finite size",
                    compartment.name
                )));
            }
            if let Some(missing) = compartment
                .size_from
                .iter()
                .find(|id| !parameter_ids.contains(id.as_str()))
            {
                return Err(invalid(format!(
                    "compartment '{}' sizes from unknown parameter '{missing}'",
                    compartment.name
                )));
            }
        }

        for species in &self.species {
            if !compartment_ids.contains(species.compartment.as_str()) {
                return Err(invalid(format!(
                    "species '{}' references unknown compartment '{}'",
                    species.id, species.compartment
                )));
            }
            if !species.initial_amount.is_finite() {
                return Err(invalid(format!(
                    "species '{}' has a non-finite initial amount",
                    species.id
                )));
            }
        }

        for reaction in &self.reactions {
            if reaction.reactants.is_empty() {
                return Err(invalid(format!("reaction '{}' has no reactant", reaction.id)));
            }
            if matches!(reaction.kinetics, Kinetics::Flow { .. }) && reaction.reactants.len() != 1 {
                return Err(invalid(format!(
                    "flow reaction '{}' must have exactly one reactant, got {}",
                    reaction.id,
                    reaction.reactants.len()
                )));
            }
            if let Some(missing) = reaction
                .reactants
                .iter()
                .chain(&reaction.products)
                .find(|id| !species_ids.contains(id.as_str()))
            {
                return Err(invalid(format!(
                    "reaction '{}' references unknown species '{missing}'",
                    reaction.id
                )));
            }
            if let Some(missing) = reaction
                .kinetics
                .parameters()
                .iter()
                .find(|id| !parameter_ids.contains(id.as_str()))
            {
                return Err(invalid(format!(
                    "reaction '{}' references unknown parameter '{missing}'",
                    reaction.id
                )));
            }
        }

        Ok(())
    }

    // =================================== Serialization ===================================

    /// Parse and validate a document from its JSON form
    pub fn from_json(text: &str) -> Result<Self> {
        let document: ModelDocument = serde_json::from_str(text)?;
        document.validate()?;
        Ok(document)
    }

    /// Serialise to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Read a document file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| PbpkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|error| match error {
            PbpkError::Document(message) => {
                PbpkError::Document(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Write the document as pretty-printed JSON
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| PbpkError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn invalid(message: String) -> PbpkError {
    PbpkError::Document(message)
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn two_pool() -> ModelDocument {
        ModelDocument::new("two_pool")
            .with_parameter("p_q", "Q_Tumor1", 0.05)
            .with_parameter("p_vol", "Tumor1Volume", 0.02)
            .with_compartment("c_vein", "Vein", 3.0)
            .with_computed_compartment("c_t1", "Tumor1", 0.01, &["p_vol"])
            .with_species("s_vein_hot", "Hot", "c_vein", 1.0)
            .with_species("s_t1_hot", "Hot", "c_t1", 0.0)
            .with_reaction(Reaction::flow("r_in", "s_vein_hot", "s_t1_hot", &["p_q"]))
    }

    #[test]
    fn test_builder_and_queries() {
        let document = two_pool();

        assert_eq!(document.name(), "two_pool");
        assert_eq!(document.parameters().len(), 2);
        assert_eq!(document.parameter("p_q").unwrap().name, "Q_Tumor1");
        assert!(document.compartment("c_t1").unwrap().is_computed());
        assert!(!document.compartment("c_vein").unwrap().is_computed());
        assert_eq!(document.species_in("c_t1").count(), 1);
        assert!(document.validate().is_ok());
    }

    #[test]
    fn test_mutation_by_id() {
        let mut document = two_pool();
        document.parameter_mut("p_q").unwrap().value = 0.5;
        document.compartment_mut("c_vein").unwrap().size = 4.0;
        document.species_mut("s_vein_hot").unwrap().initial_amount = 2.0;

        assert_eq!(document.parameter("p_q").unwrap().value, 0.5);
        assert_eq!(document.compartment("c_vein").unwrap().size, 4.0);
        assert_eq!(document.species_by_id("s_vein_hot").unwrap().initial_amount, 2.0);
        assert!(document.parameter_mut("missing").is_none());
    }

    #[test]
    fn test_json_round_trip_preserves_document() {
        let document = two_pool();
        let text = document.to_json().unwrap();
        assert_eq!(ModelDocument::from_json(&text).unwrap(), document);
    }

    #[test]
    fn test_kinetics_json_tag() {
        let text = two_pool().to_json().unwrap();
        assert!(text.contains(r#""type":"flow""#));
        assert!(!text.contains("size_from\":[]"));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let document = two_pool().with_parameter("p_q", "Other", 1.0);
        assert!(matches!(document.validate(), Err(PbpkError::Document(_))));
    }

    #[test]
    fn test_rejects_dangling_compartment() {
        let document = two_pool().with_species("s_x", "Hot", "c_missing", 0.0);
        let message = document.validate().unwrap_err().to_string();
        assert!(message.contains("c_missing"));
    }

    #[test]
    fn test_rejects_dangling_reaction_parameter() {
        let document = two_pool().with_reaction(Reaction::mass_action(
            "r_decay",
            &["s_t1_hot"],
            &[],
            &["p_missing"],
        ));
        let message = document.validate().unwrap_err().to_string();
        assert!(message.contains("p_missing"));
    }

    #[test]
    fn test_rejects_flow_with_two_reactants() {
        let mut reaction = Reaction::flow("r_bad", "s_vein_hot", "s_t1_hot", &["p_q"]);
        reaction.reactants.push("s_t1_hot".to_string());
        let document = two_pool().with_reaction(reaction);
        assert!(document.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_size_parameter() {
        let document = two_pool().with_computed_compartment("c_x", "X", 1.0, &["p_nope"]);
        assert!(document.validate().is_err());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            ModelDocument::from_json("{\"name\": 3}"),
            Err(PbpkError::Document(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let document = two_pool();

        document.write_to_file(file.path()).unwrap();
        let reloaded = ModelDocument::read(file.path()).unwrap();

        assert_eq!(reloaded, document);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let result = ModelDocument::read("/definitely/not/here.json");
        assert!(matches!(result, Err(PbpkError::Io { .. })));
    }
}
