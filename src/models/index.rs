//! Name → id lookup tables
//!
//! Users address entities by name (`Tumor1Volume`, `Kidney`, `Vein.Hot`);
//! documents and engines address them by id. [`EntityIndex`] is built once
//! per document and answers every lookup in constant time.
//!
//! When several entities share a name, the first one declared wins.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::models::ModelDocument;

/// Name → value overrides, iterated in name order
pub type Overrides = BTreeMap<String, f64>;

/// Kind of entity an override targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Parameter,
    Compartment,
    Species,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Parameter => "Parameter",
            EntityKind::Compartment => "Compartment",
            EntityKind::Species => "Species",
        };
        f.write_str(label)
    }
}

/// Override whose name matched an entity
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOverride {
    pub name: String,
    pub id: String,
    pub value: f64,
}

/// Overrides split into matched and unmatched names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub resolved: Vec<ResolvedOverride>,
    pub unresolved: Vec<String>,
}

/// Lookup tables for one document
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    parameters: HashMap<String, String>,
    compartments: HashMap<String, String>,
    /// (compartment name, species name) → species id
    species: HashMap<(String, String), String>,
}

impl EntityIndex {
    pub fn build(document: &ModelDocument) -> Self {
        let mut index = Self::default();

        for parameter in document.parameters() {
            index
                .parameters
                .entry(parameter.name.clone())
                .or_insert_with(|| parameter.id.clone());
        }

        let mut compartment_names = HashMap::new();
        for compartment in document.compartments() {
            compartment_names.insert(compartment.id.as_str(), compartment.name.as_str());
            index
                .compartments
                .entry(compartment.name.clone())
                .or_insert_with(|| compartment.id.clone());
        }

        for species in document.species() {
            let Some(compartment_name) = compartment_names.get(species.compartment.as_str()) else {
                continue;
            };
            index
                .species
                .entry((compartment_name.to_string(), species.name.clone()))
                .or_insert_with(|| species.id.clone());
        }

        index
    }

    pub fn parameter_id(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn compartment_id(&self, name: &str) -> Option<&str> {
        self.compartments.get(name).map(String::as_str)
    }

    /// Id of the species addressed as `Compartment.Species`
    pub fn species_id(&self, dotted: &str) -> Option<&str> {
        let (compartment, species) = split_species_name(dotted)?;
        self.species
            .get(&(compartment.to_string(), species.to_string()))
            .map(String::as_str)
    }

    /// Look up every override name of the given kind
    pub fn resolve(&self, kind: EntityKind, overrides: &Overrides) -> Resolution {
        let mut resolution = Resolution::default();
        for (name, value) in overrides {
            let id = match kind {
                EntityKind::Parameter => self.parameter_id(name),
                EntityKind::Compartment => self.compartment_id(name),
                EntityKind::Species => self.species_id(name),
            };
            match id {
                Some(id) => resolution.resolved.push(ResolvedOverride {
                    name: name.clone(),
                    id: id.to_string(),
                    value: *value,
                }),
                None => resolution.unresolved.push(name.clone()),
            }
        }
        resolution
    }

    /// Set parameter values by name; returns the names that matched nothing
    pub fn apply_parameters(&self, document: &mut ModelDocument, overrides: &Overrides) -> Vec<String> {
        self.apply(EntityKind::Parameter, document, overrides, |document, id, value| {
            match document.parameter_mut(id) {
                Some(parameter) => {
                    parameter.value = value;
                    true
                }
                None => false,
            }
        })
    }

    /// Set declared compartment volumes by name; returns the names that matched nothing
    pub fn apply_compartment_sizes(
        &self,
        document: &mut ModelDocument,
        overrides: &Overrides,
    ) -> Vec<String> {
        self.apply(EntityKind::Compartment, document, overrides, |document, id, value| {
            match document.compartment_mut(id) {
                Some(compartment) => {
                    if compartment.is_computed() {
                        log::warn!(
                            "Compartment {} takes its volume from parameters {:?}; \
                             the declared size override has no effect on the simulation.",
                            compartment.name,
                            compartment.size_from
                        );
                    }
                    compartment.size = value;
                    true
                }
                None => false,
            }
        })
    }

    /// Set initial species amounts by dotted name; returns the names that matched nothing
    pub fn apply_species_amounts(
        &self,
        document: &mut ModelDocument,
        overrides: &Overrides,
    ) -> Vec<String> {
        self.apply(EntityKind::Species, document, overrides, |document, id, value| {
            match document.species_mut(id) {
                Some(species) => {
                    species.initial_amount = value;
                    true
                }
                None => false,
            }
        })
    }

    fn apply<F>(
        &self,
        kind: EntityKind,
        document: &mut ModelDocument,
        overrides: &Overrides,
        mut set: F,
    ) -> Vec<String>
    where
        F: FnMut(&mut ModelDocument, &str, f64) -> bool,
    {
        let Resolution {
            resolved,
            mut unresolved,
        } = self.resolve(kind, overrides);

        for entry in resolved {
            if !set(document, &entry.id, entry.value) {
                unresolved.push(entry.name);
            }
        }

        for name in &unresolved {
            log::info!("{kind} {name} not found in the model.");
        }
        unresolved
    }
}

/// Split `Compartment.Species` at the first `.`
pub fn split_species_name(dotted: &str) -> Option<(&str, &str)> {
    dotted
        .split_once('.')
        .filter(|(compartment, species)| !compartment.is_empty() && !species.is_empty())
}
