//! Compiled compartmental system
//!
//! # Model equations
//!
//! Every species $i$ carries an amount $A_i$ (nmol) in a compartment of
//! volume $V_{c(i)}$ (L); its concentration is $C_i = A_i / V_{c(i)}$.
//!
//! Each reaction $r$ has a rate constant $k_r$, the product of its kinetic
//! parameters, and a flux:
//!
//! - **Flow**: $J_r = k_r \cdot C_s$ for its single reactant $s$
//!   ($k_r$ is a flow in L/min)
//! - **Mass action**: $J_r = k_r \cdot V_{c(s_1)} \cdot \prod_{s} C_s$
//!   taken in the compartment of the first reactant $s_1$
//!
//! The amounts evolve as
//!
//! $$\frac{dA_i}{dt} = \sum_{r : i \in P_r} J_r - \sum_{r : i \in R_r} J_r$$
//!
//! where $R_r$ and $P_r$ are the reactant and product lists (a species
//! listed twice counts twice).
//!
//! # Volumes
//!
//! A compartment with `size_from` parameters gets the product of their
//! values as its volume; the others keep their declared size. Volumes are
//! fixed for the whole run.

use std::collections::HashMap;

use nalgebra::DVector;

use crate::error::{PbpkError, Result};
use crate::models::{Kinetics, ModelDocument};
use crate::physics::{PhysicalModel, PhysicalState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RateLaw {
    Flow,
    MassAction,
}

#[derive(Debug, Clone)]
struct CompiledReaction {
    law: RateLaw,
    rate: f64,
    reactants: Vec<usize>,
    products: Vec<usize>,
}

/// Right-hand side of a [`ModelDocument`], ready for integration
#[derive(Debug, Clone)]
pub struct CompartmentalSystem {
    name: String,
    species_ids: Vec<String>,
    /// Volume of the compartment holding each species
    species_volumes: Vec<f64>,
    compartment_sizes: HashMap<String, f64>,
    initial_amounts: Vec<f64>,
    reactions: Vec<CompiledReaction>,
}

impl CompartmentalSystem {
    /// Compile a document
    ///
    /// # Errors
    ///
    /// [`PbpkError::Document`] when the document does not validate or a
    /// compartment ends up with a volume that is not finite and positive.
    pub fn compile(document: &ModelDocument) -> Result<Self> {
        document.validate()?;

        let parameter_values: HashMap<&str, f64> = document
            .parameters()
            .iter()
            .map(|p| (p.id.as_str(), p.value))
            .collect();
        let product_of = |ids: &[String]| -> f64 {
            ids.iter()
                .map(|id| parameter_values.get(id.as_str()).copied().unwrap_or(1.0))
                .product()
        };

        let mut compartment_sizes = HashMap::with_capacity(document.compartments().len());
        for compartment in document.compartments() {
            let size = if compartment.is_computed() {
                product_of(&compartment.size_from)
            } else {
                compartment.size
            };
            if !size.is_finite() || size <= 0.0 {
                return Err(PbpkError::Document(format!(
                    "compartment '{}' has volume {size}, expected a positive value",
                    compartment.name
                )));
            }
            compartment_sizes.insert(compartment.id.clone(), size);
        }

        let species_position: HashMap<&str, usize> = document
            .species()
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.as_str(), i))
            .collect();

        let mut species_ids = Vec::with_capacity(document.species().len());
        let mut species_volumes = Vec::with_capacity(document.species().len());
        let mut initial_amounts = Vec::with_capacity(document.species().len());
        for species in document.species() {
            species_ids.push(species.id.clone());
            // validate() guarantees the compartment exists
            species_volumes.push(compartment_sizes.get(&species.compartment).copied().unwrap_or(1.0));
            initial_amounts.push(species.initial_amount);
        }

        let positions = |ids: &[String]| -> Vec<usize> {
            ids.iter()
                .filter_map(|id| species_position.get(id.as_str()).copied())
                .collect()
        };

        let reactions = document
            .reactions()
            .iter()
            .map(|reaction| CompiledReaction {
                law: match reaction.kinetics {
                    Kinetics::Flow { .. } => RateLaw::Flow,
                    Kinetics::MassAction { .. } => RateLaw::MassAction,
                },
                rate: product_of(reaction.kinetics.parameters()),
                reactants: positions(&reaction.reactants),
                products: positions(&reaction.products),
            })
            .collect();

        Ok(Self {
            name: document.name().to_string(),
            species_ids,
            species_volumes,
            compartment_sizes,
            initial_amounts,
            reactions,
        })
    }

    /// Species ids, in state-vector order
    pub fn species_ids(&self) -> &[String] {
        &self.species_ids
    }

    /// Volume of the compartment holding species `index`
    pub fn species_volume(&self, index: usize) -> f64 {
        self.species_volumes[index]
    }

    /// Run-time volume of every compartment, keyed by id
    pub fn compartment_sizes(&self) -> &HashMap<String, f64> {
        &self.compartment_sizes
    }

    /// Concentrations **\[nmol/L\]** for a state of amounts
    pub fn concentrations(&self, state: &PhysicalState) -> DVector<f64> {
        state.amounts().component_div(&DVector::from_column_slice(&self.species_volumes))
    }

    fn flux(&self, reaction: &CompiledReaction, concentrations: &DVector<f64>) -> f64 {
        match reaction.law {
            RateLaw::Flow => reaction.rate * concentrations[reaction.reactants[0]],
            RateLaw::MassAction => {
                let volume = self.species_volumes[reaction.reactants[0]];
                reaction
                    .reactants
                    .iter()
                    .fold(reaction.rate * volume, |flux, &s| flux * concentrations[s])
            }
        }
    }
}

impl PhysicalModel for CompartmentalSystem {
    fn dimension(&self) -> usize {
        self.species_ids.len()
    }

    fn compute_physics(&self, state: &PhysicalState) -> PhysicalState {
        let concentrations = self.concentrations(state);
        let mut derivative = DVector::zeros(self.dimension());

        for reaction in &self.reactions {
            let flux = self.flux(reaction, &concentrations);
            for &s in &reaction.reactants {
                derivative[s] -= flux;
            }
            for &s in &reaction.products {
                derivative[s] += flux;
            }
        }

        PhysicalState::new(derivative)
    }

    fn setup_initial_state(&self) -> PhysicalState {
        PhysicalState::from_vec(self.initial_amounts.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// =================================================================================================
// Tests
// =================================================================================================
