//! Region aggregation
//!
//! A *region* is a compartment-name pattern (`Tumor1`, `Kidney`, `Tumor`).
//! Its time-activity curve is the activity of every tracer species in every
//! matching compartment:
//!
//! $$\text{TAC}_{region}(t) = f \sum_{c \,\in\, region} V_c \sum_{s \,\in\, c,\ \text{label} \subset s} C_s(t)$$
//!
//! with $f$ the nmol → MBq factor of [`ActivityConversion`]. A species is a
//! tracer when its local name contains the tracer label (`Hot` by default),
//! so free and bound labelled ligand (`Hot`, `HotBound`) both count.
//!
//! A region matching no compartment yields an all-zero series.

use ndarray::{Array1, Array2};

use crate::engine::SimulationRun;
use crate::error::{PbpkError, Result};
use crate::models::{Compartment, EntityIndex, ModelDocument, split_species_name};
use crate::units::{ActivityConversion, DECAY_CONSTANT_PARAMETER};

/// Default tracer label
pub const DEFAULT_TRACER_LABEL: &str = "Hot";

/// How a region name selects compartments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionMatch {
    /// Compartment name starts with the region (`Tumor` ⊃ `Tumor1`, `TumorRest`)
    #[default]
    Prefix,
    /// Region appears anywhere in the compartment name (`Rest` ⊃ `TumorRest`)
    Contains,
    /// Names are equal
    Exact,
}

impl RegionMatch {
    pub fn matches(&self, compartment_name: &str, region: &str) -> bool {
        match self {
            RegionMatch::Prefix => compartment_name.starts_with(region),
            RegionMatch::Contains => compartment_name.contains(region),
            RegionMatch::Exact => compartment_name == region,
        }
    }
}

/// Which compartment volume weights the concentrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeSource {
    /// Volume used by the engine during the run (follows swept parameters)
    #[default]
    Simulated,
    /// Volume declared in the document
    Declared,
}

/// Aggregation options
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSettings {
    pub matching: RegionMatch,
    pub size_source: SizeSource,
    /// Substring identifying tracer species
    pub tracer_label: String,
    /// Name of the decay-constant parameter driving the MBq conversion
    pub decay_parameter: String,
}

impl AggregationSettings {
    pub fn with_matching(mut self, matching: RegionMatch) -> Self {
        self.matching = matching;
        self
    }

    pub fn with_size_source(mut self, size_source: SizeSource) -> Self {
        self.size_source = size_source;
        self
    }

    pub fn with_tracer_label(mut self, label: impl Into<String>) -> Self {
        self.tracer_label = label.into();
        self
    }
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            matching: RegionMatch::default(),
            size_source: SizeSource::default(),
            tracer_label: DEFAULT_TRACER_LABEL.to_string(),
            decay_parameter: DECAY_CONSTANT_PARAMETER.to_string(),
        }
    }
}

/// Computes region time-activity curves from a run of one document
#[derive(Debug)]
pub struct RegionAggregator<'a> {
    document: &'a ModelDocument,
    index: EntityIndex,
    conversion: ActivityConversion,
    settings: AggregationSettings,
}

impl<'a> RegionAggregator<'a> {
    /// Aggregator using the document's own decay constant
    ///
    /// # Errors
    ///
    /// [`PbpkError::MissingParameter`] when the decay-constant parameter is absent.
    pub fn new(document: &'a ModelDocument, settings: AggregationSettings) -> Result<Self> {
        let index = EntityIndex::build(document);
        let conversion =
            ActivityConversion::from_document(document, &index, &settings.decay_parameter)?;
        Ok(Self {
            document,
            index,
            conversion,
            settings,
        })
    }

    pub fn conversion(&self) -> &ActivityConversion {
        &self.conversion
    }

    /// Compartments selected by `region`, in declaration order
    pub fn matching_compartments(&self, region: &str) -> Vec<&'a Compartment> {
        let document = self.document;
        document
            .compartments()
            .iter()
            .filter(|c| self.settings.matching.matches(&c.name, region))
            .collect()
    }

    /// Time-activity curve of one region **\[MBq\]**
    pub fn aggregate(&self, region: &str, run: &SimulationRun) -> Result<Array1<f64>> {
        let mut total = Array1::zeros(run.steps());

        for compartment in self.matching_compartments(region) {
            let volume = self.volume(compartment, run)?;
            let weight = volume * self.conversion.factor();

            for species in self.document.species_in(&compartment.id) {
                if !species.name.contains(self.settings.tracer_label.as_str()) {
                    continue;
                }
                let series = run
                    .concentration(&species.id)
                    .ok_or_else(|| PbpkError::MissingOutput(format!("species '{}'", species.id)))?;
                total.scaled_add(weight, &series);
            }
        }

        Ok(total)
    }

    /// Curves of several regions as a `[steps, regions]` table
    pub fn aggregate_all(&self, regions: &[String], run: &SimulationRun) -> Result<Array2<f64>> {
        let mut table = Array2::zeros((run.steps(), regions.len()));
        for (column, region) in regions.iter().enumerate() {
            let curve = self.aggregate(region, run)?;
            table.column_mut(column).assign(&curve);
        }
        Ok(table)
    }

    /// Activity of a single species addressed as `Compartment.Species` **\[MBq\]**
    ///
    /// `None` when the name resolves to nothing.
    pub fn species_activity(&self, dotted: &str, run: &SimulationRun) -> Result<Option<Array1<f64>>> {
        let Some(species_id) = self.index.species_id(dotted) else {
            return Ok(None);
        };
        let compartment = split_species_name(dotted)
            .and_then(|(name, _)| self.index.compartment_id(name))
            .and_then(|id| self.document.compartment(id))
            .ok_or_else(|| PbpkError::MissingOutput(format!("compartment of '{dotted}'")))?;

        let weight = self.volume(compartment, run)? * self.conversion.factor();
        let series = run
            .concentration(species_id)
            .ok_or_else(|| PbpkError::MissingOutput(format!("species '{species_id}'")))?;
        Ok(Some(series.mapv(|c| c * weight)))
    }

    fn volume(&self, compartment: &Compartment, run: &SimulationRun) -> Result<f64> {
        match self.settings.size_source {
            SizeSource::Declared => Ok(compartment.size),
            SizeSource::Simulated => run
                .compartment_size(&compartment.id)
                .ok_or_else(|| PbpkError::MissingOutput(format!("compartment '{}'", compartment.id))),
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================
