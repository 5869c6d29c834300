//! Parameter sweeps
//!
//! A [`SweepPlan`] lists parameter names and the value combinations to run.
//! [`sweep`] simulates every combination, in parallel when the `parallel`
//! feature is enabled, and stacks the region curves into a
//! `[combinations, steps, observables]` array whose first axis follows the
//! plan order, whatever order the workers finish in.
//!
//! Each worker receives the serialised configured model, rebuilds its own
//! document, sets the swept parameters by id, and asks the engine for a run.
//! Nothing mutable is shared between workers.
//!
//! # Example
//!
//! ```rust,no_run
//! use pbpk_rs::prelude::*;
//!
//! let base = ModelSource::named("psma_demo").load(&ModelLibrary::bundled())?;
//! let model = configure(&base, &ConfigurationBundle::default())?;
//! let plan = SweepPlan::grid(vec![
//!     ("Tumor1Volume", vec![0.1, 0.2, 0.3]),
//!     ("Rden_Tumor1", vec![0.1, 0.2]),
//! ])?;
//!
//! let observables = vec!["Tumor1".to_string(), "Kidney".to_string()];
//! let tacs = sweep(&model, &plan, &TimeSpan::until(60.0, 100), &observables,
//!                  &Rk4Engine::default(), &SweepOptions::default())?;
//! assert_eq!(tacs.dim(), (6, 100, 2));
//! # Ok::<(), pbpk_rs::PbpkError>(())
//! ```

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::aggregate::{AggregationSettings, RegionAggregator};
use crate::configure::ConfiguredModel;
use crate::engine::{SimulationEngine, TimeSpan};
use crate::error::{PbpkError, Result};
use crate::models::{EntityIndex, ModelDocument};

// =================================================================================================
// Plan
// =================================================================================================

/// Swept parameter names and the value combinations to simulate
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    parameters: Vec<String>,
    combinations: Vec<Vec<f64>>,
}

impl SweepPlan {
    /// Plan from explicit combinations
    ///
    /// # Errors
    ///
    /// - [`PbpkError::SweepShape`] when a combination does not have one value per parameter
    /// - [`PbpkError::InvalidConfiguration`] for an empty plan or a non-finite value
    pub fn new(parameters: Vec<String>, combinations: Vec<Vec<f64>>) -> Result<Self> {
        if parameters.is_empty() || combinations.is_empty() {
            return Err(PbpkError::InvalidConfiguration(
                "a sweep needs at least one parameter and one combination".to_string(),
            ));
        }
        for (index, combination) in combinations.iter().enumerate() {
            if combination.len() != parameters.len() {
                return Err(PbpkError::SweepShape {
                    index,
                    expected: parameters.len(),
                    found: combination.len(),
                });
            }
            if let Some(value) = combination.iter().find(|v| !v.is_finite()) {
                return Err(PbpkError::InvalidConfiguration(format!(
                    "sweep combination {index} contains non-finite value {value}"
                )));
            }
        }
        Ok(Self {
            parameters,
            combinations,
        })
    }

    /// Cartesian product of per-parameter value lists
    ///
    /// The first axis varies slowest: `[("a", [1, 2]), ("b", [3, 4])]` runs
    /// `(1,3) (1,4) (2,3) (2,4)`.
    pub fn grid<S: Into<String>>(axes: Vec<(S, Vec<f64>)>) -> Result<Self> {
        let mut parameters = Vec::with_capacity(axes.len());
        let mut combinations: Vec<Vec<f64>> = vec![Vec::new()];

        for (name, values) in axes {
            parameters.push(name.into());
            combinations = combinations
                .into_iter()
                .flat_map(|prefix| {
                    values.iter().map(move |&value| {
                        let mut combination = prefix.clone();
                        combination.push(value);
                        combination
                    })
                })
                .collect();
        }

        Self::new(parameters, combinations)
    }

    /// Swept parameter names
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn combinations(&self) -> &[Vec<f64>] {
        &self.combinations
    }

    /// Number of combinations
    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }
}

// =================================================================================================
// Options
// =================================================================================================

/// Execution options shared by single runs and sweeps
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SweepOptions {
    /// Upper bound on concurrent workers; number of cores when `None`
    pub max_workers: Option<usize>,
    pub aggregation: AggregationSettings,
}

impl SweepOptions {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    pub fn with_aggregation(mut self, aggregation: AggregationSettings) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Workers actually started for `jobs` combinations
    ///
    /// Never more than the available cores, whatever `max_workers` asks for.
    pub fn worker_count(&self, jobs: usize) -> usize {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.max_workers
            .unwrap_or(available)
            .min(available)
            .min(jobs)
            .max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == Some(0) {
            return Err(PbpkError::InvalidConfiguration(
                "max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// =================================================================================================
// Execution
// =================================================================================================

/// Simulate every combination of `plan`
///
/// # Errors
///
/// - [`PbpkError::UnknownSweepParameters`], before any worker starts, when
///   swept names are missing from the model
/// - [`PbpkError::Worker`] wrapping the first failure of a combination
pub fn sweep<E>(
    model: &ConfiguredModel,
    plan: &SweepPlan,
    span: &TimeSpan,
    observables: &[String],
    engine: &E,
    options: &SweepOptions,
) -> Result<Array3<f64>>
where
    E: SimulationEngine + ?Sized,
{
    span.validate()?;
    options.validate()?;
    let parameter_ids = resolve_swept_parameters(model.index(), plan.parameters())?;
    let serialized = model.serialize()?;
    let workers = options.worker_count(plan.len());

    log::debug!(
        "Sweeping {} over {} combination(s) with {} worker(s) using {}",
        plan.parameters().join(", "),
        plan.len(),
        workers,
        engine.name()
    );

    let blocks = ordered_map(plan.combinations(), workers, |index, values| {
        simulate_point(
            &serialized,
            &parameter_ids,
            values,
            span,
            observables,
            engine,
            &options.aggregation,
        )
        .map(|block| {
            log::debug!("Combination {index} {values:?} done");
            block
        })
        .map_err(|source| PbpkError::Worker {
            index,
            source: Box::new(source),
        })
    })?;

    stack_curves(&blocks)
}

/// Simulate the configured model once; the result has a single curve
pub fn simulate_single<E>(
    model: &ConfiguredModel,
    span: &TimeSpan,
    observables: &[String],
    engine: &E,
    settings: &AggregationSettings,
) -> Result<Array3<f64>>
where
    E: SimulationEngine + ?Sized,
{
    span.validate()?;
    let run = engine.simulate(&model.serialize()?, span)?;
    let table = RegionAggregator::new(model.document(), settings.clone())?.aggregate_all(observables, &run)?;
    stack_curves(&[table])
}

/// Ids of the swept parameters, or every name that failed to resolve
fn resolve_swept_parameters(index: &EntityIndex, names: &[String]) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(names.len());
    let mut unknown = Vec::new();
    for name in names {
        match index.parameter_id(name) {
            Some(id) => ids.push(id.to_string()),
            None => unknown.push(name.clone()),
        }
    }
    if unknown.is_empty() {
        Ok(ids)
    } else {
        Err(PbpkError::UnknownSweepParameters(unknown))
    }
}

fn simulate_point<E>(
    serialized: &str,
    parameter_ids: &[String],
    values: &[f64],
    span: &TimeSpan,
    observables: &[String],
    engine: &E,
    settings: &AggregationSettings,
) -> Result<Array2<f64>>
where
    E: SimulationEngine + ?Sized,
{
    let mut document = ModelDocument::from_json(serialized)?;
    for (id, value) in parameter_ids.iter().zip(values) {
        let parameter = document
            .parameter_mut(id)
            .ok_or_else(|| PbpkError::Document(format!("parameter id '{id}' missing from worker copy")))?;
        parameter.value = *value;
    }

    let run = engine.simulate(&document.to_json()?, span)?;
    RegionAggregator::new(&document, settings.clone())?.aggregate_all(observables, &run)
}

fn stack_curves(blocks: &[Array2<f64>]) -> Result<Array3<f64>> {
    let views: Vec<ArrayView2<'_, f64>> = blocks.iter().map(|block| block.view()).collect();
    ndarray::stack(Axis(0), &views)
        .map_err(|e| PbpkError::Integration(format!("curves of different shapes: {e}")))
}

/// Map `f` over `items` keeping input order, on up to `workers` threads
#[cfg(feature = "parallel")]
fn ordered_map<T, R, F>(items: &[T], workers: usize, f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> Result<R> + Sync + Send,
{
    use rayon::prelude::*;

    if workers <= 1 {
        return items.iter().enumerate().map(|(i, item)| f(i, item)).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| PbpkError::InvalidConfiguration(format!("cannot start worker pool: {e}")))?;

    pool.install(|| {
        items
            .par_iter()
            .enumerate()
            .map(|(i, item)| f(i, item))
            .collect()
    })
}

#[cfg(not(feature = "parallel"))]
fn ordered_map<T, R, F>(items: &[T], _workers: usize, f: F) -> Result<Vec<R>>
where
    F: Fn(usize, &T) -> Result<R>,
{
    items.iter().enumerate().map(|(i, item)| f(i, item)).collect()
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_order_first_axis_slowest() {
        let plan = SweepPlan::grid(vec![("a", vec![1.0, 2.0]), ("b", vec![3.0, 4.0, 5.0])]).unwrap();

        assert_eq!(plan.len(), 6);
        assert_eq!(plan.parameters(), &["a".to_string(), "b".to_string()]);
        assert_eq!(plan.combinations()[0], vec![1.0, 3.0]);
        assert_eq!(plan.combinations()[2], vec![1.0, 5.0]);
        assert_eq!(plan.combinations()[3], vec![2.0, 3.0]);
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let result = SweepPlan::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0], vec![3.0]],
        );
        assert!(matches!(
            result,
            Err(PbpkError::SweepShape {
                index: 1,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_empty_plans_are_rejected() {
        assert!(SweepPlan::new(vec![], vec![vec![]]).is_err());
        assert!(SweepPlan::grid(vec![("a", vec![])]).is_err());
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let result = SweepPlan::new(vec!["a".to_string()], vec![vec![f64::NAN]]);
        assert!(matches!(result, Err(PbpkError::InvalidConfiguration(_))));
    }

    fn cores() -> usize {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }

    #[test]
    fn test_worker_count_bounds() {
        let options = SweepOptions::default().with_max_workers(4);
        assert_eq!(options.worker_count(24), cores().min(4));
        assert_eq!(options.worker_count(2), cores().min(2));
        assert_eq!(options.worker_count(0), 1);
        assert_eq!(SweepOptions::default().worker_count(1), 1);
        assert_eq!(SweepOptions::default().with_max_workers(1).worker_count(24), 1);
        assert!(SweepOptions::default().with_max_workers(0).validate().is_err());
    }

    #[test]
    fn test_worker_count_capped_at_available_cores() {
        let options = SweepOptions::default().with_max_workers(4096);
        let workers = options.worker_count(4096);
        assert!(workers >= 1);
        assert!(workers <= cores(), "{workers} workers for {} cores", cores());
        assert_eq!(SweepOptions::default().worker_count(4096), cores());
    }

    #[test]
    fn test_unknown_names_all_listed() {
        let document = ModelDocument::new("m").with_parameter("p1", "kA", 1.0);
        let index = EntityIndex::build(&document);
        let names = vec!["kA".to_string(), "kB".to_string(), "kC".to_string()];

        match resolve_swept_parameters(&index, &names) {
            Err(PbpkError::UnknownSweepParameters(unknown)) => {
                assert_eq!(unknown, vec!["kB".to_string(), "kC".to_string()]);
            }
            other => panic!("expected UnknownSweepParameters, got {other:?}"),
        }
    }

    #[test]
    fn test_ordered_map_keeps_order() {
        let items: Vec<usize> = (0..64).collect();
        let result = ordered_map(&items, 8, |i, item| Ok(i * 100 + item)).unwrap();
        let expected: Vec<usize> = (0..64).map(|i| i * 101).collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_ordered_map_propagates_failure() {
        let items = vec![1, 2, 3];
        let result: Result<Vec<i32>> = ordered_map(&items, 2, |_, &item| {
            if item == 2 {
                Err(PbpkError::Integration("boom".to_string()))
            } else {
                Ok(item)
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_stack_curves_shape() {
        let blocks = vec![Array2::zeros((5, 3)), Array2::ones((5, 3))];
        let stacked = stack_curves(&blocks).unwrap();
        assert_eq!(stacked.dim(), (2, 5, 3));
        assert_eq!(stacked[[1, 4, 2]], 1.0);
    }
}
