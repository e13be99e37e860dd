//! The simulation collaborator and the observed data it is compared against.

use crate::error::{EvidenceError, Result};
use crate::parameter::ParameterVector;

/**
A deterministic simulator: maps a parameter assignment and a set of time points to the
values of an observable expression.

Implementations must be thread-safe: every chain evaluates the model concurrently with its
own parameter vector. A failed simulation is reported by non-finite entries in the output.

```rust
use evidence_mcmc::experiment::Model;
use evidence_mcmc::parameter::ParameterVector;

struct Decay;

impl Model for Decay {
    fn evaluate_on(&self, _expression: &str, times: &[f64], theta: &ParameterVector) -> Vec<f64> {
        let k = theta.value_of("k").unwrap_or(f64::NAN);
        times.iter().map(|t| (-k * t).exp()).collect()
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["k".to_string()]
    }
}
```
*/
pub trait Model: Send + Sync {
    fn evaluate_on(&self, expression: &str, times: &[f64], parameters: &ParameterVector)
        -> Vec<f64>;

    fn parameter_names(&self) -> Vec<String>;
}

/// One observed time series of a measured expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
    pub measure_expression: String,
}

impl Experiment {
    pub fn new(
        times: Vec<f64>,
        values: Vec<f64>,
        measure_expression: impl Into<String>,
    ) -> Result<Self> {
        if times.len() != values.len() {
            return Err(EvidenceError::DimensionMismatch {
                expected: times.len(),
                got: values.len(),
            });
        }
        Ok(Self {
            times,
            values,
            measure_expression: measure_expression.into(),
        })
    }

    fn shares_grid_with(&self, other: &Experiment) -> bool {
        self.times == other.times && self.measure_expression == other.measure_expression
    }
}

/// An ordered collection of experiments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentSet {
    experiments: Vec<Experiment>,
}

impl ExperimentSet {
    pub fn new(experiments: Vec<Experiment>) -> Self {
        Self { experiments }
    }

    pub fn push(&mut self, experiment: Experiment) {
        self.experiments.push(experiment);
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Experiment> {
        self.experiments.iter()
    }

    /// The time grid and measured expression every experiment shares.
    ///
    /// Fails with [`EvidenceError::IncompatibleExperiments`] when the set is empty or any
    /// two experiments disagree.
    pub fn shared_grid(&self) -> Result<(&[f64], &str)> {
        let first = self.experiments.first().ok_or_else(|| {
            EvidenceError::IncompatibleExperiments("experiment set is empty".to_string())
        })?;
        if let Some((i, _)) = self
            .experiments
            .iter()
            .enumerate()
            .find(|(_, e)| !e.shares_grid_with(first))
        {
            return Err(EvidenceError::IncompatibleExperiments(format!(
                "experiment {i} differs from experiment 0"
            )));
        }
        Ok((&first.times, &first.measure_expression))
    }

    /// Splits the set into groups that each share one grid, in order of first appearance.
    pub fn batches(&self) -> Vec<ExperimentSet> {
        let mut groups: Vec<ExperimentSet> = Vec::new();
        for experiment in &self.experiments {
            match groups
                .iter_mut()
                .find(|g| g.experiments[0].shares_grid_with(experiment))
            {
                Some(group) => group.push(experiment.clone()),
                None => groups.push(ExperimentSet::new(vec![experiment.clone()])),
            }
        }
        groups
    }
}

impl FromIterator<Experiment> for ExperimentSet {
    fn from_iter<I: IntoIterator<Item = Experiment>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
