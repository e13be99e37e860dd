/*!
Gaussian observation likelihood and the [`LogLikelihood`] seam the samplers consume.

A simulation that produces any non-finite value yields a log-likelihood of `-inf`. That is
a rejection signal for the MH step, not an error.

```rust
use evidence_mcmc::distributions::Constant;
use evidence_mcmc::experiment::{Experiment, ExperimentSet, Model};
use evidence_mcmc::likelihood::{LogLikelihood, ObservedLikelihood};
use evidence_mcmc::parameter::{Parameter, ParameterVector};

struct Flat;

impl Model for Flat {
    fn evaluate_on(&self, _: &str, times: &[f64], theta: &ParameterVector) -> Vec<f64> {
        vec![theta.value_of("a").unwrap_or(f64::NAN); times.len()]
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["a".to_string()]
    }
}

let data = ExperimentSet::new(vec![
    Experiment::new(vec![0.0, 1.0], vec![1.0, 1.0], "a").unwrap(),
]);
let likelihood = ObservedLikelihood::new(Flat, data).unwrap();
let theta = ParameterVector::new(
    vec![Parameter::new("a", 1.0, Constant::new(1.0).unwrap())],
    Some(Parameter::new("sigma", 1.0, Constant::new(1.0).unwrap())),
);
let expected = -(2.0 * std::f64::consts::PI).ln();
assert!((likelihood.log_likelihood(&theta).unwrap() - expected).abs() < 1e-12);
```
*/

use log::trace;
use statrs::distribution::{Continuous, Normal};

use crate::error::{EvidenceError, Result};
use crate::experiment::{ExperimentSet, Model};
use crate::parameter::ParameterVector;

/// Anything that scores a parameter vector with a log-likelihood.
pub trait LogLikelihood: Send + Sync {
    fn log_likelihood(&self, theta: &ParameterVector) -> Result<f64>;
}

impl<L: LogLikelihood + ?Sized> LogLikelihood for &L {
    fn log_likelihood(&self, theta: &ParameterVector) -> Result<f64> {
        (**self).log_likelihood(theta)
    }
}

/// Gaussian likelihood of one batch of experiments under a simulation model.
#[derive(Debug, Clone)]
pub struct LikelihoodFunction<M> {
    model: M,
}

impl<M: Model> LikelihoodFunction<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Sums `N(observed; simulated, sigma)` log-densities over every experiment and time
    /// point, with `sigma` the value of the noise parameter in `theta`.
    ///
    /// All experiments must share one time grid and measured expression. The model is
    /// evaluated once for the whole batch.
    pub fn get_log_likelihood(
        &self,
        experiments: &ExperimentSet,
        theta: &ParameterVector,
    ) -> Result<f64> {
        let (times, expression) = experiments.shared_grid()?;
        if let Some(e) = experiments.iter().find(|e| e.values.len() != times.len()) {
            return Err(EvidenceError::DimensionMismatch {
                expected: times.len(),
                got: e.values.len(),
            });
        }
        let sigma = theta.noise_sigma()?;
        let simulated = self.model.evaluate_on(expression, times, theta);
        if simulated.len() != times.len() {
            return Err(EvidenceError::DimensionMismatch {
                expected: times.len(),
                got: simulated.len(),
            });
        }
        if simulated.iter().any(|v| !v.is_finite()) {
            trace!("Simulation of '{expression}' produced non-finite values");
            return Ok(f64::NEG_INFINITY);
        }
        let noise = match Normal::new(0.0, sigma) {
            Ok(noise) if sigma > 0.0 => noise,
            _ => return Ok(f64::NEG_INFINITY),
        };
        Ok(experiments
            .iter()
            .flat_map(|e| e.values.iter().zip(&simulated))
            .map(|(observed, predicted)| noise.ln_pdf(observed - predicted))
            .sum())
    }
}

/// Likelihood of a whole experiment set, evaluated one shared-grid batch at a time.
#[derive(Debug, Clone)]
pub struct ObservedLikelihood<M> {
    function: LikelihoodFunction<M>,
    batches: Vec<ExperimentSet>,
}

impl<M: Model> ObservedLikelihood<M> {
    pub fn new(model: M, experiments: ExperimentSet) -> Result<Self> {
        if experiments.is_empty() {
            return Err(EvidenceError::IncompatibleExperiments(
                "experiment set is empty".to_string(),
            ));
        }
        for experiment in experiments.iter() {
            if experiment.values.len() != experiment.times.len() {
                return Err(EvidenceError::DimensionMismatch {
                    expected: experiment.times.len(),
                    got: experiment.values.len(),
                });
            }
        }
        Ok(Self {
            function: LikelihoodFunction::new(model),
            batches: experiments.batches(),
        })
    }

    pub fn model(&self) -> &M {
        self.function.model()
    }

    pub fn batches(&self) -> &[ExperimentSet] {
        &self.batches
    }
}

impl<M: Model> LogLikelihood for ObservedLikelihood<M> {
    fn log_likelihood(&self, theta: &ParameterVector) -> Result<f64> {
        let mut total = 0.0;
        for batch in &self.batches {
            let ll = self.function.get_log_likelihood(batch, theta)?;
            if ll == f64::NEG_INFINITY {
                return Ok(ll);
            }
            total += ll;
        }
        Ok(total)
    }
}

/// A likelihood that ignores the parameters. Sampling under it reproduces the prior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantLikelihood(pub f64);

impl LogLikelihood for ConstantLikelihood {
    fn log_likelihood(&self, _theta: &ParameterVector) -> Result<f64> {
        Ok(self.0)
    }
}

/// Adapts a closure into a [`LogLikelihood`].
#[derive(Clone)]
pub struct FnLikelihood<F>(pub F);

impl<F> LogLikelihood for FnLikelihood<F>
where
    F: Fn(&ParameterVector) -> f64 + Send + Sync,
{
    fn log_likelihood(&self, theta: &ParameterVector) -> Result<f64> {
        Ok((self.0)(theta))
    }
}
