/*!
Named parameters with attached priors.

A [`ParameterVector`] is the full inference target: the model parameters in model order,
optionally followed by one observation-noise parameter. Cloning a vector clones every
[`Parameter`], so chains never share mutable state.

```rust
use evidence_mcmc::distributions::{Constant, Gamma};
use evidence_mcmc::parameter::{Parameter, ParameterVector};

let k = Parameter::new("k", 1.5, Gamma::new(2.0, 1.0).unwrap());
let sigma = Parameter::new("sigma", 0.1, Constant::new(0.1).unwrap());
let theta = ParameterVector::new(vec![k], Some(sigma));

assert_eq!(theta.len(), 2);
assert_eq!(theta.model_parameters().len(), 1);
assert_eq!(theta.noise_sigma().unwrap(), 0.1);
// The noise parameter has a constant prior, so only `k` is free.
assert_eq!(theta.free_indices(), vec![0]);
```
*/

use rand::Rng;

use crate::distributions::{ContinuousDistribution, ScalarDistribution};
use crate::error::{EvidenceError, Result};
use crate::experiment::Model;

/// A named value and the prior it was drawn from.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    value: f64,
    prior: ScalarDistribution,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: f64, prior: impl Into<ScalarDistribution>) -> Self {
        Self {
            name: name.into(),
            value,
            prior: prior.into(),
        }
    }

    /// Creates the parameter with a value drawn from `prior`.
    pub fn from_prior<R: Rng + ?Sized>(
        name: impl Into<String>,
        prior: impl Into<ScalarDistribution>,
        rng: &mut R,
    ) -> Self {
        let prior = prior.into();
        let value = prior.sample(rng);
        Self {
            name: name.into(),
            value,
            prior,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn prior(&self) -> &ScalarDistribution {
        &self.prior
    }

    pub fn ln_prior(&self) -> f64 {
        self.prior.ln_pdf(self.value)
    }

    /// Parameters with a constant prior are never jumped.
    pub fn is_free(&self) -> bool {
        !self.prior.is_constant()
    }
}

/// Ordered parameters; the noise parameter, when present, is always last.
#[derive(Debug, Clone)]
pub struct ParameterVector {
    parameters: Vec<Parameter>,
    has_noise: bool,
}

impl ParameterVector {
    pub fn new(model: Vec<Parameter>, noise: Option<Parameter>) -> Self {
        let has_noise = noise.is_some();
        let mut parameters = model;
        parameters.extend(noise);
        Self {
            parameters,
            has_noise,
        }
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    /// All parameters including the noise parameter.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Everything except the noise parameter.
    pub fn model_parameters(&self) -> &[Parameter] {
        let n = self.parameters.len() - usize::from(self.has_noise);
        &self.parameters[..n]
    }

    pub fn noise(&self) -> Option<&Parameter> {
        if self.has_noise {
            self.parameters.last()
        } else {
            None
        }
    }

    /// Standard deviation of the observation noise.
    pub fn noise_sigma(&self) -> Result<f64> {
        self.noise()
            .map(Parameter::value)
            .ok_or(EvidenceError::MissingNoiseParameter)
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Value of the named parameter, searching model parameters and noise alike.
    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.get(name).map(Parameter::value)
    }

    pub fn names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.value).collect()
    }

    pub fn set_values(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.len() {
            return Err(EvidenceError::DimensionMismatch {
                expected: self.len(),
                got: values.len(),
            });
        }
        for (p, v) in self.parameters.iter_mut().zip(values) {
            p.value = *v;
        }
        Ok(())
    }

    /// Fails with [`InvalidDistribution`](EvidenceError::InvalidDistribution) when a free
    /// parameter's prior reaches zero or below, where the positive jump kernels cannot go.
    pub fn check_positive_priors(&self) -> Result<()> {
        match self
            .parameters
            .iter()
            .find(|p| p.is_free() && !p.prior.has_positive_support())
        {
            Some(p) => Err(EvidenceError::invalid(
                p.prior.name(),
                format!("free parameter '{}' needs a prior on positive values", p.name),
            )),
            None => Ok(()),
        }
    }

    /// [`check_positive_priors`](Self::check_positive_priors), then requires every free value
    /// to be positive and finite.
    pub fn check_positive_support(&self) -> Result<()> {
        self.check_positive_priors()?;
        for p in self.parameters.iter().filter(|p| p.is_free()) {
            if !(p.value.is_finite() && p.value > 0.0) {
                return Err(EvidenceError::InvalidSettings(format!(
                    "free parameter '{}' must start at a positive value, got {}",
                    p.name, p.value
                )));
            }
        }
        Ok(())
    }

    /// Indices of the parameters a sampler may move.
    pub fn free_indices(&self) -> Vec<usize> {
        self.parameters
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_free())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn values_at(&self, indices: &[usize]) -> Vec<f64> {
        indices.iter().map(|i| self.parameters[*i].value).collect()
    }

    /// A copy with the parameters at `indices` set to `values`.
    pub fn with_values_at(&self, indices: &[usize], values: &[f64]) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(EvidenceError::DimensionMismatch {
                expected: indices.len(),
                got: values.len(),
            });
        }
        let mut out = self.clone();
        for (i, v) in indices.iter().zip(values) {
            let p = out
                .parameters
                .get_mut(*i)
                .ok_or(EvidenceError::DimensionMismatch {
                    expected: self.len(),
                    got: *i + 1,
                })?;
            p.value = *v;
        }
        Ok(out)
    }

    /// A copy with every value redrawn from its own prior.
    pub fn resample_from_prior<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut out = self.clone();
        for p in out.parameters.iter_mut() {
            p.value = p.prior.sample(rng);
        }
        out
    }

    /// Sum of the independent log-prior densities.
    pub fn log_prior(&self) -> f64 {
        self.parameters.iter().map(Parameter::ln_prior).sum()
    }
}

/**
Priors keyed by parameter name plus the prior of the observation noise.

```rust
use evidence_mcmc::distributions::{Gamma, Uniform};
use evidence_mcmc::parameter::Priors;
use rand::rngs::SmallRng;
use rand::SeedableRng;

let priors = Priors::new("sigma", Uniform::new(0.01, 1.0).unwrap())
    .with_prior("k1", Gamma::new(2.0, 1.0).unwrap());

let mut rng = SmallRng::seed_from_u64(42);
let theta = priors.parameter_vector_for_names(&["k1"], &mut rng).unwrap();
assert_eq!(theta.names(), vec!["k1", "sigma"]);
assert!(priors.parameter_vector_for_names(&["k2"], &mut rng).is_err());
```
*/
#[derive(Debug, Clone)]
pub struct Priors {
    parameters: Vec<(String, ScalarDistribution)>,
    noise: (String, ScalarDistribution),
}

impl Priors {
    pub fn new(noise_name: impl Into<String>, noise_prior: impl Into<ScalarDistribution>) -> Self {
        Self {
            parameters: Vec::new(),
            noise: (noise_name.into(), noise_prior.into()),
        }
    }

    /// Adds or replaces the prior of a model parameter.
    pub fn with_prior(mut self, name: impl Into<String>, prior: impl Into<ScalarDistribution>) -> Self {
        let name = name.into();
        let prior = prior.into();
        match self.parameters.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = prior,
            None => self.parameters.push((name, prior)),
        }
        self
    }

    pub fn prior(&self, name: &str) -> Option<&ScalarDistribution> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
    }

    pub fn noise_prior(&self) -> &ScalarDistribution {
        &self.noise.1
    }

    /// Builds a parameter vector for the given names, in order, drawing every value from
    /// its prior. Fails with [`EvidenceError::MissingPrior`] for the first name without one.
    pub fn parameter_vector_for_names<S: AsRef<str>, R: Rng + ?Sized>(
        &self,
        names: &[S],
        rng: &mut R,
    ) -> Result<ParameterVector> {
        let model = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.prior(name)
                    .map(|prior| Parameter::from_prior(name, prior.clone(), rng))
                    .ok_or_else(|| EvidenceError::MissingPrior(name.to_string()))
            })
            .collect::<Result<Vec<Parameter>>>()?;
        let noise = Parameter::from_prior(self.noise.0.clone(), self.noise.1.clone(), rng);
        Ok(ParameterVector::new(model, Some(noise)))
    }

    /// Builds the parameter vector for every parameter the model declares.
    pub fn parameter_vector_for<M: Model + ?Sized, R: Rng + ?Sized>(
        &self,
        model: &M,
        rng: &mut R,
    ) -> Result<ParameterVector> {
        let names = model.parameter_names();
        self.parameter_vector_for_names(names.as_slice(), rng)
    }
}
