/*!
# Metropolis–Hastings Engine

One MH machine drives every phase of the evidence pipeline. What changes between phases is
injected:

- a [`JumpStrategy`] produces the jump distribution for the current state and may adapt
  between batches or after each iteration;
- an [`AcceptanceRule`] turns the current and candidate states into an acceptance ratio.

The engine owns the likelihood, the chain's RNG and its append-only [`Sample`].

## Lifecycle

1. [`MetropolisHastings::start_sample_from_prior`] (or [`MetropolisHastings::start_sample`])
   draws the starting state and evaluates its log-likelihood.
2. [`MetropolisHastings::get_sample`] runs `n` iterations. Each one draws a candidate from the
   jump distribution, evaluates its log-likelihood, computes the ratio and accepts with
   probability `min(1, ratio)`.
3. [`MetropolisHastings::manual_jump`] force-appends a state, counted as an accepted jump.

Parameters with a [`Constant`](crate::distributions::Constant) prior are never jumped; the
strategies only ever see the free coordinates.

## Example

```rust
use evidence_mcmc::adaptive::{RateAdaptive, ScaleAdaptation};
use evidence_mcmc::distributions::Gamma;
use evidence_mcmc::likelihood::ConstantLikelihood;
use evidence_mcmc::metropolis_hastings::{MetropolisHastings, TemperedRule};
use evidence_mcmc::parameter::{Parameter, ParameterVector};

let template = ParameterVector::new(
    vec![Parameter::new("k", 1.0, Gamma::new(2.0, 1.0).unwrap())],
    None,
);
let strategy = RateAdaptive::from_priors(&template, ScaleAdaptation::default()).unwrap();
let mut mh = MetropolisHastings::new(ConstantLikelihood(0.0), strategy, TemperedRule::new(1.0))
    .set_seed(42);

mh.start_sample_from_prior(&template).unwrap();
let sample = mh.get_sample(500).unwrap();
assert_eq!(sample.len(), 501);
assert_eq!(sample.jumps(), 500);
```
*/

use log::{debug, trace};
use rand::prelude::*;

use crate::core::{ChainState, Sample};
use crate::distributions::MultivariateDistribution;
use crate::error::{EvidenceError, Result};
use crate::io::{TraceRecord, TraceSink};
use crate::likelihood::LogLikelihood;
use crate::parameter::ParameterVector;
use crate::ratio::{acceptance_probability, safe_ratio, tempered_ratio};

/// Consecutive iterations without a valid jump density after which a chain gives up.
pub const MAX_STALLED_ITERATIONS: usize = 100;

/// Supplies jump distributions over the free coordinates of a chain.
pub trait JumpStrategy {
    type Jump: MultivariateDistribution;

    /// The jump distribution conditioned on the current free values.
    fn jump_distribution(&self, current: &[f64]) -> Result<Self::Jump>;

    /// Called at the start of every [`MetropolisHastings::get_sample`] call.
    fn before_batch(&mut self, _sample: &Sample, _free: &[usize]) -> Result<()> {
        Ok(())
    }

    /// Called after each state is appended to the sample.
    fn after_iteration(&mut self, _sample: &Sample) {}
}

/// Computes the MH acceptance ratio of a candidate.
pub trait AcceptanceRule {
    /// `ln_forward` is the log jump density of the candidate given the current state,
    /// `ln_reverse` that of the current state given the candidate.
    fn ratio(
        &self,
        current: &ChainState,
        candidate: &ChainState,
        ln_forward: f64,
        ln_reverse: f64,
    ) -> f64;

    /// Power the likelihood is raised to; reported in traces.
    fn temperature(&self) -> f64 {
        1.0
    }
}

/// Power-posterior acceptance: `(L'/L)^beta * p(theta')/p(theta) * q(theta|theta')/q(theta'|theta)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperedRule {
    pub temperature: f64,
}

impl TemperedRule {
    pub fn new(temperature: f64) -> Self {
        Self { temperature }
    }
}

impl AcceptanceRule for TemperedRule {
    fn ratio(
        &self,
        current: &ChainState,
        candidate: &ChainState,
        ln_forward: f64,
        ln_reverse: f64,
    ) -> f64 {
        let likelihood = tempered_ratio(
            candidate.log_likelihood,
            current.log_likelihood,
            self.temperature,
        );
        let prior = safe_ratio(candidate.theta.log_prior(), current.theta.log_prior());
        let jump = safe_ratio(ln_reverse, ln_forward);
        likelihood * prior * jump
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }
}

/**
A single Metropolis–Hastings chain with injected jump strategy `J` and acceptance rule `A`.

The chain's RNG is a [`SmallRng`]; [`MetropolisHastings::set_seed`] makes runs reproducible.
*/
pub struct MetropolisHastings<L, J, A = TemperedRule> {
    likelihood: L,
    strategy: J,
    rule: A,
    sample: Sample,
    free: Vec<usize>,
    /// The chain-specific random seed.
    pub seed: u64,
    rng: SmallRng,
    trace: Option<Box<dyn TraceSink + Send>>,
    stalled: usize,
}

impl<L, J, A> MetropolisHastings<L, J, A>
where
    L: LogLikelihood,
    J: JumpStrategy,
    A: AcceptanceRule,
{
    pub fn new(likelihood: L, strategy: J, rule: A) -> Self {
        let seed = thread_rng().gen::<u64>();
        Self {
            likelihood,
            strategy,
            rule,
            sample: Sample::new(),
            free: Vec::new(),
            seed,
            rng: SmallRng::seed_from_u64(seed),
            trace: None,
            stalled: 0,
        }
    }

    /// Reseeds the chain's RNG.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Sends a record of every iteration to `sink`.
    pub fn with_trace<S: TraceSink + Send + 'static>(mut self, sink: S) -> Self {
        self.trace = Some(Box::new(sink));
        self
    }

    /// Draws every parameter of `template` from its prior and starts a new sample there.
    pub fn start_sample_from_prior(&mut self, template: &ParameterVector) -> Result<()> {
        let theta = template.resample_from_prior(&mut self.rng);
        self.start_sample(theta)
    }

    /// Starts a new sample at `theta`, discarding any previous one.
    pub fn start_sample(&mut self, theta: ParameterVector) -> Result<()> {
        let free = theta.free_indices();
        if free.is_empty() {
            return Err(EvidenceError::InvalidSettings(
                "every parameter has a constant prior, nothing to sample".to_string(),
            ));
        }
        theta.check_positive_support()?;
        let log_likelihood = self.likelihood.log_likelihood(&theta)?;
        trace!("Starting sample at {:?} (log L = {log_likelihood})", theta.values());
        self.sample = Sample::new();
        self.sample.start(ChainState::new(theta, log_likelihood));
        self.free = free;
        self.stalled = 0;
        Ok(())
    }

    /// Runs `n` MH iterations and returns the whole accumulated sample.
    pub fn get_sample(&mut self, n: usize) -> Result<&Sample> {
        if self.sample.is_empty() {
            return Err(EvidenceError::EmptySample);
        }
        self.strategy.before_batch(&self.sample, &self.free)?;
        for _ in 0..n {
            self.step()?;
        }
        Ok(&self.sample)
    }

    /// One MH iteration; returns whether the candidate was accepted.
    fn step(&mut self) -> Result<bool> {
        let current = self.sample.last().ok_or(EvidenceError::EmptySample)?;
        let current_values = current.theta.values_at(&self.free);

        let forward = match self.strategy.jump_distribution(&current_values) {
            Ok(forward) => forward,
            // No valid jump density from this state: the iteration is a rejection.
            Err(EvidenceError::CovarianceNotPositiveDefinite { context }) => {
                self.stalled += 1;
                if self.stalled >= MAX_STALLED_ITERATIONS {
                    return Err(EvidenceError::CovarianceNotPositiveDefinite {
                        context: format!(
                            "no jump from {current_values:?} in {} consecutive iterations: {context}",
                            self.stalled
                        ),
                    });
                }
                debug!("No jump from {current_values:?} ({context}), staying put");
                let stay = current.clone();
                self.sample.record(stay, false);
                self.strategy.after_iteration(&self.sample);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        self.stalled = 0;
        let proposal = forward.sample(&mut self.rng);
        let theta = current.theta.with_values_at(&self.free, &proposal)?;
        // Candidates outside the prior support are rejected without simulating them.
        let log_likelihood = if theta.log_prior() == f64::NEG_INFINITY {
            f64::NEG_INFINITY
        } else {
            self.likelihood.log_likelihood(&theta)?
        };
        let candidate = ChainState::new(theta, log_likelihood);

        let ln_forward = forward.ln_pdf(&proposal);
        let ln_reverse = self
            .strategy
            .jump_distribution(&proposal)
            .map(|reverse| reverse.ln_pdf(&current_values))
            .unwrap_or(f64::NEG_INFINITY);
        let ratio = self.rule.ratio(current, &candidate, ln_forward, ln_reverse);
        let accepted = self.rng.gen::<f64>() < acceptance_probability(ratio);

        trace!(
            "iteration {}: log L {} -> {}, ratio {ratio}, accepted {accepted}",
            self.sample.jumps(),
            current.log_likelihood,
            candidate.log_likelihood
        );
        if let Some(sink) = self.trace.as_mut() {
            sink.record(&TraceRecord {
                iteration: self.sample.jumps(),
                temperature: self.rule.temperature(),
                current: &current.theta,
                proposed: &candidate.theta,
                current_log_likelihood: current.log_likelihood,
                proposed_log_likelihood: candidate.log_likelihood,
                ratio,
                accepted,
            })?;
        }

        let next = if accepted { candidate } else { current.clone() };
        self.sample.record(next, accepted);
        self.strategy.after_iteration(&self.sample);
        Ok(accepted)
    }

    /// Appends `theta` without an acceptance test, counted as an accepted jump.
    pub fn manual_jump(&mut self, theta: ParameterVector, log_likelihood: f64) -> Result<()> {
        if self.sample.is_empty() {
            return Err(EvidenceError::EmptySample);
        }
        self.sample
            .record(ChainState::new(theta, log_likelihood), true);
        self.strategy.after_iteration(&self.sample);
        self.stalled = 0;
        Ok(())
    }

    /// Whether the strategy can build a jump density at `theta`'s free coordinates.
    pub fn can_jump_from(&self, theta: &ParameterVector) -> bool {
        self.strategy
            .jump_distribution(&theta.values_at(&self.free))
            .is_ok()
    }

    /// Continues the same chain (sample, RNG, trace) under a different jump strategy.
    pub fn into_strategy<K: JumpStrategy>(self, strategy: K) -> MetropolisHastings<L, K, A> {
        MetropolisHastings {
            likelihood: self.likelihood,
            strategy,
            rule: self.rule,
            sample: self.sample,
            free: self.free,
            seed: self.seed,
            rng: self.rng,
            trace: self.trace,
            stalled: 0,
        }
    }

    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    pub fn last_state(&self) -> Option<&ChainState> {
        self.sample.last()
    }

    pub fn strategy(&self) -> &J {
        &self.strategy
    }

    pub fn rule(&self) -> &A {
        &self.rule
    }

    pub fn likelihood(&self) -> &L {
        &self.likelihood
    }

    /// Indices of the parameters the chain moves.
    pub fn free_indices(&self) -> &[usize] {
        &self.free
    }

    pub fn acceptance_rate(&self) -> f64 {
        self.sample.acceptance_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::{FixedCovariance, RateAdaptive, ScaleAdaptation};
    use crate::distributions::{Constant, Gamma};
    use crate::likelihood::{ConstantLikelihood, FnLikelihood};
    use crate::parameter::Parameter;
    use nalgebra::DMatrix;

    const SEED: u64 = 42;

    fn template() -> ParameterVector {
        ParameterVector::new(
            vec![
                Parameter::new("a", 1.0, Gamma::new(2.0, 1.0).unwrap()),
                Parameter::new("b", 3.0, Constant::new(3.0).unwrap()),
                Parameter::new("c", 1.0, Gamma::new(3.0, 0.5).unwrap()),
            ],
            None,
        )
    }

    fn rate_sampler<L: LogLikelihood>(
        likelihood: L,
    ) -> MetropolisHastings<L, RateAdaptive, TemperedRule> {
        let strategy = RateAdaptive::from_priors(&template(), ScaleAdaptation::default()).unwrap();
        MetropolisHastings::new(likelihood, strategy, TemperedRule::new(1.0)).set_seed(SEED)
    }

    #[test]
    fn sampling_requires_a_starting_state() {
        let mut mh = rate_sampler(ConstantLikelihood(0.0));
        assert!(matches!(mh.get_sample(10), Err(EvidenceError::EmptySample)));
        assert!(matches!(
            mh.manual_jump(template(), 0.0),
            Err(EvidenceError::EmptySample)
        ));
    }

    #[test]
    fn sample_grows_by_one_state_per_iteration() {
        let mut mh = rate_sampler(ConstantLikelihood(0.0));
        mh.start_sample_from_prior(&template()).unwrap();
        assert_eq!(mh.get_sample(250).unwrap().len(), 251);
        assert_eq!(mh.get_sample(50).unwrap().len(), 301);
        assert_eq!(mh.sample().jumps(), 300);
        assert!(mh.acceptance_rate() > 0.0);
    }

    #[test]
    fn constant_parameters_never_move() {
        let mut mh = rate_sampler(ConstantLikelihood(0.0));
        mh.start_sample_from_prior(&template()).unwrap();
        assert_eq!(mh.free_indices(), &[0, 2]);
        let sample = mh.get_sample(500).unwrap();
        assert!(sample
            .states()
            .iter()
            .all(|s| s.theta.value_of("b") == Some(3.0)));
        assert!(sample.states().iter().all(|s| s.theta.log_prior().is_finite()));
    }

    #[test]
    fn all_constant_parameters_are_rejected() {
        let template = ParameterVector::new(
            vec![Parameter::new("b", 3.0, Constant::new(3.0).unwrap())],
            None,
        );
        let strategy = FixedCovariance::new(DMatrix::identity(1, 1)).unwrap();
        let mut mh = MetropolisHastings::new(ConstantLikelihood(0.0), strategy, TemperedRule::new(1.0));
        assert!(matches!(
            mh.start_sample(template),
            Err(EvidenceError::InvalidSettings(_))
        ));
    }

    #[test]
    fn manual_jump_counts_as_accepted() {
        let mut mh = rate_sampler(ConstantLikelihood(0.0));
        mh.start_sample_from_prior(&template()).unwrap();
        let mut theta = template();
        theta.set_values(&[7.0, 3.0, 8.0]).unwrap();
        mh.manual_jump(theta, -4.5).unwrap();
        assert_eq!(mh.sample().jumps(), 1);
        assert_eq!(mh.sample().accepts(), 1);
        let last = mh.last_state().unwrap();
        assert_eq!(last.log_likelihood, -4.5);
        assert_eq!(last.theta.values(), vec![7.0, 3.0, 8.0]);
    }

    #[test]
    fn impossible_candidates_are_never_accepted() {
        // Only states with a < 2 are possible.
        let likelihood = FnLikelihood(|theta: &ParameterVector| {
            if theta.values()[0] < 2.0 {
                0.0
            } else {
                f64::NEG_INFINITY
            }
        });
        let mut mh = rate_sampler(likelihood);
        let mut start = template();
        start.set_values(&[1.0, 3.0, 1.0]).unwrap();
        mh.start_sample(start).unwrap();
        let sample = mh.get_sample(2_000).unwrap();
        assert!(sample.states().iter().all(|s| s.theta.values()[0] < 2.0));
        assert!(sample.states().iter().all(|s| s.log_likelihood == 0.0));
    }

    #[test]
    fn same_seed_same_chain() {
        let run = || {
            let mut mh = rate_sampler(ConstantLikelihood(0.0));
            mh.start_sample_from_prior(&template()).unwrap();
            mh.get_sample(100)
                .unwrap()
                .states()
                .iter()
                .map(|s| s.theta.values())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    fn correlated_two_parameter_start(a: f64, c: f64) -> ParameterVector {
        let mut theta = template();
        theta.set_values(&[a, 3.0, c]).unwrap();
        theta
    }

    fn strongly_anticorrelated() -> FixedCovariance {
        FixedCovariance::new(DMatrix::from_row_slice(2, 2, &[1.0, -0.9, -0.9, 1.0])).unwrap()
    }

    #[test]
    fn chain_without_any_jump_fails_instead_of_freezing() {
        // 1 + C_ac / (a c) = 1 - 0.9 / 0.25 < 0: no lognormal shape exists at (0.5, 0.5).
        let mut mh =
            MetropolisHastings::new(ConstantLikelihood(0.0), strongly_anticorrelated(), TemperedRule::new(1.0))
                .set_seed(SEED);
        mh.start_sample(correlated_two_parameter_start(0.5, 0.5)).unwrap();
        assert!(!mh.can_jump_from(&mh.last_state().unwrap().theta));
        assert!(matches!(
            mh.get_sample(1_000),
            Err(EvidenceError::CovarianceNotPositiveDefinite { .. })
        ));
        assert_eq!(mh.sample().jumps(), MAX_STALLED_ITERATIONS - 1);
        assert_eq!(mh.sample().accepts(), 0);
    }

    #[test]
    fn poorly_shaped_fixed_covariance_keeps_moving() {
        // Candidates with no reverse jump are rejected, so the chain never strays into
        // the region where no jump can be built.
        let mut mh =
            MetropolisHastings::new(ConstantLikelihood(0.0), strongly_anticorrelated(), TemperedRule::new(1.0))
                .set_seed(SEED);
        mh.start_sample(correlated_two_parameter_start(6.0, 6.0)).unwrap();
        mh.get_sample(2_000).unwrap();
        let sample = mh.sample();
        assert!(sample.accepts() > 100);
        let distinct = sample
            .states()
            .windows(2)
            .filter(|w| w[0].theta.values() != w[1].theta.values())
            .count();
        assert_eq!(distinct, sample.accepts());
        for state in sample.states() {
            assert!(mh.can_jump_from(&state.theta));
        }
    }

    #[test]
    fn manual_jump_out_of_a_stall_resets_the_count() {
        let mut mh =
            MetropolisHastings::new(ConstantLikelihood(0.0), strongly_anticorrelated(), TemperedRule::new(1.0))
                .set_seed(SEED);
        mh.start_sample(correlated_two_parameter_start(0.5, 0.5)).unwrap();
        mh.get_sample(MAX_STALLED_ITERATIONS - 2).unwrap();
        mh.manual_jump(correlated_two_parameter_start(6.0, 6.0), 0.0).unwrap();
        mh.get_sample(500).unwrap();
        assert!(mh.sample().accepts() > 1);
    }

    #[test]
    fn non_positive_starting_values_are_rejected() {
        let mut mh = rate_sampler(ConstantLikelihood(0.0));
        assert!(matches!(
            mh.start_sample(correlated_two_parameter_start(-1.0, 1.0)),
            Err(EvidenceError::InvalidSettings(_))
        ));
    }

    #[test]
    fn temperature_zero_ignores_the_likelihood() {
        let rule = TemperedRule::new(0.0);
        let mut current_theta = template();
        current_theta.set_values(&[1.0, 3.0, 1.0]).unwrap();
        let candidate_theta = current_theta.clone();
        let current = ChainState::new(current_theta, -1.0);
        let candidate = ChainState::new(candidate_theta, f64::NEG_INFINITY);
        assert_eq!(rule.ratio(&current, &candidate, -0.5, -0.5), 1.0);
        assert_eq!(TemperedRule::new(1.0).ratio(&current, &candidate, -0.5, -0.5), 0.0);
    }
}
