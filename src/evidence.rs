/*!
# Evidence Estimation

Thermodynamic integration of the log marginal likelihood:

`ln Z = ∫_0^1 E[ln L | beta] d beta`

where the expectation is over the power posterior `p(theta) L(theta)^beta`.

[`estimate_log_evidence`] runs the whole pipeline:

1. build the temperature ladder;
2. for every temperature in parallel, run Phase 1 (rate-adaptive) and then Phase 2
   (covariance-adaptive) on a chain started from the prior;
3. freeze each chain's covariance estimate and run Phase 3 (parallel tempering) over all
   temperatures jointly;
4. keep the last `n_final_samples` states per chain and integrate the per-temperature mean
   log-likelihood with the trapezoidal rule.

Seeds: the ladder uses `seed`, the Phase-1/2 chain at ladder index `i` uses `seed + 1 + i`,
and Phase 3 uses `seed + 1 + n_temperatures` as its base seed.

# Examples

```rust
use evidence_mcmc::distributions::{Constant, Gamma};
use evidence_mcmc::evidence::{estimate_log_evidence, EvidenceSettings};
use evidence_mcmc::ladder::LadderSchedule;
use evidence_mcmc::likelihood::ConstantLikelihood;
use evidence_mcmc::parameter::{Parameter, ParameterVector};

let template = ParameterVector::new(
    vec![Parameter::new("k", 1.0, Gamma::new(4.0, 0.5).unwrap())],
    Some(Parameter::new("sigma", 0.1, Constant::new(0.1).unwrap())),
);
let settings = EvidenceSettings {
    ladder: LadderSchedule::PowerLaw { n_temperatures: 4 },
    phase1_iterations: 200,
    phase2_iterations: 200,
    phase2_batch_size: 100,
    phase3_iterations: 100,
    n_final_samples: 50,
    ..EvidenceSettings::default()
}
.set_seed(42);

// A likelihood that ignores the data integrates to itself.
let estimate = estimate_log_evidence(&ConstantLikelihood(-3.0), &template, &settings).unwrap();
assert!((estimate.log_evidence + 3.0).abs() < 1e-9);
```
*/

use indicatif::{MultiProgress, ProgressBar};
use log::{debug, info};
use nalgebra::DMatrix;
use rand::prelude::*;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::adaptive::{CovarianceAdaptive, FixedCovariance, RateAdaptive, ScaleAdaptation};
use crate::core::{add_progress_bar, ChainState};
use crate::error::{EvidenceError, Result};
use crate::experiment::{ExperimentSet, Model};
use crate::ladder::{self, LadderSchedule};
use crate::likelihood::{LogLikelihood, ObservedLikelihood};
use crate::metropolis_hastings::{MetropolisHastings, TemperedRule};
use crate::parameter::{ParameterVector, Priors};
use crate::population::PopulationSampler;
use crate::stats::{empirical_covariance, mean_log_likelihood};

/// Configuration of the three-phase pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvidenceSettings {
    pub ladder: LadderSchedule,
    /// Rate-adaptive iterations per temperature.
    pub phase1_iterations: usize,
    /// Covariance-adaptive iterations per temperature.
    pub phase2_iterations: usize,
    /// Phase-2 iterations between covariance re-estimates.
    pub phase2_batch_size: usize,
    /// Parallel-tempering rounds.
    pub phase3_iterations: usize,
    /// States kept from the end of every Phase-3 chain.
    pub n_final_samples: usize,
    /// Phase-1 iterations between scale updates. Overrides `scale_adaptation.update_every`.
    pub sigma_update_n: usize,
    pub scale_adaptation: ScaleAdaptation,
    /// Decay rate of the swap-partner kernel.
    pub swap_kernel_scale: f64,
    /// Size of a dedicated worker pool; `None` uses the global rayon pool.
    pub num_threads: Option<usize>,
    pub seed: u64,
    pub show_progress: bool,
}

impl Default for EvidenceSettings {
    fn default() -> Self {
        Self {
            ladder: LadderSchedule::PowerLaw { n_temperatures: 20 },
            phase1_iterations: 2_000,
            phase2_iterations: 2_000,
            phase2_batch_size: 500,
            phase3_iterations: 2_000,
            n_final_samples: 1_000,
            sigma_update_n: 100,
            scale_adaptation: ScaleAdaptation::default(),
            swap_kernel_scale: 1.0,
            num_threads: None,
            seed: thread_rng().gen::<u64>(),
            show_progress: false,
        }
    }
}

impl EvidenceSettings {
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("phase1_iterations", self.phase1_iterations),
            ("phase2_iterations", self.phase2_iterations),
            ("phase2_batch_size", self.phase2_batch_size),
            ("phase3_iterations", self.phase3_iterations),
            ("n_final_samples", self.n_final_samples),
            ("sigma_update_n", self.sigma_update_n),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(EvidenceError::InvalidSettings(format!(
                "{name} must be positive"
            )));
        }
        if self.n_final_samples > self.phase3_iterations {
            return Err(EvidenceError::InvalidSettings(format!(
                "n_final_samples ({}) exceeds phase3_iterations ({})",
                self.n_final_samples, self.phase3_iterations
            )));
        }
        if self.ladder.len() < 2 {
            return Err(EvidenceError::InvalidSettings(format!(
                "the ladder needs at least two temperatures, got {}",
                self.ladder.len()
            )));
        }
        if !(self.swap_kernel_scale.is_finite() && self.swap_kernel_scale > 0.0) {
            return Err(EvidenceError::InvalidSettings(format!(
                "swap_kernel_scale must be positive, got {}",
                self.swap_kernel_scale
            )));
        }
        if self.num_threads == Some(0) {
            return Err(EvidenceError::InvalidSettings(
                "num_threads must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn rate_adaptation(&self) -> ScaleAdaptation {
        ScaleAdaptation {
            update_every: self.sigma_update_n,
            ..self.scale_adaptation
        }
    }
}

/// Final states per temperature, the input of the integrator.
#[derive(Debug, Clone)]
pub struct EvidenceSample {
    temperatures: Vec<f64>,
    draws: Vec<Vec<ChainState>>,
}

impl EvidenceSample {
    pub fn new(temperatures: Vec<f64>, draws: Vec<Vec<ChainState>>) -> Result<Self> {
        if temperatures.len() != draws.len() {
            return Err(EvidenceError::DimensionMismatch {
                expected: temperatures.len(),
                got: draws.len(),
            });
        }
        if draws.iter().any(Vec::is_empty) {
            return Err(EvidenceError::EmptySample);
        }
        Ok(Self {
            temperatures,
            draws,
        })
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    pub fn draws(&self) -> &[Vec<ChainState>] {
        &self.draws
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &[ChainState])> {
        self.temperatures
            .iter()
            .copied()
            .zip(self.draws.iter().map(Vec::as_slice))
    }

    /// Mean log-likelihood at every temperature.
    pub fn expected_log_likelihoods(&self) -> Vec<f64> {
        self.draws.iter().map(|d| mean_log_likelihood(d)).collect()
    }

    /// Names of the parameters, taken from the first draw.
    pub fn parameter_names(&self) -> Vec<String> {
        self.draws
            .first()
            .and_then(|d| d.first())
            .map(|s| s.theta.names().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    pub fn log_evidence(&self) -> Result<f64> {
        integrate(&self.temperatures, &self.expected_log_likelihoods())
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct EvidenceEstimate {
    pub log_evidence: f64,
    pub ladder: Vec<f64>,
    pub expected_log_likelihoods: Vec<f64>,
    pub phase2_acceptance_rates: Vec<f64>,
    pub phase3_acceptance_rates: Vec<f64>,
    pub swaps_proposed: usize,
    pub swaps_accepted: usize,
    pub sample: EvidenceSample,
}

/**
Trapezoidal rule over the ladder:
`sum_i (beta_{i+1} - beta_i) * (E_i + E_{i+1}) / 2`.

The points are sorted by temperature first.

```rust
use evidence_mcmc::evidence::integrate;

let ln_z = integrate(&[0.0, 0.5, 1.0], &[-4.0, -2.0, -1.0]).unwrap();
assert_eq!(ln_z, 0.5 * (-6.0) / 2.0 + 0.5 * (-3.0) / 2.0);
```
*/
pub fn integrate(ladder: &[f64], expected: &[f64]) -> Result<f64> {
    if ladder.len() != expected.len() {
        return Err(EvidenceError::DimensionMismatch {
            expected: ladder.len(),
            got: expected.len(),
        });
    }
    let mut points = ladder
        .iter()
        .copied()
        .zip(expected.iter().copied())
        .collect::<Vec<(f64, f64)>>();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    let sorted = points.iter().map(|p| p.0).collect::<Vec<f64>>();
    ladder::validate(&sorted)?;
    Ok(points
        .windows(2)
        .filter(|w| w[1].0 > w[0].0)
        .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
        .sum())
}

/// Output of Phases 1 and 2 at one temperature.
struct TunedChain {
    temperature: f64,
    state: ChainState,
    jump: FixedCovariance,
    phase2_acceptance: f64,
}

fn run_in_chunks<F>(total: usize, chunk: usize, progress: &ProgressBar, mut step: F) -> Result<()>
where
    F: FnMut(usize) -> Result<()>,
{
    let mut done = 0;
    while done < total {
        let n = chunk.min(total - done);
        step(n)?;
        done += n;
        progress.inc(n as u64);
    }
    Ok(())
}

fn tune_temperature<L: LogLikelihood>(
    likelihood: &L,
    template: &ParameterVector,
    temperature: f64,
    seed: u64,
    settings: &EvidenceSettings,
    progress: &ProgressBar,
) -> Result<TunedChain> {
    progress.set_length((settings.phase1_iterations + settings.phase2_iterations) as u64);

    let strategy = RateAdaptive::from_priors(template, settings.rate_adaptation())?;
    let mut chain =
        MetropolisHastings::new(likelihood, strategy, TemperedRule::new(temperature)).set_seed(seed);
    chain.start_sample_from_prior(template)?;
    run_in_chunks(
        settings.phase1_iterations,
        settings.sigma_update_n,
        progress,
        |n| chain.get_sample(n).map(|_| ()),
    )?;
    debug!(
        "beta {temperature:.4}: phase 1 acceptance {:.3}, scales {:?}",
        chain.acceptance_rate(),
        chain.strategy().scales()
    );

    let (jumps, accepts) = (chain.sample().jumps(), chain.sample().accepts());
    let mut chain = chain.into_strategy(CovarianceAdaptive::new());
    run_in_chunks(
        settings.phase2_iterations,
        settings.phase2_batch_size,
        progress,
        |n| chain.get_sample(n).map(|_| ()),
    )?;
    let phase2_acceptance = chain.sample().acceptance_rate_since(jumps, accepts);

    let covariance: DMatrix<f64> =
        empirical_covariance(chain.sample().states(), chain.free_indices())?;
    let jump = FixedCovariance::new(covariance)?;
    let state = chain
        .last_state()
        .cloned()
        .ok_or(EvidenceError::EmptySample)?;
    debug!("beta {temperature:.4}: phase 2 acceptance {phase2_acceptance:.3}");
    progress.finish_with_message("tuned");
    Ok(TunedChain {
        temperature,
        state,
        jump,
        phase2_acceptance,
    })
}

/// Runs the three-phase pipeline for `likelihood` with priors and fixed values taken from
/// `template`.
pub fn estimate_log_evidence<L: LogLikelihood>(
    likelihood: &L,
    template: &ParameterVector,
    settings: &EvidenceSettings,
) -> Result<EvidenceEstimate> {
    settings.validate()?;
    if template.free_indices().is_empty() {
        return Err(EvidenceError::InvalidSettings(
            "every parameter has a constant prior, nothing to sample".to_string(),
        ));
    }
    template.check_positive_priors()?;
    let mut rng = SmallRng::seed_from_u64(settings.seed);
    let temperatures = settings.ladder.build(&mut rng)?;
    ladder::validate(&temperatures)?;

    let run = || run_pipeline(likelihood, template, settings, &temperatures);
    match settings.num_threads {
        Some(n) => ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|i| format!("evidence-worker-{i}"))
            .build()
            .map_err(|e| EvidenceError::InvalidSettings(e.to_string()))?
            .install(run),
        None => run(),
    }
}

fn run_pipeline<L: LogLikelihood>(
    likelihood: &L,
    template: &ParameterVector,
    settings: &EvidenceSettings,
    temperatures: &[f64],
) -> Result<EvidenceEstimate> {
    let n = temperatures.len();
    let multi = settings.show_progress.then(MultiProgress::new);
    info!(
        "Phases 1-2: tuning {n} chains ({} + {} iterations each)",
        settings.phase1_iterations, settings.phase2_iterations
    );

    let tuned = temperatures
        .par_iter()
        .enumerate()
        .map(|(i, &beta)| {
            let pb = add_progress_bar(multi.as_ref(), 0, format!("beta {beta:.4}"));
            let seed = settings.seed.wrapping_add(1 + i as u64);
            tune_temperature(likelihood, template, beta, seed, settings, &pb)
        })
        .collect::<Result<Vec<TunedChain>>>()?;

    let phase2_acceptance_rates = tuned.iter().map(|t| t.phase2_acceptance).collect();
    let chains = tuned
        .into_iter()
        .map(|t| {
            let mut chain =
                MetropolisHastings::new(likelihood, t.jump, TemperedRule::new(t.temperature));
            chain.start_sample(t.state.theta)?;
            Ok(chain)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Phase 3: parallel tempering for {} rounds",
        settings.phase3_iterations
    );
    let mut population = PopulationSampler::new(chains, settings.swap_kernel_scale)?
        .set_seed(settings.seed.wrapping_add(1 + n as u64));
    let pb = add_progress_bar(
        multi.as_ref(),
        settings.phase3_iterations as u64,
        "population".to_string(),
    );
    population.run(settings.phase3_iterations, &pb)?;
    pb.finish_with_message("done");

    let swaps_proposed = population.swaps_proposed();
    let swaps_accepted = population.swaps_accepted();
    let chains = population.into_chains();
    let phase3_acceptance_rates = chains.iter().map(|c| c.acceptance_rate()).collect();
    let draws = chains
        .iter()
        .map(|c| c.sample().tail(settings.n_final_samples).to_vec())
        .collect();
    let sample = EvidenceSample::new(temperatures.to_vec(), draws)?;
    let expected_log_likelihoods = sample.expected_log_likelihoods();
    let log_evidence = integrate(temperatures, &expected_log_likelihoods)?;
    info!(
        "log evidence {log_evidence:.4} ({swaps_accepted} of {swaps_proposed} swaps accepted)"
    );

    Ok(EvidenceEstimate {
        log_evidence,
        ladder: temperatures.to_vec(),
        expected_log_likelihoods,
        phase2_acceptance_rates,
        phase3_acceptance_rates,
        swaps_proposed,
        swaps_accepted,
        sample,
    })
}

/// Builds the parameter vector from `priors` (failing fast on a missing prior) and the
/// likelihood from `experiments`, then runs [`estimate_log_evidence`].
pub fn estimate_model_evidence<M: Model>(
    model: M,
    experiments: ExperimentSet,
    priors: &Priors,
    settings: &EvidenceSettings,
) -> Result<EvidenceEstimate> {
    let mut rng = SmallRng::seed_from_u64(settings.seed);
    let template = priors.parameter_vector_for(&model, &mut rng)?;
    let likelihood = ObservedLikelihood::new(model, experiments)?;
    estimate_log_evidence(&likelihood, &template, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{Constant, Gamma, Uniform};
    use crate::likelihood::{ConstantLikelihood, FnLikelihood};
    use crate::parameter::Parameter;
    use approx::assert_abs_diff_eq;

    const SEED: u64 = 42;

    fn template() -> ParameterVector {
        ParameterVector::new(
            vec![
                Parameter::new("a", 1.0, Gamma::new(9.0, 1.0 / 3.0).unwrap()),
                Parameter::new("b", 2.0, Gamma::new(16.0, 0.125).unwrap()),
            ],
            Some(Parameter::new("sigma", 0.5, Constant::new(0.5).unwrap())),
        )
    }

    fn quick_settings() -> EvidenceSettings {
        EvidenceSettings {
            ladder: LadderSchedule::PowerLaw { n_temperatures: 5 },
            phase1_iterations: 400,
            phase2_iterations: 400,
            phase2_batch_size: 100,
            phase3_iterations: 300,
            n_final_samples: 200,
            sigma_update_n: 50,
            ..EvidenceSettings::default()
        }
        .set_seed(SEED)
    }

    #[test]
    fn trapezoid_over_three_temperatures() {
        let ladder = [0.0, 0.25, 1.0];
        let values = [-10.0, -4.0, -1.0];
        let (d0, d1) = (0.25, 0.75);
        let expected = (d0 * (values[0] + values[1]) + d1 * (values[1] + values[2])) / 2.0;
        assert_eq!(integrate(&ladder, &values).unwrap(), expected);
        assert_eq!(expected, -3.625);
    }

    #[test]
    fn trapezoid_sorts_and_validates() {
        let sorted = integrate(&[0.0, 0.5, 1.0], &[-3.0, -2.0, -1.0]).unwrap();
        let shuffled = integrate(&[1.0, 0.0, 0.5], &[-1.0, -3.0, -2.0]).unwrap();
        assert_eq!(sorted, shuffled);
        assert!(integrate(&[0.0, 1.0], &[-1.0]).is_err());
        assert!(integrate(&[0.0], &[-1.0]).is_err());
        assert!(integrate(&[0.0, 2.0], &[-1.0, -1.0]).is_err());
    }

    #[test]
    fn repeated_temperatures_contribute_nothing() {
        let ln_z = integrate(&[0.0, 0.0, 1.0], &[f64::NEG_INFINITY, -2.0, -2.0]).unwrap();
        assert_eq!(ln_z, -2.0);
    }

    #[test]
    fn settings_validation() {
        assert!(EvidenceSettings::default().validate().is_ok());
        let bad = [
            EvidenceSettings {
                phase1_iterations: 0,
                ..quick_settings()
            },
            EvidenceSettings {
                n_final_samples: 301,
                ..quick_settings()
            },
            EvidenceSettings {
                ladder: LadderSchedule::PowerLaw { n_temperatures: 1 },
                ..quick_settings()
            },
            EvidenceSettings {
                swap_kernel_scale: 0.0,
                ..quick_settings()
            },
            EvidenceSettings {
                num_threads: Some(0),
                ..quick_settings()
            },
        ];
        for settings in bad {
            assert!(matches!(
                settings.validate(),
                Err(EvidenceError::InvalidSettings(_))
            ));
        }
    }

    #[test]
    fn constant_likelihood_integrates_to_itself() {
        let estimate =
            estimate_log_evidence(&ConstantLikelihood(-7.5), &template(), &quick_settings()).unwrap();
        assert_abs_diff_eq!(estimate.log_evidence, -7.5, epsilon = 1e-9);
        assert_eq!(estimate.ladder.len(), 5);
        assert_eq!(estimate.phase2_acceptance_rates.len(), 5);
        assert!(estimate
            .phase2_acceptance_rates
            .iter()
            .all(|r| *r > 0.0 && *r <= 1.0));
        assert!(estimate
            .sample
            .draws()
            .iter()
            .all(|d| d.len() == 200 && d.iter().all(|s| s.theta.value_of("sigma") == Some(0.5))));
    }

    #[test]
    fn result_is_independent_of_the_pool_size() {
        let likelihood = FnLikelihood(|theta: &ParameterVector| {
            let v = theta.values();
            -(v[0] - 3.0).powi(2) - 2.0 * (v[1] - 2.0).powi(2)
        });
        let one = EvidenceSettings {
            num_threads: Some(1),
            ..quick_settings()
        };
        let three = EvidenceSettings {
            num_threads: Some(3),
            ..quick_settings()
        };
        let a = estimate_log_evidence(&likelihood, &template(), &one).unwrap();
        let b = estimate_log_evidence(&likelihood, &template(), &three).unwrap();
        assert_eq!(a.log_evidence, b.log_evidence);
        assert_eq!(a.expected_log_likelihoods, b.expected_log_likelihoods);
        assert_eq!(a.swaps_accepted, b.swaps_accepted);
    }

    #[test]
    fn expected_log_likelihood_rises_with_temperature() {
        let likelihood = FnLikelihood(|theta: &ParameterVector| {
            let v = theta.values();
            -8.0 * (v[0] - 3.0).powi(2) - 8.0 * (v[1] - 2.0).powi(2)
        });
        let settings = EvidenceSettings {
            ladder: LadderSchedule::Stratified {
                n_strata: 3,
                strata_size: 1,
            },
            ..quick_settings()
        };
        let estimate = estimate_log_evidence(&likelihood, &template(), &settings).unwrap();
        let e = &estimate.expected_log_likelihoods;
        assert_eq!(e.len(), 5);
        assert!(e[4] > e[0], "Expected E[ln L] at beta 1 above beta 0, got {e:?}");
        assert!(estimate.log_evidence < 0.0);
    }

    #[test]
    fn missing_prior_fails_before_sampling() {
        struct TwoParameters;

        impl Model for TwoParameters {
            fn evaluate_on(&self, _: &str, times: &[f64], _: &ParameterVector) -> Vec<f64> {
                vec![0.0; times.len()]
            }

            fn parameter_names(&self) -> Vec<String> {
                vec!["k1".to_string(), "k2".to_string()]
            }
        }

        let priors = Priors::new("sigma", Uniform::new(0.1, 1.0).unwrap())
            .with_prior("k1", Gamma::new(2.0, 1.0).unwrap());
        let data = ExperimentSet::new(vec![crate::experiment::Experiment::new(
            vec![0.0],
            vec![0.0],
            "x",
        )
        .unwrap()]);
        let err = estimate_model_evidence(TwoParameters, data, &priors, &quick_settings()).unwrap_err();
        assert!(matches!(err, EvidenceError::MissingPrior(ref n) if n == "k2"));
    }

    struct Level;

    impl Model for Level {
        fn evaluate_on(&self, _: &str, times: &[f64], theta: &ParameterVector) -> Vec<f64> {
            vec![theta.value_of("a").unwrap_or(f64::NAN); times.len()]
        }

        fn parameter_names(&self) -> Vec<String> {
            vec!["a".to_string()]
        }
    }

    fn level_data() -> ExperimentSet {
        ExperimentSet::new(vec![crate::experiment::Experiment::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![2.1, 1.8, 2.4, 2.0],
            "x",
        )
        .unwrap()])
    }

    #[test]
    fn free_noise_is_sampled_alongside_the_model() {
        let priors = Priors::new("sigma", Uniform::new(0.1, 1.0).unwrap())
            .with_prior("a", Gamma::new(4.0, 0.5).unwrap());
        let estimate =
            estimate_model_evidence(Level, level_data(), &priors, &quick_settings()).unwrap();
        assert!(estimate.log_evidence.is_finite());

        let sigmas = estimate
            .sample
            .draws()
            .iter()
            .flatten()
            .map(|s| s.theta.noise_sigma().unwrap())
            .collect::<Vec<f64>>();
        assert!(sigmas.iter().all(|s| (0.1..=1.0).contains(s)));
        let (lo, hi) = sigmas
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| (lo.min(*s), hi.max(*s)));
        assert!(hi - lo > 0.1, "Expected sigma to move, got range [{lo}, {hi}]");
    }

    #[test]
    fn non_positive_prior_support_fails_for_every_seed() {
        let priors = Priors::new("sigma", Uniform::new(-1.0, 1.0).unwrap())
            .with_prior("a", Gamma::new(4.0, 0.5).unwrap());
        for seed in 0..5 {
            let err = estimate_model_evidence(
                Level,
                level_data(),
                &priors,
                &quick_settings().set_seed(seed),
            )
            .unwrap_err();
            assert!(matches!(
                err,
                EvidenceError::InvalidDistribution { distribution: "Uniform", .. }
            ));
        }
    }

    #[test]
    fn all_constant_template_is_rejected() {
        let template = ParameterVector::new(
            vec![Parameter::new("a", 1.0, Constant::new(1.0).unwrap())],
            None,
        );
        assert!(matches!(
            estimate_log_evidence(&ConstantLikelihood(0.0), &template, &quick_settings()),
            Err(EvidenceError::InvalidSettings(_))
        ));
    }
}
