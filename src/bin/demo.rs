//! Estimates the evidence of a one-observable toy model and compares it with quadrature.
//!
//! Run with `RUST_LOG=info cargo run --release --features demo --bin demo`.

use evidence_mcmc::distributions::{Constant, ContinuousDistribution, Gamma};
use evidence_mcmc::evidence::{estimate_model_evidence, EvidenceSettings};
use evidence_mcmc::experiment::{Experiment, ExperimentSet, Model};
use evidence_mcmc::io::csv::save_evidence_sample;
use evidence_mcmc::ladder::LadderSchedule;
use evidence_mcmc::parameter::{ParameterVector, Priors};
use std::error::Error;

const SIGMA: f64 = 0.4;

/// Exponential decay `x(t) = exp(-k t)`.
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

fn ln_evidence_by_quadrature(prior: &Gamma, times: &[f64], values: &[f64]) -> f64 {
    let (n, upper) = (100_000, 20.0);
    let h = upper / n as f64;
    let ln_norm = -0.5 * (2.0 * std::f64::consts::PI * SIGMA * SIGMA).ln();
    let ln_f: Vec<f64> = (1..=n)
        .map(|i| {
            let k = i as f64 * h;
            let ln_l: f64 = times
                .iter()
                .zip(values)
                .map(|(t, y)| ln_norm - (y - (-k * t).exp()).powi(2) / (2.0 * SIGMA * SIGMA))
                .sum();
            prior.ln_pdf(k) + ln_l
        })
        .collect();
    let max = ln_f.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    max + (ln_f.iter().map(|v| (v - max).exp()).sum::<f64>() * h).ln()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    const SEED: u64 = 42;
    let times = vec![0.0, 0.5, 1.0, 1.5, 2.0, 3.0, 4.0];
    let values = vec![1.02, 0.61, 0.35, 0.26, 0.11, 0.07, -0.03];
    let prior = Gamma::new(4.0, 0.25)?;

    let data = ExperimentSet::new(vec![Experiment::new(times.clone(), values.clone(), "x")?]);
    let priors = Priors::new("sigma", Constant::new(SIGMA)?).with_prior("k", prior.clone());
    let settings = EvidenceSettings {
        ladder: LadderSchedule::PowerLaw { n_temperatures: 16 },
        show_progress: true,
        ..EvidenceSettings::default()
    }
    .set_seed(SEED);

    let estimate = estimate_model_evidence(Decay, data, &priors, &settings)?;
    let reference = ln_evidence_by_quadrature(&prior, &times, &values);

    println!("Temperature  E[ln L]  phase-2 acceptance");
    for ((beta, e), rate) in estimate
        .ladder
        .iter()
        .zip(&estimate.expected_log_likelihoods)
        .zip(&estimate.phase2_acceptance_rates)
    {
        println!("{beta:>11.6}  {e:>7.3}  {rate:>6.3}");
    }
    println!(
        "Swaps accepted: {} of {}",
        estimate.swaps_accepted, estimate.swaps_proposed
    );
    println!("ln Z (thermodynamic integration): {:.4}", estimate.log_evidence);
    println!("ln Z (quadrature):                {reference:.4}");

    save_evidence_sample(&estimate.sample, "/tmp/evidence_sample.csv")?;
    println!("Saved the final states to /tmp/evidence_sample.csv");
    Ok(())
}
