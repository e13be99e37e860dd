/*!
Phase 3: parallel tempering over a population of fixed-covariance chains.

Each outer iteration performs

1. a **local move**: every chain takes one MH step at its own temperature. The chains are
   independent, so the steps run in parallel with rayon;
2. a **swap move**: a source chain `j` is picked uniformly, a partner `k` is drawn from a
   [`DiscreteLaplacian`] centred on `j`, and the two states are exchanged with probability
   `min(1, r)` where

   `r = exp((beta_k - beta_j)(ll_j - ll_k)) * DL_k(j) / DL_j(k)`.

   An accepted exchange is recorded on both chains with
   [`MetropolisHastings::manual_jump`]. Swaps run between local moves, so no chain is ever
   stepped and swapped at the same time. A swap that would hand a chain a state its fixed
   covariance cannot jump from is refused outright.
*/

use indicatif::ProgressBar;
use log::debug;
use rand::prelude::*;
use rayon::prelude::*;

use crate::adaptive::FixedCovariance;
use crate::distributions::{DiscreteDistribution, DiscreteLaplacian};
use crate::error::{EvidenceError, Result};
use crate::ladder;
use crate::likelihood::LogLikelihood;
use crate::metropolis_hastings::{MetropolisHastings, TemperedRule};
use crate::ratio::{acceptance_probability, safe_ratio, swap_ratio};

/// A Phase-3 chain.
pub type TemperedChain<L> = MetropolisHastings<L, FixedCovariance, TemperedRule>;

/// Parallel-tempering sampler holding one chain per temperature, ascending.
pub struct PopulationSampler<L> {
    chains: Vec<TemperedChain<L>>,
    swap_kernel_scale: f64,
    /// The global random seed.
    pub seed: u64,
    swap_rng: SmallRng,
    swaps_proposed: usize,
    swaps_accepted: usize,
}

impl<L: LogLikelihood> PopulationSampler<L> {
    /// Every chain must already hold a starting state. Temperatures are read from the
    /// chains' rules and must be ascending.
    pub fn new(chains: Vec<TemperedChain<L>>, swap_kernel_scale: f64) -> Result<Self> {
        let temperatures = chains
            .iter()
            .map(|c| c.rule().temperature)
            .collect::<Vec<f64>>();
        ladder::validate(&temperatures)?;
        if !(swap_kernel_scale.is_finite() && swap_kernel_scale > 0.0) {
            return Err(EvidenceError::InvalidSettings(format!(
                "swap kernel scale must be positive, got {swap_kernel_scale}"
            )));
        }
        if chains.iter().any(|c| c.sample().is_empty()) {
            return Err(EvidenceError::EmptySample);
        }
        let seed = thread_rng().gen::<u64>();
        Ok(Self {
            chains,
            swap_kernel_scale,
            seed,
            swap_rng: SmallRng::seed_from_u64(seed),
            swaps_proposed: 0,
            swaps_accepted: 0,
        })
    }

    /// Seeds chain `i` with `seed + i` and the swap move with `seed + n_chains`.
    pub fn set_seed(mut self, seed: u64) -> Self {
        let n = self.chains.len() as u64;
        self.seed = seed;
        self.chains = self
            .chains
            .into_iter()
            .enumerate()
            .map(|(i, chain)| chain.set_seed(seed.wrapping_add(i as u64)))
            .collect();
        self.swap_rng = SmallRng::seed_from_u64(seed.wrapping_add(n));
        self
    }

    pub fn chains(&self) -> &[TemperedChain<L>] {
        &self.chains
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.chains.iter().map(|c| c.rule().temperature).collect()
    }

    /// Non-trivial swaps proposed so far (a draw of `k == j` is not counted).
    pub fn swaps_proposed(&self) -> usize {
        self.swaps_proposed
    }

    pub fn swaps_accepted(&self) -> usize {
        self.swaps_accepted
    }

    /// Runs `n_iterations` rounds of local moves followed by one swap proposal.
    pub fn run(&mut self, n_iterations: usize, progress: &ProgressBar) -> Result<()> {
        progress.set_length(n_iterations as u64);
        for _ in 0..n_iterations {
            self.chains
                .par_iter_mut()
                .map(|chain| chain.get_sample(1).map(|_| ()))
                .collect::<Result<Vec<()>>>()?;
            self.propose_swap()?;
            progress.inc(1);
        }
        debug!(
            "Population finished: {} of {} swaps accepted",
            self.swaps_accepted, self.swaps_proposed
        );
        Ok(())
    }

    /// Acceptance ratio of exchanging the current states of chains `j` and `k`, proposed
    /// as source `j` with partner `k`.
    pub fn swap_acceptance_ratio(&self, j: usize, k: usize) -> Result<f64> {
        let n = self.chains.len();
        let forward = DiscreteLaplacian::new(n, j, self.swap_kernel_scale)?;
        let reverse = DiscreteLaplacian::new(n, k, self.swap_kernel_scale)?;
        let state_j = self.chains[j].last_state().ok_or(EvidenceError::EmptySample)?;
        let state_k = self.chains[k].last_state().ok_or(EvidenceError::EmptySample)?;
        let likelihood = swap_ratio(
            state_j.log_likelihood,
            self.chains[j].rule().temperature,
            state_k.log_likelihood,
            self.chains[k].rule().temperature,
        );
        let kernel = safe_ratio(reverse.ln_pmf(j), forward.ln_pmf(k));
        Ok(likelihood * kernel)
    }

    /// Proposes one exchange; returns whether it was accepted.
    pub fn propose_swap(&mut self) -> Result<bool> {
        let n = self.chains.len();
        let j = self.swap_rng.gen_range(0..n);
        let k = DiscreteLaplacian::new(n, j, self.swap_kernel_scale)?.sample(&mut self.swap_rng);
        if k == j {
            return Ok(false);
        }
        self.swaps_proposed += 1;
        if !self.can_exchange(j, k)? {
            debug!("Refused swap of chains {j} and {k}: a state has no jump at its new temperature");
            return Ok(false);
        }
        let ratio = self.swap_acceptance_ratio(j, k)?;
        if self.swap_rng.gen::<f64>() >= acceptance_probability(ratio) {
            return Ok(false);
        }
        self.exchange(j, k)?;
        self.swaps_accepted += 1;
        debug!("Swapped states of chains {j} and {k} (ratio {ratio:.3e})");
        Ok(true)
    }

    /// Whether each chain can build a jump from the state it would receive.
    fn can_exchange(&self, j: usize, k: usize) -> Result<bool> {
        let state_j = self.chains[j].last_state().ok_or(EvidenceError::EmptySample)?;
        let state_k = self.chains[k].last_state().ok_or(EvidenceError::EmptySample)?;
        Ok(self.chains[j].can_jump_from(&state_k.theta)
            && self.chains[k].can_jump_from(&state_j.theta))
    }

    fn exchange(&mut self, j: usize, k: usize) -> Result<()> {
        let state_j = self.chains[j]
            .last_state()
            .cloned()
            .ok_or(EvidenceError::EmptySample)?;
        let state_k = self.chains[k]
            .last_state()
            .cloned()
            .ok_or(EvidenceError::EmptySample)?;
        self.chains[j].manual_jump(state_k.theta, state_k.log_likelihood)?;
        self.chains[k].manual_jump(state_j.theta, state_j.log_likelihood)?;
        Ok(())
    }

    pub fn into_chains(self) -> Vec<TemperedChain<L>> {
        self.chains
    }
}
