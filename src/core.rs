//! Chain states, the append-only sample they accumulate into, and progress display helpers.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::parameter::ParameterVector;

/// A parameter vector together with its (untempered) log-likelihood.
#[derive(Debug, Clone)]
pub struct ChainState {
    pub theta: ParameterVector,
    pub log_likelihood: f64,
}

impl ChainState {
    pub fn new(theta: ParameterVector, log_likelihood: f64) -> Self {
        Self {
            theta,
            log_likelihood,
        }
    }
}

/// An append-only sequence of chain states with jump and acceptance counters.
///
/// The first state (the starting point) is not counted as a jump.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    states: Vec<ChainState>,
    jumps: usize,
    accepts: usize,
}

impl Sample {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn start(&mut self, state: ChainState) {
        self.states.push(state);
    }

    pub(crate) fn record(&mut self, state: ChainState, accepted: bool) {
        self.states.push(state);
        self.jumps += 1;
        if accepted {
            self.accepts += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[ChainState] {
        &self.states
    }

    pub fn last(&self) -> Option<&ChainState> {
        self.states.last()
    }

    /// The final `n` states (all of them if fewer were drawn).
    pub fn tail(&self, n: usize) -> &[ChainState] {
        &self.states[self.states.len().saturating_sub(n)..]
    }

    pub fn jumps(&self) -> usize {
        self.jumps
    }

    pub fn accepts(&self) -> usize {
        self.accepts
    }

    /// Fraction of jumps accepted so far; `0` before the first jump.
    pub fn acceptance_rate(&self) -> f64 {
        if self.jumps == 0 {
            0.0
        } else {
            self.accepts as f64 / self.jumps as f64
        }
    }

    /// Acceptance rate over the jumps made after the counters read `(jumps, accepts)`.
    pub fn acceptance_rate_since(&self, jumps: usize, accepts: usize) -> f64 {
        let dj = self.jumps.saturating_sub(jumps);
        if dj == 0 {
            0.0
        } else {
            self.accepts.saturating_sub(accepts) as f64 / dj as f64
        }
    }
}

pub(crate) fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// A bar attached to `multi`, or a hidden one when `multi` is `None`.
pub(crate) fn add_progress_bar(
    multi: Option<&MultiProgress>,
    len: u64,
    prefix: String,
) -> ProgressBar {
    match multi {
        Some(multi) => {
            let pb = multi.add(ProgressBar::new(len));
            pb.set_prefix(prefix);
            pb.set_style(progress_style());
            pb
        }
        None => ProgressBar::hidden(),
    }
}
