/*!
Jump strategies for the three sampling phases.

- [`RateAdaptive`] (Phase 1): independent positive-truncated normal jumps with one scale per
  free parameter, grown or shrunk from the windowed acceptance rate.
- [`CovarianceAdaptive`] (Phase 2): joint lognormal jumps whose covariance is re-estimated
  from the whole accumulated sample before every batch.
- [`FixedCovariance`] (Phase 3): the same joint jumps with a frozen covariance.

Both covariance strategies centre the lognormal so the jump's expectation equals the
current values.
*/

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::core::Sample;
use crate::distributions::{ContinuousDistribution, MultivariateLognormal, PositiveNormal};
use crate::error::{EvidenceError, Result};
use crate::metropolis_hastings::JumpStrategy;
use crate::parameter::ParameterVector;
use crate::stats::{check_positive_definite, empirical_covariance, AcceptanceWindow};

/// Tuning rules of the rate-adaptive sampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleAdaptation {
    /// Iterations between two scale updates.
    pub update_every: usize,
    /// Above this acceptance rate the scales grow.
    pub high_rate: f64,
    /// Below this acceptance rate the scales shrink.
    pub low_rate: f64,
    pub grow_factor: f64,
    pub shrink_factor: f64,
    pub max_scale: f64,
    pub min_scale: f64,
}

impl Default for ScaleAdaptation {
    fn default() -> Self {
        Self {
            update_every: 100,
            high_rate: 0.4,
            low_rate: 0.25,
            grow_factor: 1.5,
            shrink_factor: 0.5,
            max_scale: 10.0,
            min_scale: 1e-4,
        }
    }
}

/// Phase-1 strategy: diagonal positive-normal jumps with acceptance-driven scales.
///
/// The scales are the diagonal of the jump covariance and always lie in
/// `[min_scale, max_scale]`.
#[derive(Debug, Clone)]
pub struct RateAdaptive {
    scales: Vec<f64>,
    adaptation: ScaleAdaptation,
    window: AcceptanceWindow,
}

impl RateAdaptive {
    pub fn new(scales: Vec<f64>, adaptation: ScaleAdaptation) -> Result<Self> {
        if adaptation.update_every == 0 {
            return Err(EvidenceError::InvalidSettings(
                "scale update interval must be positive".to_string(),
            ));
        }
        if let Some(s) = scales.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(EvidenceError::InvalidSettings(format!(
                "jump scales must be positive and finite, got {s}"
            )));
        }
        let scales = scales
            .into_iter()
            .map(|s| s.clamp(adaptation.min_scale, adaptation.max_scale))
            .collect();
        Ok(Self {
            scales,
            adaptation,
            window: AcceptanceWindow::default(),
        })
    }

    /// Starts each free parameter's scale at its prior variance.
    pub fn from_priors(theta: &ParameterVector, adaptation: ScaleAdaptation) -> Result<Self> {
        theta.check_positive_priors()?;
        let scales = theta
            .parameters()
            .iter()
            .filter(|p| p.is_free())
            .map(|p| p.prior().variance())
            .collect::<Result<Vec<f64>>>()?;
        Self::new(scales, adaptation)
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    fn adapt(&mut self, rate: f64) {
        let a = &self.adaptation;
        let factor = if rate > a.high_rate {
            a.grow_factor
        } else if rate < a.low_rate {
            a.shrink_factor
        } else {
            return;
        };
        for s in self.scales.iter_mut() {
            *s = (*s * factor).clamp(a.min_scale, a.max_scale);
        }
        debug!("Acceptance rate {rate:.3}, jump scales now {:?}", self.scales);
    }
}

impl JumpStrategy for RateAdaptive {
    type Jump = PositiveNormal;

    fn jump_distribution(&self, current: &[f64]) -> Result<PositiveNormal> {
        let covariance = DMatrix::from_diagonal(&DVector::from_column_slice(&self.scales));
        PositiveNormal::new(current.to_vec(), covariance)
    }

    fn after_iteration(&mut self, sample: &Sample) {
        let jumps = sample.jumps();
        if jumps > 0 && jumps % self.adaptation.update_every == 0 {
            let rate = self.window.advance(sample);
            self.adapt(rate);
        }
    }
}

fn lognormal_jump(current: &[f64], covariance: &DMatrix<f64>) -> Result<MultivariateLognormal> {
    MultivariateLognormal::create_with_shape(current, covariance)
}

/// Phase-2 strategy: the jump covariance is the empirical covariance of the full sample,
/// recomputed before every batch.
#[derive(Debug, Clone, Default)]
pub struct CovarianceAdaptive {
    covariance: Option<DMatrix<f64>>,
}

impl CovarianceAdaptive {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent estimate, if any batch has started.
    pub fn covariance(&self) -> Option<&DMatrix<f64>> {
        self.covariance.as_ref()
    }

    /// Freezes the most recent estimate.
    pub fn freeze(&self) -> Result<FixedCovariance> {
        let covariance = self.covariance.clone().ok_or_else(|| {
            EvidenceError::CovarianceNotPositiveDefinite {
                context: "no covariance has been estimated yet".to_string(),
            }
        })?;
        FixedCovariance::new(covariance)
    }
}

impl JumpStrategy for CovarianceAdaptive {
    type Jump = MultivariateLognormal;

    fn jump_distribution(&self, current: &[f64]) -> Result<MultivariateLognormal> {
        let covariance =
            self.covariance
                .as_ref()
                .ok_or_else(|| EvidenceError::CovarianceNotPositiveDefinite {
                    context: "no covariance has been estimated yet".to_string(),
                })?;
        lognormal_jump(current, covariance)
    }

    fn before_batch(&mut self, sample: &Sample, free: &[usize]) -> Result<()> {
        let covariance = empirical_covariance(sample.states(), free)?;
        check_positive_definite(
            &covariance,
            format!("empirical covariance of {} states", sample.len()),
        )?;
        debug!(
            "Jump covariance re-estimated from {} states, diagonal {:?}",
            sample.len(),
            covariance.diagonal().as_slice()
        );
        self.covariance = Some(covariance);
        Ok(())
    }
}

/// Phase-3 strategy: joint lognormal jumps with a covariance pinned at construction.
#[derive(Debug, Clone)]
pub struct FixedCovariance {
    covariance: DMatrix<f64>,
}

impl FixedCovariance {
    pub fn new(covariance: DMatrix<f64>) -> Result<Self> {
        check_positive_definite(&covariance, "fixed jump covariance")?;
        Ok(Self { covariance })
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }
}

impl JumpStrategy for FixedCovariance {
    type Jump = MultivariateLognormal;

    fn jump_distribution(&self, current: &[f64]) -> Result<MultivariateLognormal> {
        lognormal_jump(current, &self.covariance)
    }
}
