//! Sample statistics used for adaptation and for the evidence estimate.

use nalgebra::{Cholesky, DMatrix};
use ndarray::{Array2, Axis};
use ndarray_stats::CorrelationExt;

use crate::core::{ChainState, Sample};
use crate::error::{EvidenceError, Result};

/// The values at `indices` of every state, one row per state.
pub fn state_matrix(states: &[ChainState], indices: &[usize]) -> Array2<f64> {
    Array2::from_shape_fn((states.len(), indices.len()), |(row, col)| {
        states[row].theta.parameters()[indices[col]].value()
    })
}

pub fn empirical_mean(states: &[ChainState], indices: &[usize]) -> Result<Vec<f64>> {
    state_matrix(states, indices)
        .mean_axis(Axis(0))
        .map(|m| m.to_vec())
        .ok_or(EvidenceError::EmptySample)
}

/// Mean-centred outer-product average of the values at `indices` (divides by `n`).
pub fn empirical_covariance(states: &[ChainState], indices: &[usize]) -> Result<DMatrix<f64>> {
    if states.is_empty() {
        return Err(EvidenceError::EmptySample);
    }
    let x = state_matrix(states, indices);
    let cov = x.t().cov(0.0).map_err(|_| EvidenceError::EmptySample)?;
    let d = indices.len();
    Ok(DMatrix::from_fn(d, d, |i, j| 0.5 * (cov[[i, j]] + cov[[j, i]])))
}

/// Fails with [`EvidenceError::CovarianceNotPositiveDefinite`] unless `cov` has a Cholesky factor.
pub fn check_positive_definite(cov: &DMatrix<f64>, context: impl Into<String>) -> Result<()> {
    let ok = cov.is_square()
        && cov.iter().all(|x| x.is_finite())
        && Cholesky::new(cov.clone()).is_some();
    if ok {
        Ok(())
    } else {
        Err(EvidenceError::CovarianceNotPositiveDefinite {
            context: context.into(),
        })
    }
}

/// Sample average of the log-likelihoods; `NaN` for an empty slice.
pub fn mean_log_likelihood(states: &[ChainState]) -> f64 {
    states.iter().map(|s| s.log_likelihood).sum::<f64>() / states.len() as f64
}

/// Acceptance rate over the jumps since the window was last advanced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceptanceWindow {
    jumps: usize,
    accepts: usize,
}

impl AcceptanceWindow {
    /// Returns the rate since the previous call and starts a new window.
    pub fn advance(&mut self, sample: &Sample) -> f64 {
        let rate = sample.acceptance_rate_since(self.jumps, self.accepts);
        self.jumps = sample.jumps();
        self.accepts = sample.accepts();
        rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{Constant, Gamma};
    use crate::parameter::{Parameter, ParameterVector};
    use approx::assert_abs_diff_eq;

    fn state(a: f64, b: f64, ll: f64) -> ChainState {
        ChainState::new(
            ParameterVector::new(
                vec![
                    Parameter::new("a", a, Gamma::new(1.0, 1.0).unwrap()),
                    Parameter::new("fixed", 9.0, Constant::new(9.0).unwrap()),
                    Parameter::new("b", b, Gamma::new(1.0, 1.0).unwrap()),
                ],
                None,
            ),
            ll,
        )
    }

    #[test]
    fn covariance_is_the_centred_outer_product_average() {
        let states = vec![
            state(1.0, 2.0, 0.0),
            state(2.0, 4.0, 0.0),
            state(3.0, 3.0, 0.0),
            state(6.0, 7.0, 0.0),
        ];
        let cov = empirical_covariance(&states, &[0, 2]).unwrap();
        let mean = empirical_mean(&states, &[0, 2]).unwrap();
        assert_eq!(mean, vec![3.0, 4.0]);
        let manual = |i: usize, j: usize| {
            states
                .iter()
                .map(|s| {
                    let v = s.theta.values();
                    let (xi, xj) = (v[[0, 2][i]], v[[0, 2][j]]);
                    (xi - mean[i]) * (xj - mean[j])
                })
                .sum::<f64>()
                / states.len() as f64
        };
        for i in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(cov[(i, j)], manual(i, j), epsilon = 1e-12);
            }
        }
        assert_eq!(cov[(0, 1)], cov[(1, 0)]);
    }

    #[test]
    fn degenerate_samples_are_not_positive_definite() {
        let one = vec![state(1.0, 2.0, 0.0)];
        let cov = empirical_covariance(&one, &[0, 2]).unwrap();
        assert!(matches!(
            check_positive_definite(&cov, "single state"),
            Err(EvidenceError::CovarianceNotPositiveDefinite { .. })
        ));
        assert!(empirical_covariance(&[], &[0]).is_err());

        let spread = vec![state(1.0, 2.0, 0.0), state(2.0, 1.0, 0.0), state(2.0, 2.0, 0.0)];
        let cov = empirical_covariance(&spread, &[0, 2]).unwrap();
        assert!(check_positive_definite(&cov, "three states").is_ok());
    }

    #[test]
    fn mean_log_likelihood_averages() {
        let states = vec![state(1.0, 1.0, -1.0), state(1.0, 1.0, -3.0)];
        assert_eq!(mean_log_likelihood(&states), -2.0);
    }
}
