//! Multivariate normal, lognormal and positive-truncated normal distributions.

use std::f64::consts::PI;

use nalgebra::{Cholesky, DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use statrs::distribution::{ContinuousCDF, Normal};

use super::MultivariateDistribution;
use crate::error::{EvidenceError, Result};

/// Underlying log-space variances below this are clamped when solving for a lognormal shape.
const MIN_LOG_VARIANCE: f64 = 1e-10;

/// Cholesky factor, inverse and log-determinant of a covariance matrix.
///
/// Built once per distribution; every density evaluation reuses it.
#[derive(Debug, Clone)]
struct CovarianceFactor {
    covariance: DMatrix<f64>,
    lower: DMatrix<f64>,
    inverse: DMatrix<f64>,
    ln_det: f64,
}

impl CovarianceFactor {
    fn new(covariance: DMatrix<f64>, context: &str) -> Result<Self> {
        if !covariance.is_square() {
            return Err(EvidenceError::DimensionMismatch {
                expected: covariance.nrows(),
                got: covariance.ncols(),
            });
        }
        let not_pd = || EvidenceError::CovarianceNotPositiveDefinite {
            context: context.to_string(),
        };
        if covariance.iter().any(|x| !x.is_finite()) {
            return Err(not_pd());
        }
        let chol = Cholesky::new(covariance.clone()).ok_or_else(not_pd)?;
        let lower = chol.l();
        let ln_det = 2.0 * lower.diagonal().iter().map(|d| d.ln()).sum::<f64>();
        let inverse = chol.inverse();
        if !ln_det.is_finite() || inverse.iter().any(|x| !x.is_finite()) {
            return Err(not_pd());
        }
        Ok(Self {
            covariance,
            lower,
            inverse,
            ln_det,
        })
    }

    fn dim(&self) -> usize {
        self.covariance.nrows()
    }

    fn quadratic_form(&self, diff: &DVector<f64>) -> f64 {
        diff.dot(&(&self.inverse * diff))
    }

    fn is_diagonal(&self) -> bool {
        let d = self.dim();
        (0..d).all(|i| (0..d).all(|j| i == j || self.covariance[(i, j)] == 0.0))
    }
}

/**
Multivariate normal distribution `N(mean, covariance)`.

```rust
use evidence_mcmc::distributions::{MultivariateDistribution, MultivariateNormal};
use nalgebra::DMatrix;

let normal = MultivariateNormal::new(vec![0.0, 0.0], DMatrix::identity(2, 2)).unwrap();
let expected = -(2.0 * std::f64::consts::PI).ln();
assert!((normal.ln_pdf(&[0.0, 0.0]) - expected).abs() < 1e-12);
```
*/
#[derive(Debug, Clone)]
pub struct MultivariateNormal {
    mean: DVector<f64>,
    factor: CovarianceFactor,
}

impl MultivariateNormal {
    pub fn new(mean: Vec<f64>, covariance: DMatrix<f64>) -> Result<Self> {
        if mean.len() != covariance.nrows() {
            return Err(EvidenceError::DimensionMismatch {
                expected: covariance.nrows(),
                got: mean.len(),
            });
        }
        if mean.iter().any(|m| !m.is_finite()) {
            return Err(EvidenceError::invalid(
                "MultivariateNormal",
                "mean must be finite",
            ));
        }
        let factor = CovarianceFactor::new(covariance, "multivariate normal")?;
        Ok(Self {
            mean: DVector::from_vec(mean),
            factor,
        })
    }

    pub fn mean_vector(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn covariance_matrix(&self) -> &DMatrix<f64> {
        &self.factor.covariance
    }

    fn ln_density(&self, x: &[f64]) -> f64 {
        let d = self.dim();
        let diff = DVector::from_column_slice(x) - &self.mean;
        -0.5 * (d as f64 * (2.0 * PI).ln() + self.factor.ln_det + self.factor.quadratic_form(&diff))
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let z = DVector::from_fn(self.dim(), |_, _| rng.sample::<f64, _>(StandardNormal));
        &self.mean + &self.factor.lower * z
    }
}

impl MultivariateDistribution for MultivariateNormal {
    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn ln_pdf(&self, x: &[f64]) -> f64 {
        if x.len() != self.dim() || x.iter().any(|v| !v.is_finite()) {
            return f64::NEG_INFINITY;
        }
        self.ln_density(x)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.draw(rng).iter().copied().collect()
    }

    fn mean(&self) -> Result<Vec<f64>> {
        Ok(self.mean.iter().copied().collect())
    }

    fn covariance(&self) -> Result<DMatrix<f64>> {
        Ok(self.factor.covariance.clone())
    }
}

/// Multivariate lognormal: `exp(Y)` elementwise with `Y ~ N(mu, sigma)`.
#[derive(Debug, Clone)]
pub struct MultivariateLognormal {
    normal: MultivariateNormal,
}

impl MultivariateLognormal {
    /// Builds the distribution from the parameters of the underlying normal.
    pub fn new(mu: Vec<f64>, sigma: DMatrix<f64>) -> Result<Self> {
        Ok(Self {
            normal: MultivariateNormal::new(mu, sigma)?,
        })
    }

    /// Solves for the underlying normal so the lognormal itself has the given mean and
    /// covariance.
    ///
    /// Uses `sigma_ij = ln(1 + C_ij / (m_i m_j))` and `mu_i = ln m_i - sigma_ii / 2`, with
    /// the log-space variances clamped below at `1e-10`. The transform is badly conditioned
    /// when the target variances are tiny relative to the squared means, and it fails when
    /// a negative correlation is too strong to be expressed by a lognormal; prefer
    /// [`MultivariateLognormal::new`] whenever the log-space parameters are known.
    pub fn create_with_shape(mean: &[f64], covariance: &DMatrix<f64>) -> Result<Self> {
        let d = mean.len();
        if covariance.nrows() != d || covariance.ncols() != d {
            return Err(EvidenceError::DimensionMismatch {
                expected: d,
                got: covariance.nrows(),
            });
        }
        if let Some(m) = mean.iter().find(|m| !(m.is_finite() && **m > 0.0)) {
            return Err(EvidenceError::invalid(
                "MultivariateLognormal",
                format!("target mean must be positive, got {m}"),
            ));
        }

        let mut sigma = DMatrix::<f64>::zeros(d, d);
        for i in 0..d {
            for j in i..d {
                let arg = 1.0 + covariance[(i, j)] / (mean[i] * mean[j]);
                if !(arg.is_finite() && arg > 0.0) {
                    return Err(EvidenceError::CovarianceNotPositiveDefinite {
                        context: format!("lognormal shape, entry ({i}, {j}) has no log-space image"),
                    });
                }
                let mut s = arg.ln();
                if i == j {
                    s = s.max(MIN_LOG_VARIANCE);
                }
                sigma[(i, j)] = s;
                sigma[(j, i)] = s;
            }
        }
        let mu = (0..d)
            .map(|i| mean[i].ln() - 0.5 * sigma[(i, i)])
            .collect::<Vec<f64>>();
        Self::new(mu, sigma)
    }

    /// The underlying normal in log space.
    pub fn log_space(&self) -> &MultivariateNormal {
        &self.normal
    }
}

impl MultivariateDistribution for MultivariateLognormal {
    fn dim(&self) -> usize {
        self.normal.dim()
    }

    fn ln_pdf(&self, x: &[f64]) -> f64 {
        if x.len() != self.dim() || x.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return f64::NEG_INFINITY;
        }
        let ln_x = x.iter().map(|v| v.ln()).collect::<Vec<f64>>();
        self.normal.ln_density(&ln_x) - ln_x.iter().sum::<f64>()
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.normal.draw(rng).iter().map(|y| y.exp()).collect()
    }

    fn mean(&self) -> Result<Vec<f64>> {
        let sigma = self.normal.covariance_matrix();
        Ok(self
            .normal
            .mean_vector()
            .iter()
            .enumerate()
            .map(|(i, mu)| (mu + 0.5 * sigma[(i, i)]).exp())
            .collect())
    }

    fn covariance(&self) -> Result<DMatrix<f64>> {
        let m = self.mean()?;
        let sigma = self.normal.covariance_matrix();
        let d = self.dim();
        Ok(DMatrix::from_fn(d, d, |i, j| {
            m[i] * m[j] * (sigma[(i, j)].exp() - 1.0)
        }))
    }
}

/**
Normal distribution with diagonal covariance, truncated to the positive orthant.

The coordinates are independent, so the normaliser is a product of normal CDFs and every
coordinate is drawn exactly by inverting its truncated CDF. Correlated covariances are
rejected.

The mean and covariance of the truncated distribution are not implemented.

```rust
use evidence_mcmc::distributions::{MultivariateDistribution, PositiveNormal};
use nalgebra::DMatrix;

let jump = PositiveNormal::new(vec![0.2, 3.0], DMatrix::identity(2, 2)).unwrap();
let mut rng = rand::thread_rng();
assert!(jump.sample(&mut rng).iter().all(|x| *x >= 0.0));
assert!(PositiveNormal::new(vec![1.0, 1.0], DMatrix::from_element(2, 2, 0.5)).is_err());
```
*/
#[derive(Debug, Clone)]
pub struct PositiveNormal {
    normal: MultivariateNormal,
    standard: Normal,
    ln_mass: f64,
}

impl PositiveNormal {
    pub fn new(mean: Vec<f64>, covariance: DMatrix<f64>) -> Result<Self> {
        let normal = MultivariateNormal::new(mean, covariance)?;
        if !normal.factor.is_diagonal() {
            return Err(EvidenceError::invalid(
                "PositiveNormal",
                "the covariance must be diagonal",
            ));
        }
        let standard = Normal::new(0.0, 1.0)
            .map_err(|e| EvidenceError::invalid("PositiveNormal", e.to_string()))?;
        let cov = normal.covariance_matrix();
        let ln_mass = normal
            .mean_vector()
            .iter()
            .enumerate()
            .map(|(i, m)| standard.cdf(m / cov[(i, i)].sqrt()).ln())
            .sum::<f64>();
        if !ln_mass.is_finite() {
            return Err(EvidenceError::invalid(
                "PositiveNormal",
                "the untruncated normal puts no mass on the positive orthant",
            ));
        }
        Ok(Self {
            normal,
            standard,
            ln_mass,
        })
    }

    /// Draws coordinate `i` by inverting its truncated CDF.
    fn draw_coordinate<R: Rng + ?Sized>(&self, i: usize, rng: &mut R) -> f64 {
        let m = self.normal.mean[i];
        let s = self.normal.factor.covariance[(i, i)].sqrt();
        // W = -Z restricted to W < m / s keeps both tails accurate.
        let upper = self.standard.cdf(m / s);
        let u: f64 = 1.0 - rng.gen::<f64>();
        let p = (u * upper).clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON);
        (m - s * self.standard.inverse_cdf(p)).max(0.0)
    }
}

impl MultivariateDistribution for PositiveNormal {
    fn dim(&self) -> usize {
        self.normal.dim()
    }

    fn ln_pdf(&self, x: &[f64]) -> f64 {
        if x.len() != self.dim() || x.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
            return f64::NEG_INFINITY;
        }
        self.normal.ln_density(x) - self.ln_mass
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        (0..self.dim()).map(|i| self.draw_coordinate(i, rng)).collect()
    }

    fn mean(&self) -> Result<Vec<f64>> {
        Err(EvidenceError::NotImplemented("mean of a positive-truncated normal"))
    }

    fn covariance(&self) -> Result<DMatrix<f64>> {
        Err(EvidenceError::NotImplemented(
            "covariance of a positive-truncated normal",
        ))
    }
}
