/*!
Probability distributions used as priors, jump kernels and swap kernels.

Three families live here:

- **Scalar** distributions ([`Gamma`], [`Lognormal`], [`Uniform`], [`Constant`]) implement
  [`ContinuousDistribution`] and are wrapped by the [`ScalarDistribution`] enum, which is
  what a [`Parameter`](crate::parameter::Parameter) carries as its prior.
- **Multivariate** distributions ([`MultivariateNormal`], [`MultivariateLognormal`],
  [`PositiveNormal`]) implement [`MultivariateDistribution`]. They factorise their
  covariance once on construction and reuse the factor for every density evaluation.
- **Discrete** kernels ([`DiscreteLaplacian`]) implement [`DiscreteDistribution`].

Densities never fail: evaluating outside the support returns `0` (or `-inf` for the log
density). Constructors validate their parameters and fail with
[`EvidenceError::InvalidDistribution`](crate::error::EvidenceError::InvalidDistribution).

# Examples

```rust
use evidence_mcmc::distributions::{ContinuousDistribution, Gamma};
use rand::rngs::SmallRng;
use rand::SeedableRng;

let gamma = Gamma::new(2.0, 0.5).unwrap();
let mut rng = SmallRng::seed_from_u64(42);
let draws = gamma.sample_n(&mut rng, 10);
assert_eq!(draws.len(), 10);
assert!(gamma.ln_pdf(-1.0).is_infinite());
assert_eq!(gamma.mean().unwrap(), 1.0);
```
*/

mod discrete;
mod multivariate;
mod univariate;

pub use discrete::DiscreteLaplacian;
pub use multivariate::{MultivariateLognormal, MultivariateNormal, PositiveNormal};
pub use univariate::{Constant, Gamma, Lognormal, ScalarDistribution, Uniform};

use nalgebra::DMatrix;
use rand::Rng;

use crate::error::Result;

/// A distribution over the real line (or a subset of it).
pub trait ContinuousDistribution {
    /// Log density at `x`; `-inf` outside the support.
    fn ln_pdf(&self, x: f64) -> f64;

    /// Density at `x`; `0` outside the support.
    fn pdf(&self, x: f64) -> f64 {
        self.ln_pdf(x).exp()
    }

    /// Draws one value.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64;

    /// Draws `n` independent values.
    fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }

    fn mean(&self) -> Result<f64>;

    fn variance(&self) -> Result<f64>;
}

/// A distribution over vectors of a fixed dimension.
pub trait MultivariateDistribution {
    fn dim(&self) -> usize;

    /// Log density at `x`; `-inf` outside the support or for a point of the wrong length.
    fn ln_pdf(&self, x: &[f64]) -> f64;

    fn pdf(&self, x: &[f64]) -> f64 {
        self.ln_pdf(x).exp()
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64>;

    fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<Vec<f64>> {
        (0..n).map(|_| self.sample(rng)).collect()
    }

    fn mean(&self) -> Result<Vec<f64>>;

    fn covariance(&self) -> Result<DMatrix<f64>>;
}

/// A distribution over the indices `0..n`.
pub trait DiscreteDistribution {
    /// Samples an index from the distribution.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize;

    /// Log-probability of `index`; `-inf` for indices outside the support.
    fn ln_pmf(&self, index: usize) -> f64;

    fn pmf(&self, index: usize) -> f64 {
        self.ln_pmf(index).exp()
    }

    fn mean(&self) -> f64;

    fn variance(&self) -> f64;
}
