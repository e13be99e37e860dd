//! Scalar priors.

use rand::Rng;
use rand_distr::Distribution;
use statrs::distribution::Continuous;
use statrs::statistics::Distribution as Moments;

use super::ContinuousDistribution;
use crate::error::{EvidenceError, Result};

fn check_finite(distribution: &'static str, name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EvidenceError::invalid(
            distribution,
            format!("{name} must be finite, got {value}"),
        ))
    }
}

fn moment(distribution: &'static str, value: Option<f64>) -> Result<f64> {
    value.ok_or(EvidenceError::NotImplemented(distribution))
}

/**
Gamma distribution with shape `k` and scale `theta`, supported on `(0, inf)`.

```rust
use evidence_mcmc::distributions::{ContinuousDistribution, Gamma};

let gamma = Gamma::new(3.0, 2.0).unwrap();
assert_eq!(gamma.mean().unwrap(), 6.0);
assert_eq!(gamma.variance().unwrap(), 12.0);
assert!(Gamma::new(0.0, 1.0).is_err());
```
*/
#[derive(Debug, Clone)]
pub struct Gamma {
    shape: f64,
    scale: f64,
    density: statrs::distribution::Gamma,
    sampler: rand_distr::Gamma<f64>,
}

impl Gamma {
    pub fn new(shape: f64, scale: f64) -> Result<Self> {
        check_finite("Gamma", "shape", shape)?;
        check_finite("Gamma", "scale", scale)?;
        if shape <= 0.0 || scale <= 0.0 {
            return Err(EvidenceError::invalid(
                "Gamma",
                format!("shape and scale must be positive, got shape={shape}, scale={scale}"),
            ));
        }
        // statrs parameterises by rate.
        let density = statrs::distribution::Gamma::new(shape, 1.0 / scale)
            .map_err(|e| EvidenceError::invalid("Gamma", e.to_string()))?;
        let sampler = rand_distr::Gamma::new(shape, scale)
            .map_err(|e| EvidenceError::invalid("Gamma", e.to_string()))?;
        Ok(Self {
            shape,
            scale,
            density,
            sampler,
        })
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl ContinuousDistribution for Gamma {
    fn ln_pdf(&self, x: f64) -> f64 {
        if !(x.is_finite() && x > 0.0) {
            return f64::NEG_INFINITY;
        }
        self.density.ln_pdf(x)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.sampler.sample(rng)
    }

    fn mean(&self) -> Result<f64> {
        moment("Gamma mean", self.density.mean())
    }

    fn variance(&self) -> Result<f64> {
        moment("Gamma variance", self.density.variance())
    }
}

/// Lognormal distribution: `exp(Y)` with `Y ~ N(mu, sigma^2)`.
#[derive(Debug, Clone)]
pub struct Lognormal {
    mu: f64,
    sigma: f64,
    density: statrs::distribution::LogNormal,
    sampler: rand_distr::LogNormal<f64>,
}

impl Lognormal {
    /// Builds the distribution from the parameters of the underlying normal.
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        check_finite("Lognormal", "mu", mu)?;
        check_finite("Lognormal", "sigma", sigma)?;
        if sigma <= 0.0 {
            return Err(EvidenceError::invalid(
                "Lognormal",
                format!("sigma must be positive, got {sigma}"),
            ));
        }
        let density = statrs::distribution::LogNormal::new(mu, sigma)
            .map_err(|e| EvidenceError::invalid("Lognormal", e.to_string()))?;
        let sampler = rand_distr::LogNormal::new(mu, sigma)
            .map_err(|e| EvidenceError::invalid("Lognormal", e.to_string()))?;
        Ok(Self {
            mu,
            sigma,
            density,
            sampler,
        })
    }

    /// Builds the lognormal whose own mean and variance are `mean` and `variance`.
    pub fn with_moments(mean: f64, variance: f64) -> Result<Self> {
        if !(mean.is_finite() && mean > 0.0 && variance.is_finite() && variance > 0.0) {
            return Err(EvidenceError::invalid(
                "Lognormal",
                format!("mean and variance must be positive, got mean={mean}, variance={variance}"),
            ));
        }
        let sigma2 = (1.0 + variance / (mean * mean)).ln();
        Self::new(mean.ln() - 0.5 * sigma2, sigma2.sqrt())
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl ContinuousDistribution for Lognormal {
    fn ln_pdf(&self, x: f64) -> f64 {
        if !(x.is_finite() && x > 0.0) {
            return f64::NEG_INFINITY;
        }
        self.density.ln_pdf(x)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.sampler.sample(rng)
    }

    fn mean(&self) -> Result<f64> {
        moment("Lognormal mean", self.density.mean())
    }

    fn variance(&self) -> Result<f64> {
        moment("Lognormal variance", self.density.variance())
    }
}

/// Uniform distribution on `[lower, upper]`.
#[derive(Debug, Clone)]
pub struct Uniform {
    lower: f64,
    upper: f64,
    density: statrs::distribution::Uniform,
}

impl Uniform {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        check_finite("Uniform", "lower", lower)?;
        check_finite("Uniform", "upper", upper)?;
        if upper <= lower {
            return Err(EvidenceError::invalid(
                "Uniform",
                format!("upper bound {upper} must exceed lower bound {lower}"),
            ));
        }
        let density = statrs::distribution::Uniform::new(lower, upper)
            .map_err(|e| EvidenceError::invalid("Uniform", e.to_string()))?;
        Ok(Self {
            lower,
            upper,
            density,
        })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }
}

impl ContinuousDistribution for Uniform {
    fn ln_pdf(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NEG_INFINITY;
        }
        self.density.ln_pdf(x)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.lower..self.upper)
    }

    fn mean(&self) -> Result<f64> {
        moment("Uniform mean", self.density.mean())
    }

    fn variance(&self) -> Result<f64> {
        moment("Uniform variance", self.density.variance())
    }
}

/// A point mass. Its "density" is 1 at `value` and 0 everywhere else.
///
/// Parameters with a constant prior are held fixed by every sampler.
#[derive(Debug, Clone)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Result<Self> {
        check_finite("Constant", "value", value)?;
        Ok(Self { value })
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl ContinuousDistribution for Constant {
    fn ln_pdf(&self, x: f64) -> f64 {
        if x == self.value {
            0.0
        } else {
            f64::NEG_INFINITY
        }
    }

    fn sample<R: Rng + ?Sized>(&self, _rng: &mut R) -> f64 {
        self.value
    }

    fn mean(&self) -> Result<f64> {
        Ok(self.value)
    }

    fn variance(&self) -> Result<f64> {
        Ok(0.0)
    }
}

/// The closed set of scalar priors a parameter can carry.
#[derive(Debug, Clone)]
pub enum ScalarDistribution {
    Gamma(Gamma),
    Lognormal(Lognormal),
    Uniform(Uniform),
    Constant(Constant),
}

impl ScalarDistribution {
    pub fn is_constant(&self) -> bool {
        matches!(self, ScalarDistribution::Constant(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalarDistribution::Gamma(_) => "Gamma",
            ScalarDistribution::Lognormal(_) => "Lognormal",
            ScalarDistribution::Uniform(_) => "Uniform",
            ScalarDistribution::Constant(_) => "Constant",
        }
    }

    /// Whether every draw is strictly positive (up to a measure-zero boundary).
    ///
    /// The jump kernels only propose positive values, so a free parameter needs a prior
    /// with this property.
    pub fn has_positive_support(&self) -> bool {
        match self {
            ScalarDistribution::Gamma(_) | ScalarDistribution::Lognormal(_) => true,
            ScalarDistribution::Uniform(d) => d.lower() >= 0.0,
            ScalarDistribution::Constant(d) => d.value() > 0.0,
        }
    }
}

impl ContinuousDistribution for ScalarDistribution {
    fn ln_pdf(&self, x: f64) -> f64 {
        match self {
            ScalarDistribution::Gamma(d) => d.ln_pdf(x),
            ScalarDistribution::Lognormal(d) => d.ln_pdf(x),
            ScalarDistribution::Uniform(d) => d.ln_pdf(x),
            ScalarDistribution::Constant(d) => d.ln_pdf(x),
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            ScalarDistribution::Gamma(d) => d.sample(rng),
            ScalarDistribution::Lognormal(d) => d.sample(rng),
            ScalarDistribution::Uniform(d) => d.sample(rng),
            ScalarDistribution::Constant(d) => d.sample(rng),
        }
    }

    fn mean(&self) -> Result<f64> {
        match self {
            ScalarDistribution::Gamma(d) => d.mean(),
            ScalarDistribution::Lognormal(d) => d.mean(),
            ScalarDistribution::Uniform(d) => d.mean(),
            ScalarDistribution::Constant(d) => d.mean(),
        }
    }

    fn variance(&self) -> Result<f64> {
        match self {
            ScalarDistribution::Gamma(d) => d.variance(),
            ScalarDistribution::Lognormal(d) => d.variance(),
            ScalarDistribution::Uniform(d) => d.variance(),
            ScalarDistribution::Constant(d) => d.variance(),
        }
    }
}

impl From<Gamma> for ScalarDistribution {
    fn from(d: Gamma) -> Self {
        ScalarDistribution::Gamma(d)
    }
}

impl From<Lognormal> for ScalarDistribution {
    fn from(d: Lognormal) -> Self {
        ScalarDistribution::Lognormal(d)
    }
}

impl From<Uniform> for ScalarDistribution {
    fn from(d: Uniform) -> Self {
        ScalarDistribution::Uniform(d)
    }
}

impl From<Constant> for ScalarDistribution {
    fn from(d: Constant) -> Self {
        ScalarDistribution::Constant(d)
    }
}
