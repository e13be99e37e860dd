/*!
Log-domain ratio primitives.

Every likelihood or density ratio in the samplers goes through these helpers instead of
`exp(a - b)` directly, so a `-inf` on either side never turns into `NaN`:

| numerator `a` | denominator `b` | ratio      |
|---------------|-----------------|------------|
| `-inf`        | `-inf`          | `1`        |
| finite        | `-inf`          | `+inf`     |
| `-inf`        | finite          | `0`        |
| finite        | finite          | `exp(a-b)` |

```rust
use evidence_mcmc::ratio::safe_ratio;

assert_eq!(safe_ratio(f64::NEG_INFINITY, f64::NEG_INFINITY), 1.0);
assert_eq!(safe_ratio(-3.0, f64::NEG_INFINITY), f64::INFINITY);
assert_eq!(safe_ratio(f64::NEG_INFINITY, -3.0), 0.0);
assert!((safe_ratio(1.0, 0.0) - std::f64::consts::E).abs() < 1e-12);
```
*/

use num_traits::Float;

/// `exp(a) / exp(b)` for log-values `a` and `b`.
pub fn safe_ratio<T: Float>(a: T, b: T) -> T {
    let neg_inf = T::neg_infinity();
    match (a == neg_inf, b == neg_inf) {
        (true, true) => T::one(),
        (false, true) => T::infinity(),
        (true, false) => T::zero(),
        (false, false) => (a - b).exp(),
    }
}

/// `(exp(a) / exp(b))^beta`, the likelihood ratio of a power posterior at temperature `beta`.
///
/// At `beta == 0` the likelihood carries no weight and the ratio is `1` whatever `a` and
/// `b` are.
pub fn tempered_ratio<T: Float>(a: T, b: T, beta: T) -> T {
    if beta == T::zero() {
        return T::one();
    }
    let neg_inf = T::neg_infinity();
    match (a == neg_inf, b == neg_inf) {
        (true, true) => T::one(),
        (false, true) => T::infinity(),
        (true, false) => T::zero(),
        (false, false) => (beta * (a - b)).exp(),
    }
}

/// Likelihood part of the parallel-tempering exchange ratio.
///
/// Chain `j` at temperature `beta_j` holds log-likelihood `ll_j`, chain `k` holds `ll_k`.
/// Exchanging the states multiplies the joint tempered target by
/// `L_k^{beta_j} L_j^{beta_k} / (L_j^{beta_j} L_k^{beta_k}) = exp((beta_k - beta_j)(ll_j - ll_k))`.
pub fn swap_ratio<T: Float>(ll_j: T, beta_j: T, ll_k: T, beta_k: T) -> T {
    let delta = beta_k - beta_j;
    if delta >= T::zero() {
        tempered_ratio(ll_j, ll_k, delta)
    } else {
        tempered_ratio(ll_k, ll_j, -delta)
    }
}

/// Acceptance probability `min(1, ratio)`; a `NaN` ratio rejects.
pub fn acceptance_probability<T: Float>(ratio: T) -> T {
    if ratio.is_nan() {
        T::zero()
    } else {
        ratio.min(T::one())
    }
}
