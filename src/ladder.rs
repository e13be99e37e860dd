//! Temperature ladders for the power-posterior path.

use rand::Rng;

use crate::error::{EvidenceError, Result};

/// Exponent of the power-law spacing. Large exponents crowd temperatures near 0, where the
/// expected log-likelihood changes fastest.
pub const LADDER_EXPONENT: i32 = 4;

/// How the temperatures are laid out on `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderSchedule {
    /// `beta_i = (i / (n - 1))^4` for `i = 0..n`.
    PowerLaw { n_temperatures: usize },
    /// `strata_size` uniform draws inside each of `n_strata` power-law bins, plus the
    /// endpoints 0 and 1.
    Stratified { n_strata: usize, strata_size: usize },
}

impl LadderSchedule {
    /// Number of temperatures the schedule produces.
    pub fn len(&self) -> usize {
        match *self {
            LadderSchedule::PowerLaw { n_temperatures } => n_temperatures,
            LadderSchedule::Stratified {
                n_strata,
                strata_size,
            } => n_strata * strata_size + 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f64>> {
        match *self {
            LadderSchedule::PowerLaw { n_temperatures } => power_law(n_temperatures),
            LadderSchedule::Stratified {
                n_strata,
                strata_size,
            } => stratified(n_strata, strata_size, rng),
        }
    }
}

/**
Deterministic power-law ladder.

```rust
use evidence_mcmc::ladder::power_law;

let ladder = power_law(3).unwrap();
assert_eq!(ladder, vec![0.0, 0.0625, 1.0]);
```
*/
pub fn power_law(n: usize) -> Result<Vec<f64>> {
    if n < 2 {
        return Err(EvidenceError::InvalidLadder(format!(
            "need at least two temperatures, got {n}"
        )));
    }
    let last = (n - 1) as f64;
    Ok((0..n)
        .map(|i| (i as f64 / last).powi(LADDER_EXPONENT))
        .collect())
}

/// Stratified random ladder, sorted ascending and closed by the endpoints 0 and 1.
pub fn stratified<R: Rng + ?Sized>(
    n_strata: usize,
    strata_size: usize,
    rng: &mut R,
) -> Result<Vec<f64>> {
    if n_strata == 0 || strata_size == 0 {
        return Err(EvidenceError::InvalidLadder(format!(
            "need at least one stratum with one draw, got {n_strata} strata of {strata_size}"
        )));
    }
    let edge = |i: usize| (i as f64 / n_strata as f64).powi(LADDER_EXPONENT);
    let mut ladder = Vec::with_capacity(n_strata * strata_size + 2);
    ladder.push(0.0);
    for i in 0..n_strata {
        let (lo, hi) = (edge(i), edge(i + 1));
        ladder.extend((0..strata_size).map(|_| lo + (hi - lo) * rng.gen::<f64>()));
    }
    ladder.push(1.0);
    ladder.sort_by(f64::total_cmp);
    Ok(ladder)
}

/// Checks that `ladder` has two or more non-decreasing temperatures inside `[0, 1]`.
pub fn validate(ladder: &[f64]) -> Result<()> {
    if ladder.len() < 2 {
        return Err(EvidenceError::InvalidLadder(format!(
            "need at least two temperatures, got {}",
            ladder.len()
        )));
    }
    if let Some(beta) = ladder.iter().find(|b| !(0.0..=1.0).contains(*b)) {
        return Err(EvidenceError::InvalidLadder(format!(
            "temperature {beta} outside [0, 1]"
        )));
    }
    if ladder.windows(2).any(|w| w[1] < w[0]) {
        return Err(EvidenceError::InvalidLadder(
            "temperatures must be non-decreasing".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const SEED: u64 = 42;

    #[test]
    fn power_law_spacing() {
        let ladder = power_law(5).unwrap();
        assert_eq!(ladder.len(), 5);
        assert_eq!(ladder[0], 0.0);
        assert_eq!(ladder[4], 1.0);
        assert_abs_diff_eq!(ladder[2], 0.0625, epsilon = 1e-15);
        assert_abs_diff_eq!(ladder[1], 0.25f64.powi(4), epsilon = 1e-15);
        assert!(validate(&ladder).is_ok());
        assert!(power_law(1).is_err());
    }

    #[test]
    fn stratified_draws_stay_in_their_bins() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let ladder = stratified(4, 3, &mut rng).unwrap();
        assert_eq!(ladder.len(), 14);
        assert_eq!(ladder[0], 0.0);
        assert_eq!(ladder[13], 1.0);
        assert!(validate(&ladder).is_ok());
        for i in 0..4 {
            let lo = (i as f64 / 4.0).powi(4);
            let hi = ((i + 1) as f64 / 4.0).powi(4);
            let inside = ladder[1..13].iter().filter(|b| **b >= lo && **b < hi).count();
            assert_eq!(inside, 3, "Expected 3 draws in bin {i}, got {inside}");
        }
        assert!(stratified(0, 3, &mut rng).is_err());
    }

    #[test]
    fn schedule_length_matches_built_ladder() {
        let mut rng = SmallRng::seed_from_u64(SEED);
        for schedule in [
            LadderSchedule::PowerLaw { n_temperatures: 7 },
            LadderSchedule::Stratified {
                n_strata: 3,
                strata_size: 2,
            },
        ] {
            assert_eq!(schedule.build(&mut rng).unwrap().len(), schedule.len());
        }
    }

    #[test]
    fn validation_rejects_bad_ladders() {
        assert!(validate(&[0.5]).is_err());
        assert!(validate(&[0.0, 1.5]).is_err());
        assert!(validate(&[0.0, 0.6, 0.4, 1.0]).is_err());
        assert!(validate(&[0.0, f64::NAN]).is_err());
        assert!(validate(&[0.0, 0.0, 1.0]).is_ok());
    }
}
