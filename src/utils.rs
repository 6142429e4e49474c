//! Miscellaneous utilities shared across the crate.
//!
//! Holds the seeded integer generator used by the samplers and the small
//! combinatorial helpers used to build derivative and integral rows.

use std::marker::PhantomData;

use rand::distributions::uniform::SampleUniform;
use rand::prelude::*;

/// Uniform integer random-number generator over an inclusive range.
///
/// By default this uses an entropy seeded RNG, but test code can construct
/// it from a fixed seed for reproducible behavior.
pub struct UniformRandomGenerator<T>
where
    T: Copy + SampleUniform + PartialOrd,
{
    rng: StdRng,
    _value: PhantomData<T>,
}

impl<T> Default for UniformRandomGenerator<T>
where
    T: Copy + SampleUniform + PartialOrd,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> UniformRandomGenerator<T>
where
    T: Copy + SampleUniform + PartialOrd,
{
    /// Construct with a random seed (suitable for production use).
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            _value: PhantomData,
        }
    }

    /// Construct with a fixed seed (useful for tests).
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            _value: PhantomData,
        }
    }

    /// Construct from an optional seed, falling back to entropy.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::from_seed)
    }

    /// Generate a set of unique random integers in `[min, max]` into `out`.
    ///
    /// Rejection based, which is fine for the small minimal samples drawn by
    /// the consensus loop. The range must hold at least `out.len()` values.
    pub fn gen_unique(&mut self, out: &mut [T], min: T, max: T)
    where
        T: Eq,
    {
        for i in 0..out.len() {
            loop {
                let candidate = self.rng.gen_range(min..=max);
                if out[..i].iter().all(|&v| v != candidate) {
                    out[i] = candidate;
                    break;
                }
            }
        }
    }
}

/// Falling factorial `n (n - 1) ... (n - k + 1)`, the coefficient of the
/// `k`-th derivative of `x^n`. Zero when `k > n`.
pub fn falling_factorial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    ((n - k + 1)..=n).fold(1.0, |acc, v| acc * v as f64)
}

/// Rising factorial `(n + 1) (n + 2) ... (n + k)`, the divisor applied to
/// `x^(n + k)` after integrating `x^n` `k` times.
pub fn rising_factorial(n: usize, k: usize) -> f64 {
    ((n + 1)..=(n + k)).fold(1.0, |acc, v| acc * v as f64)
}

/// `k!` as a float.
pub fn factorial(k: usize) -> f64 {
    rising_factorial(0, k)
}

/// Median of a slice, or `None` when empty. NaNs sort last.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(0.5 * (sorted[mid - 1] + sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}
