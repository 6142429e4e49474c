//! Uniform random sampler drawing minimal samples without replacement.

use crate::core::Sampler;
use crate::utils::UniformRandomGenerator;

/// Uniform random sampler drawing minimal samples without replacement.
pub struct UniformRandomSampler {
    rng: UniformRandomGenerator<usize>,
}

impl Default for UniformRandomSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl UniformRandomSampler {
    /// Construct a new sampler with a random seed.
    pub fn new() -> Self {
        Self {
            rng: UniformRandomGenerator::new(),
        }
    }

    /// Construct a sampler from a fixed seed (primarily for tests).
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: UniformRandomGenerator::from_seed(seed),
        }
    }

    /// Seeded when `seed` is given, entropy seeded otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        Self {
            rng: UniformRandomGenerator::from_optional_seed(seed),
        }
    }
}

impl Sampler for UniformRandomSampler {
    fn sample(
        &mut self,
        point_number: usize,
        sample_size: usize,
        out_indices: &mut [usize],
    ) -> bool {
        if sample_size == 0
            || point_number == 0
            || sample_size > point_number
            || out_indices.len() < sample_size
        {
            return false;
        }

        self.rng
            .gen_unique(&mut out_indices[..sample_size], 0, point_number - 1);
        true
    }
}
