//! PROSAC sampler: progressively grows the subset of high-quality evaluations.

use crate::core::Sampler;
use crate::utils::UniformRandomGenerator;

/// Iterations after which PROSAC degrades to uniform sampling.
pub const DEFAULT_RANSAC_CONVERGENCE_ITERATIONS: usize = 100_000;

/// PROSAC sampler over evaluations ranked by quality score.
///
/// Evaluations are visited in descending quality. Each sample holds the
/// newest member of the current pool plus `m - 1` members drawn uniformly
/// from the rest of it; the pool grows along the PROSAC growth function.
pub struct ProsacSampler {
    rng: UniformRandomGenerator<usize>,
    /// Evaluation indices sorted by descending quality.
    ordering: Vec<usize>,
    growth_function: Vec<usize>,
    sample_size: Option<usize>,
    point_number: usize,
    ransac_convergence_iterations: usize,
    kth_sample_number: usize,
    subset_size: usize,
}

impl ProsacSampler {
    /// Rank evaluations by `quality_scores`, highest first. Equal scores keep
    /// their input order.
    pub fn from_quality_scores(quality_scores: &[f64], seed: Option<u64>) -> Self {
        let mut ordering: Vec<usize> = (0..quality_scores.len()).collect();
        ordering.sort_by(|&a, &b| quality_scores[b].total_cmp(&quality_scores[a]));
        Self::with_ordering(ordering, seed, DEFAULT_RANSAC_CONVERGENCE_ITERATIONS)
    }

    /// Use an explicit best-first ordering of evaluation indices.
    pub fn with_ordering(
        ordering: Vec<usize>,
        seed: Option<u64>,
        ransac_convergence_iterations: usize,
    ) -> Self {
        Self {
            rng: UniformRandomGenerator::from_optional_seed(seed),
            ordering,
            growth_function: Vec::new(),
            sample_size: None,
            point_number: 0,
            ransac_convergence_iterations,
            kth_sample_number: 1,
            subset_size: 0,
        }
    }

    /// Best-first ordering of evaluation indices.
    pub fn ordering(&self) -> &[usize] {
        &self.ordering
    }

    /// Size of the current sampling pool.
    pub fn subset_size(&self) -> usize {
        self.subset_size
    }

    fn increment_iteration_number(&mut self) {
        self.kth_sample_number += 1;

        if self.kth_sample_number <= self.ransac_convergence_iterations
            && self.subset_size < self.point_number
            && self.kth_sample_number > self.growth_function[self.subset_size - 1]
        {
            self.subset_size += 1;
        }
    }

    pub fn initialize(&mut self, point_number: usize, sample_size: usize) {
        self.point_number = point_number;
        self.sample_size = Some(sample_size);
        self.growth_function.clear();
        self.growth_function.resize(point_number, 0);

        let mut t_n = self.ransac_convergence_iterations as f64;
        for i in 0..sample_size {
            t_n *= (sample_size - i) as f64 / (point_number - i) as f64;
        }

        let mut t_n_prime: usize = 1;
        for i in 0..point_number {
            if i < sample_size {
                self.growth_function[i] = t_n_prime;
                continue;
            }
            let t_n_plus1 = (i + 1) as f64 * t_n / (i + 1 - sample_size) as f64;
            self.growth_function[i] = t_n_prime + ((t_n_plus1 - t_n).ceil() as usize);
            t_n = t_n_plus1;
            t_n_prime = self.growth_function[i];
        }

        self.kth_sample_number = 1;
        self.subset_size = sample_size;
    }

    fn position_to_index(&self, position: usize) -> usize {
        self.ordering.get(position).copied().unwrap_or(position)
    }
}

impl Sampler for ProsacSampler {
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

        if self.sample_size != Some(sample_size) || self.point_number != point_number {
            self.initialize(point_number, sample_size);
        }

        let out = &mut out_indices[..sample_size];
        if self.kth_sample_number > self.ransac_convergence_iterations {
            // Fall back to uniform random sampling
            self.rng.gen_unique(out, 0, point_number - 1);
        } else {
            let newest = self.subset_size - 1;
            if sample_size > 1 {
                self.rng.gen_unique(&mut out[..sample_size - 1], 0, newest - 1);
            }
            out[sample_size - 1] = newest;
        }

        for position in out.iter_mut() {
            *position = self.position_to_index(*position);
        }

        self.increment_iteration_number();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_descending_and_stable() {
        let sampler = ProsacSampler::from_quality_scores(&[0.1, 0.9, 0.5, 0.9], Some(1));
        assert_eq!(sampler.ordering(), &[1, 3, 2, 0]);
    }

    #[test]
    fn first_sample_is_the_best_evaluations() {
        let scores = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let mut sampler = ProsacSampler::from_quality_scores(&scores, Some(5));
        let mut out = [0usize; 2];
        assert!(sampler.sample(6, 2, &mut out));
        let mut sorted = out.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![4, 5]);
    }

    #[test]
    fn pool_grows_and_samples_stay_distinct() {
        let mut sampler = ProsacSampler::with_ordering((0..20).rev().collect(), Some(9), 200);
        let mut out = [0usize; 3];
        let mut last_pool = 0;
        for _ in 0..200 {
            assert!(sampler.sample(20, 3, &mut out));
            assert!(out.iter().all(|&i| i < 20));
            assert!(out[0] != out[1] && out[1] != out[2] && out[0] != out[2]);
            assert!(sampler.subset_size() >= last_pool);
            last_pool = sampler.subset_size();
        }
        assert!(last_pool > 3);
    }

    #[test]
    fn falls_back_to_uniform_after_convergence() {
        let mut sampler = ProsacSampler::with_ordering((0..10).collect(), Some(2), 3);
        let mut out = [0usize; 2];
        for _ in 0..10 {
            assert!(sampler.sample(10, 2, &mut out));
            assert_ne!(out[0], out[1]);
        }
    }

    #[test]
    fn rejects_oversized_samples() {
        let mut sampler = ProsacSampler::from_quality_scores(&[1.0, 2.0], None);
        let mut out = [0usize; 3];
        assert!(!sampler.sample(2, 3, &mut out));
    }
}
