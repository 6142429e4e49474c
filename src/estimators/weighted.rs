//! Weighted least-squares polynomial estimator.

use crate::error::{Error, Result};
use crate::estimators::{
    check_evaluation_count, fit_polynomial, run_estimate, LinearEstimatorBase,
    PolynomialEstimator, PolynomialEstimatorListener,
};
use crate::evaluations::PolynomialEvaluation;
use crate::models::Polynomial;
use crate::settings::{PolynomialEstimatorType, DEFAULT_MAX_EVALUATIONS, DEFAULT_SORT_WEIGHTS};

/// Fits a polynomial to evaluations scaled by per-evaluation weights.
///
/// Each linear row and its right-hand side are multiplied by the weight of
/// the evaluation. At most `max_evaluations` rows enter the solve: the
/// highest weighted ones when weight sorting is enabled (kept in input
/// order), the first ones otherwise.
pub struct WeightedPolynomialEstimator {
    base: LinearEstimatorBase,
    weights: Option<Vec<f64>>,
    max_evaluations: usize,
    sort_weights: bool,
}

impl Default for WeightedPolynomialEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightedPolynomialEstimator {
    pub fn new() -> Self {
        Self::from_base(LinearEstimatorBase::default())
    }

    pub fn with_degree(degree: usize) -> Result<Self> {
        Ok(Self::from_base(LinearEstimatorBase::with_degree(degree)?))
    }

    pub fn with_evaluations_and_weights(
        degree: usize,
        evaluations: Vec<PolynomialEvaluation>,
        weights: Vec<f64>,
    ) -> Result<Self> {
        check_weights(&evaluations, &weights)?;
        let mut estimator = Self::from_base(LinearEstimatorBase::with_evaluations(degree, evaluations)?);
        estimator.weights = Some(weights);
        Ok(estimator)
    }

    fn from_base(base: LinearEstimatorBase) -> Self {
        Self {
            base,
            weights: None,
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            sort_weights: DEFAULT_SORT_WEIGHTS,
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn PolynomialEstimatorListener>) -> Self {
        self.base.listener = Some(listener);
        self
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// Weights for the evaluations already set; lengths must match.
    pub fn set_weights(&mut self, weights: Vec<f64>) -> Result<()> {
        self.base.check_unlocked()?;
        let evaluations = self
            .evaluations()
            .ok_or_else(|| Error::invalid("weights require evaluations to be set first"))?;
        check_weights(evaluations, &weights)?;
        self.weights = Some(weights);
        Ok(())
    }

    pub fn set_evaluations_and_weights(
        &mut self,
        evaluations: Vec<PolynomialEvaluation>,
        weights: Vec<f64>,
    ) -> Result<()> {
        self.base.check_unlocked()?;
        check_evaluation_count(evaluations.len(), self.degree())?;
        check_weights(&evaluations, &weights)?;
        self.base.evaluations = Some(evaluations);
        self.weights = Some(weights);
        Ok(())
    }

    pub fn max_evaluations(&self) -> usize {
        self.max_evaluations
    }

    /// Must be at least `degree + 1`.
    pub fn set_max_evaluations(&mut self, max_evaluations: usize) -> Result<()> {
        self.base.check_unlocked()?;
        if max_evaluations < self.min_number_of_evaluations() {
            return Err(Error::invalid(format!(
                "max evaluations must be at least {}, got {max_evaluations}",
                self.min_number_of_evaluations()
            )));
        }
        self.max_evaluations = max_evaluations;
        Ok(())
    }

    pub fn is_sort_weights_enabled(&self) -> bool {
        self.sort_weights
    }

    pub fn set_sort_weights_enabled(&mut self, enabled: bool) -> Result<()> {
        self.base.check_unlocked()?;
        self.sort_weights = enabled;
        Ok(())
    }

    /// Indices of the evaluations entering the solve, in input order.
    fn selected_indices(&self, weights: &[f64]) -> Vec<usize> {
        let n = weights.len();
        let limit = self.max_evaluations.max(self.min_number_of_evaluations());
        if n <= limit {
            return (0..n).collect();
        }
        if !self.sort_weights {
            return (0..limit).collect();
        }

        let mut by_weight: Vec<usize> = (0..n).collect();
        by_weight.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));
        by_weight.truncate(limit);
        by_weight.sort_unstable();
        by_weight
    }

    fn solve(&self) -> Result<Polynomial> {
        let evaluations = self.evaluations().unwrap_or_default();
        let weights = self.weights().unwrap_or_default();
        let selected = self.selected_indices(weights);
        fit_polynomial(
            selected.iter().map(|&i| (&evaluations[i], weights[i])),
            self.degree(),
        )
    }
}

fn check_weights(evaluations: &[PolynomialEvaluation], weights: &[f64]) -> Result<()> {
    if weights.len() != evaluations.len() {
        return Err(Error::invalid(format!(
            "expected {} weights, got {}",
            evaluations.len(),
            weights.len()
        )));
    }
    Ok(())
}

impl PolynomialEstimator for WeightedPolynomialEstimator {
    fn base(&self) -> &LinearEstimatorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LinearEstimatorBase {
        &mut self.base
    }

    fn estimator_type(&self) -> PolynomialEstimatorType {
        PolynomialEstimatorType::Weighted
    }

    fn estimate(&mut self) -> Result<Polynomial> {
        run_estimate(self, Self::solve)
    }

    fn is_ready(&self) -> bool {
        match (self.evaluations(), self.weights()) {
            (Some(e), Some(w)) => e.len() >= self.min_number_of_evaluations() && e.len() == w.len(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::prelude::*;

    fn noisy_line(n: usize, seed: u64) -> (Vec<PolynomialEvaluation>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut evaluations = Vec::with_capacity(n);
        let mut weights = Vec::with_capacity(n);
        for _ in 0..n {
            let x: f64 = rng.gen_range(-10.0..10.0);
            let noise: f64 = rng.gen_range(-0.5..0.5);
            evaluations.push(PolynomialEvaluation::direct(x, 3.0 - 0.5 * x + noise));
            weights.push(rng.gen_range(0.1..1.0));
        }
        (evaluations, weights)
    }

    #[test]
    fn exact_data_is_recovered_for_any_positive_weights() {
        let evaluations: Vec<_> = (0..6)
            .map(|i| {
                let x = i as f64 - 2.0;
                PolynomialEvaluation::direct(x, 1.0 - x + 0.25 * x * x)
            })
            .collect();
        let weights = vec![0.5, 2.0, 1.0, 3.0, 0.1, 1.5];
        let mut estimator =
            WeightedPolynomialEstimator::with_evaluations_and_weights(2, evaluations, weights).unwrap();
        let fitted = estimator.estimate().unwrap();
        for (a, b) in fitted.coefficients().iter().zip([1.0, -1.0, 0.25]) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn capping_keeps_highest_weights() {
        let (evaluations, weights) = noisy_line(80, 5);
        let mut estimator = WeightedPolynomialEstimator::with_evaluations_and_weights(
            1,
            evaluations.clone(),
            weights.clone(),
        )
        .unwrap();
        assert_eq!(estimator.max_evaluations(), 50);
        assert!(estimator.is_sort_weights_enabled());
        let capped = estimator.estimate().unwrap();

        let mut order: Vec<usize> = (0..80).collect();
        order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));
        order.truncate(50);
        order.sort_unstable();
        let top_evaluations: Vec<_> = order.iter().map(|&i| evaluations[i].clone()).collect();
        let top_weights: Vec<_> = order.iter().map(|&i| weights[i]).collect();
        let mut reference =
            WeightedPolynomialEstimator::with_evaluations_and_weights(1, top_evaluations, top_weights)
                .unwrap();
        let expected = reference.estimate().unwrap();

        for (a, b) in capped.coefficients().iter().zip(expected.coefficients()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn unsorted_capping_uses_first_evaluations() {
        let (evaluations, weights) = noisy_line(30, 8);
        let mut estimator = WeightedPolynomialEstimator::with_evaluations_and_weights(
            1,
            evaluations.clone(),
            weights.clone(),
        )
        .unwrap();
        estimator.set_sort_weights_enabled(false).unwrap();
        estimator.set_max_evaluations(10).unwrap();
        let capped = estimator.estimate().unwrap();

        let mut reference = WeightedPolynomialEstimator::with_evaluations_and_weights(
            1,
            evaluations[..10].to_vec(),
            weights[..10].to_vec(),
        )
        .unwrap();
        let expected = reference.estimate().unwrap();
        for (a, b) in capped.coefficients().iter().zip(expected.coefficients()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn weights_must_match_evaluations() {
        let (evaluations, _) = noisy_line(5, 1);
        assert!(
            WeightedPolynomialEstimator::with_evaluations_and_weights(1, evaluations.clone(), vec![1.0; 4])
                .err()
                .is_some_and(|e| e.is_invalid_argument())
        );

        let mut estimator = WeightedPolynomialEstimator::new();
        assert!(estimator.set_weights(vec![1.0; 5]).unwrap_err().is_invalid_argument());

        estimator.set_evaluations(evaluations).unwrap();
        assert!(!estimator.is_ready());
        assert!(estimator.estimate().unwrap_err().is_not_ready());
        assert!(estimator.set_weights(vec![1.0; 3]).is_err());
        estimator.set_weights(vec![1.0; 5]).unwrap();
        assert!(estimator.is_ready());
    }

    #[test]
    fn max_evaluations_lower_bound() {
        let mut estimator = WeightedPolynomialEstimator::with_degree(3).unwrap();
        assert!(estimator.set_max_evaluations(3).unwrap_err().is_invalid_argument());
        estimator.set_max_evaluations(4).unwrap();
        assert_eq!(estimator.max_evaluations(), 4);
    }

    #[test]
    fn locked_estimator_rejects_mutation() {
        let (evaluations, weights) = noisy_line(5, 2);
        let mut estimator = WeightedPolynomialEstimator::with_evaluations_and_weights(
            1,
            evaluations.clone(),
            weights.clone(),
        )
        .unwrap();
        estimator.base.locked = true;

        assert!(estimator.set_weights(weights.clone()).unwrap_err().is_locked());
        assert!(estimator
            .set_evaluations_and_weights(evaluations, weights)
            .unwrap_err()
            .is_locked());
        assert!(estimator.set_max_evaluations(10).unwrap_err().is_locked());
        assert!(estimator.set_sort_weights_enabled(false).unwrap_err().is_locked());
        assert!(estimator.estimate().unwrap_err().is_locked());
        assert!(estimator.is_sort_weights_enabled());
    }
}
