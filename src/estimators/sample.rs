//! Polynomial estimator plugged into the consensus loop.

use crate::core::Estimator;
use crate::estimators::fit_polynomial;
use crate::evaluations::{DistanceMetric, PolynomialEvaluation};
use crate::models::Polynomial;

/// Fits candidate polynomials from minimal samples of `degree + 1`
/// evaluations and measures residuals with the configured metric.
#[derive(Debug, Clone, Copy)]
pub struct SamplePolynomialEstimator {
    degree: usize,
    metric: DistanceMetric,
}

impl SamplePolynomialEstimator {
    pub fn new(degree: usize, metric: DistanceMetric) -> Self {
        Self { degree, metric }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

impl Estimator for SamplePolynomialEstimator {
    type Model = Polynomial;

    fn sample_size(&self) -> usize {
        self.degree + 1
    }

    fn is_valid_sample(&self, data: &[PolynomialEvaluation], sample: &[usize]) -> bool {
        if sample.len() < self.sample_size() {
            return false;
        }
        // Check for distinct, in-range indices
        for i in 0..sample.len() {
            if sample[i] >= data.len() {
                return false;
            }
            for j in (i + 1)..sample.len() {
                if sample[i] == sample[j] {
                    return false;
                }
            }
        }
        true
    }

    fn estimate_model(&self, data: &[PolynomialEvaluation], sample: &[usize]) -> Option<Polynomial> {
        fit_polynomial(sample.iter().map(|&i| (&data[i], 1.0)), self.degree).ok()
    }

    fn estimate_model_nonminimal(
        &self,
        data: &[PolynomialEvaluation],
        sample: &[usize],
        weights: Option<&[f64]>,
    ) -> Option<Polynomial> {
        let weight = |i: usize| weights.and_then(|w| w.get(i).copied()).unwrap_or(1.0);
        fit_polynomial(sample.iter().map(|&i| (&data[i], weight(i))), self.degree).ok()
    }

    fn residual(&self, evaluation: &PolynomialEvaluation, model: &Polynomial) -> f64 {
        evaluation.distance(model, self.metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn minimal_sample_fits_line() {
        let data = vec![
            PolynomialEvaluation::direct(0.0, 1.0),
            PolynomialEvaluation::direct(1.0, 3.0),
            PolynomialEvaluation::derivative(4.0, 2.0, 1).unwrap(),
        ];
        let estimator = SamplePolynomialEstimator::new(1, DistanceMetric::Geometric);
        assert_eq!(estimator.sample_size(), 2);
        assert!(estimator.is_valid_sample(&data, &[0, 2]));

        let model = estimator.estimate_model(&data, &[0, 2]).unwrap();
        assert_abs_diff_eq!(model.coefficients()[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(model.coefficients()[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(estimator.residual(&data[1], &model), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rejects_repeated_or_short_samples() {
        let data = vec![
            PolynomialEvaluation::direct(0.0, 1.0),
            PolynomialEvaluation::direct(1.0, 3.0),
        ];
        let estimator = SamplePolynomialEstimator::new(1, DistanceMetric::Algebraic);
        assert!(!estimator.is_valid_sample(&data, &[0, 0]));
        assert!(!estimator.is_valid_sample(&data, &[0]));
        assert!(!estimator.is_valid_sample(&data, &[0, 5]));
    }

    #[test]
    fn degenerate_sample_yields_no_model() {
        let data = vec![
            PolynomialEvaluation::derivative(0.0, 2.0, 1).unwrap(),
            PolynomialEvaluation::derivative(1.0, 2.0, 1).unwrap(),
        ];
        let estimator = SamplePolynomialEstimator::new(1, DistanceMetric::Algebraic);
        assert!(estimator.estimate_model(&data, &[0, 1]).is_none());
    }

    #[test]
    fn zero_weights_drop_evaluations() {
        let data = vec![
            PolynomialEvaluation::direct(0.0, 1.0),
            PolynomialEvaluation::direct(1.0, 3.0),
            PolynomialEvaluation::direct(2.0, 50.0),
            PolynomialEvaluation::direct(3.0, 7.0),
        ];
        let estimator = SamplePolynomialEstimator::new(1, DistanceMetric::Algebraic);
        let weights = [1.0, 1.0, 0.0, 1.0];
        let model = estimator
            .estimate_model_nonminimal(&data, &[0, 1, 2, 3], Some(&weights))
            .unwrap();
        assert_abs_diff_eq!(model.coefficients()[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(model.coefficients()[1], 2.0, epsilon = 1e-10);
    }
}
