use tracing::debug;

use crate::core::Estimator;
use crate::evaluations::PolynomialEvaluation;
use crate::scoring::Score;

/// Least Squares optimizer that refits the model using all inliers.
///
/// Requires the estimator to support non-minimal fitting. When the refit
/// fails the original model is returned and a `refit.fallback` event is
/// logged.
pub struct LeastSquaresOptimizer<E>
where
    E: Estimator,
{
    estimator: E,
}

impl<E> LeastSquaresOptimizer<E>
where
    E: Estimator,
{
    pub fn new(estimator: E) -> Self {
        Self { estimator }
    }
}

impl<E> super::LocalOptimizer<E::Model> for LeastSquaresOptimizer<E>
where
    E: Estimator,
{
    fn run(
        &mut self,
        data: &[PolynomialEvaluation],
        inliers: &[usize],
        _residuals: &[f64],
        model: &E::Model,
        _score: &Score,
    ) -> E::Model {
        if inliers.len() < self.estimator.sample_size() {
            return model.clone();
        }

        self.estimator
            .estimate_model_nonminimal(data, inliers, None)
            .unwrap_or_else(|| fallback(model, inliers.len(), false))
    }
}

fn fallback<M: Clone>(model: &M, inliers: usize, weighted: bool) -> M {
    debug!(inliers, weighted, "refit.fallback");
    model.clone()
}

/// Single reweighted least-squares pass over the inliers.
///
/// Each inlier is weighted by `1 / (1 + r / t)`, where `r` is its residual
/// against the consensus model and `t` the inlier threshold of the score,
/// so evaluations closer to the model pull harder on the refit.
pub struct WeightedLeastSquaresOptimizer<E>
where
    E: Estimator,
{
    estimator: E,
}

impl<E> WeightedLeastSquaresOptimizer<E>
where
    E: Estimator,
{
    pub fn new(estimator: E) -> Self {
        Self { estimator }
    }

    fn compute_weights(residuals: &[f64], inliers: &[usize], threshold: f64) -> Vec<f64> {
        let mut weights = vec![0.0; residuals.len()];
        for &idx in inliers {
            weights[idx] = if threshold > 0.0 {
                1.0 / (1.0 + residuals[idx] / threshold)
            } else {
                1.0
            };
        }
        weights
    }
}

impl<E> super::LocalOptimizer<E::Model> for WeightedLeastSquaresOptimizer<E>
where
    E: Estimator,
{
    fn run(
        &mut self,
        data: &[PolynomialEvaluation],
        inliers: &[usize],
        residuals: &[f64],
        model: &E::Model,
        score: &Score,
    ) -> E::Model {
        if inliers.len() < self.estimator.sample_size() || residuals.len() != data.len() {
            return model.clone();
        }

        let weights = Self::compute_weights(residuals, inliers, score.inlier_threshold);
        self.estimator
            .estimate_model_nonminimal(data, inliers, Some(&weights))
            .unwrap_or_else(|| fallback(model, inliers.len(), true))
    }
}

/// Final refit chosen at run time: plain or residual weighted least squares.
pub enum FinalRefit<E>
where
    E: Estimator,
{
    Unweighted(LeastSquaresOptimizer<E>),
    Weighted(WeightedLeastSquaresOptimizer<E>),
}

impl<E> super::LocalOptimizer<E::Model> for FinalRefit<E>
where
    E: Estimator,
{
    fn run(
        &mut self,
        data: &[PolynomialEvaluation],
        inliers: &[usize],
        residuals: &[f64],
        model: &E::Model,
        score: &Score,
    ) -> E::Model {
        match self {
            Self::Unweighted(opt) => opt.run(data, inliers, residuals, model, score),
            Self::Weighted(opt) => opt.run(data, inliers, residuals, model, score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluations::DistanceMetric;
    use crate::estimators::SamplePolynomialEstimator;
    use crate::models::Polynomial;
    use crate::optimisers::LocalOptimizer;
    use approx::assert_abs_diff_eq;

    fn line_data() -> Vec<PolynomialEvaluation> {
        // y = 1 + 2x with one gross outlier at index 4
        let mut data: Vec<_> = (0..6)
            .map(|i| {
                let x = i as f64;
                PolynomialEvaluation::direct(x, 1.0 + 2.0 * x)
            })
            .collect();
        data[4].set_evaluation(100.0);
        data
    }

    #[test]
    fn least_squares_refits_on_inliers_only() {
        let data = line_data();
        let estimator = SamplePolynomialEstimator::new(1, DistanceMetric::Algebraic);
        let mut opt = LeastSquaresOptimizer::new(estimator);

        let rough = Polynomial::new(vec![1.1, 1.9]);
        let inliers = [0, 1, 2, 3, 5];
        let residuals = vec![0.0; data.len()];
        let refined = opt.run(&data, &inliers, &residuals, &rough, &Score::new(5, 5.0, 0.5));

        assert_abs_diff_eq!(refined.coefficients()[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(refined.coefficients()[1], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn too_few_inliers_keep_model() {
        let data = line_data();
        let estimator = SamplePolynomialEstimator::new(1, DistanceMetric::Algebraic);
        let mut opt = LeastSquaresOptimizer::new(estimator);

        let rough = Polynomial::new(vec![1.1, 1.9]);
        let residuals = vec![0.0; data.len()];
        let kept = opt.run(&data, &[0], &residuals, &rough, &Score::new(1, 1.0, 0.5));
        assert_eq!(kept, rough);
    }

    #[test]
    fn weighted_refit_ignores_outliers() {
        let data = line_data();
        let truth = Polynomial::new(vec![1.0, 2.0]);
        let residuals: Vec<f64> = data.iter().map(|e| e.algebraic_distance(&truth)).collect();

        let estimator = SamplePolynomialEstimator::new(1, DistanceMetric::Algebraic);
        let mut opt = FinalRefit::Weighted(WeightedLeastSquaresOptimizer::new(estimator));
        let refined = opt.run(
            &data,
            &[0, 1, 2, 3, 5],
            &residuals,
            &truth,
            &Score::new(5, -0.0, 1e-3),
        );

        assert_abs_diff_eq!(refined.coefficients()[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(refined.coefficients()[1], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn singular_refit_keeps_consensus_model() {
        // slopes alone cannot fix the intercept of a line
        let data: Vec<_> = (0..4)
            .map(|i| PolynomialEvaluation::derivative(i as f64, 2.0, 1).unwrap())
            .collect();
        let model = Polynomial::new(vec![1.0, 2.0]);
        let residuals = vec![0.0; data.len()];
        let score = Score::new(4, 4.0, 1e-3);
        let estimator = SamplePolynomialEstimator::new(1, DistanceMetric::Algebraic);

        for mut opt in [
            FinalRefit::Unweighted(LeastSquaresOptimizer::new(estimator)),
            FinalRefit::Weighted(WeightedLeastSquaresOptimizer::new(estimator)),
        ] {
            let kept = opt.run(&data, &[0, 1, 2, 3], &residuals, &model, &score);
            assert_eq!(kept, model);
        }
    }
}
