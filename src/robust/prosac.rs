//! PROSAC: RANSAC scoring with samples drawn best-quality first.

use crate::core::RansacTerminationCriterion;
use crate::error::{Error, Result};
use crate::evaluations::PolynomialEvaluation;
use crate::models::Polynomial;
use crate::robust::{
    check_quality_scores, run_consensus, PolynomialRobustEstimator,
    PolynomialRobustEstimatorListener, Refit, RobustEstimatorBase, Strategy,
};
use crate::samplers::ProsacSampler;
use crate::scoring::RansacInlierCountScoring;
use crate::settings::{validate_threshold, RobustEstimatorMethod, DEFAULT_THRESHOLD};

/// Inlier-count scoring over a progressively growing pool of the
/// highest-quality evaluations.
pub struct ProsacPolynomialRobustEstimator {
    base: RobustEstimatorBase,
    threshold: f64,
    quality_scores: Option<Vec<f64>>,
}

impl Default for ProsacPolynomialRobustEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProsacPolynomialRobustEstimator {
    pub fn new() -> Self {
        Self::from_base(RobustEstimatorBase::default())
    }

    pub fn with_degree(degree: usize) -> Result<Self> {
        Ok(Self::from_base(RobustEstimatorBase::with_degree(degree)?))
    }

    /// Estimator that still needs quality scores before it is ready.
    pub fn with_evaluations(degree: usize, evaluations: Vec<PolynomialEvaluation>) -> Result<Self> {
        Ok(Self::from_base(RobustEstimatorBase::with_evaluations(
            degree,
            evaluations,
        )?))
    }

    pub fn with_quality_scores(
        degree: usize,
        evaluations: Vec<PolynomialEvaluation>,
        quality_scores: Vec<f64>,
    ) -> Result<Self> {
        check_quality_scores(&quality_scores, Some(&evaluations), degree)?;
        let mut estimator = Self::with_evaluations(degree, evaluations)?;
        estimator.quality_scores = Some(quality_scores);
        Ok(estimator)
    }

    fn from_base(base: RobustEstimatorBase) -> Self {
        Self {
            base,
            threshold: DEFAULT_THRESHOLD,
            quality_scores: None,
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn PolynomialRobustEstimatorListener>) -> Self {
        self.base.listener = Some(listener);
        self
    }

    /// Replace both at once; lengths must match.
    pub fn set_evaluations_and_quality_scores(
        &mut self,
        evaluations: Vec<PolynomialEvaluation>,
        quality_scores: Vec<f64>,
    ) -> Result<()> {
        self.base.check_unlocked()?;
        if evaluations.len() != quality_scores.len() {
            return Err(Error::invalid(format!(
                "expected {} quality scores, got {}",
                evaluations.len(),
                quality_scores.len()
            )));
        }
        self.set_evaluations(evaluations)?;
        self.quality_scores = Some(quality_scores);
        Ok(())
    }
}

impl PolynomialRobustEstimator for ProsacPolynomialRobustEstimator {
    fn base(&self) -> &RobustEstimatorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RobustEstimatorBase {
        &mut self.base
    }

    fn method(&self) -> RobustEstimatorMethod {
        RobustEstimatorMethod::Prosac
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        self.base.check_unlocked()?;
        validate_threshold(threshold)?;
        self.threshold = threshold;
        Ok(())
    }

    fn quality_scores(&self) -> Option<&[f64]> {
        self.quality_scores.as_deref()
    }

    fn set_quality_scores(&mut self, quality_scores: Vec<f64>) -> Result<()> {
        self.base.check_unlocked()?;
        check_quality_scores(&quality_scores, self.evaluations(), self.degree())?;
        self.quality_scores = Some(quality_scores);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        match (self.evaluations(), self.quality_scores()) {
            (Some(e), Some(q)) => e.len() >= self.min_number_of_evaluations() && e.len() == q.len(),
            _ => false,
        }
    }

    fn estimate(&mut self) -> Result<Polynomial> {
        run_consensus(self, |this| Strategy {
            sampler: ProsacSampler::from_quality_scores(
                this.quality_scores().unwrap_or_default(),
                this.seed(),
            ),
            scoring: RansacInlierCountScoring::new(this.threshold),
            termination: RansacTerminationCriterion {
                confidence: this.confidence(),
            },
            refit: Refit::Inliers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robust::test_support::{assert_close, contaminated_line};
    use rand::prelude::*;

    #[test]
    fn recovers_line_with_twenty_percent_outliers() {
        for seed in 0..5 {
            let (truth, evaluations, _) = contaminated_line(500, 0.2, 400 + seed);
            let mut rng = StdRng::seed_from_u64(seed);
            let scores: Vec<f64> = (0..500).map(|_| rng.gen()).collect();
            let mut estimator =
                ProsacPolynomialRobustEstimator::with_quality_scores(1, evaluations, scores).unwrap();
            estimator.set_seed(Some(seed)).unwrap();
            assert_eq!(estimator.method(), RobustEstimatorMethod::Prosac);

            let fitted = estimator.estimate().unwrap();
            assert_close(&fitted, &truth, 1e-8);
        }
    }

    #[test]
    fn informative_scores_need_few_iterations() {
        let (truth, evaluations, is_outlier) = contaminated_line(500, 0.5, 41);
        let scores: Vec<f64> = is_outlier.iter().map(|&o| if o { 0.0 } else { 1.0 }).collect();
        let mut estimator =
            ProsacPolynomialRobustEstimator::with_quality_scores(1, evaluations, scores).unwrap();
        estimator.set_seed(Some(41)).unwrap();
        estimator.set_compute_and_keep_inliers_enabled(true).unwrap();

        let fitted = estimator.estimate().unwrap();
        assert_close(&fitted, &truth, 1e-8);
        // the first sample is clean, so the budget drops right away to
        // about ceil(ln 0.01 / ln 0.75) for a one-half inlier ratio
        let data = estimator.inliers_data().unwrap();
        assert!(data.iterations <= 30);
        assert_eq!(data.num_inliers, is_outlier.iter().filter(|&&o| !o).count());
    }

    #[test]
    fn readiness_requires_matching_scores() {
        let (_, evaluations, _) = contaminated_line(10, 0.0, 1);
        let mut estimator = ProsacPolynomialRobustEstimator::with_evaluations(1, evaluations.clone()).unwrap();
        assert!(!estimator.is_ready());
        assert!(estimator.estimate().unwrap_err().is_not_ready());

        assert!(estimator.set_quality_scores(vec![1.0; 9]).unwrap_err().is_invalid_argument());
        estimator.set_quality_scores(vec![1.0; 10]).unwrap();
        assert!(estimator.is_ready());

        // a shorter evaluation set leaves the scores stale
        estimator.set_evaluations(evaluations[..5].to_vec()).unwrap();
        assert!(!estimator.is_ready());
        estimator
            .set_evaluations_and_quality_scores(evaluations[..5].to_vec(), vec![1.0; 5])
            .unwrap();
        assert!(estimator.is_ready());

        assert!(ProsacPolynomialRobustEstimator::with_quality_scores(1, evaluations, vec![1.0; 3])
            .err()
            .is_some_and(|e| e.is_invalid_argument()));
    }
}
