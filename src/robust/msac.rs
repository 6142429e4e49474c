//! MSAC: RANSAC with a truncated quadratic loss instead of an inlier count.

use crate::core::RansacTerminationCriterion;
use crate::error::Result;
use crate::evaluations::PolynomialEvaluation;
use crate::models::Polynomial;
use crate::robust::{
    run_consensus, PolynomialRobustEstimator, PolynomialRobustEstimatorListener, Refit,
    RobustEstimatorBase, Strategy,
};
use crate::samplers::UniformRandomSampler;
use crate::scoring::MsacScoring;
use crate::settings::{validate_threshold, RobustEstimatorMethod, DEFAULT_THRESHOLD};

/// Uniform sampling scored by `sum(min(r^2, t^2))`, lower being better.
pub struct MsacPolynomialRobustEstimator {
    base: RobustEstimatorBase,
    threshold: f64,
}

impl Default for MsacPolynomialRobustEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl MsacPolynomialRobustEstimator {
    pub fn new() -> Self {
        Self::from_base(RobustEstimatorBase::default())
    }

    pub fn with_degree(degree: usize) -> Result<Self> {
        Ok(Self::from_base(RobustEstimatorBase::with_degree(degree)?))
    }

    pub fn with_evaluations(degree: usize, evaluations: Vec<PolynomialEvaluation>) -> Result<Self> {
        Ok(Self::from_base(RobustEstimatorBase::with_evaluations(
            degree,
            evaluations,
        )?))
    }

    fn from_base(base: RobustEstimatorBase) -> Self {
        Self {
            base,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn PolynomialRobustEstimatorListener>) -> Self {
        self.base.listener = Some(listener);
        self
    }
}

impl PolynomialRobustEstimator for MsacPolynomialRobustEstimator {
    fn base(&self) -> &RobustEstimatorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RobustEstimatorBase {
        &mut self.base
    }

    fn method(&self) -> RobustEstimatorMethod {
        RobustEstimatorMethod::Msac
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

    fn estimate(&mut self) -> Result<Polynomial> {
        run_consensus(self, |this| Strategy {
            sampler: UniformRandomSampler::from_optional_seed(this.seed()),
            scoring: MsacScoring::new(this.threshold),
            termination: RansacTerminationCriterion {
                confidence: this.confidence(),
            },
            refit: Refit::Inliers,
        })
    }
}
