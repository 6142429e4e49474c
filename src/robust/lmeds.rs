//! LMedS: keep the candidate with the smallest median squared residual.

use crate::core::MedianTerminationCriterion;
use crate::error::Result;
use crate::evaluations::PolynomialEvaluation;
use crate::models::Polynomial;
use crate::robust::{
    run_consensus, PolynomialRobustEstimator, PolynomialRobustEstimatorListener, Refit,
    RobustEstimatorBase, Strategy,
};
use crate::samplers::UniformRandomSampler;
use crate::scoring::MedianScoring;
use crate::settings::{validate_threshold, RobustEstimatorMethod, DEFAULT_STOP_THRESHOLD};

/// Least median of squares with uniform sampling.
///
/// Needs no inlier threshold up front: inliers are derived from a robust
/// scale estimate of the best median. The search stops early once the
/// square root of the best median reaches the stop threshold, and the
/// result is refit with weights decreasing with the residual.
pub struct LmedsPolynomialRobustEstimator {
    base: RobustEstimatorBase,
    stop_threshold: f64,
}

impl Default for LmedsPolynomialRobustEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl LmedsPolynomialRobustEstimator {
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
            stop_threshold: DEFAULT_STOP_THRESHOLD,
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn PolynomialRobustEstimatorListener>) -> Self {
        self.base.listener = Some(listener);
        self
    }

    pub fn stop_threshold(&self) -> f64 {
        self.stop_threshold
    }

    pub fn set_stop_threshold(&mut self, stop_threshold: f64) -> Result<()> {
        self.set_threshold(stop_threshold)
    }
}

impl PolynomialRobustEstimator for LmedsPolynomialRobustEstimator {
    fn base(&self) -> &RobustEstimatorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RobustEstimatorBase {
        &mut self.base
    }

    fn method(&self) -> RobustEstimatorMethod {
        RobustEstimatorMethod::Lmeds
    }

    fn threshold(&self) -> f64 {
        self.stop_threshold
    }

    fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        self.base.check_unlocked()?;
        validate_threshold(threshold)?;
        self.stop_threshold = threshold;
        Ok(())
    }

    fn estimate(&mut self) -> Result<Polynomial> {
        run_consensus(self, |this| Strategy {
            sampler: UniformRandomSampler::from_optional_seed(this.seed()),
            scoring: MedianScoring::new(this.stop_threshold),
            termination: MedianTerminationCriterion {
                confidence: this.confidence(),
                stop_threshold: this.stop_threshold,
            },
            refit: Refit::Weighted,
        })
    }
}
