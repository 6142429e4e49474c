//! PROMedS: LMedS scoring with samples drawn best-quality first.

use crate::core::MedianTerminationCriterion;
use crate::error::{Error, Result};
use crate::evaluations::PolynomialEvaluation;
use crate::models::Polynomial;
use crate::robust::{
    check_quality_scores, run_consensus, PolynomialRobustEstimator,
    PolynomialRobustEstimatorListener, Refit, RobustEstimatorBase, Strategy,
};
use crate::samplers::ProsacSampler;
use crate::scoring::MedianScoring;
use crate::settings::{validate_threshold, RobustEstimatorMethod, DEFAULT_STOP_THRESHOLD};

/// Median scoring and stopping of LMedS combined with the PROSAC sampling
/// schedule.
pub struct PromedsPolynomialRobustEstimator {
    base: RobustEstimatorBase,
    stop_threshold: f64,
    quality_scores: Option<Vec<f64>>,
}

impl Default for PromedsPolynomialRobustEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl PromedsPolynomialRobustEstimator {
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
            stop_threshold: DEFAULT_STOP_THRESHOLD,
            quality_scores: None,
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

impl PolynomialRobustEstimator for PromedsPolynomialRobustEstimator {
    fn base(&self) -> &RobustEstimatorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RobustEstimatorBase {
        &mut self.base
    }

    fn method(&self) -> RobustEstimatorMethod {
        RobustEstimatorMethod::Promeds
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
            scoring: MedianScoring::new(this.stop_threshold),
            termination: MedianTerminationCriterion {
                confidence: this.confidence(),
                stop_threshold: this.stop_threshold,
            },
            refit: Refit::Weighted,
        })
    }
}
