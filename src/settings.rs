//! Configuration types for polynomial estimators.
//!
//! [`RobustEstimatorSettings`] bundles the tunables shared by every robust
//! method; method-specific thresholds live on the concrete estimators and
//! default to the constants below.

use crate::error::{Error, Result};

/// Default confidence that a sample free of outliers is eventually drawn.
pub const DEFAULT_CONFIDENCE: f64 = 0.99;
/// Default cap on consensus iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 5000;
/// Default minimum progress change between two progress notifications.
pub const DEFAULT_PROGRESS_DELTA: f32 = 0.05;
/// Default inlier threshold for RANSAC, MSAC and PROSAC.
pub const DEFAULT_THRESHOLD: f64 = 1e-6;
/// Default stop threshold for LMedS and PROMedS.
pub const DEFAULT_STOP_THRESHOLD: f64 = 1e-6;
/// Default degree for estimators built without one.
pub const DEFAULT_DEGREE: usize = 1;
/// Default number of evaluations kept by the weighted estimator.
pub const DEFAULT_MAX_EVALUATIONS: usize = 50;
/// Whether the weighted estimator keeps the highest weights by default.
pub const DEFAULT_SORT_WEIGHTS: bool = true;

/// Robust estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RobustEstimatorMethod {
    /// Inlier counting with uniform sampling.
    Ransac,
    /// Least median of squares with uniform sampling.
    Lmeds,
    /// Truncated quadratic loss with uniform sampling.
    Msac,
    /// Inlier counting with quality-ordered progressive sampling.
    #[default]
    Prosac,
    /// Least median of squares with quality-ordered progressive sampling.
    Promeds,
}

impl RobustEstimatorMethod {
    /// Whether the method needs per-evaluation quality scores.
    pub fn requires_quality_scores(self) -> bool {
        matches!(self, Self::Prosac | Self::Promeds)
    }
}

/// Linear (non-robust) estimator kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolynomialEstimatorType {
    /// Unweighted least mean squared error.
    #[default]
    Lmse,
    /// Weighted least squares with optional weight sorting.
    Weighted,
}

/// Tunables shared by every robust estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct RobustEstimatorSettings {
    /// Desired confidence in (0, 1).
    pub confidence: f64,
    /// Upper bound on consensus iterations, at least 1.
    pub max_iterations: usize,
    /// Progress change in \[0, 1\] between two progress notifications.
    pub progress_delta: f32,
    /// Score with geometric rather than algebraic distance.
    pub use_geometric_distance: bool,
    /// Refit the best consensus model on its inliers.
    pub refine_result: bool,
    /// Keep the inlier flags of the best model after `estimate()`.
    pub compute_and_keep_inliers: bool,
    /// Keep the residuals of the best model after `estimate()`.
    pub compute_and_keep_residuals: bool,
    /// Sampler seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for RobustEstimatorSettings {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            progress_delta: DEFAULT_PROGRESS_DELTA,
            use_geometric_distance: true,
            refine_result: true,
            compute_and_keep_inliers: false,
            compute_and_keep_residuals: false,
            seed: None,
        }
    }
}

impl RobustEstimatorSettings {
    /// Check every range constraint at once.
    pub fn validate(&self) -> Result<()> {
        validate_confidence(self.confidence)?;
        validate_max_iterations(self.max_iterations)?;
        validate_progress_delta(self.progress_delta)
    }
}

pub(crate) fn validate_confidence(confidence: f64) -> Result<()> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(Error::invalid(format!(
            "confidence must be in (0, 1), got {confidence}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_max_iterations(max_iterations: usize) -> Result<()> {
    if max_iterations < 1 {
        return Err(Error::invalid("max iterations must be at least 1"));
    }
    Ok(())
}

pub(crate) fn validate_progress_delta(progress_delta: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&progress_delta) {
        return Err(Error::invalid(format!(
            "progress delta must be in [0, 1], got {progress_delta}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if !(threshold > 0.0) {
        return Err(Error::invalid(format!(
            "threshold must be greater than 0, got {threshold}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_degree(degree: usize) -> Result<()> {
    if degree < 1 {
        return Err(Error::invalid("degree must be at least 1"));
    }
    Ok(())
}
