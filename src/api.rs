//! High-level Rust API for robust polynomial fitting.
//!
//! One call configures the requested robust estimator, runs it and collects
//! the inliers of the result.

use crate::error::Result;
use crate::evaluations::PolynomialEvaluation;
use crate::models::Polynomial;
use crate::robust::create_with;
use crate::settings::{RobustEstimatorMethod, RobustEstimatorSettings};

/// Result of a robust polynomial estimation.
#[derive(Debug, Clone)]
pub struct EstimationResult {
    /// The estimated polynomial.
    pub polynomial: Polynomial,
    /// Indices of the evaluations agreeing with the best consensus model.
    pub inliers: Vec<usize>,
    /// Number of iterations performed.
    pub iterations: usize,
}

/// Fit a polynomial of `degree` to `evaluations` with a robust method.
///
/// # Arguments
/// * `evaluations` - Observations of the unknown polynomial
/// * `degree` - Polynomial degree, at least 1
/// * `method` - Robust method; PROSAC and PROMedS need `quality_scores`
/// * `threshold` - Inlier (or stop) threshold; method default if None
/// * `quality_scores` - Per-evaluation sampling priorities, higher first
/// * `settings` - Optional estimator settings (uses defaults if None)
///
/// # Returns
/// `EstimationResult` containing the polynomial, inlier indices and iterations.
pub fn estimate_polynomial(
    evaluations: Vec<PolynomialEvaluation>,
    degree: usize,
    method: RobustEstimatorMethod,
    threshold: Option<f64>,
    quality_scores: Option<Vec<f64>>,
    settings: Option<RobustEstimatorSettings>,
) -> Result<EstimationResult> {
    let mut estimator = create_with(degree, Some(evaluations), None, quality_scores, method)?;

    let mut settings = settings.unwrap_or_default();
    settings.compute_and_keep_inliers = true;
    estimator.set_settings(settings)?;
    if let Some(threshold) = threshold {
        estimator.set_threshold(threshold)?;
    }

    let polynomial = estimator.estimate()?;
    let (inliers, iterations) = estimator
        .inliers_data()
        .map(|data| (data.inlier_indices(), data.iterations))
        .unwrap_or_default();

    Ok(EstimationResult {
        polynomial,
        inliers,
        iterations,
    })
}
