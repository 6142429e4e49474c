//! Scoring strategies for the consensus loop.
//!
//! Each strategy turns the residuals of every evaluation against a candidate
//! polynomial into a [`Score`] and the list of inlier indices. Larger scores
//! are better; cost-based strategies store their cost negated.

use std::cmp::Ordering;

use crate::core::Scoring;
use crate::utils::median;

/// Normalisation making the median absolute residual a consistent estimate
/// of the Gaussian standard deviation.
const MEDIAN_SCALE: f64 = 1.4826;
/// Multiple of the robust scale below which a residual is an inlier.
const MEDIAN_INLIER_FACTOR: f64 = 2.5;

/// Quality of a candidate model.
///
/// Candidates compare on `value` alone; equal values are not an
/// improvement, so the earliest candidate wins ties.
#[derive(Debug, Clone, Copy)]
pub struct Score {
    pub inlier_count: usize,
    pub value: f64,
    /// Residual threshold that separated inliers from outliers.
    pub inlier_threshold: f64,
    /// Evaluations the iteration budget is sized from. Same as
    /// `inlier_count` unless the scoring says otherwise.
    pub support: usize,
}

impl Score {
    pub fn new(inlier_count: usize, value: f64, inlier_threshold: f64) -> Self {
        Self {
            inlier_count,
            value,
            inlier_threshold,
            support: inlier_count,
        }
    }

    pub fn with_support(mut self, support: usize) -> Self {
        self.support = support;
        self
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

fn collect_inliers(residuals: &[f64], threshold: f64, inliers_out: &mut Vec<usize>) {
    inliers_out.clear();
    inliers_out.extend(
        residuals
            .iter()
            .enumerate()
            .filter(|(_, r)| **r <= threshold)
            .map(|(i, _)| i),
    );
}

/// RANSAC-style scoring: the number of residuals within the threshold.
#[derive(Debug, Clone, Copy)]
pub struct RansacInlierCountScoring {
    threshold: f64,
}

impl RansacInlierCountScoring {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Scoring for RansacInlierCountScoring {
    fn score(&self, residuals: &[f64], _sample_size: usize, inliers_out: &mut Vec<usize>) -> Score {
        collect_inliers(residuals, self.threshold, inliers_out);
        let inlier_count = inliers_out.len();
        Score::new(inlier_count, inlier_count as f64, self.threshold)
    }
}

/// MSAC scoring: truncated quadratic loss `sum(min(r^2, t^2))`.
#[derive(Debug, Clone, Copy)]
pub struct MsacScoring {
    threshold: f64,
}

impl MsacScoring {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Scoring for MsacScoring {
    fn score(&self, residuals: &[f64], _sample_size: usize, inliers_out: &mut Vec<usize>) -> Score {
        let threshold_sq = self.threshold * self.threshold;
        let loss: f64 = residuals.iter().map(|r| (r * r).min(threshold_sq)).sum();
        collect_inliers(residuals, self.threshold, inliers_out);
        Score::new(inliers_out.len(), -loss, self.threshold)
    }
}

/// Least-median-of-squares scoring.
///
/// The score is the negated median of squared residuals. Inliers are the
/// residuals within `2.5` robust standard deviations derived from that
/// median, never below the stop threshold.
///
/// Only residuals within the stop threshold count as [`Score::support`].
/// The derived threshold of a model through an outlier covers almost every
/// evaluation.
#[derive(Debug, Clone, Copy)]
pub struct MedianScoring {
    stop_threshold: f64,
}

impl MedianScoring {
    pub fn new(stop_threshold: f64) -> Self {
        Self { stop_threshold }
    }

    /// Robust inlier threshold for a median of squared residuals.
    pub fn inlier_threshold(&self, median_sq: f64, point_number: usize, sample_size: usize) -> f64 {
        let dof = point_number.saturating_sub(sample_size).max(1) as f64;
        let sigma = MEDIAN_SCALE * (1.0 + 5.0 / dof) * median_sq.sqrt();
        (MEDIAN_INLIER_FACTOR * sigma).max(self.stop_threshold)
    }
}

impl Scoring for MedianScoring {
    fn score(&self, residuals: &[f64], sample_size: usize, inliers_out: &mut Vec<usize>) -> Score {
        let squared: Vec<f64> = residuals.iter().map(|r| r * r).collect();
        let Some(median_sq) = median(&squared) else {
            inliers_out.clear();
            return Score::new(0, f64::NEG_INFINITY, self.stop_threshold);
        };
        let threshold = self.inlier_threshold(median_sq, residuals.len(), sample_size);
        collect_inliers(residuals, threshold, inliers_out);
        let support = residuals.iter().filter(|r| **r <= self.stop_threshold).count();
        Score::new(inliers_out.len(), -median_sq, threshold).with_support(support)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn ransac_inlier_count_scoring_counts_correctly() {
        let residuals = [0.1, 0.4, 0.6, 1.0, 0.3];
        let scoring = RansacInlierCountScoring::new(0.5);
        let mut inliers = Vec::new();
        let s = scoring.score(&residuals, 2, &mut inliers);

        assert_eq!(s.inlier_count, 3);
        assert_eq!(s.value, 3.0);
        assert_eq!(inliers, vec![0, 1, 4]);
        assert_eq!(s.support, 3);
    }

    #[test]
    fn msac_truncates_outlier_cost() {
        let scoring = MsacScoring::new(1.0);
        let mut inliers = Vec::new();
        let s = scoring.score(&[0.5, 0.0, 10.0], 2, &mut inliers);
        assert_abs_diff_eq!(s.value, -(0.25 + 1.0), epsilon = 1e-12);
        assert_eq!(inliers, vec![0, 1]);

        // a tighter fit scores higher
        let better = scoring.score(&[0.1, 0.0, 10.0], 2, &mut inliers);
        assert!(better > s);
    }

    #[test]
    fn median_scoring_derives_threshold() {
        let scoring = MedianScoring::new(1e-6);
        let mut inliers = Vec::new();
        let residuals = [1.0, 1.0, 1.0, 1.0, 100.0, 1.0, 200.0];
        let s = scoring.score(&residuals, 2, &mut inliers);
        assert_abs_diff_eq!(s.value, -1.0, epsilon = 1e-12);
        // sigma = 1.4826 * (1 + 5 / 5) * 1
        assert_abs_diff_eq!(s.inlier_threshold, 2.5 * 1.4826 * 2.0, epsilon = 1e-12);
        assert_eq!(inliers, vec![0, 1, 2, 3, 5]);
        assert_eq!(s.support, 0);
    }

    #[test]
    fn wide_median_threshold_does_not_count_as_support() {
        // a line through an outlier: half the residuals are huge, so the
        // derived threshold swallows every evaluation
        let scoring = MedianScoring::new(1e-6);
        let mut inliers = Vec::new();
        let residuals = [0.0, 0.0, 40.0, 55.0, 60.0, 70.0, 80.0];
        let s = scoring.score(&residuals, 2, &mut inliers);
        assert_eq!(s.inlier_count, 7);
        assert_eq!(s.support, 2);
    }

    #[test]
    fn median_threshold_never_below_stop_threshold() {
        let scoring = MedianScoring::new(1e-3);
        assert_eq!(scoring.inlier_threshold(0.0, 10, 2), 1e-3);
        assert_eq!(scoring.inlier_threshold(0.0, 2, 2), 1e-3);
    }

    #[test]
    fn ties_are_not_improvements() {
        let a = Score::new(3, 3.0, 0.1);
        let b = Score::new(3, 3.0, 0.2);
        assert!(!(b > a));
        assert!(a == b);
    }

    #[test]
    fn nan_scores_never_win() {
        let a = Score::new(3, 3.0, 0.1);
        let nan = Score::new(0, f64::NAN, 0.1);
        assert!(!(nan > a));
    }
}
