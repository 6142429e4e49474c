use crate::evaluations::PolynomialEvaluation;
use crate::scoring::Score;

/// Final optimization strategy refining the best consensus model.
///
/// After the consensus loop settles on a model, the optimizer may re-estimate
/// it from all of its inliers.
///
/// ## Example: custom refinement
///
/// ```rust
/// use polyinlier::evaluations::PolynomialEvaluation;
/// use polyinlier::optimisers::LocalOptimizer;
/// use polyinlier::scoring::Score;
///
/// /// Keeps the consensus model untouched.
/// struct KeepOptimizer;
///
/// impl<M: Clone> LocalOptimizer<M> for KeepOptimizer {
///     fn run(
///         &mut self,
///         _data: &[PolynomialEvaluation],
///         _inliers: &[usize],
///         _residuals: &[f64],
///         model: &M,
///         _score: &Score,
///     ) -> M {
///         model.clone()
///     }
/// }
/// ```
pub trait LocalOptimizer<M> {
    /// Refine `model` given its inlier indices and the residuals of every evaluation.
    ///
    /// Implementations fall back to a clone of `model` when refinement fails.
    fn run(
        &mut self,
        data: &[PolynomialEvaluation],
        inliers: &[usize],
        residuals: &[f64],
        model: &M,
        score: &Score,
    ) -> M;
}

/// Local optimizer stub used when no refinement is desired.
pub struct NoopLocalOptimizer;

impl<M: Clone> LocalOptimizer<M> for NoopLocalOptimizer {
    fn run(
        &mut self,
        _data: &[PolynomialEvaluation],
        _inliers: &[usize],
        _residuals: &[f64],
        model: &M,
        _score: &Score,
    ) -> M {
        model.clone()
    }
}

pub mod local;

pub use local::{FinalRefit, LeastSquaresOptimizer, WeightedLeastSquaresOptimizer};
