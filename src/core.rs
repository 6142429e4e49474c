//! Consensus pipeline traits and the shared sample-consensus loop.
//!
//! Every robust method is the same loop wired with different components:
//! - an [`Estimator`] fitting candidate polynomials from minimal samples,
//! - a [`Sampler`] choosing those samples,
//! - a [`Scoring`] strategy ranking candidates,
//! - a [`TerminationCriterion`] shrinking the iteration budget,
//! - an optional [`LocalOptimizer`] refitting the winner on its inliers.
//!
//! [`SampleConsensus`] orchestrates them and reports progress through a
//! [`ConsensusObserver`].

use tracing::trace;

use crate::evaluations::PolynomialEvaluation;
use crate::scoring::Score;

pub use crate::optimisers::LocalOptimizer;

/// Number of sampling attempts per iteration before giving up on it.
const MAX_SAMPLE_ATTEMPTS: usize = 100;

/// Estimator responsible for generating model hypotheses from samples.
pub trait Estimator {
    /// Model type produced by this estimator.
    type Model: Clone;

    /// Size of a minimal sample for this estimator.
    fn sample_size(&self) -> usize;

    /// Check whether a given sample can produce a model.
    fn is_valid_sample(&self, data: &[PolynomialEvaluation], sample: &[usize]) -> bool;

    /// Estimate a candidate model from a minimal sample.
    fn estimate_model(&self, data: &[PolynomialEvaluation], sample: &[usize])
        -> Option<Self::Model>;

    /// Estimate a model from more than the minimal number of evaluations.
    ///
    /// `weights`, when given, is indexed by evaluation index (not by
    /// position in `sample`).
    fn estimate_model_nonminimal(
        &self,
        data: &[PolynomialEvaluation],
        sample: &[usize],
        weights: Option<&[f64]>,
    ) -> Option<Self::Model>;

    /// Non-negative residual of one evaluation against a model.
    fn residual(&self, evaluation: &PolynomialEvaluation, model: &Self::Model) -> f64;
}

/// Sampler responsible for drawing minimal samples.
pub trait Sampler {
    /// Draw `sample_size` distinct indices in `[0, point_number)` into `out_indices`.
    ///
    /// Returns `false` if a valid sample could not be drawn (caller may retry).
    fn sample(&mut self, point_number: usize, sample_size: usize, out_indices: &mut [usize])
        -> bool;
}

/// Scoring strategy used to evaluate model quality and determine inliers.
pub trait Scoring {
    /// Score residuals of every evaluation and collect the inlier indices.
    fn score(&self, residuals: &[f64], sample_size: usize, inliers_out: &mut Vec<usize>) -> Score;
}

/// Termination criterion deciding when the consensus loop can stop.
pub trait TerminationCriterion {
    /// Update the iteration budget after a new best score.
    ///
    /// Returns `true` if the loop should terminate immediately.
    fn check(
        &mut self,
        point_number: usize,
        best_score: &Score,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool;
}

/// Receives iteration and progress events from [`SampleConsensus::run`].
pub trait ConsensusObserver {
    /// Called after each iteration with the number of completed iterations.
    fn on_iteration(&mut self, _iteration: usize) {}

    /// Called after each iteration with the fraction of the current budget spent.
    fn on_progress(&mut self, _progress: f32) {}
}

/// Observer ignoring every event.
pub struct NoopObserver;

impl ConsensusObserver for NoopObserver {}

/// Standard RANSAC iteration budget.
///
/// The update rule follows the standard formula
/// `N = log(1 - confidence) / log(1 - inlier_ratio^sample_size)`.
/// The budget only ever shrinks.
pub struct RansacTerminationCriterion {
    /// Desired confidence in (0, 1).
    pub confidence: f64,
}

impl RansacTerminationCriterion {
    /// Iterations required for the given inlier ratio, if computable.
    pub fn required_iterations(&self, inlier_ratio: f64, sample_size: usize) -> Option<usize> {
        if inlier_ratio <= 0.0 {
            return None;
        }
        if inlier_ratio >= 1.0 {
            return Some(1);
        }

        let p_good_sample = inlier_ratio.powi(sample_size as i32);
        if p_good_sample <= 0.0 || p_good_sample >= 1.0 {
            return None;
        }

        let log_one_minus_conf = (1.0 - self.confidence).ln();
        let log_one_minus_p = (1.0 - p_good_sample).ln();
        if !log_one_minus_conf.is_finite() || !log_one_minus_p.is_finite() {
            return None;
        }

        Some((log_one_minus_conf / log_one_minus_p).ceil().max(1.0) as usize)
    }
}

impl TerminationCriterion for RansacTerminationCriterion {
    fn check(
        &mut self,
        point_number: usize,
        best_score: &Score,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        if point_number == 0 {
            return false;
        }

        let inlier_ratio = (best_score.support as f64 / point_number as f64).clamp(0.0, 1.0);
        if let Some(required) = self.required_iterations(inlier_ratio, sample_size) {
            if required < *max_iterations {
                *max_iterations = required;
            }
        }

        // The outer loop stops once the (possibly updated) budget is spent.
        false
    }
}

/// Budget of [`RansacTerminationCriterion`] plus an early exit once the
/// median residual of the best model drops to the stop threshold.
///
/// The budget follows [`Score::support`], which median scoring limits to
/// residuals within the stop threshold. Stopping early only happens on
/// the median test.
pub struct MedianTerminationCriterion {
    pub confidence: f64,
    pub stop_threshold: f64,
}

impl TerminationCriterion for MedianTerminationCriterion {
    fn check(
        &mut self,
        point_number: usize,
        best_score: &Score,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        let mut ransac = RansacTerminationCriterion {
            confidence: self.confidence,
        };
        ransac.check(point_number, best_score, sample_size, max_iterations);

        // Median scores hold the negated median of squared residuals.
        -best_score.value <= self.stop_threshold * self.stop_threshold
    }
}

/// Sample-consensus loop orchestrating the pipeline components.
pub struct SampleConsensus<E, Sa, Sc, T, LO>
where
    E: Estimator,
    Sa: Sampler,
    Sc: Scoring,
    T: TerminationCriterion,
    LO: LocalOptimizer<E::Model>,
{
    pub max_iterations: usize,
    pub estimator: E,
    pub sampler: Sa,
    pub scoring: Sc,
    pub final_optimizer: Option<LO>,
    pub termination: T,

    // Outputs / diagnostics
    pub best_model: Option<E::Model>,
    pub best_inliers: Vec<usize>,
    pub best_residuals: Vec<f64>,
    pub best_score: Option<Score>,
    pub iteration: usize,
}

impl<E, Sa, Sc, T, LO> SampleConsensus<E, Sa, Sc, T, LO>
where
    E: Estimator,
    Sa: Sampler,
    Sc: Scoring,
    T: TerminationCriterion,
    LO: LocalOptimizer<E::Model>,
{
    /// Create a new pipeline from its components.
    pub fn new(
        max_iterations: usize,
        estimator: E,
        sampler: Sa,
        scoring: Sc,
        final_optimizer: Option<LO>,
        termination: T,
    ) -> Self {
        Self {
            max_iterations,
            estimator,
            sampler,
            scoring,
            final_optimizer,
            termination,
            best_model: None,
            best_inliers: Vec::new(),
            best_residuals: Vec::new(),
            best_score: None,
            iteration: 0,
        }
    }

    /// Run the consensus loop over the given evaluations.
    ///
    /// On return `best_model` is `None` if no sample ever produced a model.
    /// Otherwise it holds the winning candidate, refitted by the final
    /// optimizer when one is configured and the winner has more inliers
    /// than a minimal sample.
    pub fn run(&mut self, data: &[PolynomialEvaluation], observer: &mut dyn ConsensusObserver) {
        let point_number = data.len();
        let sample_size = self.estimator.sample_size();
        let mut sample = vec![0usize; sample_size];
        let mut residuals = vec![0.0; point_number];
        let mut tmp_inliers = Vec::new();

        let mut max_iterations = self.max_iterations;

        self.best_inliers.clear();
        self.best_residuals.clear();
        self.best_model = None;
        self.best_score = None;
        self.iteration = 0;

        if sample_size == 0 || point_number < sample_size {
            return;
        }

        while self.iteration < max_iterations {
            let mut candidate: Option<E::Model> = None;

            for _ in 0..MAX_SAMPLE_ATTEMPTS {
                if !self.sampler.sample(point_number, sample_size, &mut sample)
                    || !self.estimator.is_valid_sample(data, &sample)
                {
                    continue;
                }

                candidate = self.estimator.estimate_model(data, &sample);
                if candidate.is_some() {
                    break;
                }
            }

            let mut should_terminate = false;

            if let Some(model) = candidate {
                for (residual, evaluation) in residuals.iter_mut().zip(data) {
                    *residual = self.estimator.residual(evaluation, &model);
                }

                let score = self.scoring.score(&residuals, sample_size, &mut tmp_inliers);

                let better = match &self.best_score {
                    None => true,
                    Some(best) => score > *best,
                };

                if better {
                    trace!(
                        iteration = self.iteration,
                        inliers = score.inlier_count,
                        score = score.value,
                        "consensus.best_model"
                    );
                    self.best_score = Some(score);
                    self.best_model = Some(model);
                    self.best_inliers.clone_from(&tmp_inliers);
                    self.best_residuals.clone_from(&residuals);

                    let previous = max_iterations;
                    should_terminate = self.termination.check(
                        point_number,
                        &score,
                        sample_size,
                        &mut max_iterations,
                    );
                    if max_iterations < previous {
                        trace!(from = previous, to = max_iterations, "consensus.budget_shrunk");
                    }
                }
            }

            self.iteration += 1;
            observer.on_iteration(self.iteration);
            observer.on_progress((self.iteration as f32 / max_iterations as f32).min(1.0));

            if should_terminate {
                break;
            }
        }

        // Optional final optimization step once iterations are done.
        if let (Some(final_opt), Some(best_model), Some(best_score)) = (
            &mut self.final_optimizer,
            &self.best_model,
            &self.best_score,
        ) {
            if self.best_inliers.len() > sample_size {
                let refined = final_opt.run(
                    data,
                    &self.best_inliers,
                    &self.best_residuals,
                    best_model,
                    best_score,
                );
                self.best_model = Some(refined);
            }
        }
    }
}
