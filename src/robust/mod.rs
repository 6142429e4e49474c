//! Robust polynomial estimators.
//!
//! Five interchangeable strategies share one sample-consensus skeleton
//! ([`crate::core::SampleConsensus`]) and differ in scoring, termination
//! and sampling:
//!
//! | Method  | Scoring                  | Sampling              | Final refit |
//! |---------|--------------------------|-----------------------|-------------|
//! | RANSAC  | inlier count             | uniform               | inliers     |
//! | MSAC    | truncated squared loss   | uniform               | inliers     |
//! | LMedS   | median squared residual  | uniform               | weighted    |
//! | PROSAC  | inlier count             | quality ordered       | inliers     |
//! | PROMedS | median squared residual  | quality ordered       | weighted    |
//!
//! Every strategy implements [`PolynomialRobustEstimator`]; [`create`] and
//! [`create_with`] pick one from a [`RobustEstimatorMethod`].

pub mod lmeds;
pub mod msac;
pub mod promeds;
pub mod prosac;
pub mod ransac;

pub use lmeds::LmedsPolynomialRobustEstimator;
pub use msac::MsacPolynomialRobustEstimator;
pub use promeds::PromedsPolynomialRobustEstimator;
pub use prosac::ProsacPolynomialRobustEstimator;
pub use ransac::RansacPolynomialRobustEstimator;

use tracing::debug;

use crate::core::{ConsensusObserver, SampleConsensus, Sampler, Scoring, TerminationCriterion};
use crate::error::{Error, Result};
use crate::estimators::{check_evaluation_count, SamplePolynomialEstimator};
use crate::evaluations::{DistanceMetric, PolynomialEvaluation};
use crate::models::Polynomial;
use crate::optimisers::{FinalRefit, LeastSquaresOptimizer, WeightedLeastSquaresOptimizer};
use crate::settings::{
    validate_confidence, validate_degree, validate_max_iterations, validate_progress_delta,
    RobustEstimatorMethod, RobustEstimatorSettings, DEFAULT_DEGREE,
};

/// Notified of the progress of a robust estimation.
///
/// Every callback runs while the estimator is locked.
pub trait PolynomialRobustEstimatorListener {
    fn on_estimate_start(&mut self, _estimator: &dyn PolynomialRobustEstimator) {}

    /// Only called when the estimation succeeded.
    fn on_estimate_end(&mut self, _estimator: &dyn PolynomialRobustEstimator) {}

    /// `iteration` counts the completed iterations, starting at 1.
    fn on_estimate_next_iteration(
        &mut self,
        _estimator: &dyn PolynomialRobustEstimator,
        _iteration: usize,
    ) {
    }

    /// Called once progress moved by at least the configured progress delta.
    fn on_estimate_progress_change(
        &mut self,
        _estimator: &dyn PolynomialRobustEstimator,
        _progress: f32,
    ) {
    }
}

/// Inlier flags and residuals of the best consensus model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InliersData {
    /// Per-evaluation inlier flags; empty unless inliers are kept.
    pub inliers: Vec<bool>,
    /// Per-evaluation residuals; empty unless residuals are kept.
    pub residuals: Vec<f64>,
    pub num_inliers: usize,
    pub iterations: usize,
}

impl InliersData {
    /// Indices of the evaluations flagged as inliers.
    pub fn inlier_indices(&self) -> Vec<usize> {
        self.inliers
            .iter()
            .enumerate()
            .filter_map(|(i, &inlier)| inlier.then_some(i))
            .collect()
    }
}

/// State shared by every robust estimator.
pub struct RobustEstimatorBase {
    pub(crate) degree: usize,
    pub(crate) evaluations: Option<Vec<PolynomialEvaluation>>,
    pub(crate) listener: Option<Box<dyn PolynomialRobustEstimatorListener>>,
    pub(crate) settings: RobustEstimatorSettings,
    pub(crate) locked: bool,
    pub(crate) inliers_data: Option<InliersData>,
}

impl Default for RobustEstimatorBase {
    fn default() -> Self {
        Self {
            degree: DEFAULT_DEGREE,
            evaluations: None,
            listener: None,
            settings: RobustEstimatorSettings::default(),
            locked: false,
            inliers_data: None,
        }
    }
}

impl RobustEstimatorBase {
    pub(crate) fn with_degree(degree: usize) -> Result<Self> {
        validate_degree(degree)?;
        Ok(Self {
            degree,
            ..Default::default()
        })
    }

    pub(crate) fn with_evaluations(
        degree: usize,
        evaluations: Vec<PolynomialEvaluation>,
    ) -> Result<Self> {
        let mut base = Self::with_degree(degree)?;
        check_evaluation_count(evaluations.len(), degree)?;
        base.evaluations = Some(evaluations);
        Ok(base)
    }

    pub(crate) fn check_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(Error::Locked);
        }
        Ok(())
    }
}

pub(crate) fn check_quality_scores(
    quality_scores: &[f64],
    evaluations: Option<&[PolynomialEvaluation]>,
    degree: usize,
) -> Result<()> {
    match evaluations {
        Some(evaluations) if quality_scores.len() != evaluations.len() => {
            Err(Error::invalid(format!(
                "expected {} quality scores, got {}",
                evaluations.len(),
                quality_scores.len()
            )))
        }
        _ if quality_scores.len() < degree + 1 => Err(Error::invalid(format!(
            "at least {} quality scores are required for degree {degree}, got {}",
            degree + 1,
            quality_scores.len()
        ))),
        _ => Ok(()),
    }
}

/// Outlier-resistant polynomial estimator.
pub trait PolynomialRobustEstimator {
    fn base(&self) -> &RobustEstimatorBase;

    fn base_mut(&mut self) -> &mut RobustEstimatorBase;

    fn method(&self) -> RobustEstimatorMethod;

    /// Inlier threshold, or the stop threshold for median based methods.
    fn threshold(&self) -> f64;

    /// Must be greater than zero.
    fn set_threshold(&mut self, threshold: f64) -> Result<()>;

    /// Run the consensus search and return the best polynomial.
    ///
    /// Fails with [`Error::Locked`] while another estimation runs,
    /// [`Error::NotReady`] when the configuration is incomplete and
    /// [`Error::RobustEstimation`] when no consensus model was found.
    fn estimate(&mut self) -> Result<Polynomial>;

    fn degree(&self) -> usize {
        self.base().degree
    }

    fn set_degree(&mut self, degree: usize) -> Result<()> {
        self.base().check_unlocked()?;
        validate_degree(degree)?;
        self.base_mut().degree = degree;
        Ok(())
    }

    fn evaluations(&self) -> Option<&[PolynomialEvaluation]> {
        self.base().evaluations.as_deref()
    }

    /// Requires at least `degree + 1` evaluations.
    fn set_evaluations(&mut self, evaluations: Vec<PolynomialEvaluation>) -> Result<()> {
        self.base().check_unlocked()?;
        check_evaluation_count(evaluations.len(), self.degree())?;
        self.base_mut().evaluations = Some(evaluations);
        Ok(())
    }

    /// Set both at once so a higher degree can be paired with more evaluations.
    fn set_degree_and_evaluations(
        &mut self,
        degree: usize,
        evaluations: Vec<PolynomialEvaluation>,
    ) -> Result<()> {
        self.base().check_unlocked()?;
        validate_degree(degree)?;
        check_evaluation_count(evaluations.len(), degree)?;
        let base = self.base_mut();
        base.degree = degree;
        base.evaluations = Some(evaluations);
        Ok(())
    }

    fn listener(&self) -> Option<&dyn PolynomialRobustEstimatorListener> {
        self.base().listener.as_deref()
    }

    fn set_listener(
        &mut self,
        listener: Option<Box<dyn PolynomialRobustEstimatorListener>>,
    ) -> Result<()> {
        self.base().check_unlocked()?;
        self.base_mut().listener = listener;
        Ok(())
    }

    fn settings(&self) -> &RobustEstimatorSettings {
        &self.base().settings
    }

    /// Replace every tunable at once; nothing changes if any is invalid.
    fn set_settings(&mut self, settings: RobustEstimatorSettings) -> Result<()> {
        self.base().check_unlocked()?;
        settings.validate()?;
        self.base_mut().settings = settings;
        Ok(())
    }

    fn confidence(&self) -> f64 {
        self.settings().confidence
    }

    fn set_confidence(&mut self, confidence: f64) -> Result<()> {
        self.base().check_unlocked()?;
        validate_confidence(confidence)?;
        self.base_mut().settings.confidence = confidence;
        Ok(())
    }

    fn max_iterations(&self) -> usize {
        self.settings().max_iterations
    }

    fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        self.base().check_unlocked()?;
        validate_max_iterations(max_iterations)?;
        self.base_mut().settings.max_iterations = max_iterations;
        Ok(())
    }

    fn progress_delta(&self) -> f32 {
        self.settings().progress_delta
    }

    fn set_progress_delta(&mut self, progress_delta: f32) -> Result<()> {
        self.base().check_unlocked()?;
        validate_progress_delta(progress_delta)?;
        self.base_mut().settings.progress_delta = progress_delta;
        Ok(())
    }

    fn is_geometric_distance_used(&self) -> bool {
        self.settings().use_geometric_distance
    }

    fn set_geometric_distance_used(&mut self, used: bool) -> Result<()> {
        self.base().check_unlocked()?;
        self.base_mut().settings.use_geometric_distance = used;
        Ok(())
    }

    fn is_result_refined(&self) -> bool {
        self.settings().refine_result
    }

    fn set_result_refined(&mut self, refine: bool) -> Result<()> {
        self.base().check_unlocked()?;
        self.base_mut().settings.refine_result = refine;
        Ok(())
    }

    fn is_compute_and_keep_inliers_enabled(&self) -> bool {
        self.settings().compute_and_keep_inliers
    }

    fn set_compute_and_keep_inliers_enabled(&mut self, enabled: bool) -> Result<()> {
        self.base().check_unlocked()?;
        self.base_mut().settings.compute_and_keep_inliers = enabled;
        Ok(())
    }

    fn is_compute_and_keep_residuals_enabled(&self) -> bool {
        self.settings().compute_and_keep_residuals
    }

    fn set_compute_and_keep_residuals_enabled(&mut self, enabled: bool) -> Result<()> {
        self.base().check_unlocked()?;
        self.base_mut().settings.compute_and_keep_residuals = enabled;
        Ok(())
    }

    fn seed(&self) -> Option<u64> {
        self.settings().seed
    }

    fn set_seed(&mut self, seed: Option<u64>) -> Result<()> {
        self.base().check_unlocked()?;
        self.base_mut().settings.seed = seed;
        Ok(())
    }

    /// Per-evaluation sampling priorities; `None` for uniformly sampling methods.
    fn quality_scores(&self) -> Option<&[f64]> {
        None
    }

    /// Validated like the quality ordered methods, then discarded: uniformly
    /// sampling methods keep no scores and [`Self::quality_scores`] stays
    /// `None` for them.
    fn set_quality_scores(&mut self, quality_scores: Vec<f64>) -> Result<()> {
        self.base().check_unlocked()?;
        check_quality_scores(&quality_scores, self.evaluations(), self.degree())
    }

    fn is_locked(&self) -> bool {
        self.base().locked
    }

    /// Always `degree + 1`.
    fn min_number_of_evaluations(&self) -> usize {
        self.degree() + 1
    }

    fn is_ready(&self) -> bool {
        self.evaluations()
            .is_some_and(|e| e.len() >= self.min_number_of_evaluations())
    }

    /// Inliers of the last successful estimation, when keeping inliers or
    /// residuals is enabled.
    fn inliers_data(&self) -> Option<&InliersData> {
        self.base().inliers_data.as_ref()
    }
}

/// Final refit applied to the winning consensus model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Refit {
    /// Least squares over the inliers.
    Inliers,
    /// Least squares over the inliers weighted by their residuals.
    Weighted,
}

/// Components a robust method plugs into the consensus skeleton.
pub(crate) struct Strategy<Sa, Sc, T> {
    pub sampler: Sa,
    pub scoring: Sc,
    pub termination: T,
    pub refit: Refit,
}

/// Forwards consensus events to the robust listener.
struct ListenerObserver<'a> {
    estimator: &'a dyn PolynomialRobustEstimator,
    listener: Option<&'a mut Box<dyn PolynomialRobustEstimatorListener>>,
    progress_delta: f32,
    last_progress: f32,
}

impl ConsensusObserver for ListenerObserver<'_> {
    fn on_iteration(&mut self, iteration: usize) {
        if let Some(listener) = self.listener.as_mut() {
            listener.on_estimate_next_iteration(self.estimator, iteration);
        }
    }

    fn on_progress(&mut self, progress: f32) {
        if (progress - self.last_progress).abs() < self.progress_delta {
            return;
        }
        self.last_progress = progress;
        if let Some(listener) = self.listener.as_mut() {
            listener.on_estimate_progress_change(self.estimator, progress);
        }
    }
}

/// Lock `this`, run the consensus skeleton with the components `build`
/// returns and unlock, storing the inliers data on success.
pub(crate) fn run_consensus<R, Sa, Sc, T, F>(this: &mut R, build: F) -> Result<Polynomial>
where
    R: PolynomialRobustEstimator,
    Sa: Sampler,
    Sc: Scoring,
    T: TerminationCriterion,
    F: FnOnce(&R) -> Strategy<Sa, Sc, T>,
{
    this.base().check_unlocked()?;
    if !this.is_ready() {
        return Err(Error::NotReady(format!(
            "at least {} evaluations (and matching quality scores, if used) are required",
            this.min_number_of_evaluations()
        )));
    }

    let strategy = build(&*this);
    let settings = this.settings().clone();
    let metric = DistanceMetric::from_geometric_flag(settings.use_geometric_distance);
    let estimator = SamplePolynomialEstimator::new(this.degree(), metric);
    let final_optimizer = settings.refine_result.then(|| match strategy.refit {
        Refit::Inliers => FinalRefit::Unweighted(LeastSquaresOptimizer::new(estimator)),
        Refit::Weighted => FinalRefit::Weighted(WeightedLeastSquaresOptimizer::new(estimator)),
    });
    let mut pipeline = SampleConsensus::new(
        settings.max_iterations,
        estimator,
        strategy.sampler,
        strategy.scoring,
        final_optimizer,
        strategy.termination,
    );

    this.base_mut().locked = true;
    this.base_mut().inliers_data = None;
    let mut listener = this.base_mut().listener.take();

    let view: &dyn PolynomialRobustEstimator = &*this;
    let method = view.method();
    let data = view.evaluations().unwrap_or_default();
    debug!(
        method = ?method,
        evaluations = data.len(),
        degree = view.degree(),
        max_iterations = settings.max_iterations,
        "robust.estimate_start"
    );

    if let Some(l) = listener.as_mut() {
        l.on_estimate_start(view);
    }

    let mut observer = ListenerObserver {
        estimator: view,
        listener: listener.as_mut(),
        progress_delta: settings.progress_delta,
        last_progress: 0.0,
    };
    pipeline.run(data, &mut observer);

    let sample_size = view.min_number_of_evaluations();
    let result = match pipeline.best_model.take() {
        Some(model) if pipeline.best_inliers.len() >= sample_size => Ok(model),
        _ => Err(Error::RobustEstimation(format!(
            "no consensus model found after {} iterations",
            pipeline.iteration
        ))),
    };

    let inliers_data = match &result {
        Ok(_) => {
            debug!(
                method = ?method,
                iterations = pipeline.iteration,
                inliers = pipeline.best_inliers.len(),
                "robust.estimate_finished"
            );
            if let Some(l) = listener.as_mut() {
                l.on_estimate_end(view);
            }
            keep_inliers_data(
                &settings,
                data.len(),
                &pipeline.best_inliers,
                &pipeline.best_residuals,
                pipeline.iteration,
            )
        }
        Err(_) => {
            debug!(method = ?method, iterations = pipeline.iteration, "robust.estimate_failed");
            None
        }
    };

    let base = this.base_mut();
    base.listener = listener;
    base.locked = false;
    base.inliers_data = inliers_data;
    result
}

fn keep_inliers_data(
    settings: &RobustEstimatorSettings,
    point_number: usize,
    inliers: &[usize],
    residuals: &[f64],
    iterations: usize,
) -> Option<InliersData> {
    if !settings.compute_and_keep_inliers && !settings.compute_and_keep_residuals {
        return None;
    }

    let mut data = InliersData {
        num_inliers: inliers.len(),
        iterations,
        ..Default::default()
    };
    if settings.compute_and_keep_inliers {
        data.inliers = vec![false; point_number];
        for &i in inliers {
            data.inliers[i] = true;
        }
    }
    if settings.compute_and_keep_residuals {
        data.residuals = residuals.to_vec();
    }
    Some(data)
}

/// Robust estimator of the given method with default configuration.
pub fn create(method: RobustEstimatorMethod) -> Box<dyn PolynomialRobustEstimator> {
    match method {
        RobustEstimatorMethod::Ransac => Box::new(RansacPolynomialRobustEstimator::new()),
        RobustEstimatorMethod::Lmeds => Box::new(LmedsPolynomialRobustEstimator::new()),
        RobustEstimatorMethod::Msac => Box::new(MsacPolynomialRobustEstimator::new()),
        RobustEstimatorMethod::Prosac => Box::new(ProsacPolynomialRobustEstimator::new()),
        RobustEstimatorMethod::Promeds => Box::new(PromedsPolynomialRobustEstimator::new()),
    }
}

/// Robust estimator of the given method, validated like the constructors.
///
/// PROSAC and PROMedS given evaluations also need quality scores of the
/// same length. Quality scores are ignored by the other methods.
pub fn create_with(
    degree: usize,
    evaluations: Option<Vec<PolynomialEvaluation>>,
    listener: Option<Box<dyn PolynomialRobustEstimatorListener>>,
    quality_scores: Option<Vec<f64>>,
    method: RobustEstimatorMethod,
) -> Result<Box<dyn PolynomialRobustEstimator>> {
    validate_degree(degree)?;
    if let Some(evaluations) = &evaluations {
        check_evaluation_count(evaluations.len(), degree)?;
    }
    if method.requires_quality_scores() {
        match &quality_scores {
            Some(scores) => check_quality_scores(scores, evaluations.as_deref(), degree)?,
            None if evaluations.is_some() => {
                return Err(Error::invalid(format!(
                    "{method:?} requires quality scores matching the evaluations"
                )))
            }
            None => {}
        }
    }

    let mut estimator = create(method);
    if let Some(evaluations) = evaluations {
        estimator.set_degree_and_evaluations(degree, evaluations)?;
    } else {
        estimator.set_degree(degree)?;
    }
    if let (true, Some(scores)) = (method.requires_quality_scores(), quality_scores) {
        estimator.set_quality_scores(scores)?;
    }
    estimator.set_listener(listener)?;
    Ok(estimator)
}
