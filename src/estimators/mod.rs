//! Linear polynomial estimators.
//!
//! This module contains the estimators that turn a set of evaluations into a
//! polynomial by solving one least-squares system:
//! - Unweighted least mean squared error ([`LmsePolynomialEstimator`])
//! - Weighted least squares with weight sorting ([`WeightedPolynomialEstimator`])
//! - The minimal-sample estimator used inside the consensus loop
//!   ([`SamplePolynomialEstimator`])
//!
//! Every configurable estimator implements [`PolynomialEstimator`], which
//! carries the shared degree/evaluations/listener state and the locking
//! discipline around `estimate()`.

pub mod lmse;
pub mod sample;
pub mod weighted;

pub use lmse::LmsePolynomialEstimator;
pub use sample::SamplePolynomialEstimator;
pub use weighted::WeightedPolynomialEstimator;

use nalgebra::SVD;
use tracing::debug;

use crate::error::{Error, Result};
use crate::evaluations::PolynomialEvaluation;
use crate::models::Polynomial;
use crate::settings::{validate_degree, PolynomialEstimatorType, DEFAULT_DEGREE};
use crate::types::{CoefficientVector, DesignMatrix};

/// Notified when a linear estimator starts and finishes an estimation.
///
/// Both callbacks run while the estimator is locked.
pub trait PolynomialEstimatorListener {
    fn on_estimate_start(&mut self, _estimator: &dyn PolynomialEstimator) {}

    /// Only called when the estimation succeeded.
    fn on_estimate_end(&mut self, _estimator: &dyn PolynomialEstimator) {}
}

/// State shared by every linear estimator.
pub struct LinearEstimatorBase {
    pub(crate) degree: usize,
    pub(crate) evaluations: Option<Vec<PolynomialEvaluation>>,
    pub(crate) listener: Option<Box<dyn PolynomialEstimatorListener>>,
    pub(crate) locked: bool,
}

impl Default for LinearEstimatorBase {
    fn default() -> Self {
        Self {
            degree: DEFAULT_DEGREE,
            evaluations: None,
            listener: None,
            locked: false,
        }
    }
}

impl LinearEstimatorBase {
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

pub(crate) fn check_evaluation_count(count: usize, degree: usize) -> Result<()> {
    if count < degree + 1 {
        return Err(Error::invalid(format!(
            "at least {} evaluations are required for degree {degree}, got {count}",
            degree + 1
        )));
    }
    Ok(())
}

/// Linear (non-robust) polynomial estimator.
pub trait PolynomialEstimator {
    fn base(&self) -> &LinearEstimatorBase;

    fn base_mut(&mut self) -> &mut LinearEstimatorBase;

    fn estimator_type(&self) -> PolynomialEstimatorType;

    /// Solve for the polynomial best matching the configured evaluations.
    ///
    /// Fails with [`Error::Locked`] while another estimation runs,
    /// [`Error::NotReady`] when the configuration is incomplete and
    /// [`Error::Singular`] when the evaluations do not determine the
    /// polynomial.
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

    fn listener(&self) -> Option<&dyn PolynomialEstimatorListener> {
        self.base().listener.as_deref()
    }

    fn set_listener(&mut self, listener: Option<Box<dyn PolynomialEstimatorListener>>) -> Result<()> {
        self.base().check_unlocked()?;
        self.base_mut().listener = listener;
        Ok(())
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
}

/// Lock `estimator`, bracket `solve` with the listener callbacks and unlock.
pub(crate) fn run_estimate<E, F>(estimator: &mut E, solve: F) -> Result<Polynomial>
where
    E: PolynomialEstimator,
    F: FnOnce(&E) -> Result<Polynomial>,
{
    estimator.base().check_unlocked()?;
    if !estimator.is_ready() {
        return Err(Error::NotReady(format!(
            "at least {} evaluations (and matching weights, if any) are required",
            estimator.min_number_of_evaluations()
        )));
    }

    estimator.base_mut().locked = true;
    let mut listener = estimator.base_mut().listener.take();

    if let Some(l) = listener.as_mut() {
        l.on_estimate_start(&*estimator);
    }

    let result = solve(&*estimator);

    if let (Ok(_), Some(l)) = (&result, listener.as_mut()) {
        l.on_estimate_end(&*estimator);
    }

    let base = estimator.base_mut();
    base.listener = listener;
    base.locked = false;
    result
}

/// Solve the least-squares system built from `(evaluation, weight)` pairs.
///
/// Every linear row and its right-hand side are multiplied by the weight.
/// The system is solved through an SVD; a numerically rank-deficient design
/// matrix yields [`Error::Singular`].
pub fn fit_polynomial<'a, I>(rows: I, degree: usize) -> Result<Polynomial>
where
    I: IntoIterator<Item = (&'a PolynomialEvaluation, f64)>,
{
    let unknowns = degree + 1;
    let rows: Vec<_> = rows
        .into_iter()
        .map(|(evaluation, weight)| (evaluation.linear_row(degree), weight))
        .collect();
    let n = rows.len();

    if n < unknowns {
        return Err(Error::Singular { rows: n, unknowns });
    }

    let mut a = DesignMatrix::zeros(n, unknowns);
    let mut b = CoefficientVector::zeros(n);
    for (i, (row, weight)) in rows.iter().enumerate() {
        for (j, &coefficient) in row.coefficients.iter().enumerate() {
            a[(i, j)] = coefficient * weight;
        }
        b[i] = row.value * weight;
    }

    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        debug!(rows = n, unknowns, "polynomial.non_finite_system");
        return Err(Error::Singular { rows: n, unknowns });
    }

    let svd = SVD::new(a, true, true);
    let max_singular_value = svd.singular_values.max();
    let eps = max_singular_value * f64::EPSILON * n.max(unknowns) as f64;
    let rank = svd.rank(eps);
    if max_singular_value <= 0.0 || rank < unknowns {
        debug!(rows = n, unknowns, rank, "polynomial.rank_deficient");
        return Err(Error::Singular { rows: n, unknowns });
    }

    let coefficients = svd
        .solve(&b, eps)
        .map_err(|_| Error::Singular { rows: n, unknowns })?;
    Ok(Polynomial::from(coefficients))
}

/// Linear estimator of the given kind with default configuration.
pub fn create(kind: PolynomialEstimatorType) -> Box<dyn PolynomialEstimator> {
    match kind {
        PolynomialEstimatorType::Lmse => Box::new(LmsePolynomialEstimator::new()),
        PolynomialEstimatorType::Weighted => Box::new(WeightedPolynomialEstimator::new()),
    }
}

/// Linear estimator of the given kind, validated like the constructors.
///
/// `weights` is only used by [`PolynomialEstimatorType::Weighted`] and must
/// then match `evaluations` in length.
pub fn create_with(
    degree: usize,
    evaluations: Option<Vec<PolynomialEvaluation>>,
    weights: Option<Vec<f64>>,
    listener: Option<Box<dyn PolynomialEstimatorListener>>,
    kind: PolynomialEstimatorType,
) -> Result<Box<dyn PolynomialEstimator>> {
    let mut estimator: Box<dyn PolynomialEstimator> = match kind {
        PolynomialEstimatorType::Lmse => {
            let mut estimator = LmsePolynomialEstimator::with_degree(degree)?;
            if let Some(evaluations) = evaluations {
                estimator.set_evaluations(evaluations)?;
            }
            Box::new(estimator)
        }
        PolynomialEstimatorType::Weighted => {
            let mut estimator = WeightedPolynomialEstimator::with_degree(degree)?;
            match (evaluations, weights) {
                (Some(evaluations), Some(weights)) => {
                    estimator.set_evaluations_and_weights(evaluations, weights)?
                }
                (Some(evaluations), None) => estimator.set_evaluations(evaluations)?,
                (None, Some(_)) => {
                    return Err(Error::invalid("weights were given without evaluations"))
                }
                (None, None) => {}
            }
            Box::new(estimator)
        }
    };
    estimator.set_listener(listener)?;
    Ok(estimator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fit_recovers_quadratic_from_mixed_evaluations() {
        let p = Polynomial::new(vec![2.0, -1.0, 0.5]);
        let evaluations = vec![
            PolynomialEvaluation::direct(-1.0, p.evaluate(-1.0)),
            PolynomialEvaluation::derivative(3.0, p.evaluate_derivative(3.0, 1), 1).unwrap(),
            PolynomialEvaluation::integral_interval(0.0, 2.0, p.integrate_interval(0.0, 2.0, 1), 1, None)
                .unwrap(),
        ];

        let fitted = fit_polynomial(evaluations.iter().map(|e| (e, 1.0)), 2).unwrap();
        for (a, b) in fitted.coefficients().iter().zip(p.coefficients()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn fit_rejects_underdetermined_and_degenerate_systems() {
        let single = [PolynomialEvaluation::direct(1.0, 1.0)];
        assert!(matches!(
            fit_polynomial(single.iter().map(|e| (e, 1.0)), 1),
            Err(Error::Singular { rows: 1, unknowns: 2 })
        ));

        // two first derivatives of a line only constrain the slope
        let slopes = [
            PolynomialEvaluation::derivative(0.0, 2.0, 1).unwrap(),
            PolynomialEvaluation::derivative(5.0, 2.0, 1).unwrap(),
        ];
        let err = fit_polynomial(slopes.iter().map(|e| (e, 1.0)), 1).unwrap_err();
        assert!(err.is_estimation_failure());

        let nan = [
            PolynomialEvaluation::direct(0.0, f64::NAN),
            PolynomialEvaluation::direct(1.0, 1.0),
        ];
        assert!(fit_polynomial(nan.iter().map(|e| (e, 1.0)), 1).is_err());
    }

    #[test]
    fn factory_builds_requested_kind() {
        let lmse = create(PolynomialEstimatorType::Lmse);
        assert_eq!(lmse.estimator_type(), PolynomialEstimatorType::Lmse);
        assert_eq!(lmse.degree(), DEFAULT_DEGREE);

        let weighted = create(PolynomialEstimatorType::Weighted);
        assert_eq!(weighted.estimator_type(), PolynomialEstimatorType::Weighted);
        assert!(!weighted.is_ready());
    }

    #[test]
    fn factory_validates_arguments() {
        let evaluations = vec![
            PolynomialEvaluation::direct(0.0, 1.0),
            PolynomialEvaluation::direct(1.0, 3.0),
        ];

        assert!(create_with(0, None, None, None, PolynomialEstimatorType::Lmse)
            .err().unwrap()
            .is_invalid_argument());
        assert!(
            create_with(2, Some(evaluations.clone()), None, None, PolynomialEstimatorType::Lmse)
                .err().unwrap()
                .is_invalid_argument()
        );
        assert!(create_with(
            1,
            Some(evaluations.clone()),
            Some(vec![1.0]),
            None,
            PolynomialEstimatorType::Weighted
        )
        .err().unwrap()
        .is_invalid_argument());

        let mut estimator = create_with(
            1,
            Some(evaluations),
            Some(vec![1.0, 1.0]),
            None,
            PolynomialEstimatorType::Weighted,
        )
        .unwrap();
        assert!(estimator.is_ready());
        let p = estimator.estimate().unwrap();
        assert_abs_diff_eq!(p.coefficients()[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.coefficients()[1], 2.0, epsilon = 1e-12);
    }
}
