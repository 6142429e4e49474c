//! Unweighted least mean squared error polynomial estimator.

use crate::error::Result;
use crate::estimators::{
    fit_polynomial, run_estimate, LinearEstimatorBase, PolynomialEstimator,
    PolynomialEstimatorListener,
};
use crate::evaluations::PolynomialEvaluation;
use crate::models::Polynomial;
use crate::settings::PolynomialEstimatorType;

/// Fits a polynomial minimising the summed squared row residuals.
///
/// With the LMSE solution disallowed, only the first `degree + 1`
/// evaluations are used and the system is solved exactly.
pub struct LmsePolynomialEstimator {
    base: LinearEstimatorBase,
    lmse_solution_allowed: bool,
}

impl Default for LmsePolynomialEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl LmsePolynomialEstimator {
    pub fn new() -> Self {
        Self {
            base: LinearEstimatorBase::default(),
            lmse_solution_allowed: true,
        }
    }

    pub fn with_degree(degree: usize) -> Result<Self> {
        Ok(Self {
            base: LinearEstimatorBase::with_degree(degree)?,
            lmse_solution_allowed: true,
        })
    }

    pub fn with_evaluations(degree: usize, evaluations: Vec<PolynomialEvaluation>) -> Result<Self> {
        Ok(Self {
            base: LinearEstimatorBase::with_evaluations(degree, evaluations)?,
            lmse_solution_allowed: true,
        })
    }

    pub fn with_listener(mut self, listener: Box<dyn PolynomialEstimatorListener>) -> Self {
        self.base.listener = Some(listener);
        self
    }

    pub fn is_lmse_solution_allowed(&self) -> bool {
        self.lmse_solution_allowed
    }

    pub fn set_lmse_solution_allowed(&mut self, allowed: bool) -> Result<()> {
        self.base.check_unlocked()?;
        self.lmse_solution_allowed = allowed;
        Ok(())
    }

    fn solve(&self) -> Result<Polynomial> {
        let evaluations = self.evaluations().unwrap_or_default();
        let used = if self.lmse_solution_allowed {
            evaluations
        } else {
            &evaluations[..evaluations.len().min(self.min_number_of_evaluations())]
        };
        fit_polynomial(used.iter().map(|e| (e, 1.0)), self.degree())
    }
}

impl PolynomialEstimator for LmsePolynomialEstimator {
    fn base(&self) -> &LinearEstimatorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LinearEstimatorBase {
        &mut self.base
    }

    fn estimator_type(&self) -> PolynomialEstimatorType {
        PolynomialEstimatorType::Lmse
    }

    fn estimate(&mut self) -> Result<Polynomial> {
        run_estimate(self, Self::solve)
    }
}
