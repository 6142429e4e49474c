//! Observations of an unknown polynomial.
//!
//! Every [`PolynomialEvaluation`] is a linear constraint on the coefficient
//! vector `c` of the polynomial being fitted: [`PolynomialEvaluation::linear_row`]
//! returns `(a, b)` with `a · c = b`. Four kinds of observation exist:
//!
//! - `Direct`: `p(x) = v`
//! - `Derivative`: `p^(k)(x) = v`
//! - `Integral`: the `k`-th antiderivative of `p` at `x` equals `v`, with one
//!   integration constant per integration step
//! - `IntegralInterval`: the definite `k`-th integral of `p` over
//!   `[start_x, end_x]` equals `v`
//!
//! Rows are built for any degree without validation; garbage in (for
//! instance an order larger than the degree) yields an all-zero row.

use crate::error::{Error, Result};
use crate::models::Polynomial;
use crate::utils::{factorial, falling_factorial, rising_factorial};

/// Tag identifying the kind of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationType {
    Direct,
    Derivative,
    Integral,
    IntegralInterval,
}

/// How the residual between an evaluation and a candidate polynomial is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// Raw residual of the linear row, `|a · c - b|`.
    Algebraic,
    /// First-order distance to the observed curve, `|f(x) - v| / sqrt(1 + f'(x)^2)`.
    ///
    /// Accounts for perturbations of the abscissa. Interval integrals have no
    /// single abscissa and fall back to the algebraic residual.
    #[default]
    Geometric,
}

impl DistanceMetric {
    /// Metric selected by a `use_geometric_distance` flag.
    pub fn from_geometric_flag(use_geometric_distance: bool) -> Self {
        if use_geometric_distance {
            Self::Geometric
        } else {
            Self::Algebraic
        }
    }
}

/// One observation of an unknown polynomial.
#[derive(Debug, Clone, PartialEq)]
pub enum PolynomialEvaluation {
    /// `p(x) = evaluation`.
    Direct { x: f64, evaluation: f64 },
    /// `p^(order)(x) = evaluation`.
    Derivative {
        x: f64,
        evaluation: f64,
        order: usize,
    },
    /// `order`-th antiderivative of `p` at `x` equals `evaluation`.
    ///
    /// `constants[j]` is the constant introduced by the `j`-th integration.
    Integral {
        x: f64,
        evaluation: f64,
        order: usize,
        constants: Vec<f64>,
    },
    /// Definite `order`-th integral over `[start_x, end_x]` equals `evaluation`.
    ///
    /// `constants` is accepted for symmetry with `Integral` but cancels in
    /// the definite integral and never affects the row.
    IntegralInterval {
        start_x: f64,
        end_x: f64,
        evaluation: f64,
        order: usize,
        constants: Vec<f64>,
    },
}

/// Linear constraint `coefficients · c = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRow {
    pub coefficients: Vec<f64>,
    pub value: f64,
}

fn check_order(order: usize) -> Result<()> {
    if order < 1 {
        return Err(Error::invalid("derivative or integral order must be at least 1"));
    }
    Ok(())
}

fn check_constants(order: usize, constants: Option<Vec<f64>>) -> Result<Vec<f64>> {
    match constants {
        None => Ok(vec![0.0; order]),
        Some(c) if c.len() == order => Ok(c),
        Some(c) => Err(Error::invalid(format!(
            "expected {order} integration constants, got {}",
            c.len()
        ))),
    }
}

impl PolynomialEvaluation {
    /// Observation of `p(x)`.
    pub fn direct(x: f64, evaluation: f64) -> Self {
        Self::Direct { x, evaluation }
    }

    /// Observation of the `order`-th derivative at `x`; `order` must be at least 1.
    pub fn derivative(x: f64, evaluation: f64, order: usize) -> Result<Self> {
        check_order(order)?;
        Ok(Self::Derivative {
            x,
            evaluation,
            order,
        })
    }

    /// Observation of the `order`-th antiderivative at `x`.
    ///
    /// `constants` must hold exactly `order` values; `None` means all zero.
    pub fn integral(
        x: f64,
        evaluation: f64,
        order: usize,
        constants: Option<Vec<f64>>,
    ) -> Result<Self> {
        check_order(order)?;
        let constants = check_constants(order, constants)?;
        Ok(Self::Integral {
            x,
            evaluation,
            order,
            constants,
        })
    }

    /// Observation of the definite `order`-th integral over `[start_x, end_x]`.
    pub fn integral_interval(
        start_x: f64,
        end_x: f64,
        evaluation: f64,
        order: usize,
        constants: Option<Vec<f64>>,
    ) -> Result<Self> {
        check_order(order)?;
        let constants = check_constants(order, constants)?;
        Ok(Self::IntegralInterval {
            start_x,
            end_x,
            evaluation,
            order,
            constants,
        })
    }

    pub fn evaluation_type(&self) -> EvaluationType {
        match self {
            Self::Direct { .. } => EvaluationType::Direct,
            Self::Derivative { .. } => EvaluationType::Derivative,
            Self::Integral { .. } => EvaluationType::Integral,
            Self::IntegralInterval { .. } => EvaluationType::IntegralInterval,
        }
    }

    /// Observed value.
    pub fn evaluation(&self) -> f64 {
        match self {
            Self::Direct { evaluation, .. }
            | Self::Derivative { evaluation, .. }
            | Self::Integral { evaluation, .. }
            | Self::IntegralInterval { evaluation, .. } => *evaluation,
        }
    }

    /// Replace the observed value.
    pub fn set_evaluation(&mut self, value: f64) {
        match self {
            Self::Direct { evaluation, .. }
            | Self::Derivative { evaluation, .. }
            | Self::Integral { evaluation, .. }
            | Self::IntegralInterval { evaluation, .. } => *evaluation = value,
        }
    }

    /// Abscissa, absent for interval integrals.
    pub fn x(&self) -> Option<f64> {
        match self {
            Self::Direct { x, .. } | Self::Derivative { x, .. } | Self::Integral { x, .. } => {
                Some(*x)
            }
            Self::IntegralInterval { .. } => None,
        }
    }

    /// Derivative or integral order; zero for direct evaluations.
    pub fn order(&self) -> usize {
        match self {
            Self::Direct { .. } => 0,
            Self::Derivative { order, .. }
            | Self::Integral { order, .. }
            | Self::IntegralInterval { order, .. } => *order,
        }
    }

    /// Express this observation as a row of the linear system for a
    /// polynomial of the given degree.
    pub fn linear_row(&self, degree: usize) -> LinearRow {
        let n = degree + 1;
        match self {
            Self::Direct { x, evaluation } => LinearRow {
                coefficients: (0..n).map(|i| x.powi(i as i32)).collect(),
                value: *evaluation,
            },
            Self::Derivative {
                x,
                evaluation,
                order,
            } => LinearRow {
                coefficients: (0..n)
                    .map(|i| {
                        if i < *order {
                            0.0
                        } else {
                            falling_factorial(i, *order) * x.powi((i - order) as i32)
                        }
                    })
                    .collect(),
                value: *evaluation,
            },
            Self::Integral {
                x,
                evaluation,
                order,
                constants,
            } => {
                let offset: f64 = constants
                    .iter()
                    .take(*order)
                    .enumerate()
                    .map(|(j, c)| {
                        let power = order - 1 - j;
                        c * x.powi(power as i32) / factorial(power)
                    })
                    .sum();
                LinearRow {
                    coefficients: (0..n)
                        .map(|i| x.powi((i + order) as i32) / rising_factorial(i, *order))
                        .collect(),
                    value: evaluation - offset,
                }
            }
            Self::IntegralInterval {
                start_x,
                end_x,
                evaluation,
                order,
                ..
            } => LinearRow {
                coefficients: (0..n)
                    .map(|i| {
                        let power = (i + order) as i32;
                        (end_x.powi(power) - start_x.powi(power)) / rising_factorial(i, *order)
                    })
                    .collect(),
                value: *evaluation,
            },
        }
    }

    /// Value the candidate polynomial predicts for this observation.
    pub fn predicted(&self, polynomial: &Polynomial) -> f64 {
        match self {
            Self::Direct { x, .. } => polynomial.evaluate(*x),
            Self::Derivative { x, order, .. } => polynomial.evaluate_derivative(*x, *order),
            Self::Integral {
                x,
                order,
                constants,
                ..
            } => polynomial.evaluate_nth_integral(*x, *order, constants),
            Self::IntegralInterval {
                start_x,
                end_x,
                order,
                ..
            } => polynomial.integrate_interval(*start_x, *end_x, *order),
        }
    }

    /// `|predicted - observed|`.
    pub fn algebraic_distance(&self, polynomial: &Polynomial) -> f64 {
        (self.predicted(polynomial) - self.evaluation()).abs()
    }

    /// First-order distance from the observation to the observed curve.
    pub fn geometric_distance(&self, polynomial: &Polynomial) -> f64 {
        let slope = match self {
            Self::Direct { x, .. } => polynomial.evaluate_derivative(*x, 1),
            Self::Derivative { x, order, .. } => polynomial.evaluate_derivative(*x, order + 1),
            Self::Integral {
                x,
                order,
                constants,
                ..
            } => {
                // d/dx of the k-th antiderivative drops the last constant.
                let lower = order.saturating_sub(1);
                polynomial.evaluate_nth_integral(*x, lower, &constants[..lower.min(constants.len())])
            }
            Self::IntegralInterval { .. } => return self.algebraic_distance(polynomial),
        };
        self.algebraic_distance(polynomial) / (1.0 + slope * slope).sqrt()
    }

    /// Distance under the requested metric.
    pub fn distance(&self, polynomial: &Polynomial, metric: DistanceMetric) -> f64 {
        match metric {
            DistanceMetric::Algebraic => self.algebraic_distance(polynomial),
            DistanceMetric::Geometric => self.geometric_distance(polynomial),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dot(row: &LinearRow, p: &Polynomial) -> f64 {
        row.coefficients
            .iter()
            .zip(p.coefficients())
            .map(|(a, c)| a * c)
            .sum()
    }

    #[test]
    fn constructors_validate_order_and_constants() {
        assert!(PolynomialEvaluation::derivative(1.0, 2.0, 0)
            .unwrap_err()
            .is_invalid_argument());
        assert!(PolynomialEvaluation::integral(1.0, 2.0, 2, Some(vec![1.0]))
            .unwrap_err()
            .is_invalid_argument());
        assert!(PolynomialEvaluation::integral_interval(0.0, 1.0, 2.0, 0, None).is_err());

        let e = PolynomialEvaluation::integral(1.0, 2.0, 3, None).unwrap();
        match e {
            PolynomialEvaluation::Integral { constants, .. } => assert_eq!(constants, vec![0.0; 3]),
            _ => panic!("expected integral evaluation"),
        }
    }

    #[test]
    fn accessors_report_fields() {
        let mut e = PolynomialEvaluation::derivative(2.0, 5.0, 2).unwrap();
        assert_eq!(e.evaluation_type(), EvaluationType::Derivative);
        assert_eq!(e.x(), Some(2.0));
        assert_eq!(e.order(), 2);
        e.set_evaluation(7.0);
        assert_eq!(e.evaluation(), 7.0);

        let i = PolynomialEvaluation::integral_interval(0.0, 1.0, 3.0, 1, None).unwrap();
        assert_eq!(i.x(), None);
        assert_eq!(i.evaluation_type(), EvaluationType::IntegralInterval);
        assert_eq!(PolynomialEvaluation::direct(1.0, 1.0).order(), 0);
    }

    #[test]
    fn direct_row_is_power_basis() {
        let row = PolynomialEvaluation::direct(2.0, 9.0).linear_row(3);
        assert_eq!(row.coefficients, vec![1.0, 2.0, 4.0, 8.0]);
        assert_eq!(row.value, 9.0);
    }

    #[test]
    fn derivative_row_uses_falling_factorials() {
        let row = PolynomialEvaluation::derivative(2.0, 1.0, 2)
            .unwrap()
            .linear_row(3);
        // d2/dx2 of [1, x, x^2, x^3] at 2 = [0, 0, 2, 12]
        assert_eq!(row.coefficients, vec![0.0, 0.0, 2.0, 12.0]);
    }

    #[test]
    fn rows_are_satisfied_by_the_generating_polynomial() {
        let p = Polynomial::new(vec![1.5, -2.0, 0.25, 3.0]);
        let constants = vec![0.5, -1.0];
        let evaluations = vec![
            PolynomialEvaluation::direct(0.7, p.evaluate(0.7)),
            PolynomialEvaluation::derivative(-1.3, p.evaluate_derivative(-1.3, 2), 2).unwrap(),
            PolynomialEvaluation::integral(
                1.1,
                p.evaluate_nth_integral(1.1, 2, &constants),
                2,
                Some(constants.clone()),
            )
            .unwrap(),
            PolynomialEvaluation::integral_interval(
                -0.5,
                2.0,
                p.integrate_interval(-0.5, 2.0, 2),
                2,
                Some(vec![3.0, 4.0]),
            )
            .unwrap(),
        ];

        for e in &evaluations {
            let row = e.linear_row(p.degree());
            assert_abs_diff_eq!(dot(&row, &p), row.value, epsilon = 1e-10);
            assert_abs_diff_eq!(e.algebraic_distance(&p), 0.0, epsilon = 1e-10);
            assert_abs_diff_eq!(e.geometric_distance(&p), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn interval_constants_do_not_change_the_row() {
        let a = PolynomialEvaluation::integral_interval(0.0, 2.0, 1.0, 2, None).unwrap();
        let b =
            PolynomialEvaluation::integral_interval(0.0, 2.0, 1.0, 2, Some(vec![7.0, -3.0])).unwrap();
        assert_eq!(a.linear_row(2), b.linear_row(2));
    }

    #[test]
    fn geometric_distance_scales_by_slope() {
        // p(x) = 2x, observation (1, 3): vertical error 1, slope 2
        let p = Polynomial::new(vec![0.0, 2.0]);
        let e = PolynomialEvaluation::direct(1.0, 3.0);
        assert_abs_diff_eq!(e.algebraic_distance(&p), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(e.geometric_distance(&p), 1.0 / 5f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(
            e.distance(&p, DistanceMetric::Algebraic),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn geometric_distance_of_integral_uses_lower_antiderivative() {
        // p(x) = 1, first antiderivative x + c; slope is p(x) = 1
        let p = Polynomial::new(vec![1.0]);
        let e = PolynomialEvaluation::integral(2.0, 4.0, 1, Some(vec![1.0])).unwrap();
        // predicted 3, observed 4
        assert_abs_diff_eq!(e.geometric_distance(&p), 1.0 / 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn metric_from_flag() {
        assert_eq!(DistanceMetric::from_geometric_flag(true), DistanceMetric::Geometric);
        assert_eq!(DistanceMetric::from_geometric_flag(false), DistanceMetric::Algebraic);
    }
}
