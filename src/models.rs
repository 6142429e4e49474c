//! Polynomial model fitted by the estimators.
//!
//! A [`Polynomial`] is an ordered coefficient vector, lowest degree first, so
//! `[a, b, c]` is `a + b x + c x^2`.

use crate::types::CoefficientVector;
use crate::utils::{factorial, falling_factorial, rising_factorial};

/// Univariate polynomial with real coefficients.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Default for Polynomial {
    fn default() -> Self {
        Self::new(vec![0.0])
    }
}

impl Polynomial {
    /// Build a polynomial from its coefficients, lowest degree first.
    ///
    /// An empty vector is the zero polynomial.
    pub fn new(mut coefficients: Vec<f64>) -> Self {
        if coefficients.is_empty() {
            coefficients.push(0.0);
        }
        Self { coefficients }
    }

    /// Coefficients, lowest degree first.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Number of stored coefficients minus one.
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Evaluate `p(x)` with Horner's scheme.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }

    /// `order`-th derivative as a new polynomial. Order 0 is a copy.
    pub fn derivative(&self, order: usize) -> Polynomial {
        if order > self.degree() {
            return Polynomial::default();
        }
        let coefficients = self
            .coefficients
            .iter()
            .enumerate()
            .skip(order)
            .map(|(i, &c)| c * falling_factorial(i, order))
            .collect();
        Polynomial::new(coefficients)
    }

    /// Evaluate the `order`-th derivative at `x`.
    pub fn evaluate_derivative(&self, x: f64, order: usize) -> f64 {
        self.derivative(order).evaluate(x)
    }

    /// `order`-th antiderivative.
    ///
    /// `constants[j]` is the integration constant introduced by the `j`-th
    /// integration step; missing constants are zero.
    pub fn nth_integration(&self, order: usize, constants: &[f64]) -> Polynomial {
        let mut coefficients = vec![0.0; self.coefficients.len() + order];
        for (i, &c) in self.coefficients.iter().enumerate() {
            coefficients[i + order] = c / rising_factorial(i, order);
        }
        for (j, &k) in constants.iter().take(order).enumerate() {
            let power = order - 1 - j;
            coefficients[power] += k / factorial(power);
        }
        Polynomial::new(coefficients)
    }

    /// Evaluate the `order`-th antiderivative at `x`.
    pub fn evaluate_nth_integral(&self, x: f64, order: usize, constants: &[f64]) -> f64 {
        self.nth_integration(order, constants).evaluate(x)
    }

    /// Definite `order`-th integral over `[start_x, end_x]`, i.e. the
    /// `order`-th antiderivative (with zero constants) at `end_x` minus its
    /// value at `start_x`.
    pub fn integrate_interval(&self, start_x: f64, end_x: f64, order: usize) -> f64 {
        let antiderivative = self.nth_integration(order, &[]);
        antiderivative.evaluate(end_x) - antiderivative.evaluate(start_x)
    }

    /// Coefficients as an nalgebra column vector.
    pub fn to_vector(&self) -> CoefficientVector {
        CoefficientVector::from_column_slice(&self.coefficients)
    }
}

impl From<CoefficientVector> for Polynomial {
    fn from(vector: CoefficientVector) -> Self {
        Self::new(vector.iter().copied().collect())
    }
}
