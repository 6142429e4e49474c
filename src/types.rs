//! Shared linear algebra aliases.
//!
//! Estimators assemble evaluations into a dense design matrix whose columns
//! are the unknown polynomial coefficients (lowest degree first).

use nalgebra::{DMatrix, DVector};

/// Dense `N x (degree + 1)` matrix of linear constraints.
pub type DesignMatrix = DMatrix<f64>;

/// Column vector of polynomial coefficients or right-hand-side values.
pub type CoefficientVector = DVector<f64>;
