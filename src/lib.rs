//! # Polyinlier - Robust Polynomial Fitting
//!
//! `polyinlier` fits a polynomial of a chosen degree to heterogeneous
//! observations (point values, derivative values, integral values and
//! definite integrals over intervals) while tolerating gross outliers.
//!
//! ## Quick Start
//!
//! The easiest way to use `polyinlier` is through the high-level API:
//!
//! ```rust
//! use polyinlier::{estimate_polynomial, PolynomialEvaluation, RobustEstimatorMethod};
//!
//! // y = 1 + 2x, with one gross outlier
//! let mut evaluations: Vec<_> = (0..10)
//!     .map(|i| PolynomialEvaluation::direct(i as f64, 1.0 + 2.0 * i as f64))
//!     .collect();
//! evaluations[3].set_evaluation(50.0);
//!
//! let result =
//!     estimate_polynomial(evaluations, 1, RobustEstimatorMethod::Lmeds, None, None, None).unwrap();
//! println!("Found {} inliers", result.inliers.len());
//! ```
//!
//! ## Estimators
//!
//! - **Linear** ([`estimators`]): unweighted and weighted least squares over
//!   every evaluation, for data known to be clean.
//! - **Robust** ([`robust`]): RANSAC, MSAC, LMedS, PROSAC and PROMedS, all
//!   implementing [`PolynomialRobustEstimator`] and built by [`robust::create`].
//!
//! Estimators are locked while `estimate()` runs; every mutator fails with
//! [`Error::Locked`] in that window. Listeners observe start, end, iteration
//! and progress events.
//!
//! ## Extending the Library
//!
//! The robust methods are compositions of the pipeline traits in [`core`]:
//!
//! - **[`Estimator`](core::Estimator)**: fits candidate models from samples
//! - **[`Sampler`](core::Sampler)**: draws minimal samples
//! - **[`Scoring`](core::Scoring)**: ranks candidates and selects inliers
//! - **[`TerminationCriterion`](core::TerminationCriterion)**: shrinks the iteration budget
//! - **[`LocalOptimizer`](core::LocalOptimizer)**: refines the final model
//!
//! ### Example: Custom Sampler
//!
//! ```rust
//! use polyinlier::core::Sampler;
//!
//! /// Always samples the first evaluations.
//! struct FirstSampler;
//!
//! impl Sampler for FirstSampler {
//!     fn sample(
//!         &mut self,
//!         point_number: usize,
//!         sample_size: usize,
//!         out_indices: &mut [usize],
//!     ) -> bool {
//!         if sample_size > point_number {
//!             return false;
//!         }
//!         for (i, index) in out_indices.iter_mut().take(sample_size).enumerate() {
//!             *index = i;
//!         }
//!         true
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - **[`api`](api)**: One-call robust fitting
//! - **[`core`](core)**: Pipeline traits and the `SampleConsensus` loop
//! - **[`estimators`](estimators)**: Linear polynomial estimators
//! - **[`evaluations`](evaluations)**: Observation types and their linear rows
//! - **[`robust`](robust)**: Robust estimators and their factory
//! - **[`samplers`](samplers)**: Uniform and PROSAC sampling
//! - **[`scoring`](scoring)**: Inlier count, MSAC and median scoring
//! - **[`settings`](settings)**: Configuration types and defaults

pub mod api;
pub mod core;
pub mod error;
pub mod estimators;
pub mod evaluations;
pub mod models;
pub mod optimisers;
pub mod robust;
pub mod samplers;
pub mod scoring;
pub mod settings;
pub mod types;
pub mod utils;

// Re-export high-level API
pub use api::{estimate_polynomial, EstimationResult};

pub use error::{Error, Result};
pub use estimators::{PolynomialEstimator, PolynomialEstimatorListener};
pub use evaluations::{DistanceMetric, EvaluationType, PolynomialEvaluation};
pub use models::Polynomial;
pub use robust::{InliersData, PolynomialRobustEstimator, PolynomialRobustEstimatorListener};

// Re-export core traits for easy access
pub use self::core::{Estimator, LocalOptimizer, Sampler, Scoring, TerminationCriterion};

// Re-export settings for convenience
pub use settings::{PolynomialEstimatorType, RobustEstimatorMethod, RobustEstimatorSettings};
