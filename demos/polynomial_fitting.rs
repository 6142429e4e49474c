//! Example: Robust quadratic fitting from mixed evaluations
//!
//! This example fits a quadratic from point values and slopes, some of
//! which are gross outliers, and compares every robust method.

use polyinlier::{
    estimate_polynomial, Polynomial, PolynomialEvaluation, RobustEstimatorMethod,
    RobustEstimatorSettings,
};
use rand::Rng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Robust Polynomial Fitting Example ===\n");

    let truth = Polynomial::new(vec![1.0, -0.5, 0.25]);
    let n_total = 300;
    let outlier_ratio = 0.25;

    println!(
        "True polynomial: {:.2} + {:.2}x + {:.2}x^2",
        truth.coefficients()[0],
        truth.coefficients()[1],
        truth.coefficients()[2]
    );

    let mut rng = rand::thread_rng();
    let mut evaluations = Vec::with_capacity(n_total);
    let mut n_outliers = 0;
    for i in 0..n_total {
        let x: f64 = rng.gen_range(-5.0..5.0);
        let mut evaluation = if i % 3 == 0 {
            PolynomialEvaluation::derivative(x, truth.evaluate_derivative(x, 1), 1)?
        } else {
            PolynomialEvaluation::direct(x, truth.evaluate(x))
        };
        if rng.gen_bool(outlier_ratio) {
            evaluation.set_evaluation(evaluation.evaluation() + rng.gen_range(-50.0..50.0));
            n_outliers += 1;
        }
        evaluations.push(evaluation);
    }
    println!(
        "Generated {} evaluations ({} slopes), {} of them corrupted\n",
        n_total,
        n_total / 3,
        n_outliers
    );

    // Prefer evaluations close to the origin when sampling progressively
    let quality_scores: Vec<f64> = evaluations
        .iter()
        .map(|e| 1.0 / (1.0 + e.x().unwrap_or(0.0).abs()))
        .collect();

    for method in [
        RobustEstimatorMethod::Ransac,
        RobustEstimatorMethod::Msac,
        RobustEstimatorMethod::Lmeds,
        RobustEstimatorMethod::Prosac,
        RobustEstimatorMethod::Promeds,
    ] {
        let scores = method
            .requires_quality_scores()
            .then(|| quality_scores.clone());
        let settings = RobustEstimatorSettings {
            seed: Some(42),
            ..Default::default()
        };
        let result = estimate_polynomial(evaluations.clone(), 2, method, None, scores, Some(settings))?;

        let error = result
            .polynomial
            .coefficients()
            .iter()
            .zip(truth.coefficients())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        println!("{:?}:", method);
        println!("  Coefficients: {:?}", result.polynomial.coefficients());
        println!(
            "  Inliers: {} of {} ({:.1}%)",
            result.inliers.len(),
            n_total,
            100.0 * result.inliers.len() as f64 / n_total as f64
        );
        println!("  Iterations: {}", result.iterations);
        println!("  Max coefficient error: {:.3e}\n", error);
    }

    Ok(())
}
