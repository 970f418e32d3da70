//! Example: Basis Smoothing
//!
//! Smooths noisy curves in a cubic B-spline basis with a second-derivative
//! penalty. Compares the three solvers, shows how the smoothing parameter
//! trades fit for roughness, and resamples on a finer grid.

use skfda_core::basis::{BSpline, Basis, DomainRange, Fourier};
use skfda_core::fdata::FDataGrid;
use skfda_core::helpers::linspace;
use skfda_core::matrix::FdMatrix;
use skfda_core::regularization::Regularization;
use skfda_core::smoothing::BasisSmoother;
use skfda_core::solver::SolverMethod;
use std::f64::consts::PI;

fn rmse(a: &[f64], b: &[f64]) -> f64 {
    (a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        / a.len() as f64)
        .sqrt()
}

fn truth(x: f64, i: usize) -> f64 {
    (2.0 * PI * x).sin() + 0.5 * (4.0 * PI * x + 0.2 * i as f64).cos()
}

fn main() -> skfda_core::Result<()> {
    println!("=== Example: Basis Smoothing ===\n");

    let n = 10;
    let m = 60;
    let t = linspace(0.0, 1.0, m);
    let clean: Vec<Vec<f64>> = (0..n)
        .map(|i| t.iter().map(|&x| truth(x, i)).collect())
        .collect();
    let noisy: Vec<Vec<f64>> = clean
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, v)| v + 0.2 * (12.9898 * (i * m + j) as f64).sin())
                .collect()
        })
        .collect();
    let fd = FDataGrid::new(FdMatrix::from_rows(&noisy)?, t.clone())?;

    // --- Section 1: solvers ---
    println!("--- Solvers ---");
    let spline: Basis = BSpline::cubic(DomainRange::default(), 15)?.into();
    for method in [SolverMethod::Cholesky, SolverMethod::Qr, SolverMethod::Matrix] {
        let mut smoother = BasisSmoother::new(spline.clone())
            .with_method(method)
            .with_smoothing_parameter(1e-5)
            .with_regularization(Regularization::DerivativeOrder(2));
        let smoothed = smoother.fit_transform(&fd)?.into_grid().unwrap_or_else(|| fd.clone());
        println!(
            "  {:<9} RMSE vs truth (curve 0): {:.4}",
            method,
            rmse(&smoothed.data().row(0), &clean[0])
        );
    }

    // --- Section 2: smoothing parameter ---
    println!("\n--- Smoothing parameter ---");
    println!("  {:>10}  {:>10}  {:>8}", "lambda", "RMSE", "df");
    for lambda in [1e-8, 1e-6, 1e-4, 1e-2, 1.0] {
        let mut smoother = BasisSmoother::new(spline.clone())
            .with_smoothing_parameter(lambda)
            .with_regularization(Regularization::DerivativeOrder(2));
        smoother.fit(&fd)?;
        let df = smoother.hat_matrix()?.trace();
        let smoothed = smoother.transform(&fd)?.into_grid().unwrap_or_else(|| fd.clone());
        let err: f64 = (0..n)
            .map(|i| rmse(&smoothed.data().row(i), &clean[i]))
            .sum::<f64>()
            / n as f64;
        println!("  {:>10.0e}  {:>10.4}  {:>8.2}", lambda, err, df);
    }

    // --- Section 3: Fourier coefficients and resampling ---
    println!("\n--- Fourier representation ---");
    let fourier: Basis = Fourier::new(DomainRange::default(), 7).into();
    let coefs = fd.to_basis(&fourier)?;
    println!("  Coefficients of curve 0: {:?}", coefs.coefficients().row(0));
    let fine = linspace(0.0, 1.0, 201);
    let resampled = coefs.to_grid(&fine)?;
    println!(
        "  Resampled on {} points, value at t = 0.25: {:.4} (truth {:.4})",
        resampled.n_points(),
        resampled.data()[(0, 50)],
        truth(0.25, 0)
    );

    println!("\n=== Done ===");
    Ok(())
}
