//! Example: Functional PCA
//!
//! Builds curves from three known modes of variation, recovers them with
//! FPCA on basis coefficients and on the discretized curves, and uses the
//! leading scores in a scalar regression.

use skfda_core::basis::{Basis, DomainRange, Fourier};
use skfda_core::fdata::FDataGrid;
use skfda_core::fpca::{FpcaBasis, FpcaGrid, FunctionalPca};
use skfda_core::helpers::linspace;
use skfda_core::matrix::FdMatrix;
use skfda_core::regression::{Coefficient, Covariate, LinearRegression};
use skfda_core::smoothing::BasisSmoother;
use std::f64::consts::PI;

fn main() -> skfda_core::Result<()> {
    println!("=== Example: Functional PCA ===\n");

    let n = 40;
    let t = linspace(0.0, 1.0, 101);
    let sd = [2.0, 1.0, 0.5];
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            // Deterministic scores spread over each mode
            let z: Vec<f64> = (0..3)
                .map(|k| sd[k] * (1.7 * (i + 1) as f64 * (k + 1) as f64).sin())
                .collect();
            t.iter()
                .map(|&x| {
                    z[0] * (2.0 * PI * x).sin()
                        + z[1] * (2.0 * PI * x).cos()
                        + z[2] * (4.0 * PI * x).sin()
                })
                .collect()
        })
        .collect();
    let fd = FDataGrid::new(FdMatrix::from_rows(&rows)?, t)?;

    // --- Section 1: FPCA on coefficients ---
    println!("--- FPCA in a Fourier basis ---");
    let basis: Basis = Fourier::new(DomainRange::default(), 7).into();
    let coefs = BasisSmoother::new(basis)
        .with_return_basis(true)
        .fit_transform(&fd)?
        .into_basis()
        .unwrap_or_else(|| unreachable!("smoother configured to return coefficients"));
    let mut basis_pca = FpcaBasis::new(3);
    let scores = basis_pca.fit_transform(&coefs)?;
    let eig = basis_pca.eigenvalues()?;
    let total: f64 = eig.iter().sum();
    for (k, v) in eig.iter().enumerate() {
        println!("  PC{}: eigenvalue {:.4} ({:.1}% of the first three)", k + 1, v, 100.0 * v / total);
    }

    // --- Section 2: FPCA on the grid ---
    println!("\n--- FPCA on discretized curves ---");
    let mut grid_pca = FpcaGrid::new(3);
    grid_pca.fit(&fd)?;
    for (k, (a, b)) in eig.iter().zip(grid_pca.eigenvalues()?).enumerate() {
        println!("  PC{}: basis {:.4}  grid {:.4}", k + 1, a, b);
    }

    // --- Section 3: regression on scores ---
    println!("\n--- Regression on the leading scores ---");
    let y: Vec<f64> = (0..n).map(|i| 0.5 + scores[(i, 0)] - 2.0 * scores[(i, 1)]).collect();
    let mut model = LinearRegression::new();
    model.fit(&[Covariate::Multivariate(scores)], &y)?;
    println!("  Intercept: {:.4}", model.intercept()?);
    if let Coefficient::Multivariate(b) = &model.coefficients()?[0] {
        println!("  Coefficients: {:?}", b);
    }

    println!("\n=== Done ===");
    Ok(())
}
