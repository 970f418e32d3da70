//! Penalized least-squares solvers.
//!
//! Every strategy minimizes
//!
//! ```text
//! (Y − ΦCᵗ)ᵗ W (Y − ΦCᵗ) + C P Cᵗ
//! ```
//!
//! for the coefficient matrix `C` (`n_samples × n_basis`), where `Φ` holds
//! the basis values at the sample points (`n_points × n_basis`), `W` is an
//! optional symmetric positive definite weight matrix and `P` the penalty
//! already scaled by the smoothing parameter.

use crate::basis::symmetrize;
use crate::error::{FdaError, Result};
use crate::helpers::{NUMERICAL_EPS, RANK_TOL};
use nalgebra::{Cholesky, DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strategy used to solve the penalized normal equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverMethod {
    /// Cholesky factorization of `ΦᵗWΦ + P`.
    #[default]
    Cholesky,
    /// QR factorization of the weighted design stacked with a penalty factor.
    Qr,
    /// Explicit coefficient matrix `(ΦᵗWΦ + P)⁻¹ΦᵗW`, reusable across data.
    Matrix,
}

impl fmt::Display for SolverMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolverMethod::Cholesky => "cholesky",
            SolverMethod::Qr => "qr",
            SolverMethod::Matrix => "matrix",
        };
        f.pad(name)
    }
}

impl FromStr for SolverMethod {
    type Err = FdaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cholesky" => Ok(SolverMethod::Cholesky),
            "qr" => Ok(SolverMethod::Qr),
            "matrix" => Ok(SolverMethod::Matrix),
            other => Err(FdaError::invalid(
                "method",
                format!("unknown solver '{}', expected cholesky, qr or matrix", other),
            )),
        }
    }
}

/// Inputs of one penalized least-squares problem.
#[derive(Debug, Clone, Copy)]
pub struct PenalizedLeastSquares<'a> {
    /// Basis values at the sample points, `n_points × n_basis`.
    pub basis_values: &'a DMatrix<f64>,
    /// Optional `n_points × n_points` weight matrix.
    pub weights: Option<&'a DMatrix<f64>>,
    /// Observations, `n_points × n_samples`.
    pub data: &'a DMatrix<f64>,
    /// Optional `n_basis × n_basis` penalty, already scaled.
    pub penalty: Option<&'a DMatrix<f64>>,
}

impl<'a> PenalizedLeastSquares<'a> {
    fn validate(&self) -> Result<()> {
        check_design(self.basis_values, self.weights, self.penalty)?;
        let m = self.basis_values.nrows();
        if self.data.nrows() != m {
            return Err(FdaError::DimensionMismatch {
                context: "data rows vs sample points",
                expected: m,
                found: self.data.nrows(),
            });
        }
        Ok(())
    }
}

fn check_design(
    phi: &DMatrix<f64>,
    weights: Option<&DMatrix<f64>>,
    penalty: Option<&DMatrix<f64>>,
) -> Result<()> {
    let (m, k) = phi.shape();
    if let Some(w) = weights {
        if w.shape() != (m, m) {
            return Err(FdaError::DimensionMismatch {
                context: "weight matrix size vs sample points",
                expected: m,
                found: if w.nrows() != m { w.nrows() } else { w.ncols() },
            });
        }
    }
    if let Some(p) = penalty {
        if p.shape() != (k, k) {
            return Err(FdaError::DimensionMismatch {
                context: "penalty matrix size vs basis size",
                expected: k,
                found: if p.nrows() != k { p.nrows() } else { p.ncols() },
            });
        }
    }
    Ok(())
}

/// `ΦᵗW`, or `Φᵗ` without weights.
fn weighted_transpose(phi: &DMatrix<f64>, weights: Option<&DMatrix<f64>>) -> DMatrix<f64> {
    match weights {
        Some(w) => phi.transpose() * w,
        None => phi.transpose(),
    }
}

/// `ΦᵗWΦ + P`, symmetrized.
fn normal_matrix(
    phi: &DMatrix<f64>,
    phi_t_w: &DMatrix<f64>,
    penalty: Option<&DMatrix<f64>>,
) -> DMatrix<f64> {
    let mut lhs = phi_t_w * phi;
    if let Some(p) = penalty {
        lhs += p;
    }
    symmetrize(&lhs)
}

impl SolverMethod {
    /// Solve for the coefficients, returned as `n_samples × n_basis`.
    pub fn solve(&self, problem: &PenalizedLeastSquares<'_>) -> Result<DMatrix<f64>> {
        problem.validate()?;
        log::debug!(
            "Solving penalized least squares with {} ({} points, {} basis functions, {} samples)",
            self,
            problem.basis_values.nrows(),
            problem.basis_values.ncols(),
            problem.data.ncols()
        );
        match self {
            SolverMethod::Cholesky => solve_cholesky(problem),
            SolverMethod::Qr => solve_qr(problem),
            SolverMethod::Matrix => {
                let coef_matrix =
                    direct_coef_matrix(problem.basis_values, problem.weights, problem.penalty)?;
                Ok((coef_matrix * problem.data).transpose())
            }
        }
    }
}

fn solve_cholesky(problem: &PenalizedLeastSquares<'_>) -> Result<DMatrix<f64>> {
    let phi = problem.basis_values;
    let k = phi.ncols();
    let phi_t_w = weighted_transpose(phi, problem.weights);
    let lhs = normal_matrix(phi, &phi_t_w, problem.penalty);
    let rhs = &phi_t_w * problem.data;

    let chol = Cholesky::new(lhs).ok_or(FdaError::CholeskyFailed {
        matrix: "normal equations matrix",
        dim: k,
    })?;
    Ok(chol.solve(&rhs).transpose())
}

fn solve_qr(problem: &PenalizedLeastSquares<'_>) -> Result<DMatrix<f64>> {
    let (m, k) = problem.basis_values.shape();
    let n = problem.data.ncols();

    // W = UᵗU with U = Lᵗ, so ΦᵗWΦ = (UΦ)ᵗ(UΦ)
    let (phi, data) = match problem.weights {
        Some(w) => {
            let chol = Cholesky::new(symmetrize(w)).ok_or(FdaError::CholeskyFailed {
                matrix: "weight matrix",
                dim: m,
            })?;
            let upper = chol.l().transpose();
            (&upper * problem.basis_values, &upper * problem.data)
        }
        None => (problem.basis_values.clone(), problem.data.clone()),
    };

    let (design, rhs) = match problem.penalty.filter(|p| p.iter().any(|&v| v != 0.0)) {
        Some(p) => {
            let factor = penalty_factor(p);
            let mut design = DMatrix::zeros(m + k, k);
            design.rows_mut(0, m).copy_from(&phi);
            design.rows_mut(m, k).copy_from(&factor.transpose());
            let mut rhs = DMatrix::zeros(m + k, n);
            rhs.rows_mut(0, m).copy_from(&data);
            (design, rhs)
        }
        None => (phi, data),
    };

    if design.nrows() < k {
        return Err(FdaError::Underdetermined {
            n_basis: k,
            n_points: m,
        });
    }

    let qr = design.qr();
    let r = qr.r();
    let q = qr.q();

    let max_diag = r.diagonal().iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if r.diagonal().iter().any(|v| v.abs() <= RANK_TOL * max_diag) || max_diag == 0.0 {
        return Err(FdaError::SingularMatrix {
            matrix: "triangular factor of the stacked design",
            dim: k,
        });
    }

    let qt_y = q.transpose() * rhs;
    let coefs = r
        .solve_upper_triangular(&qt_y)
        .ok_or(FdaError::SingularMatrix {
            matrix: "triangular factor of the stacked design",
            dim: k,
        })?;
    Ok(coefs.transpose())
}

/// `F` with `FFᵗ = P`, from the eigendecomposition of `P` with negative
/// eigenvalues clipped to zero.
fn penalty_factor(penalty: &DMatrix<f64>) -> DMatrix<f64> {
    let eig = SymmetricEigen::new(symmetrize(penalty));
    let max_abs = eig
        .eigenvalues
        .iter()
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    let most_negative = eig.eigenvalues.iter().fold(0.0f64, |acc, &v| acc.min(v));
    if most_negative < -NUMERICAL_EPS * max_abs.max(1.0) {
        log::warn!(
            "Penalty matrix has a negative eigenvalue ({:e}); clipping to zero",
            most_negative
        );
    }

    let mut factor = eig.eigenvectors;
    for (j, &w) in eig.eigenvalues.iter().enumerate() {
        factor.column_mut(j).scale_mut(w.max(0.0).sqrt());
    }
    factor
}

/// Explicit coefficient matrix `(ΦᵗWΦ + P)⁻¹ΦᵗW` of shape `n_basis × n_points`.
///
/// Multiplying it by any data matrix observed at the same points yields the
/// coefficients without refactorizing.
pub fn direct_coef_matrix(
    basis_values: &DMatrix<f64>,
    weights: Option<&DMatrix<f64>>,
    penalty: Option<&DMatrix<f64>>,
) -> Result<DMatrix<f64>> {
    check_design(basis_values, weights, penalty)?;
    let k = basis_values.ncols();
    let phi_t_w = weighted_transpose(basis_values, weights);
    let lhs = normal_matrix(basis_values, &phi_t_w, penalty);
    lhs.lu().solve(&phi_t_w).ok_or(FdaError::SingularMatrix {
        matrix: "normal equations matrix",
        dim: k,
    })
}

/// Solve the square system `Φ Cᵗ = Y` directly (interpolation), returning
/// `n_samples × n_basis`.
pub fn interpolate(basis_values: &DMatrix<f64>, data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let k = basis_values.ncols();
    if basis_values.nrows() != k {
        return Err(FdaError::DimensionMismatch {
            context: "interpolation requires as many points as basis functions",
            expected: k,
            found: basis_values.nrows(),
        });
    }
    if data.nrows() != k {
        return Err(FdaError::DimensionMismatch {
            context: "data rows vs sample points",
            expected: k,
            found: data.nrows(),
        });
    }
    log::debug!("Interpolating {} samples on {} points", data.ncols(), k);
    basis_values
        .clone()
        .lu()
        .solve(data)
        .map(|c| c.transpose())
        .ok_or(FdaError::SingularMatrix {
            matrix: "basis evaluation matrix",
            dim: k,
        })
}
