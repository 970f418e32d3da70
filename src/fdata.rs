//! Functional data containers: discretized samples and basis representations.

use crate::basis::{Basis, DomainRange};
use crate::error::{FdaError, Result};
use crate::helpers::{trapezoidal_weights, validate_sample_points};
use crate::iter_maybe_parallel;
use crate::matrix::FdMatrix;
use crate::smoothing::{BasisSmoother, Smoothed};
use nalgebra::DMatrix;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

/// Compute the Lp norm of each row with integration weights.
///
/// `p = ∞` gives the maximum absolute value.
pub(crate) fn norm_lp(data: &FdMatrix, weights: &[f64], p: f64) -> Vec<f64> {
    let (n, m) = data.shape();
    iter_maybe_parallel!(0..n)
        .map(|i| {
            if p.is_infinite() {
                return (0..m).map(|j| data[(i, j)].abs()).fold(0.0, f64::max);
            }
            let integral: f64 = (0..m)
                .map(|j| data[(i, j)].abs().powf(p) * weights[j])
                .sum();
            integral.powf(1.0 / p)
        })
        .collect()
}

/// Functional data observed on a common grid of sample points.
///
/// `data` is `n_samples × n_points`; `sample_points` are finite and strictly
/// increasing and lie inside `domain`.
#[derive(Debug, Clone, PartialEq)]
pub struct FDataGrid {
    data: FdMatrix,
    sample_points: Vec<f64>,
    domain: DomainRange,
}

impl FDataGrid {
    /// Grid whose domain spans the first to the last sample point.
    pub fn new(data: FdMatrix, sample_points: Vec<f64>) -> Result<Self> {
        validate_sample_points(&sample_points)?;
        let first = sample_points[0];
        let last = sample_points[sample_points.len() - 1];
        if sample_points.len() < 2 {
            return Err(FdaError::InvalidSamplePoints(
                "a single sample point needs an explicit domain".to_string(),
            ));
        }
        Self::with_domain(data, sample_points, DomainRange::new(first, last)?)
    }

    pub fn with_domain(
        data: FdMatrix,
        sample_points: Vec<f64>,
        domain: DomainRange,
    ) -> Result<Self> {
        validate_sample_points(&sample_points)?;
        if data.ncols() != sample_points.len() {
            return Err(FdaError::DimensionMismatch {
                context: "data columns vs sample points",
                expected: sample_points.len(),
                found: data.ncols(),
            });
        }
        if let Some(&outside) = sample_points.iter().find(|&&t| !domain.contains(t)) {
            return Err(FdaError::InvalidSamplePoints(format!(
                "point {} lies outside the domain {}",
                outside, domain
            )));
        }
        Ok(Self {
            data,
            sample_points,
            domain,
        })
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.sample_points.len()
    }

    pub fn sample_points(&self) -> &[f64] {
        &self.sample_points
    }

    pub fn data(&self) -> &FdMatrix {
        &self.data
    }

    pub fn domain_range(&self) -> DomainRange {
        self.domain
    }

    /// Pointwise mean, as a single-sample grid.
    pub fn mean(&self) -> FDataGrid {
        let mean = self.data.column_means();
        let m = mean.len();
        FDataGrid {
            data: FdMatrix::from_column_major(mean, 1, m)
                .unwrap_or_else(|_| FdMatrix::zeros(1, m)),
            sample_points: self.sample_points.clone(),
            domain: self.domain,
        }
    }

    /// Copy with the pointwise mean subtracted.
    pub fn centered(&self) -> FDataGrid {
        let data = self
            .data
            .sub_row_vector(&self.data.column_means())
            .unwrap_or_else(|_| self.data.clone());
        FDataGrid {
            data,
            sample_points: self.sample_points.clone(),
            domain: self.domain,
        }
    }

    /// Least-squares representation in `basis` (no penalty).
    pub fn to_basis(&self, basis: &Basis) -> Result<FDataBasis> {
        let mut smoother = BasisSmoother::new(basis.clone()).with_return_basis(true);
        match smoother.fit_transform(self)? {
            Smoothed::Basis(fd) => Ok(fd),
            Smoothed::Grid(_) => Err(FdaError::BasisMismatch(
                "smoother returned a grid although a basis was requested".to_string(),
            )),
        }
    }

    /// Samples of `self` followed by those of `other`.
    pub fn concatenate(&self, other: &FDataGrid) -> Result<FDataGrid> {
        self.domain.ensure_same(&other.domain)?;
        if self.sample_points != other.sample_points {
            return Err(FdaError::SamplePointsMismatch {
                expected: self.n_points(),
                found: other.n_points(),
            });
        }
        let rows: Vec<Vec<f64>> = self
            .data
            .rows()
            .into_iter()
            .chain(other.data.rows())
            .collect();
        Ok(FDataGrid {
            data: FdMatrix::from_rows(&rows)?,
            sample_points: self.sample_points.clone(),
            domain: self.domain,
        })
    }

    /// Lp norm of every sample under the trapezoidal rule.
    pub fn norm(&self, p: f64) -> Vec<f64> {
        norm_lp(&self.data, &trapezoidal_weights(&self.sample_points), p)
    }
}

/// Functional data expressed as coefficients in a basis.
///
/// `coefficients` is `n_samples × n_basis`.
#[derive(Debug, Clone, PartialEq)]
pub struct FDataBasis {
    basis: Basis,
    coefficients: FdMatrix,
}

impl FDataBasis {
    pub fn new(basis: Basis, coefficients: FdMatrix) -> Result<Self> {
        if coefficients.ncols() != basis.n_basis() {
            return Err(FdaError::DimensionMismatch {
                context: "coefficient columns vs basis size",
                expected: basis.n_basis(),
                found: coefficients.ncols(),
            });
        }
        Ok(Self {
            basis,
            coefficients,
        })
    }

    pub(crate) fn from_dmatrix(basis: Basis, coefficients: &DMatrix<f64>) -> Result<Self> {
        Self::new(basis, FdMatrix::from_dmatrix(coefficients))
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.coefficients.nrows()
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn coefficients(&self) -> &FdMatrix {
        &self.coefficients
    }

    pub fn domain_range(&self) -> DomainRange {
        self.basis.domain_range()
    }

    /// Values (or derivatives) of every sample, `n_samples × points.len()`.
    pub fn evaluate(&self, points: &[f64], derivative: usize) -> Result<FdMatrix> {
        let phi = self.basis.evaluate(points, derivative)?;
        Ok(FdMatrix::from_dmatrix(&(self.coefficients.to_dmatrix() * phi)))
    }

    /// Discretize on `points`.
    pub fn to_grid(&self, points: &[f64]) -> Result<FDataGrid> {
        let values = self.evaluate(points, 0)?;
        FDataGrid::with_domain(values, points.to_vec(), self.domain_range())
    }

    /// Mean function, as a single-sample representation.
    pub fn mean(&self) -> FDataBasis {
        let mean = self.coefficients.column_means();
        let k = mean.len();
        FDataBasis {
            basis: self.basis.clone(),
            coefficients: FdMatrix::from_column_major(mean, 1, k)
                .unwrap_or_else(|_| FdMatrix::zeros(1, k)),
        }
    }

    /// Copy with the mean function subtracted.
    pub fn centered(&self) -> FDataBasis {
        let mean = self.coefficients.column_means();
        let coefficients = self
            .coefficients
            .sub_row_vector(&mean)
            .unwrap_or_else(|_| self.coefficients.clone());
        FDataBasis {
            basis: self.basis.clone(),
            coefficients,
        }
    }

    /// `⟨xᵢ, yⱼ⟩` for every pair of samples, `n_samples × other.n_samples`.
    pub fn inner_product(&self, other: &FDataBasis) -> Result<DMatrix<f64>> {
        let cross = self.basis.inner_product(&other.basis)?;
        Ok(self.coefficients.to_dmatrix() * cross * other.coefficients.to_dmatrix().transpose())
    }

    /// Samples of `self` followed by those of `other`; bases must be equal.
    pub fn concatenate(&self, other: &FDataBasis) -> Result<FDataBasis> {
        if self.basis != other.basis {
            return Err(FdaError::BasisMismatch(
                "cannot concatenate representations in different bases".to_string(),
            ));
        }
        let rows: Vec<Vec<f64>> = self
            .coefficients
            .rows()
            .into_iter()
            .chain(other.coefficients.rows())
            .collect();
        FDataBasis::new(self.basis.clone(), FdMatrix::from_rows(&rows)?)
    }
}
