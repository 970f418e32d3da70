//! # skfda-core
//!
//! Basis representation and smoothing for Functional Data Analysis in Rust.
//!
//! This crate provides:
//! - Basis systems (Fourier, B-spline, monomial) with derivatives, Gram
//!   matrices, roughness penalties and cross-basis inner products
//! - Penalized least-squares smoothing with Cholesky, QR and explicit-matrix
//!   solvers and a cached hat matrix
//! - Functional PCA on basis coefficients or on discretized samples
//! - Scalar-on-function linear regression
//! - One-way functional ANOVA statistics
//!
//! ## Data Layout
//!
//! Samples are rows of column-major [`FdMatrix`] values: for n observations
//! with m evaluation points, `data[i + j * n]` is observation i at point j.
//! Basis evaluations are `n_basis × n_points` nalgebra matrices.

#![allow(clippy::needless_range_loop)]

pub mod parallel;

pub mod anova;
pub mod basis;
pub mod error;
pub mod fdata;
pub mod fpca;
pub mod helpers;
pub mod matrix;
pub mod quadrature;
pub mod regression;
pub mod regularization;
pub mod smoothing;
pub mod solver;

// Re-export commonly used items
pub use basis::{BSpline, Basis, DomainRange, Fourier, Monomial};
pub use error::{ErrorKind, FdaError, Result};
pub use fdata::{FDataBasis, FDataGrid};
pub use fpca::{FpcaBasis, FpcaGrid, FunctionalPca};
pub use helpers::{trapezoidal_weights, NUMERICAL_EPS};
pub use matrix::FdMatrix;
pub use regression::{Coefficient, Covariate, LinearRegression};
pub use regularization::{compute_penalty_matrix, LinearDifferentialOperator, Regularization};
pub use smoothing::{BasisSmoother, Smoothed, SmootherConfig};
pub use solver::{PenalizedLeastSquares, SolverMethod};
