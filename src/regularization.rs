//! Roughness penalties built from linear differential operators.

use crate::basis::Basis;
use crate::error::{FdaError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Linear differential operator with constant weights, `L = Σⱼ wⱼ Dʲ`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearDifferentialOperator {
    weights: Vec<f64>,
}

impl LinearDifferentialOperator {
    /// Operator from the weights of `D⁰, D¹, ...`.
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(FdaError::invalid("weights", "at least one weight is required"));
        }
        if let Some(bad) = weights.iter().find(|w| !w.is_finite()) {
            return Err(FdaError::invalid(
                "weights",
                format!("weights must be finite, got {}", bad),
            ));
        }
        Ok(Self { weights })
    }

    /// The pure derivative `Dⁿ`.
    pub fn derivative(order: usize) -> Self {
        let mut weights = vec![0.0; order + 1];
        weights[order] = 1.0;
        Self { weights }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Highest derivative order in the operator.
    pub fn order(&self) -> usize {
        self.weights.len() - 1
    }
}

/// Regularization term added to a least-squares fit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Regularization {
    #[default]
    None,
    /// Penalize the integrated square of the n-th derivative.
    DerivativeOrder(usize),
    /// Penalize the integrated square of an arbitrary operator.
    Operator(LinearDifferentialOperator),
}

impl Regularization {
    pub fn operator(&self) -> Option<LinearDifferentialOperator> {
        match self {
            Regularization::None => None,
            Regularization::DerivativeOrder(n) => Some(LinearDifferentialOperator::derivative(*n)),
            Regularization::Operator(op) => Some(op.clone()),
        }
    }

    /// Unscaled penalty matrix on `basis`, or `None` without regularization.
    pub fn penalty_matrix(&self, basis: &Basis) -> Option<DMatrix<f64>> {
        self.operator().map(|op| basis.penalty(&op))
    }
}

impl From<LinearDifferentialOperator> for Regularization {
    fn from(op: LinearDifferentialOperator) -> Self {
        Regularization::Operator(op)
    }
}

pub(crate) fn check_smoothing_parameter(value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(FdaError::invalid(
            "smoothing_parameter",
            format!("must be finite and non-negative, got {}", value),
        ));
    }
    Ok(())
}

/// Penalty matrix `λR` for `basis`, or `None` when there is no regularization.
pub fn compute_penalty_matrix(
    basis: &Basis,
    smoothing_parameter: f64,
    regularization: &Regularization,
) -> Result<Option<DMatrix<f64>>> {
    check_smoothing_parameter(smoothing_parameter)?;
    Ok(regularization
        .penalty_matrix(basis)
        .map(|penalty| penalty * smoothing_parameter))
}
