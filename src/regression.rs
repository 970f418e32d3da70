//! Linear regression of a scalar response on functional and multivariate
//! covariates.
//!
//! ```text
//! yᵢ = α + Σ_q ⟨xᵢ_q, β_q⟩ + εᵢ
//! ```
//!
//! Multivariate covariates contribute an ordinary dot product, functional
//! covariates an L² inner product with a coefficient function expressed in a
//! coefficient basis. With coefficients `b` of `β_q` in its basis, the
//! design block of a functional covariate with coefficients `C` is `C·J`
//! where `J` holds the inner products between the two bases.

use crate::basis::Basis;
use crate::error::{FdaError, Result};
use crate::fdata::FDataBasis;
use crate::matrix::FdMatrix;
use crate::regularization::{check_smoothing_parameter, Regularization};
use crate::solver::{PenalizedLeastSquares, SolverMethod};
use nalgebra::DMatrix;

/// One explanatory variable, observed for every sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Covariate {
    /// `n_samples × n_features` block of scalar covariates.
    Multivariate(FdMatrix),
    Functional(FDataBasis),
}

impl Covariate {
    /// Number of observations in the covariate.
    pub fn n_samples(&self) -> usize {
        match self {
            Covariate::Multivariate(x) => x.nrows(),
            Covariate::Functional(fd) => fd.n_samples(),
        }
    }
}

/// Fitted coefficient of one covariate.
#[derive(Debug, Clone, PartialEq)]
pub enum Coefficient {
    Multivariate(Vec<f64>),
    Functional(FDataBasis),
}

#[derive(Debug, Clone)]
enum BlockLayout {
    Multivariate { n_features: usize },
    Functional {
        input_basis: Basis,
        cross_gram: DMatrix<f64>,
    },
}

impl BlockLayout {
    fn width(&self) -> usize {
        match self {
            BlockLayout::Multivariate { n_features } => *n_features,
            BlockLayout::Functional { cross_gram, .. } => cross_gram.ncols(),
        }
    }

    fn design(&self, covariate: &Covariate) -> Result<DMatrix<f64>> {
        match (self, covariate) {
            (BlockLayout::Multivariate { n_features }, Covariate::Multivariate(x)) => {
                if x.ncols() != *n_features {
                    return Err(FdaError::DimensionMismatch {
                        context: "multivariate covariate features",
                        expected: *n_features,
                        found: x.ncols(),
                    });
                }
                Ok(x.to_dmatrix())
            }
            (
                BlockLayout::Functional {
                    input_basis,
                    cross_gram,
                },
                Covariate::Functional(fd),
            ) => {
                if fd.basis() != input_basis {
                    return Err(FdaError::BasisMismatch(
                        "functional covariate is not in the basis used at fit time".to_string(),
                    ));
                }
                Ok(fd.coefficients().to_dmatrix() * cross_gram)
            }
            _ => Err(FdaError::BasisMismatch(
                "covariate kinds differ from those used at fit time".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
struct FittedRegression {
    intercept: f64,
    coefficients: Vec<Coefficient>,
    layout: Vec<BlockLayout>,
}

/// Penalized least-squares linear regression with a scalar response.
///
/// Penalties are per covariate. For multivariate blocks only
/// `Regularization::DerivativeOrder(0)` (ridge) is meaningful; for
/// functional blocks any regularization is applied to the coefficient
/// function. The intercept is never penalized.
#[derive(Debug, Clone)]
pub struct LinearRegression {
    fit_intercept: bool,
    coef_basis: Vec<Option<Basis>>,
    regularization_parameter: f64,
    regularization: Vec<Regularization>,
    fitted: Option<FittedRegression>,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    /// Unpenalized model with an intercept, coefficients in each
    /// covariate's own basis.
    pub fn new() -> Self {
        Self {
            fit_intercept: true,
            coef_basis: Vec::new(),
            regularization_parameter: 1.0,
            regularization: Vec::new(),
            fitted: None,
        }
    }

    /// Whether an unpenalized intercept column is added to the design.
    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Basis of each functional coefficient; `None` (or a missing entry)
    /// uses the covariate's own basis.
    pub fn with_coef_basis(mut self, coef_basis: Vec<Option<Basis>>) -> Self {
        self.coef_basis = coef_basis;
        self
    }

    /// Penalty weight and per-covariate regularization (missing entries are
    /// unpenalized).
    pub fn with_regularization(mut self, parameter: f64, regularization: Vec<Regularization>) -> Self {
        self.regularization_parameter = parameter;
        self.regularization = regularization;
        self
    }

    /// Fitted intercept, 0 when the model was fitted without one.
    pub fn intercept(&self) -> Result<f64> {
        self.fitted
            .as_ref()
            .map(|f| f.intercept)
            .ok_or(FdaError::NotFitted("intercept"))
    }

    /// Fitted coefficients, one per covariate in fit order.
    pub fn coefficients(&self) -> Result<&[Coefficient]> {
        self.fitted
            .as_ref()
            .map(|f| f.coefficients.as_slice())
            .ok_or(FdaError::NotFitted("coefficients"))
    }

    fn regularization_for(&self, index: usize) -> &Regularization {
        self.regularization.get(index).unwrap_or(&Regularization::None)
    }

    /// Fit the model by penalized least squares.
    ///
    /// # Arguments
    /// * `covariates` - Explanatory variables, each with one row per sample
    /// * `response` - Scalar response, one value per sample
    ///
    /// # Errors
    /// `InvalidParameter` for a negative penalty weight or no covariates,
    /// `DimensionMismatch` when sample counts disagree, and a numerical
    /// error when the penalized normal equations are singular.
    pub fn fit(&mut self, covariates: &[Covariate], response: &[f64]) -> Result<()> {
        check_smoothing_parameter(self.regularization_parameter)?;
        if covariates.is_empty() {
            return Err(FdaError::invalid("covariates", "at least one covariate is required"));
        }
        let n = response.len();
        check_sample_counts(covariates, n)?;

        let mut layout = Vec::with_capacity(covariates.len());
        let mut coef_bases = Vec::with_capacity(covariates.len());
        let mut penalties = Vec::with_capacity(covariates.len());
        for (q, covariate) in covariates.iter().enumerate() {
            let reg = self.regularization_for(q);
            match covariate {
                Covariate::Multivariate(x) => {
                    let p = x.ncols();
                    let penalty = match reg {
                        Regularization::None => None,
                        Regularization::DerivativeOrder(0) => Some(DMatrix::identity(p, p)),
                        other => {
                            return Err(FdaError::invalid(
                                "regularization",
                                format!(
                                    "{:?} cannot be applied to a multivariate covariate",
                                    other
                                ),
                            ))
                        }
                    };
                    layout.push(BlockLayout::Multivariate { n_features: p });
                    coef_bases.push(None);
                    penalties.push(penalty);
                }
                Covariate::Functional(fd) => {
                    let beta_basis = self
                        .coef_basis
                        .get(q)
                        .cloned()
                        .flatten()
                        .unwrap_or_else(|| fd.basis().clone());
                    let cross_gram = fd.basis().inner_product(&beta_basis)?;
                    penalties.push(reg.penalty_matrix(&beta_basis));
                    layout.push(BlockLayout::Functional {
                        input_basis: fd.basis().clone(),
                        cross_gram,
                    });
                    coef_bases.push(Some(beta_basis));
                }
            }
        }

        let offset = usize::from(self.fit_intercept);
        let design = assemble_design(&layout, covariates, self.fit_intercept, n)?;
        let n_params = design.ncols();

        let mut penalty = DMatrix::zeros(n_params, n_params);
        let mut start = offset;
        for (block, block_penalty) in layout.iter().zip(&penalties) {
            let width = block.width();
            if let Some(p) = block_penalty {
                penalty
                    .view_mut((start, start), (width, width))
                    .copy_from(&(p * self.regularization_parameter));
            }
            start += width;
        }

        log::debug!(
            "Fitting linear regression: {} samples, {} covariates, {} parameters",
            n,
            covariates.len(),
            n_params
        );

        let y = DMatrix::from_column_slice(n, 1, response);
        let has_penalty = penalty.iter().any(|&v| v != 0.0);
        let problem = PenalizedLeastSquares {
            basis_values: &design,
            weights: None,
            data: &y,
            penalty: has_penalty.then_some(&penalty),
        };
        let beta = SolverMethod::Cholesky.solve(&problem)?;

        let intercept = if self.fit_intercept { beta[(0, 0)] } else { 0.0 };
        let mut coefficients = Vec::with_capacity(layout.len());
        let mut start = offset;
        for (block, basis) in layout.iter().zip(coef_bases) {
            let width = block.width();
            let values: Vec<f64> = (start..start + width).map(|j| beta[(0, j)]).collect();
            coefficients.push(match basis {
                Some(basis) => Coefficient::Functional(FDataBasis::new(
                    basis,
                    FdMatrix::from_column_major(values, 1, width)?,
                )?),
                None => Coefficient::Multivariate(values),
            });
            start += width;
        }

        self.fitted = Some(FittedRegression {
            intercept,
            coefficients,
            layout,
        });
        Ok(())
    }

    /// Predicted responses for new covariates.
    ///
    /// Covariates must come in the fit order, with the same kinds, feature
    /// counts and bases.
    pub fn predict(&self, covariates: &[Covariate]) -> Result<Vec<f64>> {
        let fitted = self.fitted.as_ref().ok_or(FdaError::NotFitted("predict"))?;
        if covariates.len() != fitted.layout.len() {
            return Err(FdaError::DimensionMismatch {
                context: "number of covariates",
                expected: fitted.layout.len(),
                found: covariates.len(),
            });
        }
        let n = covariates[0].n_samples();
        check_sample_counts(covariates, n)?;
        let design = assemble_design(&fitted.layout, covariates, false, n)?;

        let beta: Vec<f64> = fitted
            .coefficients
            .iter()
            .flat_map(|c| match c {
                Coefficient::Multivariate(v) => v.clone(),
                Coefficient::Functional(fd) => fd.coefficients().row(0),
            })
            .collect();
        let beta = DMatrix::from_column_slice(beta.len(), 1, &beta);
        let fitted_values = design * beta;
        Ok(fitted_values.iter().map(|v| v + fitted.intercept).collect())
    }
}

fn check_sample_counts(covariates: &[Covariate], n: usize) -> Result<()> {
    if let Some(bad) = covariates.iter().find(|c| c.n_samples() != n) {
        return Err(FdaError::DimensionMismatch {
            context: "covariate samples vs response length",
            expected: n,
            found: bad.n_samples(),
        });
    }
    Ok(())
}

fn assemble_design(
    layout: &[BlockLayout],
    covariates: &[Covariate],
    intercept: bool,
    n: usize,
) -> Result<DMatrix<f64>> {
    let offset = usize::from(intercept);
    let width: usize = offset + layout.iter().map(BlockLayout::width).sum::<usize>();
    let mut design = DMatrix::zeros(n, width);
    if intercept {
        design.column_mut(0).fill(1.0);
    }
    let mut start = offset;
    for (block, covariate) in layout.iter().zip(covariates) {
        let values = block.design(covariate)?;
        design.columns_mut(start, values.ncols()).copy_from(&values);
        start += values.ncols();
    }
    Ok(design)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::{BSpline, DomainRange, Monomial};
    use approx::assert_abs_diff_eq;

    fn mixed_covariates() -> (Vec<Covariate>, Vec<f64>) {
        let multivariate = FdMatrix::from_rows(&[
            vec![0.0, 0.0],
            vec![2.0, 7.0],
            vec![1.0, 7.0],
            vec![3.0, 9.0],
            vec![4.0, 16.0],
            vec![2.0, 14.0],
            vec![3.0, 5.0],
        ])
        .unwrap();
        let basis: Basis = Monomial::new(DomainRange::default(), 3).unwrap().into();
        let functional = FDataBasis::new(
            basis,
            FdMatrix::from_rows(&[
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
                vec![1.0, 0.0, 1.0],
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ])
            .unwrap(),
        )
        .unwrap();

        // y = 2 + [3, 1]·x + ∫ 3 f
        let integral = [3.0, 1.5, 1.0, 4.0, 3.0, 1.5, 1.0];
        let y = (0..7)
            .map(|i| 2.0 + 3.0 * multivariate[(i, 0)] + multivariate[(i, 1)] + integral[i])
            .collect();
        (
            vec![
                Covariate::Multivariate(multivariate),
                Covariate::Functional(functional),
            ],
            y,
        )
    }

    #[test]
    fn test_mixed_covariates_recover_coefficients() {
        let (x, y) = mixed_covariates();
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        assert_abs_diff_eq!(model.intercept().unwrap(), 2.0, epsilon = 1e-8);
        let coefs = model.coefficients().unwrap();
        match &coefs[0] {
            Coefficient::Multivariate(b) => {
                assert_abs_diff_eq!(b[0], 3.0, epsilon = 1e-8);
                assert_abs_diff_eq!(b[1], 1.0, epsilon = 1e-8);
            }
            other => panic!("expected multivariate coefficient, got {:?}", other),
        }
        match &coefs[1] {
            Coefficient::Functional(fd) => {
                let b = fd.coefficients().row(0);
                assert_abs_diff_eq!(b[0], 3.0, epsilon = 1e-7);
                assert_abs_diff_eq!(b[1], 0.0, epsilon = 1e-7);
                assert_abs_diff_eq!(b[2], 0.0, epsilon = 1e-7);
            }
            other => panic!("expected functional coefficient, got {:?}", other),
        }

        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(&y) {
            assert_abs_diff_eq!(p, t, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_mixed_covariates_with_penalties() {
        let (x, y) = mixed_covariates();
        let mut model = LinearRegression::new().with_regularization(
            1.0,
            vec![
                Regularization::DerivativeOrder(0),
                Regularization::DerivativeOrder(2),
            ],
        );
        model.fit(&x, &y).unwrap();

        assert_abs_diff_eq!(model.intercept().unwrap(), 2.0, epsilon = 0.01);
        let coefs = model.coefficients().unwrap();
        if let Coefficient::Multivariate(b) = &coefs[0] {
            assert_abs_diff_eq!(b[0], 2.536739, epsilon = 1e-4);
            assert_abs_diff_eq!(b[1], 1.072186, epsilon = 1e-4);
        }
        if let Coefficient::Functional(fd) = &coefs[1] {
            let b = fd.coefficients().row(0);
            assert_abs_diff_eq!(b[0], 2.125676, epsilon = 1e-4);
            assert_abs_diff_eq!(b[1], 2.450782, epsilon = 1e-4);
            assert_abs_diff_eq!(b[2], 5.808745e-4, epsilon = 1e-4);
        }

        let expected = [5.349035, 16.456464, 13.361185, 23.930295, 32.650965, 23.961766, 16.29029];
        let pred = model.predict(&x).unwrap();
        for (p, e) in pred.iter().zip(expected) {
            assert_abs_diff_eq!(*p, e, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_functional_coefficient_in_other_basis() {
        let (x, y) = mixed_covariates();
        let spline: Basis = BSpline::new(DomainRange::default(), 3, 3).unwrap().into();
        let mut model = LinearRegression::new().with_coef_basis(vec![None, Some(spline.clone())]);
        model.fit(&x, &y).unwrap();
        match &model.coefficients().unwrap()[1] {
            Coefficient::Functional(fd) => assert_eq!(fd.basis(), &spline),
            other => panic!("expected functional coefficient, got {:?}", other),
        }
        // Quadratic splines on one interval span the same space as the monomials
        assert_abs_diff_eq!(model.intercept().unwrap(), 2.0, epsilon = 1e-7);
    }

    #[test]
    fn test_without_intercept() {
        let (x, y) = mixed_covariates();
        let mut model = LinearRegression::new().with_intercept(false);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.intercept().unwrap(), 0.0);
        // The functional block absorbs the intercept through H⁻¹·2 = [6, -48, 60]
        if let Coefficient::Functional(fd) = &model.coefficients().unwrap()[1] {
            assert!(fd.coefficients()[(0, 0)] > 3.0);
        }
    }

    #[test]
    fn test_input_validation() {
        let (x, y) = mixed_covariates();
        let mut model = LinearRegression::new();
        assert!(matches!(
            model.fit(&x, &y[..5]).unwrap_err(),
            FdaError::DimensionMismatch { .. }
        ));
        assert!(matches!(model.predict(&x).unwrap_err(), FdaError::NotFitted(_)));

        let mut ridge_only = LinearRegression::new()
            .with_regularization(1.0, vec![Regularization::DerivativeOrder(2)]);
        assert!(matches!(
            ridge_only.fit(&x, &y).unwrap_err(),
            FdaError::InvalidParameter { .. }
        ));

        model.fit(&x, &y).unwrap();
        let swapped = vec![x[1].clone(), x[0].clone()];
        assert!(matches!(
            model.predict(&swapped).unwrap_err(),
            FdaError::BasisMismatch(_)
        ));
    }
}
