//! Basis smoothing of discretized functional data.
//!
//! [`BasisSmoother`] fits penalized least-squares coefficients in a [`Basis`]
//! and returns either the coefficients or the smoothed values on a grid. The
//! linear operator mapping observations to coefficients (and the hat matrix
//! mapping observations to smoothed values) is cached per pair of input and
//! output points.

use crate::basis::Basis;
use crate::error::{FdaError, Result};
use crate::fdata::{FDataBasis, FDataGrid};
use crate::helpers::validate_sample_points;
use crate::matrix::FdMatrix;
use crate::regularization::{check_smoothing_parameter, compute_penalty_matrix, Regularization};
use crate::solver::{direct_coef_matrix, interpolate, PenalizedLeastSquares, SolverMethod};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Configuration of a [`BasisSmoother`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherConfig {
    /// Weight `λ` of the roughness penalty.
    pub smoothing_parameter: f64,
    pub method: SolverMethod,
    pub regularization: Regularization,
    /// Points at which smoothed values are returned; `None` reuses the
    /// input sample points.
    pub output_points: Option<Vec<f64>>,
    /// Return coefficients instead of discretized values.
    pub return_basis: bool,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            smoothing_parameter: 1.0,
            method: SolverMethod::Cholesky,
            regularization: Regularization::None,
            output_points: None,
            return_basis: false,
        }
    }
}

impl SmootherConfig {
    pub fn validate(&self) -> Result<()> {
        check_smoothing_parameter(self.smoothing_parameter)?;
        if let Some(points) = &self.output_points {
            validate_sample_points(points)?;
        }
        Ok(())
    }
}

/// Output of a smoothing pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Smoothed {
    Basis(FDataBasis),
    Grid(FDataGrid),
}

impl Smoothed {
    pub fn into_basis(self) -> Option<FDataBasis> {
        match self {
            Smoothed::Basis(fd) => Some(fd),
            Smoothed::Grid(_) => None,
        }
    }

    pub fn into_grid(self) -> Option<FDataGrid> {
        match self {
            Smoothed::Grid(fd) => Some(fd),
            Smoothed::Basis(_) => None,
        }
    }
}

/// Coefficient and hat matrices computed for one pair of point sets.
#[derive(Debug, Clone)]
struct OperatorCache {
    input_points: Vec<f64>,
    output_points: Vec<f64>,
    /// `n_basis × n_input`
    coef_matrix: DMatrix<f64>,
    /// `n_output × n_input`, built on first request
    hat_matrix: Option<DMatrix<f64>>,
}

impl OperatorCache {
    fn is_valid_for(&self, input_points: &[f64], output_points: &[f64]) -> bool {
        self.input_points == input_points && self.output_points == output_points
    }
}

/// Penalized least-squares smoother in a fixed basis.
///
/// # Examples
///
/// ```
/// use skfda_core::basis::{DomainRange, Fourier};
/// use skfda_core::fdata::FDataGrid;
/// use skfda_core::matrix::FdMatrix;
/// use skfda_core::smoothing::BasisSmoother;
///
/// let t = vec![0.0, 0.25, 0.5, 0.75, 1.0];
/// let data = FdMatrix::from_rows(&[vec![3.0, 3.0, 1.0, 1.0, 3.0]]).unwrap();
/// let fd = FDataGrid::new(data, t).unwrap();
///
/// let basis = Fourier::new(DomainRange::default(), 3);
/// let mut smoother = BasisSmoother::new(basis.into()).with_return_basis(true);
/// let coefs = smoother.fit_transform(&fd).unwrap().into_basis().unwrap();
///
/// assert!((coefs.coefficients()[(0, 0)] - 2.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct BasisSmoother {
    basis: Basis,
    config: SmootherConfig,
    weights: Option<DMatrix<f64>>,
    fitted_points: Option<Vec<f64>>,
    cache: Option<OperatorCache>,
}

impl BasisSmoother {
    /// Smoother in `basis` with the default configuration: no penalty,
    /// Cholesky solver, values returned at the input points.
    pub fn new(basis: Basis) -> Self {
        Self {
            basis,
            config: SmootherConfig::default(),
            weights: None,
            fitted_points: None,
            cache: None,
        }
    }

    /// Smoother with a validated configuration.
    ///
    /// # Errors
    /// `InvalidParameter` for a negative or non-finite smoothing parameter,
    /// `InvalidSamplePoints` for unsorted output points.
    pub fn from_config(basis: Basis, config: SmootherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(basis)
        })
    }

    /// Set the penalty weight `λ`. Validated on fit.
    pub fn with_smoothing_parameter(mut self, smoothing_parameter: f64) -> Self {
        self.config.smoothing_parameter = smoothing_parameter;
        self.invalidate();
        self
    }

    /// Set the solver used for the penalized least-squares problem.
    pub fn with_method(mut self, method: SolverMethod) -> Self {
        self.config.method = method;
        self.invalidate();
        self
    }

    /// Set the roughness penalty. Accepts a [`Regularization`] or a
    /// [`LinearDifferentialOperator`](crate::regularization::LinearDifferentialOperator).
    pub fn with_regularization(mut self, regularization: impl Into<Regularization>) -> Self {
        self.config.regularization = regularization.into();
        self.invalidate();
        self
    }

    /// Set a symmetric positive definite `n_points × n_points` weight matrix.
    pub fn with_weights(mut self, weights: DMatrix<f64>) -> Self {
        self.weights = Some(weights);
        self.invalidate();
        self
    }

    /// Return smoothed values at `output_points` instead of the input points.
    pub fn with_output_points(mut self, output_points: Vec<f64>) -> Self {
        self.config.output_points = Some(output_points);
        self.invalidate();
        self
    }

    /// Return basis coefficients instead of discretized values.
    pub fn with_return_basis(mut self, return_basis: bool) -> Self {
        self.config.return_basis = return_basis;
        self.invalidate();
        self
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn config(&self) -> &SmootherConfig {
        &self.config
    }

    /// The weight matrix, if one was set.
    pub fn weights(&self) -> Option<&DMatrix<f64>> {
        self.weights.as_ref()
    }

    /// Whether [`fit`](Self::fit) or [`fit_transform`](Self::fit_transform)
    /// has recorded sample points.
    pub fn is_fitted(&self) -> bool {
        self.fitted_points.is_some()
    }

    /// Change `λ`, dropping any cached operator.
    ///
    /// # Errors
    /// `InvalidParameter` when `λ` is negative or not finite.
    pub fn set_smoothing_parameter(&mut self, smoothing_parameter: f64) -> Result<()> {
        check_smoothing_parameter(smoothing_parameter)?;
        self.config.smoothing_parameter = smoothing_parameter;
        self.invalidate();
        Ok(())
    }

    /// Change the solver, dropping any cached operator.
    pub fn set_method(&mut self, method: SolverMethod) {
        self.config.method = method;
        self.invalidate();
    }

    /// Change the penalty, dropping any cached operator.
    pub fn set_regularization(&mut self, regularization: Regularization) {
        self.config.regularization = regularization;
        self.invalidate();
    }

    /// Replace or remove the weight matrix, dropping any cached operator.
    pub fn set_weights(&mut self, weights: Option<DMatrix<f64>>) {
        self.weights = weights;
        self.invalidate();
    }

    /// Change the output points (`None` reuses the input points), dropping
    /// any cached operator.
    ///
    /// # Errors
    /// `InvalidSamplePoints` when the points are not strictly increasing.
    pub fn set_output_points(&mut self, output_points: Option<Vec<f64>>) -> Result<()> {
        if let Some(points) = &output_points {
            validate_sample_points(points)?;
        }
        self.config.output_points = output_points;
        self.invalidate();
        Ok(())
    }

    /// Switch between coefficient and grid output, dropping any cached
    /// operator.
    pub fn set_return_basis(&mut self, return_basis: bool) {
        self.config.return_basis = return_basis;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Record the sample points of `data`. With [`SolverMethod::Matrix`] the
    /// coefficient matrix (and the hat matrix, when returning grids) is built
    /// eagerly.
    pub fn fit(&mut self, data: &FDataGrid) -> Result<()> {
        self.config.validate()?;
        self.check_weights(data.n_points())?;
        let penalty = self.penalty()?;
        self.check_determined(data.n_points(), penalty.is_some())?;
        self.fitted_points = Some(data.sample_points().to_vec());

        if self.config.method == SolverMethod::Matrix {
            let with_hat = !self.config.return_basis;
            self.operator_cache(data.sample_points(), with_hat)?;
        }
        Ok(())
    }

    /// Fit on `data` and smooth it.
    ///
    /// With more points than basis functions, or an active penalty, the
    /// configured solver is used. With exactly as many points as functions
    /// the data is interpolated. Fewer points than functions is rejected.
    ///
    /// # Errors
    /// `Underdetermined` for too few points, `DimensionMismatch` for a weight
    /// matrix of the wrong size, and a numerical error when the solver's
    /// system is singular.
    pub fn fit_transform(&mut self, data: &FDataGrid) -> Result<Smoothed> {
        self.config.validate()?;
        self.check_weights(data.n_points())?;
        let penalty = self.penalty()?;
        let uses_solver = self.check_determined(data.n_points(), penalty.is_some())?;

        if uses_solver && self.config.method == SolverMethod::Matrix {
            self.fit(data)?;
            return self.transform(data);
        }

        self.fitted_points = Some(data.sample_points().to_vec());
        let coefs = self.solve_direct(data, penalty.as_ref(), uses_solver)?;
        self.build_output(data, coefs)
    }

    /// Smooth `data` observed at the points recorded by [`fit`](Self::fit).
    pub fn transform(&mut self, data: &FDataGrid) -> Result<Smoothed> {
        let fitted = self
            .fitted_points
            .as_ref()
            .ok_or(FdaError::NotFitted("transform"))?;
        if fitted.as_slice() != data.sample_points() {
            return Err(FdaError::SamplePointsMismatch {
                expected: fitted.len(),
                found: data.n_points(),
            });
        }

        self.check_weights(data.n_points())?;
        let penalty = self.penalty()?;
        let uses_solver = self.check_determined(data.n_points(), penalty.is_some())?;
        if uses_solver && self.config.method == SolverMethod::Matrix {
            return self.transform_cached(data);
        }
        let coefs = self.solve_direct(data, penalty.as_ref(), uses_solver)?;
        self.build_output(data, coefs)
    }

    /// Hat matrix `n_output × n_input` mapping observations at the fitted
    /// points to smoothed values at the output points.
    pub fn hat_matrix(&mut self) -> Result<&DMatrix<f64>> {
        let input = self
            .fitted_points
            .clone()
            .ok_or(FdaError::NotFitted("hat_matrix"))?;
        let cache = self.operator_cache(&input, true)?;
        cache
            .hat_matrix
            .as_ref()
            .ok_or(FdaError::NotFitted("hat_matrix"))
    }

    fn penalty(&self) -> Result<Option<DMatrix<f64>>> {
        compute_penalty_matrix(
            &self.basis,
            self.config.smoothing_parameter,
            &self.config.regularization,
        )
    }

    /// The weight matrix, when set, must be `n_points × n_points` whichever
    /// path the data takes.
    fn check_weights(&self, n_points: usize) -> Result<()> {
        match &self.weights {
            Some(w) if w.shape() != (n_points, n_points) => Err(FdaError::DimensionMismatch {
                context: "weight matrix size vs sample points",
                expected: n_points,
                found: if w.nrows() != n_points { w.nrows() } else { w.ncols() },
            }),
            _ => Ok(()),
        }
    }

    /// Whether the solver path applies (`true`) or the data is interpolated
    /// (`false`); errors when the system is underdetermined.
    fn check_determined(&self, n_points: usize, has_penalty: bool) -> Result<bool> {
        let n_basis = self.basis.n_basis();
        let penalized = has_penalty && self.config.smoothing_parameter > 0.0;
        if n_points > n_basis || penalized {
            Ok(true)
        } else if n_points == n_basis {
            Ok(false)
        } else {
            Err(FdaError::Underdetermined { n_basis, n_points })
        }
    }

    /// `n_points × n_basis` basis values.
    fn basis_values(&self, points: &[f64]) -> Result<DMatrix<f64>> {
        Ok(self.basis.evaluate(points, 0)?.transpose())
    }

    fn output_points_for(&self, input_points: &[f64]) -> Vec<f64> {
        self.config
            .output_points
            .clone()
            .unwrap_or_else(|| input_points.to_vec())
    }

    fn solve_direct(
        &self,
        data: &FDataGrid,
        penalty: Option<&DMatrix<f64>>,
        uses_solver: bool,
    ) -> Result<DMatrix<f64>> {
        let phi = self.basis_values(data.sample_points())?;
        let y = data.data().to_dmatrix().transpose();
        if !uses_solver {
            return interpolate(&phi, &y);
        }
        let problem = PenalizedLeastSquares {
            basis_values: &phi,
            weights: self.weights.as_ref(),
            data: &y,
            penalty,
        };
        self.config.method.solve(&problem)
    }

    fn operator_cache(&mut self, input_points: &[f64], with_hat: bool) -> Result<&OperatorCache> {
        let output_points = self.output_points_for(input_points);
        let valid = self
            .cache
            .as_ref()
            .is_some_and(|c| c.is_valid_for(input_points, &output_points));

        if !valid {
            log::debug!(
                "Building smoothing operator for {} input points and {} output points",
                input_points.len(),
                output_points.len()
            );
            let penalty = self.penalty()?;
            let phi = self.basis_values(input_points)?;
            let coef_matrix = direct_coef_matrix(&phi, self.weights.as_ref(), penalty.as_ref())?;
            self.cache = Some(OperatorCache {
                input_points: input_points.to_vec(),
                output_points: output_points.clone(),
                coef_matrix,
                hat_matrix: None,
            });
        }

        let needs_hat = with_hat && self.cache.as_ref().is_some_and(|c| c.hat_matrix.is_none());
        if needs_hat {
            let phi_out = self.basis_values(&output_points)?;
            if let Some(cache) = self.cache.as_mut() {
                log::debug!("Computing hat matrix ({}x{})", output_points.len(), input_points.len());
                cache.hat_matrix = Some(&phi_out * &cache.coef_matrix);
            }
        }

        self.cache.as_ref().ok_or(FdaError::NotFitted("transform"))
    }

    fn transform_cached(&mut self, data: &FDataGrid) -> Result<Smoothed> {
        let return_basis = self.config.return_basis;
        let y = data.data().to_dmatrix().transpose();

        let (coefs, values, output_points) = {
            let cache = self.operator_cache(data.sample_points(), !return_basis)?;
            let coefs = (&cache.coef_matrix * &y).transpose();
            let values = match (&cache.hat_matrix, return_basis) {
                (Some(hat), false) => Some((hat * &y).transpose()),
                _ => None,
            };
            (coefs, values, cache.output_points.clone())
        };

        match values {
            Some(values) => Ok(Smoothed::Grid(FDataGrid::with_domain(
                FdMatrix::from_dmatrix(&values),
                output_points,
                self.basis.domain_range(),
            )?)),
            None => self.build_output(data, coefs),
        }
    }

    /// Wrap `n_samples × n_basis` coefficients as the configured output.
    fn build_output(&self, data: &FDataGrid, coefs: DMatrix<f64>) -> Result<Smoothed> {
        let fd = FDataBasis::from_dmatrix(self.basis.clone(), &coefs)?;
        if self.config.return_basis {
            return Ok(Smoothed::Basis(fd));
        }
        let output_points = self.output_points_for(data.sample_points());
        let values = fd.evaluate(&output_points, 0)?;
        Ok(Smoothed::Grid(FDataGrid::with_domain(
            values,
            output_points,
            self.basis.domain_range(),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::{BSpline, DomainRange, Fourier, Monomial};
    use crate::regularization::LinearDifferentialOperator;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_1_SQRT_2;

    const METHODS: [SolverMethod; 3] = [SolverMethod::Cholesky, SolverMethod::Qr, SolverMethod::Matrix];

    fn five_points() -> FDataGrid {
        let data = FdMatrix::from_rows(&[vec![3.0, 3.0, 1.0, 1.0, 3.0]]).unwrap();
        FDataGrid::new(data, vec![0.0, 0.25, 0.5, 0.75, 1.0]).unwrap()
    }

    fn fourier3() -> Basis {
        Fourier::new(DomainRange::default(), 3).into()
    }

    #[test]
    fn test_coefficients_agree_across_methods() {
        for method in METHODS {
            let mut smoother = BasisSmoother::new(fourier3())
                .with_method(method)
                .with_return_basis(true);
            let fd = smoother.fit_transform(&five_points()).unwrap().into_basis().unwrap();
            let c = fd.coefficients();
            assert_abs_diff_eq!(c[(0, 0)], 2.0, epsilon = 1e-10);
            assert_abs_diff_eq!(c[(0, 1)], FRAC_1_SQRT_2, epsilon = 1e-10);
            assert_abs_diff_eq!(c[(0, 2)], FRAC_1_SQRT_2, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_hat_matrix_values() {
        let mut smoother = BasisSmoother::new(fourier3()).with_smoothing_parameter(0.0);
        smoother.fit(&five_points()).unwrap();
        let hat = smoother.hat_matrix().unwrap().clone();
        let expected = [
            [3.0, 1.0, -1.0, 1.0, 3.0],
            [1.0, 5.0, 2.0, -2.0, 1.0],
            [-1.0, 2.0, 5.0, 2.0, -1.0],
            [1.0, -2.0, 2.0, 5.0, 1.0],
            [3.0, 1.0, -1.0, 1.0, 3.0],
        ];
        for i in 0..5 {
            for j in 0..5 {
                assert_abs_diff_eq!(hat[(i, j)], expected[i][j] / 7.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_grid_output_matches_hat_matrix() {
        let fd = five_points();
        let mut smoother = BasisSmoother::new(fourier3()).with_method(SolverMethod::Matrix);
        let smoothed = smoother.fit_transform(&fd).unwrap().into_grid().unwrap();
        let hat = smoother.hat_matrix().unwrap().clone();
        let y = fd.data().to_dmatrix().transpose();
        let expected = hat * y;
        for j in 0..5 {
            assert_abs_diff_eq!(smoothed.data()[(0, j)], expected[(j, 0)], epsilon = 1e-12);
        }
        assert_abs_diff_eq!(smoothed.data()[(0, 0)], 3.0, epsilon = 1e-10);
        // 2 + sin(2πt) + cos(2πt) passes through every observation
        assert_abs_diff_eq!(smoothed.data()[(0, 2)], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_penalized_coefficients() {
        let op = LinearDifferentialOperator::new(vec![0.1, 0.2]).unwrap();
        for method in METHODS {
            let mut smoother = BasisSmoother::new(fourier3())
                .with_method(method)
                .with_regularization(op.clone())
                .with_return_basis(true);
            let fd = smoother.fit_transform(&five_points()).unwrap().into_basis().unwrap();
            let c = fd.coefficients();
            assert_abs_diff_eq!(c[(0, 0)], 2.0399, epsilon = 1e-3);
            assert_abs_diff_eq!(c[(0, 1)], 0.5061, epsilon = 1e-3);
            assert_abs_diff_eq!(c[(0, 2)], 0.5516, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_output_points() {
        let mut smoother = BasisSmoother::new(fourier3()).with_output_points(vec![0.0, 0.5, 1.0]);
        let smoothed = smoother.fit_transform(&five_points()).unwrap().into_grid().unwrap();
        assert_eq!(smoothed.sample_points(), &[0.0, 0.5, 1.0]);
        assert_eq!(smoother.hat_matrix().unwrap().shape(), (3, 5));
    }

    #[test]
    fn test_interpolation_when_square() {
        let basis: Basis = BSpline::new(DomainRange::default(), 5, 2).unwrap().into();
        let fd = five_points();
        let mut smoother = BasisSmoother::new(basis);
        let smoothed = smoother.fit_transform(&fd).unwrap().into_grid().unwrap();
        for j in 0..5 {
            assert_abs_diff_eq!(smoothed.data()[(0, j)], fd.data()[(0, j)], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_underdetermined() {
        let basis: Basis = Fourier::new(DomainRange::default(), 7).into();
        let mut smoother = BasisSmoother::new(basis);
        let err = smoother.fit_transform(&five_points()).unwrap_err();
        assert_eq!(
            err,
            FdaError::Underdetermined {
                n_basis: 7,
                n_points: 5
            }
        );
    }

    #[test]
    fn test_penalty_resolves_underdetermined() {
        let basis: Basis = BSpline::cubic(DomainRange::default(), 7).unwrap().into();
        let mut smoother = BasisSmoother::new(basis)
            .with_regularization(Regularization::DerivativeOrder(2))
            .with_smoothing_parameter(0.1);
        assert!(smoother.fit_transform(&five_points()).is_ok());
    }

    #[test]
    fn test_transform_requires_fit() {
        let mut smoother = BasisSmoother::new(fourier3());
        assert_eq!(
            smoother.transform(&five_points()).unwrap_err(),
            FdaError::NotFitted("transform")
        );
        assert!(matches!(smoother.hat_matrix(), Err(FdaError::NotFitted(_))));
    }

    #[test]
    fn test_transform_checks_points() {
        let mut smoother = BasisSmoother::new(fourier3());
        smoother.fit(&five_points()).unwrap();
        let t = vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0];
        let other = FDataGrid::new(FdMatrix::zeros(1, 6), t).unwrap();
        assert_eq!(
            smoother.transform(&other).unwrap_err(),
            FdaError::SamplePointsMismatch {
                expected: 5,
                found: 6
            }
        );
    }

    #[test]
    fn test_setter_invalidates_cache() {
        let mut smoother = BasisSmoother::new(fourier3())
            .with_regularization(Regularization::DerivativeOrder(1))
            .with_smoothing_parameter(0.0);
        smoother.fit(&five_points()).unwrap();
        let before = smoother.hat_matrix().unwrap().clone();
        smoother.set_smoothing_parameter(0.5).unwrap();
        let after = smoother.hat_matrix().unwrap().clone();
        assert!((before[(0, 0)] - after[(0, 0)]).abs() > 1e-3);
        assert!(smoother.set_smoothing_parameter(-1.0).is_err());
    }

    #[test]
    fn test_from_config_validates() {
        let config = SmootherConfig {
            smoothing_parameter: f64::NAN,
            ..SmootherConfig::default()
        };
        assert!(BasisSmoother::from_config(fourier3(), config).is_err());

        let config = SmootherConfig {
            output_points: Some(vec![0.5, 0.1]),
            ..SmootherConfig::default()
        };
        assert!(BasisSmoother::from_config(fourier3(), config).is_err());
    }

    #[test]
    fn test_weights_change_fit() {
        let w = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![10.0, 1.0, 1.0, 1.0, 1.0]));
        let basis: Basis = Fourier::new(DomainRange::default(), 1).into();
        let mut smoother = BasisSmoother::new(basis.clone()).with_return_basis(true);
        let plain = smoother.fit_transform(&five_points()).unwrap().into_basis().unwrap();
        let mut weighted = BasisSmoother::new(basis).with_weights(w).with_return_basis(true);
        let heavy = weighted.fit_transform(&five_points()).unwrap().into_basis().unwrap();
        // The heavily weighted first point pulls the constant towards 3
        assert!(heavy.coefficients()[(0, 0)] > plain.coefficients()[(0, 0)]);
    }

    #[test]
    fn test_builder_after_fit_drops_cached_operator() {
        let penalized = |lambda: f64| {
            BasisSmoother::new(fourier3())
                .with_method(SolverMethod::Matrix)
                .with_regularization(Regularization::DerivativeOrder(2))
                .with_smoothing_parameter(lambda)
        };
        let mut smoother = penalized(0.0);
        smoother.fit(&five_points()).unwrap();
        let unpenalized = smoother.hat_matrix().unwrap().clone();

        let mut smoother = smoother.with_smoothing_parameter(1.0);
        let mut fresh = penalized(1.0);
        fresh.fit(&five_points()).unwrap();
        let expected = fresh.hat_matrix().unwrap().clone();
        let found = smoother.hat_matrix().unwrap().clone();
        assert!((found[(0, 0)] - unpenalized[(0, 0)]).abs() > 1e-3);
        for (a, b) in found.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }

        let smoothed = smoother.transform(&five_points()).unwrap().into_grid().unwrap();
        let reference = fresh.transform(&five_points()).unwrap().into_grid().unwrap();
        assert_eq!(smoothed, reference);
    }

    #[test]
    fn test_output_points_may_extend_past_the_sampled_span() {
        let t = crate::helpers::linspace(0.1, 0.9, 9);
        let rows = vec![t.iter().map(|x| 1.0 + x).collect::<Vec<f64>>()];
        let fd = FDataGrid::new(FdMatrix::from_rows(&rows).unwrap(), t).unwrap();
        let output = crate::helpers::linspace(0.0, 1.0, 11);

        let mut smoother = BasisSmoother::new(fourier3()).with_output_points(output.clone());
        let smoothed = smoother.fit_transform(&fd).unwrap().into_grid().unwrap();
        assert_eq!(smoothed.sample_points(), output.as_slice());
        assert_eq!(smoothed.domain_range(), DomainRange::default());

        let mut cached = BasisSmoother::new(fourier3())
            .with_method(SolverMethod::Matrix)
            .with_output_points(output);
        let again = cached.fit_transform(&fd).unwrap().into_grid().unwrap();
        assert_eq!(again.domain_range(), DomainRange::default());
    }

    #[test]
    fn test_weight_size_checked_when_interpolating() {
        let basis: Basis = Monomial::new(DomainRange::default(), 5).unwrap().into();
        let mut smoother = BasisSmoother::new(basis).with_weights(DMatrix::identity(2, 2));
        let expected = FdaError::DimensionMismatch {
            context: "weight matrix size vs sample points",
            expected: 5,
            found: 2,
        };
        assert_eq!(smoother.fit_transform(&five_points()).unwrap_err(), expected);
        assert_eq!(smoother.fit(&five_points()).unwrap_err(), expected);

        smoother.set_weights(Some(DMatrix::identity(5, 5)));
        assert!(smoother.fit_transform(&five_points()).is_ok());
    }
}
