//! Functional principal component analysis.
//!
//! Two estimators share the [`FunctionalPca`] trait: [`FpcaBasis`] works on
//! basis coefficients and returns components in a (possibly different)
//! basis, [`FpcaGrid`] works on discretized samples and returns discretized
//! eigenfunctions. Both reduce the problem to an ordinary PCA of a whitened
//! matrix through [`multivariate_pca`].

use crate::basis::{symmetrize, Basis};
use crate::error::{FdaError, Result};
use crate::fdata::{FDataBasis, FDataGrid};
use crate::helpers::trapezoidal_weights;
use crate::matrix::FdMatrix;
use crate::regularization::{check_smoothing_parameter, Regularization};
use nalgebra::{Cholesky, DMatrix, SVD};

/// Fit/transform interface shared by the functional PCA estimators.
pub trait FunctionalPca {
    type Data;

    fn fit(&mut self, data: &Self::Data) -> Result<()>;

    /// Principal component scores, `n_samples × n_components`.
    fn transform(&self, data: &Self::Data) -> Result<FdMatrix>;

    fn fit_transform(&mut self, data: &Self::Data) -> Result<FdMatrix> {
        self.fit(data)?;
        self.transform(data)
    }

    /// Eigenvalues of the fitted components, in descending order.
    fn eigenvalues(&self) -> Result<&[f64]>;

    fn n_components(&self) -> usize;
}

/// Reject component counts that cannot be honored.
///
/// `capacity` is the dimension of the representation (basis size or number
/// of sample points) and `capacity_label` names it in the error.
pub fn check_component_count(
    n_components: usize,
    n_samples: usize,
    capacity: usize,
    capacity_label: &'static str,
) -> Result<()> {
    if n_components == 0 {
        return Err(FdaError::invalid("n_components", "must be at least 1"));
    }
    if n_components > n_samples {
        return Err(FdaError::TooManyComponents {
            requested: n_components,
            available: n_samples,
            limit: "samples",
        });
    }
    if n_components > capacity {
        return Err(FdaError::TooManyComponents {
            requested: n_components,
            available: capacity,
            limit: capacity_label,
        });
    }
    Ok(())
}

/// Result of [`multivariate_pca`].
#[derive(Debug, Clone, PartialEq)]
pub struct MultivariatePca {
    /// Column means removed before the decomposition.
    pub mean: Vec<f64>,
    /// Principal directions as rows, `n_components × n_features`.
    pub components: DMatrix<f64>,
    /// Singular values of the centered matrix, descending.
    pub singular_values: Vec<f64>,
}

/// Center columns of a matrix and return (centered_matrix, column_means).
fn center_columns(data: &DMatrix<f64>) -> (DMatrix<f64>, Vec<f64>) {
    let n = data.nrows().max(1) as f64;
    let means: Vec<f64> = data.column_iter().map(|c| c.sum() / n).collect();
    let mut centered = data.clone();
    for (j, mu) in means.iter().enumerate() {
        centered.column_mut(j).add_scalar_mut(-mu);
    }
    (centered, means)
}

/// PCA of the rows of `data` via SVD of the column-centered matrix.
///
/// Directions are sorted by decreasing singular value. Each direction's
/// sign is chosen so that its largest-magnitude entry is positive.
pub fn multivariate_pca(data: &DMatrix<f64>, n_components: usize) -> Result<MultivariatePca> {
    let (n, p) = data.shape();
    check_component_count(n_components, n, p, "features")?;

    let (centered, mean) = center_columns(data);
    let svd = SVD::new(centered, false, true);
    let v_t = svd.v_t.as_ref().ok_or(FdaError::SingularMatrix {
        matrix: "whitened data matrix",
        dim: p,
    })?;

    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&a, &b| svd.singular_values[b].total_cmp(&svd.singular_values[a]));

    let mut components = DMatrix::zeros(n_components, p);
    let mut singular_values = Vec::with_capacity(n_components);
    for (k, &idx) in order.iter().take(n_components).enumerate() {
        let row = v_t.row(idx);
        let pivot = row.iter().fold(0.0f64, |acc, &v| if v.abs() > acc.abs() { v } else { acc });
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        for j in 0..p {
            components[(k, j)] = sign * row[j];
        }
        singular_values.push(svd.singular_values[idx]);
    }

    if singular_values.iter().all(|&s| s == 0.0) {
        log::warn!("PCA input has zero total variance; components are arbitrary");
    }

    Ok(MultivariatePca {
        mean,
        components,
        singular_values,
    })
}

// ============== Basis variant ==============

#[derive(Debug, Clone)]
struct FittedBasisPca {
    components: FDataBasis,
    eigenvalues: Vec<f64>,
    mean: Vec<f64>,
    input_basis: Basis,
    /// Inner products between the input and component bases
    cross_gram: DMatrix<f64>,
}

/// Functional PCA of basis-represented data.
///
/// Components are expressed in `components_basis` (the input basis by
/// default). A positive regularization parameter adds a roughness penalty to
/// the component Gram matrix, giving smoother components.
#[derive(Debug, Clone)]
pub struct FpcaBasis {
    n_components: usize,
    centering: bool,
    components_basis: Option<Basis>,
    regularization_parameter: f64,
    regularization: Regularization,
    fitted: Option<FittedBasisPca>,
}

impl Default for FpcaBasis {
    fn default() -> Self {
        Self::new(3)
    }
}

impl FpcaBasis {
    /// Estimator for `n_components` components, centered, with components
    /// in the input basis and no roughness penalty.
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            centering: true,
            components_basis: None,
            regularization_parameter: 0.0,
            regularization: Regularization::DerivativeOrder(2),
            fitted: None,
        }
    }

    /// Whether the mean function is removed before the decomposition.
    pub fn with_centering(mut self, centering: bool) -> Self {
        self.centering = centering;
        self
    }

    /// Express the components in `basis`, which must share the data's
    /// domain.
    pub fn with_components_basis(mut self, basis: Basis) -> Self {
        self.components_basis = Some(basis);
        self
    }

    /// Penalize the roughness of the components.
    ///
    /// # Arguments
    /// * `parameter` - Penalty weight, non-negative (checked on fit)
    /// * `regularization` - Roughness measure applied to the component basis
    pub fn with_regularization(mut self, parameter: f64, regularization: Regularization) -> Self {
        self.regularization_parameter = parameter;
        self.regularization = regularization;
        self
    }

    /// Fitted components, one sample per component.
    pub fn components(&self) -> Result<&FDataBasis> {
        self.fitted
            .as_ref()
            .map(|f| &f.components)
            .ok_or(FdaError::NotFitted("components"))
    }

    /// Coefficients of the mean function removed at fit time (zero without
    /// centering).
    pub fn mean_coefficients(&self) -> Result<&[f64]> {
        self.fitted
            .as_ref()
            .map(|f| f.mean.as_slice())
            .ok_or(FdaError::NotFitted("mean_coefficients"))
    }
}

impl FunctionalPca for FpcaBasis {
    type Data = FDataBasis;

    fn fit(&mut self, data: &FDataBasis) -> Result<()> {
        check_smoothing_parameter(self.regularization_parameter)?;
        let components_basis = self
            .components_basis
            .clone()
            .unwrap_or_else(|| data.basis().clone());
        data.domain_range()
            .ensure_same(&components_basis.domain_range())?;
        check_component_count(
            self.n_components,
            data.n_samples(),
            components_basis.n_basis(),
            "basis functions",
        )?;

        log::debug!(
            "Fitting basis FPCA: {} samples, {} components in a basis of {} functions",
            data.n_samples(),
            self.n_components,
            components_basis.n_basis()
        );

        let n = data.n_samples() as f64;
        let mean = if self.centering {
            data.coefficients().column_means()
        } else {
            vec![0.0; data.basis().n_basis()]
        };
        let coefs = data.coefficients().sub_row_vector(&mean)?.to_dmatrix();

        let gram = components_basis.gram_matrix();
        let mut penalized_gram = gram.clone();
        if self.regularization_parameter > 0.0 {
            if let Some(penalty) = self.regularization.penalty_matrix(&components_basis) {
                penalized_gram += penalty * self.regularization_parameter;
            }
        }
        let penalized_gram = symmetrize(&penalized_gram);

        let cross_gram = if data.basis() == &components_basis {
            gram
        } else {
            data.basis().inner_product(&components_basis)?
        };

        let k = components_basis.n_basis();
        let chol = Cholesky::new(penalized_gram).ok_or(FdaError::CholeskyFailed {
            matrix: "component basis Gram matrix",
            dim: k,
        })?;
        let l = chol.l();

        // L⁻¹Jᵗ
        let whitening = l
            .solve_lower_triangular(&cross_gram.transpose())
            .ok_or(FdaError::SingularMatrix {
                matrix: "component basis Gram factor",
                dim: k,
            })?;
        let whitened = coefs * whitening.transpose() / n.sqrt();

        let pca = multivariate_pca(&whitened, self.n_components)?;

        // Aᵗ = L⁻ᵗVᵗ
        let component_coefs = l
            .transpose()
            .solve_upper_triangular(&pca.components.transpose())
            .ok_or(FdaError::SingularMatrix {
                matrix: "component basis Gram factor",
                dim: k,
            })?
            .transpose();

        self.fitted = Some(FittedBasisPca {
            components: FDataBasis::from_dmatrix(components_basis, &component_coefs)?,
            eigenvalues: pca.singular_values.iter().map(|s| s * s).collect(),
            mean,
            input_basis: data.basis().clone(),
            cross_gram,
        });
        Ok(())
    }

    fn transform(&self, data: &FDataBasis) -> Result<FdMatrix> {
        let fitted = self.fitted.as_ref().ok_or(FdaError::NotFitted("transform"))?;
        if data.basis() != &fitted.input_basis {
            return Err(FdaError::BasisMismatch(
                "data must be expressed in the basis used at fit time".to_string(),
            ));
        }
        let centered = data.coefficients().sub_row_vector(&fitted.mean)?.to_dmatrix();
        let component_coefs = fitted.components.coefficients().to_dmatrix();
        let scores = centered * &fitted.cross_gram * component_coefs.transpose();
        Ok(FdMatrix::from_dmatrix(&scores))
    }

    fn eigenvalues(&self) -> Result<&[f64]> {
        self.fitted
            .as_ref()
            .map(|f| f.eigenvalues.as_slice())
            .ok_or(FdaError::NotFitted("eigenvalues"))
    }

    fn n_components(&self) -> usize {
        self.n_components
    }
}

// ============== Grid variant ==============

#[derive(Debug, Clone)]
struct FittedGridPca {
    components: FDataGrid,
    eigenvalues: Vec<f64>,
    mean: Vec<f64>,
    weights: Vec<f64>,
}

/// Functional PCA of discretized data.
///
/// The L² inner product is approximated with quadrature weights: the
/// trapezoidal rule on the sample points unless explicit weights are given.
/// Components are discretized eigenfunctions with unit norm under those
/// weights.
#[derive(Debug, Clone)]
pub struct FpcaGrid {
    n_components: usize,
    centering: bool,
    weights: Option<Vec<f64>>,
    fitted: Option<FittedGridPca>,
}

impl Default for FpcaGrid {
    fn default() -> Self {
        Self::new(3)
    }
}

impl FpcaGrid {
    /// Estimator for `n_components` components, centered, with trapezoidal
    /// weights.
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            centering: true,
            weights: None,
            fitted: None,
        }
    }

    /// Whether the pointwise mean is removed before the decomposition.
    pub fn with_centering(mut self, centering: bool) -> Self {
        self.centering = centering;
        self
    }

    /// Fixed positive quadrature weights, one per sample point.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Discretized eigenfunctions on the fitted sample points.
    pub fn components(&self) -> Result<&FDataGrid> {
        self.fitted
            .as_ref()
            .map(|f| &f.components)
            .ok_or(FdaError::NotFitted("components"))
    }

    /// Pointwise mean removed at fit time (zero without centering).
    pub fn mean(&self) -> Result<&[f64]> {
        self.fitted
            .as_ref()
            .map(|f| f.mean.as_slice())
            .ok_or(FdaError::NotFitted("mean"))
    }

    fn resolve_weights(&self, sample_points: &[f64]) -> Result<Vec<f64>> {
        match &self.weights {
            Some(w) => {
                if w.len() != sample_points.len() {
                    return Err(FdaError::DimensionMismatch {
                        context: "quadrature weights vs sample points",
                        expected: sample_points.len(),
                        found: w.len(),
                    });
                }
                if let Some(bad) = w.iter().find(|&&v| !v.is_finite() || v <= 0.0) {
                    return Err(FdaError::invalid(
                        "weights",
                        format!("quadrature weights must be positive, got {}", bad),
                    ));
                }
                Ok(w.clone())
            }
            None => Ok(trapezoidal_weights(sample_points)),
        }
    }
}

impl FunctionalPca for FpcaGrid {
    type Data = FDataGrid;

    fn fit(&mut self, data: &FDataGrid) -> Result<()> {
        let (n, m) = data.data().shape();
        check_component_count(self.n_components, n, m, "sample points")?;
        let weights = self.resolve_weights(data.sample_points())?;

        log::debug!(
            "Fitting grid FPCA: {} samples on {} points, {} components",
            n,
            m,
            self.n_components
        );

        let mean = if self.centering {
            data.data().column_means()
        } else {
            vec![0.0; m]
        };
        let mut whitened = data.data().sub_row_vector(&mean)?.to_dmatrix();
        let scale = (n as f64).sqrt();
        for (j, w) in weights.iter().enumerate() {
            whitened.column_mut(j).scale_mut(w.sqrt() / scale);
        }

        let pca = multivariate_pca(&whitened, self.n_components)?;

        let mut eigenfunctions = pca.components;
        for (j, w) in weights.iter().enumerate() {
            eigenfunctions.column_mut(j).scale_mut(1.0 / w.sqrt());
        }

        let components = FDataGrid::with_domain(
            FdMatrix::from_dmatrix(&eigenfunctions),
            data.sample_points().to_vec(),
            data.domain_range(),
        )?;

        self.fitted = Some(FittedGridPca {
            components,
            eigenvalues: pca.singular_values.iter().map(|s| s * s).collect(),
            mean,
            weights,
        });
        Ok(())
    }

    fn transform(&self, data: &FDataGrid) -> Result<FdMatrix> {
        let fitted = self.fitted.as_ref().ok_or(FdaError::NotFitted("transform"))?;
        let expected = fitted.components.sample_points();
        if data.sample_points() != expected {
            return Err(FdaError::SamplePointsMismatch {
                expected: expected.len(),
                found: data.n_points(),
            });
        }
        let mut centered = data.data().sub_row_vector(&fitted.mean)?.to_dmatrix();
        for (j, w) in fitted.weights.iter().enumerate() {
            centered.column_mut(j).scale_mut(*w);
        }
        let eigenfunctions = fitted.components.data().to_dmatrix();
        Ok(FdMatrix::from_dmatrix(&(centered * eigenfunctions.transpose())))
    }

    fn eigenvalues(&self) -> Result<&[f64]> {
        self.fitted
            .as_ref()
            .map(|f| f.eigenvalues.as_slice())
            .ok_or(FdaError::NotFitted("eigenvalues"))
    }

    fn n_components(&self) -> usize {
        self.n_components
    }
}
