//! Basis systems for representing functional data.
//!
//! A [`Basis`] is a finite family of functions on a [`DomainRange`]. It can be
//! evaluated (with derivatives) at arbitrary points and provides the integral
//! matrices the smoother, PCA and regression need: the Gram matrix, roughness
//! penalties and cross-basis inner products.

use crate::error::{FdaError, Result};
use crate::helpers::{linspace, validate_sample_points};
use crate::quadrature::{merge_breaks, QuadratureRule};
use crate::regularization::LinearDifferentialOperator;
use crate::slice_maybe_parallel;
use nalgebra::DMatrix;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, SQRT_2};
use std::fmt;

/// Maximum B-spline order produced by [`Basis::basis_of_product`].
const MAX_PRODUCT_ORDER: usize = 20;

/// Maximum order of the generic product basis for mixed families.
const MAX_DEFAULT_PRODUCT_ORDER: usize = 8;

/// Gauss-Legendre nodes per panel for trigonometric integrands.
const FOURIER_NODES_PER_PANEL: usize = 16;

/// Closed interval over which a basis is defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DomainRangeRepr")]
pub struct DomainRange {
    pub start: f64,
    pub end: f64,
}

impl DomainRange {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || start >= end {
            return Err(FdaError::invalid(
                "domain_range",
                format!("bounds must be finite with start < end, got [{}, {}]", start, end),
            ));
        }
        Ok(Self { start, end })
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    #[inline]
    pub fn contains(&self, x: f64) -> bool {
        x >= self.start && x <= self.end
    }

    /// Equality up to rounding of the bounds.
    pub fn approx_eq(&self, other: &DomainRange) -> bool {
        let tol = 1e-12 * self.length().abs().max(1.0);
        (self.start - other.start).abs() <= tol && (self.end - other.end).abs() <= tol
    }

    pub(crate) fn ensure_same(&self, other: &DomainRange) -> Result<()> {
        if self.approx_eq(other) {
            Ok(())
        } else {
            Err(FdaError::DomainMismatch {
                left: *self,
                right: *other,
            })
        }
    }
}

#[derive(Deserialize)]
struct DomainRangeRepr {
    start: f64,
    end: f64,
}

impl TryFrom<DomainRangeRepr> for DomainRange {
    type Error = FdaError;

    fn try_from(repr: DomainRangeRepr) -> Result<Self> {
        DomainRange::new(repr.start, repr.end)
    }
}

impl Default for DomainRange {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 1.0,
        }
    }
}

impl fmt::Display for DomainRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

// ============== Fourier ==============

/// Fourier basis of period `T`.
///
/// ```text
/// φ₀(t)    = 1 / (√2 c)
/// φ₂ₙ₋₁(t) = sin(nωt) / c
/// φ₂ₙ(t)   = cos(nωt) / c
/// ```
///
/// with `ω = 2π/T` and `c = √(T/2)`, so the functions are orthonormal when the
/// period equals the domain length. The number of functions is always odd: an
/// even request is incremented by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FourierRepr")]
pub struct Fourier {
    domain: DomainRange,
    n_basis: usize,
    period: f64,
}

impl Fourier {
    /// Fourier basis whose period is the domain length.
    pub fn new(domain: DomainRange, n_basis: usize) -> Self {
        Self {
            domain,
            n_basis: Self::odd(n_basis),
            period: domain.length(),
        }
    }

    pub fn with_period(domain: DomainRange, n_basis: usize, period: f64) -> Result<Self> {
        if !period.is_finite() || period <= 0.0 {
            return Err(FdaError::invalid(
                "period",
                format!("must be finite and positive, got {}", period),
            ));
        }
        Ok(Self {
            domain,
            n_basis: Self::odd(n_basis),
            period,
        })
    }

    fn odd(n_basis: usize) -> usize {
        n_basis + 1 - n_basis % 2
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// Copy on a new domain. With `rescale_period` the period is scaled by the
    /// ratio of the interval lengths, otherwise it is kept.
    pub fn rescale(&self, domain: DomainRange, rescale_period: bool) -> Fourier {
        let period = if rescale_period {
            self.period * domain.length() / self.domain.length()
        } else {
            self.period
        };
        Fourier {
            domain,
            n_basis: self.n_basis,
            period,
        }
    }

    fn is_orthonormal(&self) -> bool {
        (self.period - self.domain.length()).abs() <= 1e-12 * self.period
    }

    fn values_at(&self, x: f64, derivative: usize) -> Vec<f64> {
        let norm = (self.period / 2.0).sqrt();
        let omega = 2.0 * PI / self.period;
        let mut out = vec![0.0; self.n_basis];

        if derivative == 0 {
            out[0] = 1.0 / (SQRT_2 * norm);
        }
        for n in 1..=(self.n_basis - 1) / 2 {
            let a = n as f64 * omega;
            let (s, c) = (a * x).sin_cos();
            let factor = a.powi(derivative as i32) / norm;
            // d/dx shifts the phase by π/2
            let (ds, dc) = match derivative % 4 {
                0 => (s, c),
                1 => (c, -s),
                2 => (-s, -c),
                _ => (-c, s),
            };
            out[2 * n - 1] = factor * ds;
            out[2 * n] = factor * dc;
        }
        out
    }

    fn quadrature_breaks(&self) -> Vec<f64> {
        let cycles = (self.domain.length() / self.period).ceil().max(1.0) as usize;
        let panels = 2 * self.n_basis.max(3) * cycles;
        linspace(self.domain.start, self.domain.end, panels + 1)
    }
}

#[derive(Deserialize)]
struct FourierRepr {
    domain: DomainRange,
    n_basis: usize,
    period: f64,
}

impl TryFrom<FourierRepr> for Fourier {
    type Error = FdaError;

    fn try_from(repr: FourierRepr) -> Result<Self> {
        if repr.n_basis == 0 {
            return Err(FdaError::invalid("n_basis", "must be at least 1"));
        }
        Fourier::with_period(repr.domain, repr.n_basis, repr.period)
    }
}

// ============== B-spline ==============

/// B-spline basis of a given order (degree + 1) on a set of breakpoints.
///
/// `knots` holds the breakpoints including both domain ends; boundary knots
/// are repeated `order` times when evaluating, so the basis has
/// `knots.len() + order - 2` functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BSplineRepr")]
pub struct BSpline {
    domain: DomainRange,
    order: usize,
    knots: Vec<f64>,
}

impl BSpline {
    /// B-spline basis with `n_basis` functions and uniformly spaced knots.
    pub fn new(domain: DomainRange, n_basis: usize, order: usize) -> Result<Self> {
        if order == 0 {
            return Err(FdaError::invalid("order", "B-spline order must be at least 1"));
        }
        if n_basis < order {
            return Err(FdaError::invalid(
                "n_basis",
                format!(
                    "a B-spline basis of order {} needs at least {} functions, got {}",
                    order, order, n_basis
                ),
            ));
        }
        let knots = linspace(domain.start, domain.end, n_basis - order + 2);
        Ok(Self {
            domain,
            order,
            knots,
        })
    }

    /// Cubic B-splines (order 4) with uniform knots.
    pub fn cubic(domain: DomainRange, n_basis: usize) -> Result<Self> {
        Self::new(domain, n_basis, 4)
    }

    pub fn with_knots(domain: DomainRange, order: usize, knots: Vec<f64>) -> Result<Self> {
        if order == 0 {
            return Err(FdaError::invalid("order", "B-spline order must be at least 1"));
        }
        validate_sample_points(&knots)?;
        if knots.len() < 2 {
            return Err(FdaError::invalid("knots", "at least the two domain ends are required"));
        }
        let tol = 1e-12 * domain.length().max(1.0);
        if (knots[0] - domain.start).abs() > tol || (knots[knots.len() - 1] - domain.end).abs() > tol
        {
            return Err(FdaError::invalid(
                "knots",
                format!("first and last knot must match the domain {}", domain),
            ));
        }
        Ok(Self {
            domain,
            order,
            knots,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn n_basis(&self) -> usize {
        self.knots.len() + self.order - 2
    }

    fn extended_knots(&self) -> Vec<f64> {
        let pad = self.order - 1;
        let mut ext = Vec::with_capacity(self.knots.len() + 2 * pad);
        ext.extend(std::iter::repeat(self.domain.start).take(pad));
        ext.extend_from_slice(&self.knots);
        ext.extend(std::iter::repeat(self.domain.end).take(pad));
        ext
    }

    /// De Boor table up to order `order - derivative`, then the derivative
    /// recurrence `B'ᵢ,ₖ = (k-1)(Bᵢ,ₖ₋₁/(tᵢ₊ₖ₋₁-tᵢ) - Bᵢ₊₁,ₖ₋₁/(tᵢ₊ₖ-tᵢ₊₁))`.
    fn values_at(&self, x: f64, derivative: usize) -> Vec<f64> {
        let n_basis = self.n_basis();
        let k = self.order;
        if derivative >= k || !self.domain.contains(x) {
            return vec![0.0; n_basis];
        }

        let t = self.extended_knots();
        let len = t.len();

        // Half-open spans, except the last one which is closed at the domain end
        let last_span = len - k - 1;
        let span = if x >= self.domain.end {
            last_span
        } else {
            (k - 1..=last_span)
                .find(|&j| x >= t[j] && x < t[j + 1])
                .unwrap_or(last_span)
        };

        let mut b = vec![0.0; len - 1];
        b[span] = 1.0;

        for q in 2..=(k - derivative) {
            let mut next = vec![0.0; len - q];
            for i in 0..(len - q) {
                let d1 = t[i + q - 1] - t[i];
                let d2 = t[i + q] - t[i + 1];
                let left = if d1 > 0.0 { (x - t[i]) / d1 * b[i] } else { 0.0 };
                let right = if d2 > 0.0 {
                    (t[i + q] - x) / d2 * b[i + 1]
                } else {
                    0.0
                };
                next[i] = left + right;
            }
            b = next;
        }

        for q in (k - derivative + 1)..=k {
            let mut next = vec![0.0; len - q];
            for i in 0..(len - q) {
                let d1 = t[i + q - 1] - t[i];
                let d2 = t[i + q] - t[i + 1];
                let left = if d1 > 0.0 { b[i] / d1 } else { 0.0 };
                let right = if d2 > 0.0 { b[i + 1] / d2 } else { 0.0 };
                next[i] = (q - 1) as f64 * (left - right);
            }
            b = next;
        }

        b
    }

    fn rescale(&self, domain: DomainRange) -> BSpline {
        let ratio = domain.length() / self.domain.length();
        let mut knots: Vec<f64> = self
            .knots
            .iter()
            .map(|&t| domain.start + (t - self.domain.start) * ratio)
            .collect();
        // Pin the ends against rounding
        if let Some(first) = knots.first_mut() {
            *first = domain.start;
        }
        if let Some(last) = knots.last_mut() {
            *last = domain.end;
        }
        BSpline {
            domain,
            order: self.order,
            knots,
        }
    }
}

#[derive(Deserialize)]
struct BSplineRepr {
    domain: DomainRange,
    order: usize,
    knots: Vec<f64>,
}

impl TryFrom<BSplineRepr> for BSpline {
    type Error = FdaError;

    fn try_from(repr: BSplineRepr) -> Result<Self> {
        BSpline::with_knots(repr.domain, repr.order, repr.knots)
    }
}

// ============== Monomial ==============

/// Monomial basis `1, t, t², ..., tⁿ⁻¹`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MonomialRepr")]
pub struct Monomial {
    domain: DomainRange,
    n_basis: usize,
}

impl Monomial {
    pub fn new(domain: DomainRange, n_basis: usize) -> Result<Self> {
        if n_basis == 0 {
            return Err(FdaError::invalid("n_basis", "must be at least 1"));
        }
        Ok(Self { domain, n_basis })
    }

    fn values_at(&self, x: f64, derivative: usize) -> Vec<f64> {
        (0..self.n_basis)
            .map(|i| {
                if derivative > i {
                    return 0.0;
                }
                let falling: f64 = ((i - derivative + 1)..=i).map(|f| f as f64).product();
                falling * x.powi((i - derivative) as i32)
            })
            .collect()
    }

    /// `∫ tⁱ⁺ʲ dt` over the domain.
    fn gram_matrix(&self) -> DMatrix<f64> {
        let (a, b) = (self.domain.start, self.domain.end);
        DMatrix::from_fn(self.n_basis, self.n_basis, |i, j| {
            let p = (i + j + 1) as i32;
            (b.powi(p) - a.powi(p)) / p as f64
        })
    }
}

#[derive(Deserialize)]
struct MonomialRepr {
    domain: DomainRange,
    n_basis: usize,
}

impl TryFrom<MonomialRepr> for Monomial {
    type Error = FdaError;

    fn try_from(repr: MonomialRepr) -> Result<Self> {
        Monomial::new(repr.domain, repr.n_basis)
    }
}

// ============== Basis ==============

/// A finite basis of functions over a one-dimensional domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Basis {
    Fourier(Fourier),
    BSpline(BSpline),
    Monomial(Monomial),
}

impl From<Fourier> for Basis {
    fn from(b: Fourier) -> Self {
        Basis::Fourier(b)
    }
}

impl From<BSpline> for Basis {
    fn from(b: BSpline) -> Self {
        Basis::BSpline(b)
    }
}

impl From<Monomial> for Basis {
    fn from(b: Monomial) -> Self {
        Basis::Monomial(b)
    }
}

impl Basis {
    /// Number of functions in the basis.
    pub fn n_basis(&self) -> usize {
        match self {
            Basis::Fourier(b) => b.n_basis,
            Basis::BSpline(b) => b.n_basis(),
            Basis::Monomial(b) => b.n_basis,
        }
    }

    pub fn domain_range(&self) -> DomainRange {
        match self {
            Basis::Fourier(b) => b.domain,
            Basis::BSpline(b) => b.domain,
            Basis::Monomial(b) => b.domain,
        }
    }

    /// Evaluate every basis function (or its `derivative`-th derivative).
    ///
    /// Returns a matrix of shape `(n_basis, points.len())`. Points outside the
    /// domain are extrapolated by the family's own formula; non-finite points
    /// are rejected.
    pub fn evaluate(&self, points: &[f64], derivative: usize) -> Result<DMatrix<f64>> {
        if let Some(&bad) = points.iter().find(|x| !x.is_finite()) {
            return Err(FdaError::NonFinitePoint(bad));
        }
        Ok(self.evaluate_unchecked(points, derivative))
    }

    pub(crate) fn evaluate_unchecked(&self, points: &[f64], derivative: usize) -> DMatrix<f64> {
        let columns: Vec<Vec<f64>> = slice_maybe_parallel!(points)
            .map(|&x| self.values_at(x, derivative))
            .collect();
        DMatrix::from_fn(self.n_basis(), points.len(), |i, j| columns[j][i])
    }

    fn values_at(&self, x: f64, derivative: usize) -> Vec<f64> {
        match self {
            Basis::Fourier(b) => b.values_at(x, derivative),
            Basis::BSpline(b) => b.values_at(x, derivative),
            Basis::Monomial(b) => b.values_at(x, derivative),
        }
    }

    /// Matrix of inner products `⟨φᵢ, φⱼ⟩` over the domain, explicitly
    /// symmetrized.
    pub fn gram_matrix(&self) -> DMatrix<f64> {
        let gram = match self {
            Basis::Fourier(b) if b.is_orthonormal() => DMatrix::identity(b.n_basis, b.n_basis),
            Basis::Monomial(b) => b.gram_matrix(),
            _ => {
                let rule = self.quadrature_rule();
                let phi = self.evaluate_unchecked(&rule.nodes, 0);
                weighted_cross_product(&phi, &phi, &rule.weights)
            }
        };
        symmetrize(&gram)
    }

    /// Roughness penalty `Rᵢⱼ = ∫ Lφᵢ(s) Lφⱼ(s) ds`.
    pub fn penalty(&self, operator: &LinearDifferentialOperator) -> DMatrix<f64> {
        let rule = self.quadrature_rule();
        let l_phi = self.apply_operator(operator, &rule.nodes);
        symmetrize(&weighted_cross_product(&l_phi, &l_phi, &rule.weights))
    }

    /// `Lφ` for every basis function at `points`, shape `(n_basis, points.len())`.
    pub(crate) fn apply_operator(
        &self,
        operator: &LinearDifferentialOperator,
        points: &[f64],
    ) -> DMatrix<f64> {
        let mut out = DMatrix::zeros(self.n_basis(), points.len());
        for (order, &w) in operator.weights().iter().enumerate() {
            if w != 0.0 {
                out += self.evaluate_unchecked(points, order) * w;
            }
        }
        out
    }

    /// Cross-Gram matrix `⟨φᵢ, ψⱼ⟩` of shape `(self.n_basis, other.n_basis)`.
    pub fn inner_product(&self, other: &Basis) -> Result<DMatrix<f64>> {
        self.domain_range().ensure_same(&other.domain_range())?;
        if self == other {
            return Ok(self.gram_matrix());
        }
        let breaks = merge_breaks(&self.quadrature_breaks(), &other.quadrature_breaks());
        let n_nodes = self.nodes_per_panel().max(other.nodes_per_panel());
        let rule = QuadratureRule::composite(&breaks, n_nodes);
        let phi = self.evaluate_unchecked(&rule.nodes, 0);
        let psi = other.evaluate_unchecked(&rule.nodes, 0);
        Ok(weighted_cross_product(&phi, &psi, &rule.weights))
    }

    /// Basis able to represent products of functions of `self` and `other`.
    ///
    /// Same-family pairs combine analytically; mixed pairs fall back to a
    /// generic B-spline basis.
    pub fn basis_of_product(&self, other: &Basis) -> Result<Basis> {
        let domain = self.domain_range();
        domain.ensure_same(&other.domain_range())?;

        match (self, other) {
            (Basis::Fourier(a), Basis::Fourier(b))
                if (a.period - b.period).abs() <= 1e-12 * a.period.max(b.period) =>
            {
                Ok(Fourier::with_period(domain, a.n_basis + b.n_basis - 1, a.period)?.into())
            }
            (Basis::Monomial(a), Basis::Monomial(b)) => {
                Ok(Monomial::new(domain, a.n_basis + b.n_basis - 1)?.into())
            }
            (Basis::BSpline(a), Basis::BSpline(b)) => {
                let knots = merge_breaks(&a.knots, &b.knots);
                let order = (a.order + b.order - 1).min(MAX_PRODUCT_ORDER);
                Ok(BSpline::with_knots(domain, order, knots)?.into())
            }
            _ => {
                let total = self.n_basis() + other.n_basis();
                let order = MAX_DEFAULT_PRODUCT_ORDER.min(total);
                let n_basis = total.max(order + 1);
                Ok(BSpline::new(domain, n_basis, order)?.into())
            }
        }
    }

    /// Copy of the basis on a new domain. Fourier periods are kept; use
    /// [`Fourier::rescale`] to scale them with the domain.
    pub fn rescale(&self, domain: DomainRange) -> Basis {
        match self {
            Basis::Fourier(b) => b.rescale(domain, false).into(),
            Basis::BSpline(b) => b.rescale(domain).into(),
            Basis::Monomial(b) => Monomial {
                domain,
                n_basis: b.n_basis,
            }
            .into(),
        }
    }

    fn quadrature_breaks(&self) -> Vec<f64> {
        match self {
            Basis::Fourier(b) => b.quadrature_breaks(),
            Basis::BSpline(b) => b.knots.clone(),
            Basis::Monomial(b) => vec![b.domain.start, b.domain.end],
        }
    }

    /// Nodes per panel making products of two basis functions exact (or, for
    /// Fourier, accurate to rounding).
    fn nodes_per_panel(&self) -> usize {
        match self {
            Basis::Fourier(_) => FOURIER_NODES_PER_PANEL,
            Basis::BSpline(b) => b.order,
            Basis::Monomial(b) => b.n_basis,
        }
    }

    fn quadrature_rule(&self) -> QuadratureRule {
        QuadratureRule::composite(&self.quadrature_breaks(), self.nodes_per_panel())
    }
}

/// `A · diag(w) · Bᵗ` for evaluation matrices sharing quadrature nodes.
fn weighted_cross_product(a: &DMatrix<f64>, b: &DMatrix<f64>, weights: &[f64]) -> DMatrix<f64> {
    let mut bw = b.clone();
    for (j, &w) in weights.iter().enumerate() {
        bw.column_mut(j).scale_mut(w);
    }
    a * bw.transpose()
}

/// `(M + Mᵗ) / 2`, cancelling floating-point asymmetry before a decomposition.
pub fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    (m + m.transpose()) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn unit() -> DomainRange {
        DomainRange::default()
    }

    fn uniform_grid(n: usize) -> Vec<f64> {
        linspace(0.0, 1.0, n)
    }

    fn assert_matrix_close(a: &DMatrix<f64>, b: &DMatrix<f64>, tol: f64) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < tol, "{} vs {} (tol {})", x, y, tol);
        }
    }

    // ============== Domain tests ==============

    #[test]
    fn test_domain_range_validation() {
        assert!(DomainRange::new(0.0, 1.0).is_ok());
        assert!(DomainRange::new(1.0, 1.0).is_err());
        assert!(DomainRange::new(0.0, f64::INFINITY).is_err());
        assert_eq!(format!("{}", unit()), "[0, 1]");
    }

    // ============== Fourier tests ==============

    #[test]
    fn test_fourier_forces_odd_count() {
        let domain = DomainRange::new(0.0, 2.0).unwrap();
        let basis = Basis::from(Fourier::new(domain, 4));
        assert_eq!(basis.n_basis(), 5);

        let values = basis.evaluate(&[0.0, 0.3, 1.7], 0).unwrap();
        assert_eq!(values.shape(), (5, 3));
        let norm = (2.0f64 / 2.0).sqrt();
        for j in 0..3 {
            assert_abs_diff_eq!(values[(0, j)], 1.0 / (SQRT_2 * norm), epsilon = 1e-15);
        }
    }

    #[test]
    fn test_fourier_values_with_short_period() {
        let domain = DomainRange::new(0.0, PI).unwrap();
        let basis = Basis::from(Fourier::with_period(domain, 3, 1.0).unwrap());
        let values = basis.evaluate(&[0.0, PI / 4.0, PI / 2.0, PI], 0).unwrap();
        let expected = [
            [1.0, 1.0, 1.0, 1.0],
            [0.0, -1.38, -0.61, 1.1],
            [1.41, 0.31, -1.28, 0.89],
        ];
        for i in 0..3 {
            for j in 0..4 {
                assert_abs_diff_eq!(values[(i, j)], expected[i][j], epsilon = 0.006);
            }
        }
    }

    #[test]
    fn test_fourier_second_derivative() {
        let basis = Basis::from(Fourier::new(unit(), 5));
        let t = uniform_grid(7);
        let values = basis.evaluate(&t, 0).unwrap();
        let second = basis.evaluate(&t, 2).unwrap();
        let omega = 2.0 * PI;
        for j in 0..t.len() {
            assert_eq!(second[(0, j)], 0.0);
            assert_abs_diff_eq!(second[(1, j)], -omega * omega * values[(1, j)], epsilon = 1e-9);
            assert_abs_diff_eq!(
                second[(4, j)],
                -4.0 * omega * omega * values[(4, j)],
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_fourier_gram_orthonormal() {
        let basis = Basis::from(Fourier::new(unit(), 7));
        assert_eq!(basis.gram_matrix(), DMatrix::identity(7, 7));
    }

    #[test]
    fn test_fourier_gram_numeric_with_short_period() {
        // Two full periods on the domain: every function has squared norm 2
        let basis = Basis::from(Fourier::with_period(unit(), 5, 0.5).unwrap());
        let gram = basis.gram_matrix();
        assert_matrix_close(&gram, &(DMatrix::identity(5, 5) * 2.0), 1e-10);
    }

    #[test]
    fn test_fourier_penalty_second_derivative() {
        let basis = Basis::from(Fourier::new(unit(), 5));
        let penalty = basis.penalty(&LinearDifferentialOperator::derivative(2));
        let w = 2.0 * PI;
        let expected = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![
            0.0,
            w.powi(4),
            w.powi(4),
            (2.0 * w).powi(4),
            (2.0 * w).powi(4),
        ]));
        assert_matrix_close(&penalty, &expected, 1e-6);
    }

    #[test]
    fn test_fourier_rescale_period() {
        let fourier = Fourier::new(unit(), 3);
        let domain = DomainRange::new(0.0, 4.0).unwrap();
        assert_eq!(fourier.rescale(domain, false).period(), 1.0);
        assert_eq!(fourier.rescale(domain, true).period(), 4.0);
        let generic = Basis::from(fourier).rescale(domain);
        assert_eq!(generic.domain_range(), domain);
    }

    // ============== B-spline tests ==============

    #[test]
    fn test_bspline_dimensions() {
        let basis = Basis::from(BSpline::cubic(unit(), 8).unwrap());
        assert_eq!(basis.n_basis(), 8);
        let values = basis.evaluate(&uniform_grid(50), 0).unwrap();
        assert_eq!(values.shape(), (8, 50));
    }

    #[test]
    fn test_bspline_partition_of_unity() {
        let basis = Basis::from(BSpline::cubic(unit(), 10).unwrap());
        let t = uniform_grid(41);
        let values = basis.evaluate(&t, 0).unwrap();
        let first = basis.evaluate(&t, 1).unwrap();
        for j in 0..t.len() {
            let sum: f64 = values.column(j).iter().sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
            let dsum: f64 = first.column(j).iter().sum();
            assert_abs_diff_eq!(dsum, 0.0, epsilon = 1e-9);
            assert!(values.column(j).iter().all(|&v| v >= -1e-14));
        }
    }

    #[test]
    fn test_bspline_linear_hats() {
        // Order 2 with knots 0, 0.5, 1: hat functions
        let basis = Basis::from(BSpline::new(unit(), 3, 2).unwrap());
        let values = basis.evaluate(&[0.0, 0.25, 0.5, 1.0], 0).unwrap();
        assert_abs_diff_eq!(values[(0, 0)], 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(values[(0, 1)], 0.5, epsilon = 1e-14);
        assert_abs_diff_eq!(values[(1, 1)], 0.5, epsilon = 1e-14);
        assert_abs_diff_eq!(values[(1, 2)], 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(values[(2, 3)], 1.0, epsilon = 1e-14);

        let slopes = basis.evaluate(&[0.25], 1).unwrap();
        assert_abs_diff_eq!(slopes[(0, 0)], -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(slopes[(1, 0)], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bspline_zero_outside_domain() {
        let basis = Basis::from(BSpline::cubic(unit(), 6).unwrap());
        let values = basis.evaluate(&[-0.5, 1.5], 0).unwrap();
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_bspline_gram_sums_to_length() {
        let domain = DomainRange::new(-1.0, 2.0).unwrap();
        let basis = Basis::from(BSpline::cubic(domain, 7).unwrap());
        let gram = basis.gram_matrix();
        assert_abs_diff_eq!(gram.sum(), 3.0, epsilon = 1e-12);
        assert_matrix_close(&gram, &gram.transpose(), 1e-15);
    }

    #[test]
    fn test_bspline_penalty_vanishes_beyond_order() {
        let basis = Basis::from(BSpline::new(unit(), 5, 2).unwrap());
        let penalty = basis.penalty(&LinearDifferentialOperator::derivative(2));
        assert!(penalty.iter().all(|&v| v.abs() < 1e-14));
    }

    #[test]
    fn test_bspline_invalid_construction() {
        assert!(BSpline::new(unit(), 3, 4).is_err());
        assert!(BSpline::new(unit(), 3, 0).is_err());
        assert!(BSpline::with_knots(unit(), 4, vec![0.0, 0.5, 0.9]).is_err());
    }

    // ============== Monomial tests ==============

    #[test]
    fn test_monomial_values_and_derivatives() {
        let basis = Basis::from(Monomial::new(unit(), 4).unwrap());
        let values = basis.evaluate(&[2.0], 0).unwrap();
        assert_eq!(values.column(0).iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 4.0, 8.0]);
        let second = basis.evaluate(&[2.0], 2).unwrap();
        assert_eq!(second.column(0).iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0, 2.0, 12.0]);
    }

    #[test]
    fn test_monomial_gram_is_hilbert() {
        let basis = Basis::from(Monomial::new(unit(), 3).unwrap());
        let gram = basis.gram_matrix();
        for i in 0..3 {
            for j in 0..3 {
                assert_abs_diff_eq!(gram[(i, j)], 1.0 / (i + j + 1) as f64, epsilon = 1e-15);
            }
        }
    }

    // ============== Cross-basis tests ==============

    #[test]
    fn test_inner_product_matches_gram_for_same_family() {
        let monomial = Basis::from(Monomial::new(unit(), 3).unwrap());
        let bigger = Basis::from(Monomial::new(unit(), 4).unwrap());
        let cross = monomial.inner_product(&bigger).unwrap();
        assert_eq!(cross.shape(), (3, 4));
        let gram = bigger.gram_matrix();
        for i in 0..3 {
            for j in 0..4 {
                assert_abs_diff_eq!(cross[(i, j)], gram[(i, j)], epsilon = 1e-13);
            }
        }
    }

    #[test]
    fn test_inner_product_constant_with_bspline() {
        let constant = Basis::from(Monomial::new(unit(), 1).unwrap());
        let spline = Basis::from(BSpline::cubic(unit(), 6).unwrap());
        let cross = constant.inner_product(&spline).unwrap();
        assert_eq!(cross.shape(), (1, 6));
        assert_abs_diff_eq!(cross.sum(), 1.0, epsilon = 1e-13);
    }

    #[test]
    fn test_inner_product_domain_mismatch() {
        let a = Basis::from(Monomial::new(unit(), 2).unwrap());
        let b = Basis::from(Monomial::new(DomainRange::new(0.0, 2.0).unwrap(), 2).unwrap());
        let err = a.inner_product(&b).unwrap_err();
        assert!(matches!(err, FdaError::DomainMismatch { .. }));
    }

    #[test]
    fn test_basis_of_product() {
        let f3 = Basis::from(Fourier::new(unit(), 3));
        let f5 = Basis::from(Fourier::new(unit(), 5));
        assert_eq!(f3.basis_of_product(&f5).unwrap(), Basis::from(Fourier::new(unit(), 7)));

        let m2 = Basis::from(Monomial::new(unit(), 2).unwrap());
        let m3 = Basis::from(Monomial::new(unit(), 3).unwrap());
        assert_eq!(m2.basis_of_product(&m3).unwrap().n_basis(), 4);

        let s1 = Basis::from(BSpline::new(unit(), 5, 4).unwrap());
        let s2 = Basis::from(BSpline::new(unit(), 4, 3).unwrap());
        match s1.basis_of_product(&s2).unwrap() {
            Basis::BSpline(b) => {
                assert_eq!(b.order(), 6);
                assert_eq!(b.knots(), &[0.0, 0.5, 1.0]);
            }
            other => panic!("expected B-spline product, got {:?}", other),
        }

        match f3.basis_of_product(&m2).unwrap() {
            Basis::BSpline(b) => {
                assert_eq!(b.order(), 5);
                assert_eq!(b.n_basis(), 6);
            }
            other => panic!("expected generic B-spline product, got {:?}", other),
        }

        let other_period = Basis::from(Fourier::with_period(unit(), 3, 0.5).unwrap());
        assert!(matches!(f3.basis_of_product(&other_period).unwrap(), Basis::BSpline(_)));
    }

    #[test]
    fn test_evaluate_rejects_non_finite() {
        let basis = Basis::from(Monomial::new(unit(), 2).unwrap());
        let err = basis.evaluate(&[0.0, f64::NAN], 0).unwrap_err();
        assert!(matches!(err, FdaError::NonFinitePoint(_)));
    }
}
