//! Statistics for the one-way functional ANOVA test of Cuevas, Febrero-Bande
//! and Fraiman (2004).
//!
//! Both statistics aggregate pairwise Lp distances between samples (usually
//! group means) with per-sample weights (usually group sizes). Distances use
//! the trapezoidal rule on the sample points.

use crate::error::{FdaError, Result};
use crate::fdata::FDataGrid;
use crate::helpers::trapezoidal_weights;
use crate::iter_maybe_parallel;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

fn check_inputs(fd: &FDataGrid, weights: &[f64], p: f64) -> Result<()> {
    if p.is_nan() || p < 1.0 {
        return Err(FdaError::invalid(
            "p",
            format!("must be at least 1 (or infinite), got {}", p),
        ));
    }
    if weights.len() != fd.n_samples() {
        return Err(FdaError::DimensionMismatch {
            context: "weights vs samples",
            expected: fd.n_samples(),
            found: weights.len(),
        });
    }
    Ok(())
}

/// `‖a − scale·b‖ₚᵖ`, or the sup norm for infinite `p`.
fn lp_distance_pow(a: &[f64], b: &[f64], scale: f64, quad: &[f64], p: f64) -> f64 {
    let diffs = a.iter().zip(b).map(|(x, y)| (x - scale * y).abs());
    if p.is_infinite() {
        return diffs.fold(0.0, f64::max);
    }
    diffs.zip(quad).map(|(d, w)| d.powf(p) * w).sum()
}

/// Sum over pairs `i > j` of `f(i, j)`, in a fixed order.
fn sum_over_pairs<F>(n: usize, f: F) -> f64
where
    F: Fn(usize, usize) -> f64 + Sync + Send,
{
    let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (0..i).map(move |j| (i, j))).collect();
    let terms: Vec<f64> = iter_maybe_parallel!(pairs).map(|(i, j)| f(i, j)).collect();
    terms.iter().sum()
}

/// `Vₙ = Σ_{i>j} wⱼ ‖fᵢ − fⱼ‖ₚᵖ`.
///
/// # Examples
///
/// ```
/// use skfda_core::anova::v_sample_stat;
/// use skfda_core::fdata::FDataGrid;
/// use skfda_core::matrix::FdMatrix;
///
/// let t = vec![0.0, 0.5, 1.0];
/// let data = FdMatrix::from_rows(&[vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]]).unwrap();
/// let fd = FDataGrid::new(data, t).unwrap();
///
/// let v = v_sample_stat(&fd, &[2.0, 5.0], 2.0).unwrap();
/// assert!((v - 2.0).abs() < 1e-12);
/// ```
pub fn v_sample_stat(fd: &FDataGrid, weights: &[f64], p: f64) -> Result<f64> {
    check_inputs(fd, weights, p)?;
    let quad = trapezoidal_weights(fd.sample_points());
    let rows = fd.data().rows();
    Ok(sum_over_pairs(fd.n_samples(), |i, j| {
        weights[j] * lp_distance_pow(&rows[i], &rows[j], 1.0, &quad, p)
    }))
}

/// `Σ_{i>j} ‖fⱼ − √(wⱼ/wᵢ) fᵢ‖ₚᵖ`. Every weight must be non-zero.
pub fn v_asymptotic_stat(fd: &FDataGrid, weights: &[f64], p: f64) -> Result<f64> {
    check_inputs(fd, weights, p)?;
    if weights.iter().any(|&w| w == 0.0) {
        return Err(FdaError::invalid("weights", "all weights must be non-zero"));
    }
    let quad = trapezoidal_weights(fd.sample_points());
    let rows = fd.data().rows();
    Ok(sum_over_pairs(fd.n_samples(), |i, j| {
        let scale = (weights[j] / weights[i]).sqrt();
        lp_distance_pow(&rows[j], &rows[i], scale, &quad, p)
    }))
}
