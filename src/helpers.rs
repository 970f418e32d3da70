//! Numerical constants, integration weights and grid validation.

use crate::error::{FdaError, Result};

/// Small epsilon for numerical comparisons (e.g., avoiding division by zero).
pub const NUMERICAL_EPS: f64 = 1e-10;

/// Relative tolerance below which a triangular factor's diagonal is treated as zero.
pub const RANK_TOL: f64 = 1e-12;

/// Compute trapezoidal rule integration weights for a non-uniform grid.
///
/// Interior points get half the sum of the two adjacent interval widths and
/// the boundary points a single half-width:
/// `[Δ₁/2, (Δ₁+Δ₂)/2, ..., (Δₘ₋₂+Δₘ₋₁)/2, Δₘ₋₁/2]`.
///
/// # Arguments
/// * `argvals` - Grid points (evaluation points)
///
/// # Returns
/// Vector of integration weights
pub fn trapezoidal_weights(argvals: &[f64]) -> Vec<f64> {
    let n = argvals.len();
    if n < 2 {
        return vec![1.0; n];
    }

    let mut weights = vec![0.0; n];
    for i in 0..n {
        if i == 0 {
            weights[i] = (argvals[1] - argvals[0]) / 2.0;
        } else if i == n - 1 {
            weights[i] = (argvals[n - 1] - argvals[n - 2]) / 2.0;
        } else {
            weights[i] = (argvals[i + 1] - argvals[i - 1]) / 2.0;
        }
    }

    weights
}

/// Check that sample points are finite and strictly increasing.
pub fn validate_sample_points(argvals: &[f64]) -> Result<()> {
    if argvals.is_empty() {
        return Err(FdaError::InvalidSamplePoints(
            "at least one sample point is required".to_string(),
        ));
    }
    if let Some(&bad) = argvals.iter().find(|x| !x.is_finite()) {
        return Err(FdaError::InvalidSamplePoints(format!(
            "point {} is not finite",
            bad
        )));
    }
    if let Some(i) = argvals.windows(2).position(|w| w[1] <= w[0]) {
        return Err(FdaError::InvalidSamplePoints(format!(
            "points must be strictly increasing, but point {} ({}) follows {}",
            i + 1,
            argvals[i + 1],
            argvals[i]
        )));
    }
    Ok(())
}

/// `n` equally spaced points covering `[start, end]`.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + i as f64 * step })
                .collect()
        }
    }
}
