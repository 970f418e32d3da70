//! Composite Gauss-Legendre quadrature on a partition of the domain.
//!
//! Gram, penalty and cross-basis matrices are all integrals of products of
//! basis functions. Splitting the domain at the bases' breakpoints keeps the
//! integrands smooth on every panel, so a fixed number of nodes per panel is
//! exact for piecewise polynomials and accurate to rounding for trigonometric
//! bases.

use std::f64::consts::PI;

/// Nodes and weights of a composite quadrature rule.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureRule {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

impl QuadratureRule {
    /// Composite rule with `n_nodes` Gauss-Legendre nodes on every panel
    /// `[breaks[i], breaks[i + 1]]`. Zero-width panels are skipped.
    pub fn composite(breaks: &[f64], n_nodes: usize) -> Self {
        let (ref_nodes, ref_weights) = gauss_legendre_nodes_weights(n_nodes.max(1));
        let panels = breaks.len().saturating_sub(1);

        let mut nodes = Vec::with_capacity(panels * ref_nodes.len());
        let mut weights = Vec::with_capacity(panels * ref_nodes.len());
        for w in breaks.windows(2) {
            let (a, b) = (w[0], w[1]);
            if b - a <= 0.0 {
                continue;
            }
            let half_width = (b - a) / 2.0;
            let center = (a + b) / 2.0;
            for (x, wt) in ref_nodes.iter().zip(ref_weights.iter()) {
                nodes.push(center + half_width * x);
                weights.push(half_width * wt);
            }
        }

        Self { nodes, weights }
    }
}

/// Merge two sorted breakpoint lists into one sorted list without duplicates.
pub fn merge_breaks(left: &[f64], right: &[f64]) -> Vec<f64> {
    let mut all: Vec<f64> = left.iter().chain(right.iter()).copied().collect();
    all.sort_by(|a, b| a.total_cmp(b));
    all.dedup_by(|a, b| (*a - *b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0));
    all
}

/// Compute Gauss-Legendre nodes and weights on `[-1, 1]`.
///
/// Newton iteration on the Legendre polynomial from a Chebyshev initial guess.
fn gauss_legendre_nodes_weights(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];

    let m = n.div_ceil(2);

    for i in 0..m {
        let mut z = ((i as f64 + 0.75) / (n as f64 + 0.5) * PI).cos();

        for _ in 0..100 {
            let (p, dp) = legendre_p_and_dp(n, z);
            let z_new = z - p / dp;
            if (z_new - z).abs() < 1e-15 {
                z = z_new;
                break;
            }
            z = z_new;
        }

        let (_, dp) = legendre_p_and_dp(n, z);
        let w = 2.0 / ((1.0 - z * z) * dp * dp);

        nodes[i] = -z;
        nodes[n - 1 - i] = z;
        weights[i] = w;
        weights[n - 1 - i] = w;
    }

    (nodes, weights)
}

/// Evaluate Legendre polynomial P_n(x) and its derivative.
fn legendre_p_and_dp(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }
    if n == 1 {
        return (x, 1.0);
    }

    let mut p_prev = 1.0;
    let mut p_curr = x;

    for k in 2..=n {
        let p_next = ((2 * k - 1) as f64 * x * p_curr - (k - 1) as f64 * p_prev) / k as f64;
        p_prev = p_curr;
        p_curr = p_next;
    }

    let dp = n as f64 * (x * p_curr - p_prev) / (x * x - 1.0);

    (p_curr, dp)
}
