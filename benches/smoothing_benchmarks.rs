//! Benchmarks for basis smoothing and functional PCA
//!
//! Compares performance of:
//! - The three penalized least-squares solvers (Cholesky, QR, explicit matrix)
//! - Reusing a cached smoothing operator across datasets
//! - Functional PCA on basis coefficients and on discretized samples

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use skfda_core::basis::{BSpline, Basis, DomainRange};
use skfda_core::fdata::FDataGrid;
use skfda_core::fpca::{FpcaBasis, FpcaGrid, FunctionalPca};
use skfda_core::helpers::linspace;
use skfda_core::matrix::FdMatrix;
use skfda_core::regularization::Regularization;
use skfda_core::smoothing::BasisSmoother;
use skfda_core::solver::SolverMethod;
use std::f64::consts::PI;

/// Generate `n` noisy sine curves on `m` points
fn generate_curves(n: usize, m: usize) -> FDataGrid {
    let t = linspace(0.0, 1.0, m);
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            t.iter()
                .enumerate()
                .map(|(j, &x)| {
                    let signal = (2.0 * PI * x + 0.1 * i as f64).sin();
                    // Deterministic pseudo-noise for reproducibility
                    let noise = 0.1 * ((17.3 * (i * m + j) as f64).sin());
                    signal + noise
                })
                .collect()
        })
        .collect();
    // Generated rows are rectangular and the grid is strictly increasing
    FDataGrid::new(FdMatrix::from_rows(&rows).unwrap(), t).unwrap()
}

fn spline(n_basis: usize) -> Basis {
    BSpline::cubic(DomainRange::default(), n_basis).unwrap().into()
}

fn smoother(n_basis: usize, method: SolverMethod) -> BasisSmoother {
    BasisSmoother::new(spline(n_basis))
        .with_method(method)
        .with_smoothing_parameter(1e-4)
        .with_regularization(Regularization::DerivativeOrder(2))
}

/// Benchmark the solvers with a growing number of sample points
fn bench_solvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("smoothing_solvers");

    for size in [50, 100, 200, 500].iter() {
        let data = generate_curves(20, *size);
        for method in [SolverMethod::Cholesky, SolverMethod::Qr, SolverMethod::Matrix] {
            group.bench_with_input(BenchmarkId::new(method.to_string(), size), size, |b, _| {
                b.iter(|| smoother(15, method).fit_transform(black_box(&data)))
            });
        }
    }

    group.finish();
}

/// Benchmark transform with a warm operator cache
fn bench_cached_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_transform");

    for n in [10, 100, 1000].iter() {
        let data = generate_curves(*n, 200);
        let mut fitted = smoother(20, SolverMethod::Matrix);
        fitted.fit(&data).unwrap();
        group.bench_with_input(BenchmarkId::new("matrix", n), n, |b, _| {
            b.iter(|| fitted.transform(black_box(&data)))
        });
        group.bench_with_input(BenchmarkId::new("cholesky", n), n, |b, _| {
            b.iter(|| smoother(20, SolverMethod::Cholesky).fit_transform(black_box(&data)))
        });
    }

    group.finish();
}

/// Benchmark FPCA on coefficients vs discretized samples
fn bench_fpca(c: &mut Criterion) {
    let mut group = c.benchmark_group("fpca");

    for n in [50, 200, 1000].iter() {
        let grid = generate_curves(*n, 101);
        let coefs = grid.to_basis(&spline(15)).unwrap();
        group.bench_with_input(BenchmarkId::new("basis", n), n, |b, _| {
            b.iter(|| FpcaBasis::new(3).fit_transform(black_box(&coefs)))
        });
        group.bench_with_input(BenchmarkId::new("grid", n), n, |b, _| {
            b.iter(|| FpcaGrid::new(3).fit_transform(black_box(&grid)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_solvers, bench_cached_transform, bench_fpca);
criterion_main!(benches);
