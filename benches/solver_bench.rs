// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use eikonal_fmm::batch::solve_shots;
use eikonal_fmm::core::CartesianGrid;
use eikonal_fmm::medium::{VtiModel, VtiParams};
use eikonal_fmm::options::{Scheme, SolverOptions};
use eikonal_fmm::solver::{FmmSolver, PointSource};
use eikonal_fmm::update_kernels::{solve_local_eikonal, AxisSample, LocalMedium};

fn grid_2d(n: usize) -> CartesianGrid<2> {
    CartesianGrid::<2>::new([n, n], [1.0, 1.0], vec![1.0; n * n]).unwrap()
}

fn grid_3d(n: usize) -> CartesianGrid<3> {
    CartesianGrid::<3>::new([n, n, n], [1.0; 3], vec![1.0; n * n * n]).unwrap()
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Local update in isolation: isotropic quadratic vs VTI bisection.
fn bench_local_update(c: &mut Criterion) {
    let samples = [
        AxisSample {
            axis: 0,
            time: 1.0,
            spacing: 1.0,
        },
        AxisSample {
            axis: 1,
            time: 1.2,
            spacing: 1.0,
        },
        AxisSample {
            axis: 2,
            time: 1.3,
            spacing: 1.0,
        },
    ];
    let iso = LocalMedium::Isotropic { slowness: 1.0 };
    let vti = LocalMedium::Vti {
        params: VtiParams {
            vp0: 1.0,
            epsilon: 0.2,
            delta: 0.1,
        },
        symmetry_axis: 2,
    };
    let mut group = c.benchmark_group("local_update_3axis");
    group.bench_function("isotropic", |b| {
        b.iter(|| solve_local_eikonal(black_box(&samples), black_box(&iso)))
    });
    group.bench_function("vti", |b| {
        b.iter(|| solve_local_eikonal(black_box(&samples), black_box(&vti)))
    });
    group.finish();
}

/// Grid size scaling: single source in the center of 2D grids.
fn bench_grid_size_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_size_scaling");
    for &n in &[128, 256, 512] {
        let grid = grid_2d(n);
        let center = (n / 2) as f64;
        group.bench_function(format!("{}x{}", n, n), |b| {
            b.iter(|| {
                let mut solver = FmmSolver::new(&grid, SolverOptions::default()).unwrap();
                solver.add_source([center, center], 0.0).unwrap();
                black_box(solver.solve().unwrap())
            });
        });
    }
    group.finish();
}

/// 3D: 64^3 homogeneous, isotropic and VTI schemes.
fn bench_3d(c: &mut Criterion) {
    let n = 64;
    let iso_grid = grid_3d(n);
    let model = VtiModel::uniform(
        n * n * n,
        VtiParams {
            vp0: 1.0,
            epsilon: 0.2,
            delta: 0.1,
        },
        2,
    );
    let vti_grid = CartesianGrid::<3>::new_vti([n, n, n], [1.0; 3], model).unwrap();
    let center = (n / 2) as f64;

    let mut group = c.benchmark_group("3d_64x64x64");
    group.bench_function("isotropic", |b| {
        b.iter(|| {
            let mut solver = FmmSolver::new(&iso_grid, SolverOptions::default()).unwrap();
            solver.add_source([center; 3], 0.0).unwrap();
            black_box(solver.solve().unwrap())
        });
    });
    let vti_opts = SolverOptions {
        scheme: Scheme::Vti,
        ..Default::default()
    };
    group.bench_function("vti", |b| {
        b.iter(|| {
            let mut solver = FmmSolver::new(&vti_grid, vti_opts.clone()).unwrap();
            solver.add_source([center; 3], 0.0).unwrap();
            black_box(solver.solve().unwrap())
        });
    });
    group.finish();
}

/// Shot scaling: 16 shots on a 256^2 grid, 1 thread vs all cores.
fn bench_shot_scaling(c: &mut Criterion) {
    let cpus = num_cpus();
    let grid = grid_2d(256);
    let shots: Vec<PointSource<2>> = (0..16)
        .map(|k| PointSource::at([k as f64 * 16.0, 128.0]))
        .collect();
    let opts = SolverOptions::default();

    let mut group = c.benchmark_group("shots_16_256x256");
    for threads in [1, cpus] {
        group.bench_function(format!("{}threads", threads), |b| {
            b.iter(|| black_box(solve_shots(&grid, &shots, &opts, Some(threads)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_local_update,
    bench_grid_size_scaling,
    bench_3d,
    bench_shot_scaling,
);
criterion_main!(benches);
