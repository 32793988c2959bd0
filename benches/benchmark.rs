//! # benchmark
//!
//! Benchmarking suite.

use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::{array, Array2};
use rand::prelude::*;
use rand_distr::Normal;

use sweepflow::geometry::polytope::cuboid_interior_mask;
use sweepflow::geometry::se3::SE3;
use sweepflow::geometry::so3::{quat_to_mat3, yaw_to_quat};

const NUM_POINTS: usize = 131072;

fn random_points(num_points: usize) -> Array2<f64> {
    let normal = Normal::new(0.0, 25.0).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    Array2::from_shape_fn((num_points, 3), |_| normal.sample(&mut rng))
}

fn so3_benchmark(c: &mut Criterion) {
    let quat_wxyz = yaw_to_quat(0.5);
    c.bench_function("quat_to_mat3", |b| b.iter(|| quat_to_mat3(&quat_wxyz.view())));
}

fn se3_benchmark(c: &mut Criterion) {
    let city_se3_ego = SE3 {
        rotation: quat_to_mat3(&yaw_to_quat(0.5).view()),
        translation: array![5.0, -2.0, 0.3],
    };
    let points_ego = random_points(NUM_POINTS);
    c.bench_function("transform_from", |b| {
        b.iter(|| city_se3_ego.transform_from(&points_ego.view()))
    });
}

fn polytope_benchmark(c: &mut Criterion) {
    let points = random_points(NUM_POINTS);
    let ego_se3_object = SE3 {
        rotation: quat_to_mat3(&yaw_to_quat(-0.25).view()),
        translation: array![10.0, 4.0, 0.0],
    };
    let dims_lwh = array![4.6, 1.9, 1.7];
    c.bench_function("cuboid_interior_mask", |b| {
        b.iter(|| cuboid_interior_mask(&points.view(), &ego_se3_object, &dims_lwh.view()))
    });
}

criterion_group!(benches, so3_benchmark, se3_benchmark, polytope_benchmark);
criterion_main!(benches);
