//! Physics benchmarks (criterion - wall-clock time).
//!
//! Run all:    cargo bench --manifest-path benchmarks/Cargo.toml --bench physics
//! Filter:     cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- narrowphase

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::DVec2;
use rein2d::ecs::components::physics::ColliderShape;
use rein2d::ecs::components::transform::Transform2d;
use rein2d::physics::contact::ContactManifold;
use rein2d::physics::narrowphase::{
    box_polygon_manifold, circle_circle, circle_polygon_manifold, detect_pair, obb_obb, ray_polygon,
};
use rein2d::physics::raycast::Ray;
use rein2d::physics::solver::{BodyState, CorrectionParams, resolve_against_static};
use rein2d_bench::*;

const EPS: f64 = 1e-4;
const EPS_SMALL: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Narrowphase
// ---------------------------------------------------------------------------

fn bench_narrowphase(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("narrowphase/circle_circle");
        group.bench_function("intersecting", |b| {
            b.iter(|| circle_circle(DVec2::ZERO, 1.0, DVec2::new(1.5, 0.0), 1.0));
        });
        group.bench_function("separated", |b| {
            b.iter(|| circle_circle(DVec2::ZERO, 1.0, DVec2::new(5.0, 0.0), 1.0));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/obb_obb");
        let half = DVec2::ONE;
        group.bench_function("intersecting", |b| {
            b.iter(|| obb_obb(DVec2::ZERO, half, 0.0, DVec2::new(1.5, 0.0), half, 0.0));
        });
        group.bench_function("separated", |b| {
            b.iter(|| obb_obb(DVec2::ZERO, half, 0.0, DVec2::new(5.0, 0.0), half, 0.0));
        });
        group.bench_function("rotated", |b| {
            b.iter(|| obb_obb(DVec2::ZERO, half, 0.0, DVec2::new(1.5, 0.5), half, 0.785));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/box_polygon");
        let floor = floor_polygon(20.0);
        let half = DVec2::ONE;
        group.bench_function("flat", |b| {
            b.iter(|| box_polygon_manifold(DVec2::new(0.0, 0.95), half, 0.0, &floor, EPS, EPS_SMALL));
        });
        group.bench_function("corner", |b| {
            b.iter(|| box_polygon_manifold(DVec2::new(0.0, 1.35), half, 0.785, &floor, EPS, EPS_SMALL));
        });
        group.bench_function("separated", |b| {
            b.iter(|| box_polygon_manifold(DVec2::new(0.0, 3.0), half, 0.0, &floor, EPS, EPS_SMALL));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/circle_polygon");
        let floor = floor_polygon(20.0);
        group.bench_function("intersecting", |b| {
            b.iter(|| circle_polygon_manifold(DVec2::new(0.0, 0.9), 1.0, &floor, EPS));
        });
        group.bench_function("separated", |b| {
            b.iter(|| circle_polygon_manifold(DVec2::new(0.0, 3.0), 1.0, &floor, EPS));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/dispatch");
        let shape_a = ColliderShape::Box {
            half_extents: DVec2::ONE,
        };
        let shape_b = ColliderShape::Circle { radius: 1.0 };
        let ta = Transform2d::identity();
        let tb = Transform2d::from_position(DVec2::new(1.8, 0.2));
        group.bench_function("box_circle", |b| {
            b.iter(|| detect_pair(&shape_a, &ta, &shape_b, &tb));
        });
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

fn bench_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver/static");
    let params = CorrectionParams {
        slop: 0.005,
        percentage: 0.8,
    };
    let manifold = ContactManifold::pair(
        DVec2::Y,
        DVec2::new(-1.0, 0.0),
        DVec2::new(1.0, 0.0),
        0.05,
    );
    let body = BodyState {
        position: DVec2::new(0.0, 0.95),
        linear_velocity: DVec2::new(1.0, -5.0),
        angular_velocity: 0.3,
        inv_mass: 1.0,
        inv_inertia: 1.5,
        restitution: 0.6,
        restitution_threshold: 0.5,
        friction: 0.2,
        min_velocity: DVec2::splat(0.01),
        min_angular_velocity: 0.01,
    };
    group.bench_function("two_contacts", |b| {
        b.iter(|| {
            let mut state = body;
            resolve_against_static(&mut state, &manifold, 0.4, params)
        });
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

fn bench_pipeline(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("pipeline/tick");
        group.sample_size(30);
        for &n in &[10, 50, 100, 200] {
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
                b.iter_batched(
                    || settled_scene(n, 100).expect("scene setup"),
                    |(mut world, mut physics)| {
                        physics.tick(&mut world);
                    },
                    criterion::BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("pipeline/sustained_10frames");
        group.sample_size(20);
        for &n in &[50, 100] {
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
                b.iter_batched(
                    || setup_scene(n).expect("scene setup"),
                    |(mut world, mut physics)| {
                        for _ in 0..10 {
                            physics.step(&mut world, 1.0 / 60.0);
                        }
                    },
                    criterion::BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Ray casting
// ---------------------------------------------------------------------------

fn bench_raycast(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("raycast/polygon");
        let floor = floor_polygon(20.0);
        group.bench_function("hit", |b| {
            b.iter(|| ray_polygon(DVec2::new(0.0, 5.0), DVec2::NEG_Y, &floor, f64::INFINITY, EPS_SMALL));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("raycast/scene");
        for &n in &[50, 200] {
            let (world, mut physics) = setup_scene(n).expect("scene setup");
            let ray = Ray::new(DVec2::new(-100.0, 1.5), DVec2::X);
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| physics.ray_cast(&world, &ray));
            });
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_narrowphase,
    bench_solver,
    bench_pipeline,
    bench_raycast,
);
criterion_main!(benches);
