use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rigidcore::collision::{intersect, DynamicAabbTree};
use rigidcore::geometry::Aabb;
use rigidcore::prelude::*;

/// Floor plus an `n`-body grid of alternating spheres and boxes
fn build_world(n: usize) -> World {
    let mut world = World::default();
    world
        .add_body(RigidBodyDesc::fixed(Shape::cuboid(Vec3::new(50.0, 0.5, 50.0))))
        .expect("floor");

    let side = (n as f32).sqrt().ceil() as usize;
    for i in 0..n {
        let x = (i % side) as f32 * 1.2 - side as f32 * 0.6;
        let z = (i / side) as f32 * 1.2 - side as f32 * 0.6;
        let shape = if i % 2 == 0 {
            Shape::sphere(0.5)
        } else {
            Shape::cuboid(Vec3::splat(0.45))
        };
        world
            .add_body(
                RigidBodyDesc::dynamic(shape)
                    .with_position(Vec3::new(x, 1.0 + (i % 3) as f32, z))
                    .with_mass(1.0),
            )
            .expect("body");
    }
    world
}

fn bench_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    for &n in &[10usize, 100, 500] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || {
                    let mut world = build_world(n);
                    // Let contacts form so the solver has work to do
                    for _ in 0..30 {
                        world.step(1.0 / 60.0).expect("warmup step");
                    }
                    world
                },
                |mut world| {
                    let report = world.step(1.0 / 60.0).expect("step");
                    black_box(report);
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_tree_query(c: &mut Criterion) {
    let mut tree = DynamicAabbTree::new();
    for i in 0..1_000u32 {
        let p = Vec3::new((i % 10) as f32, ((i / 10) % 10) as f32, (i / 100) as f32) * 2.0;
        tree.insert(Aabb::from_center_half_extents(p, Vec3::splat(0.75)), i);
    }
    let region = Aabb::from_center_half_extents(Vec3::splat(9.0), Vec3::splat(3.0));

    c.bench_function("tree_query_1000", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            tree.query(black_box(region), |_, _| hits += 1);
            hits
        })
    });
}

fn bench_narrow_phase(c: &mut Criterion) {
    let cube = Shape::cuboid(Vec3::splat(0.5));
    let capsule = Shape::capsule(0.3, 0.6);
    let pose_a = Transform::IDENTITY;
    let pose_b = Transform::new(Vec3::new(0.3, 0.7, 0.1), Quat::from_rotation_z(0.6));

    c.bench_function("gjk_epa_box_capsule", |b| {
        b.iter(|| intersect(black_box(&cube), &pose_a, black_box(&capsule), &pose_b))
    });
}

criterion_group!(benches, bench_world_step, bench_tree_query, bench_narrow_phase);
criterion_main!(benches);
