//! Shared setup helpers for rein2d benchmarks.
//!
//! ## Running
//!
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- narrowphase

use glam::DVec2;
use rein2d::ecs::components::physics::{Collider, RigidBody};
use rein2d::ecs::components::transform::Transform2d;
use rein2d::physics::geometry::ConvexPolygon;
use rein2d::physics::{ColliderDesc, PhysicsConfig, PhysicsWorld};

/// Floor slab whose top edge lies on y = 0.
pub fn floor_points(half_width: f64) -> [DVec2; 4] {
    [
        DVec2::new(-half_width, -1.0),
        DVec2::new(half_width, -1.0),
        DVec2::new(half_width, 0.0),
        DVec2::new(-half_width, 0.0),
    ]
}

pub fn floor_polygon(half_width: f64) -> ConvexPolygon {
    ConvexPolygon::new(&floor_points(half_width)).expect("floor outline is convex")
}

/// `n` bodies stacked in columns above a wide floor, alternating boxes and
/// circles. Every body is attached.
pub fn setup_scene(n: usize) -> anyhow::Result<(hecs::World, PhysicsWorld)> {
    let mut world = hecs::World::new();
    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    let cols = (n as f64).sqrt().ceil() as usize;

    physics.add_static_polygon(
        &mut world,
        &floor_points(cols as f64 * 2.0 + 10.0),
        ColliderDesc::default(),
    )?;

    for i in 0..n {
        let x = (i % cols) as f64 * 2.5 - cols as f64 * 1.25;
        let y = 1.5 + (i / cols) as f64 * 2.5;
        let collider = if i % 2 == 0 {
            Collider::cuboid(DVec2::splat(0.5))
        } else {
            Collider::circle(0.5)
        };
        let entity = world.spawn((
            Transform2d::from_position(DVec2::new(x, y)),
            RigidBody::new(1.0),
            collider.with_friction(0.2),
        ));
        physics.attach_body(&world, entity)?;
    }

    Ok((world, physics))
}

/// Scene that has already run `ticks` ticks, so bodies are in contact.
pub fn settled_scene(n: usize, ticks: usize) -> anyhow::Result<(hecs::World, PhysicsWorld)> {
    let (mut world, mut physics) = setup_scene(n)?;
    for _ in 0..ticks {
        physics.tick(&mut world);
    }
    Ok((world, physics))
}
