//! End-to-end simulation scenarios driven tick by tick.

use rein2d::glam::DVec2;
use rein2d::physics::ColliderDesc;
use rein2d::{
    Collider, ColliderFlags, PhysicsConfig, PhysicsWorld, Ray, RigidBody, Transform2d,
};

const FLOOR: [DVec2; 4] = [
    DVec2::new(-20.0, -1.0),
    DVec2::new(20.0, -1.0),
    DVec2::new(20.0, 0.0),
    DVec2::new(-20.0, 0.0),
];

fn floor_scene() -> (hecs::World, PhysicsWorld) {
    let mut world = hecs::World::new();
    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    physics
        .add_static_polygon(&mut world, &FLOOR, ColliderDesc::default())
        .unwrap();
    (world, physics)
}

fn spawn_falling_box(world: &mut hecs::World, position: DVec2, velocity: DVec2) -> hecs::Entity {
    let mut rb = RigidBody::new(1.0);
    rb.linear_velocity = velocity;
    rb.restitution = 0.6;
    world.spawn((
        Transform2d::from_position(position),
        rb,
        Collider::cuboid(DVec2::ONE).with_friction(0.2),
    ))
}

/// Tick until the first static contact. Returns the vertical velocity just
/// before that tick and the body state right after it.
fn tick_until_contact(
    world: &mut hecs::World,
    physics: &mut PhysicsWorld,
    entity: hecs::Entity,
) -> (f64, DVec2, DVec2) {
    for _ in 0..2000 {
        let before = world.get::<&RigidBody>(entity).unwrap().linear_velocity.y;
        physics.tick(world);
        if physics.last_tick_stats().static_contacts > 0 {
            let position = world.get::<&Transform2d>(entity).unwrap().position;
            let velocity = world.get::<&RigidBody>(entity).unwrap().linear_velocity;
            return (before, position, velocity);
        }
    }
    panic!("box never reached the floor");
}

#[test]
fn test_falling_box_bounces_off_floor() {
    let (mut world, mut physics) = floor_scene();
    let entity = spawn_falling_box(&mut world, DVec2::new(0.0, 5.0), DVec2::new(0.0, -5.0));
    physics.attach_body(&world, entity).unwrap();

    let (incoming, position, velocity) = tick_until_contact(&mut world, &mut physics, entity);
    let gravity_step = 9.81 * physics.config().fixed_timestep;

    assert!(velocity.y > 0.0, "box should bounce: vy = {}", velocity.y);
    assert!(
        velocity.y <= 0.6 * (incoming.abs() + gravity_step) + 0.05,
        "bounce {} exceeds restitution bound for incoming {}",
        velocity.y,
        incoming
    );
    assert!(
        position.y - 1.0 >= 0.0,
        "box bottom still below the floor: {}",
        position.y - 1.0
    );
    assert_eq!(velocity.x, 0.0);
}

#[test]
fn test_box_just_above_floor_bounces_near_restitution() {
    let (mut world, mut physics) = floor_scene();
    let entity = spawn_falling_box(&mut world, DVec2::new(0.0, 1.05), DVec2::new(0.0, -5.0));
    physics.attach_body(&world, entity).unwrap();

    let (_, position, velocity) = tick_until_contact(&mut world, &mut physics, entity);

    assert!(velocity.y > 0.0, "box should bounce: vy = {}", velocity.y);
    assert!(velocity.y < 3.2, "bounce {} should be about 0.6 * 5", velocity.y);
    assert!(position.y >= 1.0, "box bottom below the floor: y = {}", position.y);
}

#[test]
fn test_circle_rolls_down_ramp() {
    let mut world = hecs::World::new();
    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    // Slope falling to the right.
    physics
        .add_static_polygon(
            &mut world,
            &[DVec2::new(-10.0, 5.0), DVec2::new(-10.0, -1.0), DVec2::new(10.0, -1.0)],
            ColliderDesc {
                flags: ColliderFlags::RAMP,
                ..ColliderDesc::default()
            },
        )
        .unwrap();
    let ball = world.spawn((
        Transform2d::from_position(DVec2::new(-5.0, 4.0)),
        RigidBody::new(1.0),
        Collider::circle(0.5),
    ));
    physics.attach_body(&world, ball).unwrap();

    for _ in 0..400 {
        physics.tick(&mut world);
    }

    let position = world.get::<&Transform2d>(ball).unwrap().position;
    assert!(position.x > -5.0, "ball should move down the slope: x = {}", position.x);
    assert!(position.y < 4.0);
}

#[test]
fn test_ray_cast_returns_nearest_matching_hit() {
    let (mut world, mut physics) = floor_scene();
    let enemy = world.spawn((
        Transform2d::from_position(DVec2::new(0.0, 3.0)),
        RigidBody::new(1.0),
        Collider::circle(0.5).with_flags(ColliderFlags::ENEMY),
    ));
    let player = world.spawn((
        Transform2d::from_position(DVec2::new(0.0, 6.0)),
        RigidBody::new(1.0),
        Collider::cuboid(DVec2::splat(0.5)).with_flags(ColliderFlags::PLAYER),
    ));
    physics.attach_body(&world, enemy).unwrap();
    physics.attach_body(&world, player).unwrap();

    let down = Ray::new(DVec2::new(0.0, 10.0), DVec2::NEG_Y);

    let hit = physics.ray_cast(&world, &down).unwrap();
    assert_eq!(hit.entity, player);
    assert!((hit.position.y - 6.5).abs() < 1e-9);

    let hit = physics
        .ray_cast(&world, &down.with_flags(ColliderFlags::ENEMY | ColliderFlags::GROUND))
        .unwrap();
    assert_eq!(hit.entity, enemy);
    assert!((hit.position.y - 3.5).abs() < 1e-9);
    assert!((hit.distance_squared - 6.5 * 6.5).abs() < 1e-9);

    let hit = physics
        .ray_cast(&world, &down.with_flags(ColliderFlags::GROUND))
        .unwrap();
    assert_eq!(hit.entity, physics.colliders()[0]);
    assert!(hit.position.y.abs() < 1e-9);

    assert!(physics
        .ray_cast(&world, &down.with_flags(ColliderFlags::WEAPON))
        .is_none());
}

#[test]
fn test_invalid_mass_is_clamped() {
    for mass in [0.0, -3.0, f64::NAN, f64::INFINITY] {
        assert_eq!(RigidBody::new(mass).mass(), 1.0);
    }
    let mut rb = RigidBody::new(4.0);
    rb.set_mass(-1.0);
    assert_eq!(rb.mass(), 1.0);
    assert_eq!(rb.inverse_mass(), 1.0);
}

#[test]
fn test_external_transform_edit_is_respected() {
    let (mut world, mut physics) = floor_scene();
    let entity = spawn_falling_box(&mut world, DVec2::new(0.0, 5.0), DVec2::ZERO);
    physics.attach_body(&world, entity).unwrap();
    physics.tick(&mut world);

    world.get::<&mut Transform2d>(entity).unwrap().position = DVec2::new(8.0, 10.0);
    physics.tick(&mut world);

    let position = world.get::<&Transform2d>(entity).unwrap().position;
    assert_eq!(position.x, 8.0);
    assert!(position.y < 10.0 && position.y > 9.9);
}
