//! Worker thread lifecycle.

use std::time::{Duration, Instant};

use rein2d::glam::DVec2;
use rein2d::physics::scheduler::lock_scene;
use rein2d::{
    Collider, ColliderDesc, Color, DebugDraw, NullDraw, PhysicsConfig, PhysicsScheduler,
    RigidBody, Scene, Transform2d, UpdatePhysicsDefaults,
};

fn scheduler_with_body() -> (PhysicsScheduler, hecs::Entity) {
    let mut scene = Scene::new(PhysicsConfig::default());
    let entity = scene.world.spawn((
        Transform2d::from_position(DVec2::new(0.0, 100.0)),
        RigidBody::new(1.0),
        Collider::circle(0.5),
    ));
    scene.physics.attach_body(&scene.world, entity).unwrap();
    (PhysicsScheduler::new(scene.into_shared()), entity)
}

fn ticks(scheduler: &PhysicsScheduler) -> u64 {
    lock_scene(scheduler.scene()).physics.clock().ticks
}

/// Poll `condition` for up to two seconds.
fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_double_start_leaves_one_worker() {
    let (mut scheduler, _) = scheduler_with_body();
    scheduler.start().unwrap();
    scheduler.start().unwrap();

    assert!(scheduler.is_running());
    assert_eq!(scheduler.live_workers(), 1);

    scheduler.stop();
    assert!(!scheduler.is_running());
    assert_eq!(scheduler.live_workers(), 0);
}

#[test]
fn test_stop_before_start_is_a_no_op() {
    let (mut scheduler, _) = scheduler_with_body();
    scheduler.stop();
    scheduler.stop();
    assert!(!scheduler.is_running());
    assert_eq!(scheduler.live_workers(), 0);
    assert_eq!(ticks(&scheduler), 0);
}

#[test]
fn test_worker_ticks_until_stopped() {
    let (mut scheduler, entity) = scheduler_with_body();
    scheduler.start().unwrap();
    assert!(eventually(|| ticks(&scheduler) >= 10));

    scheduler.stop();
    let stopped_at = ticks(&scheduler);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(ticks(&scheduler), stopped_at, "no tick may run after stop returns");

    let scene = lock_scene(scheduler.scene());
    let rb = scene.world.get::<&RigidBody>(entity).unwrap();
    let transform = scene.world.get::<&Transform2d>(entity).unwrap();
    assert!(transform.position.y < 100.0, "body should have fallen");
    assert_eq!(rb.linear_velocity, DVec2::ZERO, "velocities reset on stop");
}

#[test]
fn test_restart_after_stop() {
    let (mut scheduler, _) = scheduler_with_body();
    scheduler.start().unwrap();
    scheduler.stop();
    let first_run = ticks(&scheduler);

    scheduler.start().unwrap();
    assert_eq!(scheduler.live_workers(), 1);
    assert!(eventually(|| ticks(&scheduler) > first_run));
    scheduler.stop();
}

#[test]
fn test_defaults_pushed_to_running_worker() {
    let (mut scheduler, _) = scheduler_with_body();
    scheduler.start().unwrap();
    scheduler.push_defaults(UpdatePhysicsDefaults {
        gravity: DVec2::new(0.0, -1.62),
        iteration_count: 2,
        ..UpdatePhysicsDefaults::default()
    });

    assert!(eventually(|| {
        lock_scene(scheduler.scene()).physics.config().iteration_count == 2
    }));
    assert_eq!(
        lock_scene(scheduler.scene()).physics.config().gravity,
        DVec2::new(0.0, -1.62)
    );
    scheduler.stop();
}

#[test]
fn test_drop_stops_worker() {
    let (mut scheduler, _) = scheduler_with_body();
    let scene = scheduler.scene().clone();
    scheduler.start().unwrap();
    assert!(eventually(|| lock_scene(&scene).physics.clock().ticks > 0));
    drop(scheduler);

    let stopped_at = lock_scene(&scene).physics.clock().ticks;
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(lock_scene(&scene).physics.clock().ticks, stopped_at);
}

/// Sink that panics on the first draw call.
struct PanickingDraw;

impl DebugDraw for PanickingDraw {
    fn line(&mut self, _from: DVec2, _to: DVec2, _color: Color) {
        panic!("debug sink failure");
    }

    fn circle(&mut self, _center: DVec2, _radius: f64, _color: Color) {
        panic!("debug sink failure");
    }
}

#[test]
fn test_start_replaces_panicked_worker() {
    let mut scene = Scene::new(PhysicsConfig::default());
    scene
        .physics
        .add_static_polygon(
            &mut scene.world,
            &[
                DVec2::new(-5.0, -1.0),
                DVec2::new(5.0, -1.0),
                DVec2::new(5.0, 0.0),
                DVec2::new(-5.0, 0.0),
            ],
            ColliderDesc::default(),
        )
        .unwrap();
    let mut rb = RigidBody::new(1.0);
    rb.debug.show_manifolds = true;
    let entity = scene.world.spawn((
        Transform2d::from_position(DVec2::new(0.0, 0.45)),
        rb,
        Collider::circle(0.5),
    ));
    scene.physics.attach_body(&scene.world, entity).unwrap();
    scene.physics.set_debug_draw(Box::new(PanickingDraw));

    let mut scheduler = PhysicsScheduler::new(scene.into_shared());
    scheduler.start().unwrap();
    // The first contact draws its manifold and takes the worker down.
    assert!(eventually(|| !scheduler.is_running()));
    assert_eq!(scheduler.live_workers(), 0);

    lock_scene(scheduler.scene())
        .physics
        .set_debug_draw(Box::new(NullDraw));
    let before = ticks(&scheduler);
    scheduler.start().unwrap();
    assert!(scheduler.is_running());
    assert_eq!(scheduler.live_workers(), 1);
    assert!(eventually(|| ticks(&scheduler) > before));
    scheduler.stop();
    assert!(!scheduler.is_running());
}
