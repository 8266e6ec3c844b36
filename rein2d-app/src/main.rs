use std::time::Duration;

use anyhow::Context;
use glam::DVec2;
use rein2d::physics::debug::DebugRecorder;
use rein2d::physics::persistence::save_body;
use rein2d::physics::scheduler::lock_scene;
use rein2d::physics::ColliderDesc;
use rein2d::{
    Collider, ColliderFlags, Owner, PhysicsConfig, PhysicsScheduler, Ray, RigidBody, Scene,
    Transform2d, Trigger, UpdatePhysicsDefaults,
};

const FRAMES: usize = 30;
const FRAME_TIME: Duration = Duration::from_millis(100);

fn build_scene(defaults: &UpdatePhysicsDefaults) -> anyhow::Result<(Scene, Vec<hecs::Entity>)> {
    let mut scene = Scene::new(PhysicsConfig::default());
    scene.physics.apply_defaults(defaults);

    let Scene { world, physics } = &mut scene;

    // Floor and a ramp on the right
    physics.add_static_polygon(
        world,
        &[
            DVec2::new(-20.0, -1.0),
            DVec2::new(20.0, -1.0),
            DVec2::new(20.0, 0.0),
            DVec2::new(-20.0, 0.0),
        ],
        ColliderDesc {
            debug_normals: true,
            ..ColliderDesc::default()
        },
    )?;
    physics.add_static_polygon(
        world,
        &[DVec2::new(4.0, 0.0), DVec2::new(12.0, 0.0), DVec2::new(12.0, 4.0)],
        ColliderDesc {
            flags: ColliderFlags::RAMP,
            ..ColliderDesc::default()
        },
    )?;

    let mut player_body = RigidBody::new(1.0);
    player_body.linear_velocity = DVec2::new(0.0, -5.0);
    player_body.debug.show = true;
    player_body.debug.show_manifolds = true;
    let player = world.spawn((
        Transform2d::from_position(DVec2::new(0.0, 5.0)),
        player_body,
        Collider::cuboid(DVec2::ONE)
            .with_friction(0.2)
            .with_flags(ColliderFlags::PLAYER),
        Owner(1),
    ));

    let mut ball_body = RigidBody::new(0.5);
    ball_body.linear_velocity = DVec2::new(-2.0, 0.0);
    let ball = world.spawn((
        Transform2d::from_position(DVec2::new(8.0, 6.0)),
        ball_body,
        Collider::circle(0.5).with_flags(ColliderFlags::ENEMY),
        Owner(2),
    ));

    let zone = world.spawn((
        Transform2d::from_position(DVec2::new(0.0, 1.0)),
        Trigger::new(DVec2::new(2.0, 1.0)),
    ));

    let bodies = vec![player, ball];
    for &entity in &bodies {
        physics.attach_body(world, entity)?;
    }
    physics.add_trigger(world, zone)?;

    Ok((scene, bodies))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let defaults = match std::env::args().nth(1) {
        Some(path) => UpdatePhysicsDefaults::load(&path)?,
        None => UpdatePhysicsDefaults::default(),
    };

    let (mut scene, bodies) = build_scene(&defaults)?;
    let recorder = DebugRecorder::new();
    scene.physics.set_debug_draw(Box::new(recorder.clone()));

    let mut scheduler = PhysicsScheduler::new(scene.into_shared());
    scheduler.start()?;

    for frame in 0..FRAMES {
        std::thread::sleep(FRAME_TIME);

        let mut guard = lock_scene(scheduler.scene());
        let Scene { world, physics } = &mut *guard;

        for &entity in &bodies {
            let transform = world
                .get::<&Transform2d>(entity)
                .context("body lost its transform")?;
            let rb = world.get::<&RigidBody>(entity).context("body lost its rigid body")?;
            log::info!(
                "frame {frame:>2} {entity:?}: pos = ({:.3}, {:.3}) rot = {:.3} vel = ({:.3}, {:.3})",
                transform.position.x,
                transform.position.y,
                transform.rotation,
                rb.linear_velocity.x,
                rb.linear_velocity.y,
            );
        }

        for event in physics.drain_trigger_events() {
            log::info!("frame {frame:>2} trigger: {event:?}");
        }

        let ray = Ray::new(DVec2::new(-10.0, 0.5), DVec2::X)
            .with_flags(ColliderFlags::PLAYER | ColliderFlags::ENEMY)
            .with_debug(true);
        if let Some(hit) = physics.ray_cast(world, &ray) {
            log::info!(
                "frame {frame:>2} ray hit {:?} at ({:.3}, {:.3})",
                hit.entity,
                hit.position.x,
                hit.position.y
            );
        }

        physics.debug_draw(world);
        log::debug!("frame {frame:>2}: {} debug draw commands", recorder.drain().len());
    }

    scheduler.stop();

    let guard = lock_scene(scheduler.scene());
    log::info!("simulated {:?}", guard.physics.clock());
    for &entity in &bodies {
        let record = save_body(&guard.world, entity)?;
        println!("{}", serde_json::to_string_pretty(&record)?);
    }

    Ok(())
}
