//! 2D rigid body simulation over a `hecs::World`.
//!
//! # Architecture
//!
//! [`PhysicsWorld`] is the simulation context. It never owns entities; it keeps
//! ordered registries of attached bodies, static colliders and triggers, which
//! fix the iteration order of every tick:
//!
//! 1. Integrate velocity (queued forces, gravity, exponential drag)
//! 2. Resolve contacts against every later registered body
//! 3. Resolve contacts against static polygons (`iteration_count` passes)
//! 4. Integrate position
//!
//! Steps 1-4 run body by body in registration order. Trigger volumes are
//! updated once all bodies have moved.
//!
//! Hosts either call [`PhysicsWorld::step`] from their own frame loop or hand
//! the world to a [`scheduler::PhysicsScheduler`] worker thread.

pub mod contact;
pub mod debug;
pub mod error;
pub mod events;
pub mod geometry;
pub mod narrowphase;
pub mod persistence;
pub mod raycast;
pub mod rigid_body;
pub mod scheduler;
pub mod solver;
pub mod trigger;

use std::time::Duration;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::ecs::components::physics::{Collider, ColliderFlags, ColliderShape, RigidBody, Trigger};
use crate::ecs::components::transform::{Owner, Transform2d};

use self::contact::RayHit;
use self::debug::{Color, DebugDraw, NullDraw};
use self::error::{PhysicsError, PhysicsResult};
use self::events::UpdatePhysicsDefaults;
use self::geometry::{box_corners, ConvexPolygon};
use self::narrowphase::{detect_pair, detect_static};
use self::raycast::Ray;
use self::solver::{resolve_against_static, resolve_pair, BodyState, CorrectionParams};
use self::trigger::{update_triggers, TriggerEvent};

/// Configuration for the physics simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, -9.81).
    pub gravity: DVec2,
    /// Fixed timestep for physics updates in seconds. Default: 1/200.
    pub fixed_timestep: f64,
    /// Maximum number of ticks per frame. Default: 4.
    pub max_substeps: u32,
    /// Wall-clock budget of one worker frame. Default: 20 ms.
    pub target_frame_time: Duration,
    /// Fraction of penetration removed per resolution. Default: 0.8.
    pub position_correction_percentage: f64,
    /// Penetration tolerated without correction. Default: 0.005.
    pub position_correction_slop: f64,
    /// SAT tie-break bias and contact de-duplication distance. Default: 1e-4.
    pub eps: f64,
    /// Parallel threshold for segment crossings in contact generation and ray
    /// tests. Default: 1e-9.
    pub eps_small: f64,
    /// Static contact passes per body per tick. Default: 1.
    pub iteration_count: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: DVec2::new(0.0, -9.81),
            fixed_timestep: 1.0 / 200.0,
            max_substeps: 4,
            target_frame_time: Duration::from_millis(20),
            position_correction_percentage: 0.8,
            position_correction_slop: 0.005,
            eps: 1e-4,
            eps_small: 1e-9,
            iteration_count: 1,
        }
    }
}

impl PhysicsConfig {
    fn correction(&self) -> CorrectionParams {
        CorrectionParams {
            slop: self.position_correction_slop,
            percentage: self.position_correction_percentage,
        }
    }
}

/// A dynamic body registered with a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(hecs::Entity);

impl BodyHandle {
    pub fn entity(self) -> hecs::Entity {
        self.0
    }
}

/// A static polygon collider registered with a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(hecs::Entity);

impl ColliderHandle {
    pub fn entity(self) -> hecs::Entity {
        self.0
    }
}

/// Tunables of a static polygon built by [`PhysicsWorld::add_static_polygon`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderDesc {
    pub friction: f64,
    pub flags: ColliderFlags,
    pub debug_normals: bool,
}

impl Default for ColliderDesc {
    fn default() -> Self {
        Self {
            friction: 0.4,
            flags: ColliderFlags::GROUND,
            debug_normals: false,
        }
    }
}

/// Simulated time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    pub ticks: u64,
    /// Seconds of simulated time.
    pub time: f64,
}

/// Contacts resolved during the last tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub static_contacts: usize,
    pub pair_contacts: usize,
}

/// The main physics world managing simulation state.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    accumulator: f64,
    clock: SimClock,
    stats: TickStats,
    bodies: Vec<hecs::Entity>,
    colliders: Vec<hecs::Entity>,
    triggers: Vec<hecs::Entity>,
    trigger_events: Vec<TriggerEvent>,
    debug: Box<dyn DebugDraw>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .field("triggers", &self.triggers.len())
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Create a new physics world with the given configuration.
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
            clock: SimClock::default(),
            stats: TickStats::default(),
            bodies: Vec::new(),
            colliders: Vec::new(),
            triggers: Vec::new(),
            trigger_events: Vec::new(),
            debug: Box::new(NullDraw),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn clock(&self) -> SimClock {
        self.clock
    }

    pub fn last_tick_stats(&self) -> TickStats {
        self.stats
    }

    pub fn bodies(&self) -> &[hecs::Entity] {
        &self.bodies
    }

    pub fn colliders(&self) -> &[hecs::Entity] {
        &self.colliders
    }

    pub fn triggers(&self) -> &[hecs::Entity] {
        &self.triggers
    }

    /// Replace the debug geometry sink.
    pub fn set_debug_draw(&mut self, sink: Box<dyn DebugDraw>) {
        self.debug = sink;
    }

    /// Apply pushed tunables. Invalid values are clamped (or ignored, for
    /// non-finite gravity) with a warning.
    pub fn apply_defaults(&mut self, defaults: &UpdatePhysicsDefaults) {
        if defaults.gravity.is_finite() {
            self.config.gravity = defaults.gravity;
        } else {
            tracing::warn!(gravity = ?defaults.gravity, "ignoring non-finite gravity");
        }

        self.config.position_correction_percentage = clamped(
            "position_correction_percentage",
            defaults.position_correction_percentage,
            0.0,
            1.0,
        );
        self.config.position_correction_slop = clamped(
            "position_correction_slop",
            defaults.position_correction_slop,
            0.0,
            f64::MAX,
        );
        self.config.eps = clamped("eps", defaults.eps, 0.0, f64::MAX);
        self.config.eps_small = clamped("eps_small", defaults.eps_small, 0.0, f64::MAX);

        if defaults.iteration_count == 0 {
            tracing::warn!("iteration_count must be at least 1, using 1");
        }
        self.config.iteration_count = defaults.iteration_count.max(1);

        tracing::debug!(config = ?self.config, "physics defaults applied");
    }

    /// Register a dynamic body. The entity needs a [`Transform2d`], a
    /// [`RigidBody`] and a circle or box [`Collider`].
    ///
    /// Attaching an already registered entity returns the existing handle.
    pub fn attach_body(
        &mut self,
        world: &hecs::World,
        entity: hecs::Entity,
    ) -> PhysicsResult<BodyHandle> {
        if !world.contains(entity) {
            return Err(PhysicsError::UnknownBody { entity });
        }
        if !world.satisfies::<&Transform2d>(entity).unwrap_or(false) {
            return Err(PhysicsError::MissingComponent {
                entity,
                component: "Transform2d",
            });
        }
        if !world.satisfies::<&RigidBody>(entity).unwrap_or(false) {
            return Err(PhysicsError::MissingComponent {
                entity,
                component: "RigidBody",
            });
        }
        let collider = world
            .get::<&Collider>(entity)
            .map_err(|_| PhysicsError::MissingShape { entity })?;
        if let ColliderShape::Polygon(_) = collider.shape {
            return Err(PhysicsError::UnsupportedBodyShape {
                entity,
                shape: collider.shape.kind(),
            });
        }

        if !self.bodies.contains(&entity) {
            self.bodies.push(entity);
            let owner = world.get::<&Owner>(entity).ok().map(|o| o.0);
            tracing::debug!(?entity, ?owner, shape = collider.shape.kind(), "body attached");
        }
        Ok(BodyHandle(entity))
    }

    /// Deregister a body. The entity itself is left alone.
    pub fn detach_body(&mut self, handle: BodyHandle) -> PhysicsResult<()> {
        let entity = handle.entity();
        let index = self
            .bodies
            .iter()
            .position(|&e| e == entity)
            .ok_or(PhysicsError::UnknownBody { entity })?;
        self.bodies.remove(index);
        tracing::debug!(?entity, "body detached");
        Ok(())
    }

    /// Build a static polygon from `points`, spawn it and register it.
    pub fn add_static_polygon(
        &mut self,
        world: &mut hecs::World,
        points: &[DVec2],
        desc: ColliderDesc,
    ) -> PhysicsResult<ColliderHandle> {
        let mut polygon = ConvexPolygon::new(points)?;
        polygon.debug_normals = desc.debug_normals;
        let collider = Collider::polygon(polygon)
            .with_friction(desc.friction)
            .with_flags(desc.flags);
        let entity = world.spawn((Transform2d::identity(), collider));
        self.colliders.push(entity);
        tracing::debug!(?entity, vertices = points.len(), "static polygon added");
        Ok(ColliderHandle(entity))
    }

    /// Register an existing entity carrying a polygon [`Collider`], for example
    /// one rebuilt with [`persistence::load_collider`].
    pub fn register_collider(
        &mut self,
        world: &hecs::World,
        entity: hecs::Entity,
    ) -> PhysicsResult<ColliderHandle> {
        let collider = world
            .get::<&Collider>(entity)
            .map_err(|_| PhysicsError::MissingShape { entity })?;
        if !matches!(collider.shape, ColliderShape::Polygon(_)) {
            return Err(PhysicsError::UnsupportedBodyShape {
                entity,
                shape: collider.shape.kind(),
            });
        }
        if !self.colliders.contains(&entity) {
            self.colliders.push(entity);
            tracing::debug!(?entity, "static polygon registered");
        }
        Ok(ColliderHandle(entity))
    }

    /// Deregister and despawn a static collider.
    pub fn remove_collider(&mut self, world: &mut hecs::World, handle: ColliderHandle) {
        let entity = handle.entity();
        self.colliders.retain(|&e| e != entity);
        if world.despawn(entity).is_ok() {
            tracing::debug!(?entity, "static polygon removed");
        }
    }

    /// Register a trigger volume. The entity needs a [`Transform2d`] and a [`Trigger`].
    pub fn add_trigger(
        &mut self,
        world: &hecs::World,
        entity: hecs::Entity,
    ) -> PhysicsResult<hecs::Entity> {
        for (present, component) in [
            (world.satisfies::<&Transform2d>(entity), "Transform2d"),
            (world.satisfies::<&Trigger>(entity), "Trigger"),
        ] {
            if !present.unwrap_or(false) {
                return Err(PhysicsError::MissingComponent { entity, component });
            }
        }
        if !self.triggers.contains(&entity) {
            self.triggers.push(entity);
            tracing::debug!(?entity, "trigger added");
        }
        Ok(entity)
    }

    pub fn remove_trigger(&mut self, entity: hecs::Entity) {
        self.triggers.retain(|&e| e != entity);
    }

    /// Take every trigger event queued since the last drain.
    pub fn drain_trigger_events(&mut self) -> Vec<TriggerEvent> {
        std::mem::take(&mut self.trigger_events)
    }

    /// Step the physics simulation forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator to ensure deterministic simulation.
    /// Returns the number of ticks run.
    pub fn step(&mut self, world: &mut hecs::World, delta_time: f64) -> u32 {
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= self.config.fixed_timestep && substeps < self.config.max_substeps
        {
            self.tick(world);
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > self.config.fixed_timestep * self.config.max_substeps as f64 {
            self.accumulator = 0.0;
        }
        substeps
    }

    /// Advance the simulation by exactly one fixed timestep.
    pub fn tick(&mut self, world: &mut hecs::World) {
        let dt = self.config.fixed_timestep;
        self.clock.ticks += 1;
        self.clock.time += dt;
        self.stats = TickStats::default();

        for index in 0..self.bodies.len() {
            let entity = self.bodies[index];
            if !self.integrate_body_velocity(world, entity, dt) {
                continue;
            }

            for other in index + 1..self.bodies.len() {
                let other = self.bodies[other];
                if self.collide_pair(world, entity, other).is_some() {
                    self.stats.pair_contacts += 1;
                }
            }

            for _ in 0..self.config.iteration_count {
                for collider in 0..self.colliders.len() {
                    let collider = self.colliders[collider];
                    if self.collide_static(world, entity, collider).is_some() {
                        self.stats.static_contacts += 1;
                    }
                }
            }

            if let Ok((transform, rb)) =
                world.query_one_mut::<(&mut Transform2d, &RigidBody)>(entity)
            {
                rigid_body::integrate_position(rb, transform, dt);
            }
        }

        update_triggers(world, &self.triggers, &self.bodies, &mut self.trigger_events);
    }

    fn integrate_body_velocity(&self, world: &mut hecs::World, entity: hecs::Entity, dt: f64) -> bool {
        let Ok((rb, collider)) = world.query_one_mut::<(&mut RigidBody, &Collider)>(entity) else {
            return false;
        };
        let inertia = collider.shape.moment_of_inertia(rb.mass());
        rigid_body::integrate_velocity(rb, inertia, self.config.gravity, dt);
        true
    }

    fn collide_static(
        &mut self,
        world: &hecs::World,
        body: hecs::Entity,
        static_entity: hecs::Entity,
    ) -> Option<()> {
        let static_collider = world.get::<&Collider>(static_entity).ok()?;
        let ColliderShape::Polygon(polygon) = &static_collider.shape else {
            return None;
        };

        let mut query = world
            .query_one::<(&mut Transform2d, &mut RigidBody, &Collider)>(body)
            .ok()?;
        let (transform, rb, collider) = query.get()?;

        let manifold = detect_static(
            &collider.shape,
            transform,
            polygon,
            self.config.eps,
            self.config.eps_small,
        )?;
        if rb.debug.show_manifolds {
            manifold.debug_draw(self.debug.as_mut());
        }

        let mut state = BodyState::from_body(rb, collider, transform);
        resolve_against_static(
            &mut state,
            &manifold,
            static_collider.friction,
            self.config.correction(),
        );
        state.write_back(rb, transform);
        Some(())
    }

    fn collide_pair(&mut self, world: &mut hecs::World, a: hecs::Entity, b: hecs::Entity) -> Option<()> {
        let (manifold, mut state_a, mut state_b, show) = {
            let mut query_a = world.query_one::<(&Transform2d, &RigidBody, &Collider)>(a).ok()?;
            let (transform_a, rb_a, collider_a) = query_a.get()?;
            let mut query_b = world.query_one::<(&Transform2d, &RigidBody, &Collider)>(b).ok()?;
            let (transform_b, rb_b, collider_b) = query_b.get()?;

            let manifold =
                detect_pair(&collider_a.shape, transform_a, &collider_b.shape, transform_b)?;
            (
                manifold,
                BodyState::from_body(rb_a, collider_a, transform_a),
                BodyState::from_body(rb_b, collider_b, transform_b),
                rb_a.debug.show_manifolds || rb_b.debug.show_manifolds,
            )
        };

        if show {
            manifold.debug_draw(self.debug.as_mut());
        }
        resolve_pair(&mut state_a, &mut state_b, &manifold, self.config.correction());

        for (entity, state) in [(a, state_a), (b, state_b)] {
            if let Ok((transform, rb)) =
                world.query_one_mut::<(&mut Transform2d, &mut RigidBody)>(entity)
            {
                state.write_back(rb, transform);
            }
        }
        Some(())
    }

    /// Cast a ray against static colliders and bodies. Returns the nearest hit.
    pub fn ray_cast(&mut self, world: &hecs::World, ray: &Ray) -> Option<RayHit> {
        let candidates = self.colliders.iter().chain(&self.bodies).copied();
        let hit = raycast::cast(world, candidates, ray, self.config.eps_small);

        if ray.debug {
            self.debug.line(ray.origin, ray.debug_end(), Color::RAY);
            if let Some(hit) = &hit {
                self.debug.line(ray.origin, hit.position, Color::RAY_HIT);
            }
        }
        hit
    }

    /// Draw registered geometry: static outlines, and bodies whose
    /// [`DebugFlags::show`](crate::ecs::components::physics::DebugFlags) is set.
    pub fn debug_draw(&mut self, world: &hecs::World) {
        for &entity in &self.colliders {
            if let Ok(collider) = world.get::<&Collider>(entity) {
                if let ColliderShape::Polygon(polygon) = &collider.shape {
                    polygon.debug_draw(self.debug.as_mut(), Color::WHITE);
                }
            }
        }

        for &entity in &self.bodies {
            let Ok(mut query) = world.query_one::<(&Transform2d, &RigidBody, &Collider)>(entity)
            else {
                continue;
            };
            let Some((transform, rb, collider)) = query.get() else {
                continue;
            };
            if !rb.debug.show {
                continue;
            }
            match collider.shape {
                ColliderShape::Circle { radius } => {
                    self.debug.circle(transform.position, radius, Color::WHITE);
                }
                ColliderShape::Box { half_extents } => {
                    let corners = box_corners(transform.position, half_extents, transform.rotation);
                    self.debug.polygon(&corners, Color::WHITE);
                }
                ColliderShape::Polygon(_) => {}
            }
        }
    }

    /// Stop every body in `world`.
    pub fn reset_velocities(&self, world: &mut hecs::World) {
        rigid_body::reset_velocities(world);
    }
}

fn clamped(name: &'static str, value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        tracing::warn!(name, "NaN tunable, using {min}");
        return min;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        tracing::warn!(name, value, clamped, "tunable out of range");
    }
    clamped
}
