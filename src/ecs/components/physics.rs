//! Physics components for ECS entities.

use std::collections::VecDeque;

use bitflags::bitflags;
use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::ecs::components::transform::Transform2d;
use crate::physics::geometry::ConvexPolygon;

bitflags! {
    /// Collision category bits.
    ///
    /// Rays and triggers only see colliders whose bits intersect their filter,
    /// so `DEFAULT` (no bits) is invisible to every filter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ColliderFlags: u8 {
        const DEFAULT = 0b0_0000;
        const GROUND = 0b0_0001;
        const PLAYER = 0b0_0010;
        const ENEMY = 0b0_0100;
        const RAMP = 0b0_1000;
        const WEAPON = 0b1_0000;
        const ALL = u8::MAX;
    }
}

/// Per-entity debug-draw switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugFlags {
    /// Draw the body outline.
    pub show: bool,
    /// Draw contact points and normals of every manifold involving this body.
    pub show_manifolds: bool,
}

impl Default for DebugFlags {
    fn default() -> Self {
        Self {
            show: true,
            show_manifolds: false,
        }
    }
}

/// Dynamic rigid body component.
///
/// Position and rotation live in the entity's [`Transform2d`]; the body only
/// carries velocities, tunables and the pending force/torque queues.
#[derive(Debug, Clone)]
pub struct RigidBody {
    mass: f64,
    pub linear_velocity: DVec2,
    /// Angular velocity in radians per second (counter-clockwise).
    pub angular_velocity: f64,
    /// Forces queued since the last tick. Drained by the integrator.
    pub force_queue: VecDeque<DVec2>,
    /// Torques queued since the last tick. Drained by the integrator.
    pub torque_queue: VecDeque<f64>,
    /// Exponential linear drag coefficient per axis (1/s).
    pub linear_drag: DVec2,
    /// Exponential angular drag coefficient (1/s).
    pub angular_drag: f64,
    /// Per-axis multiplier applied to the global gravity.
    pub gravity_scale: DVec2,
    /// Coefficient of restitution (0.0 - 1.0).
    pub restitution: f64,
    /// Minimum approach speed for restitution to apply.
    pub restitution_threshold: f64,
    /// A body whose velocity components are all below this is snapped to rest.
    pub min_velocity: DVec2,
    pub min_angular_velocity: f64,
    /// Ignore torques and angular impulses.
    pub lock_rotation: bool,
    pub debug: DebugFlags,
}

impl RigidBody {
    /// Create a dynamic body. Invalid masses are clamped to 1.0.
    pub fn new(mass: f64) -> Self {
        Self {
            mass: sanitize_mass(mass),
            linear_velocity: DVec2::ZERO,
            angular_velocity: 0.0,
            force_queue: VecDeque::new(),
            torque_queue: VecDeque::new(),
            linear_drag: DVec2::splat(0.5),
            angular_drag: 0.5,
            gravity_scale: DVec2::ONE,
            restitution: 0.6,
            restitution_threshold: 0.5,
            min_velocity: DVec2::splat(0.01),
            min_angular_velocity: 0.01,
            lock_rotation: false,
            debug: DebugFlags::default(),
        }
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Set the mass, clamping values `<= 0` (or non-finite) to 1.0.
    pub fn set_mass(&mut self, mass: f64) {
        self.mass = sanitize_mass(mass);
    }

    #[inline]
    pub fn inverse_mass(&self) -> f64 {
        if self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Queue a force through the centre of mass for the next tick.
    pub fn add_force(&mut self, force: DVec2) {
        self.force_queue.push_back(force);
    }

    /// Queue a force applied at a world-space point; the off-centre part becomes torque.
    pub fn add_force_at(&mut self, force: DVec2, point: DVec2, transform: &Transform2d) {
        self.force_queue.push_back(force);
        let r = point - transform.position;
        self.torque_queue.push_back(r.perp_dot(force));
    }

    pub fn add_torque(&mut self, torque: f64) {
        self.torque_queue.push_back(torque);
    }

    pub fn reset_velocity(&mut self) {
        self.linear_velocity = DVec2::ZERO;
        self.angular_velocity = 0.0;
    }
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Clamp an invalid mass to 1.0 and say so.
pub(crate) fn sanitize_mass(mass: f64) -> f64 {
    if mass > 0.0 && mass.is_finite() {
        mass
    } else {
        tracing::warn!(mass, "rigid body mass must be positive, clamped to 1.0");
        1.0
    }
}

/// Collider shape.
#[derive(Debug, Clone)]
pub enum ColliderShape {
    Circle { radius: f64 },
    /// Oriented box; its rotation is the owning transform's rotation.
    Box { half_extents: DVec2 },
    /// Static convex outline in world space. Never attached to a dynamic body.
    Polygon(ConvexPolygon),
}

impl ColliderShape {
    /// Moment of inertia about the centre for the given mass.
    ///
    /// Degenerate shapes fall back to 1.0 so the solver never divides by zero.
    pub fn moment_of_inertia(&self, mass: f64) -> f64 {
        let inertia = match self {
            ColliderShape::Circle { radius } => 0.5 * mass * radius * radius,
            ColliderShape::Box { half_extents } => {
                mass * (half_extents.x * half_extents.x + half_extents.y * half_extents.y) / 12.0
            }
            ColliderShape::Polygon(_) => 0.0,
        };
        if inertia > 0.0 && inertia.is_finite() {
            inertia
        } else {
            1.0
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ColliderShape::Circle { .. } => "circle",
            ColliderShape::Box { .. } => "box",
            ColliderShape::Polygon(_) => "polygon",
        }
    }
}

/// Collision geometry component.
#[derive(Debug, Clone)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Coulomb friction coefficient.
    pub friction: f64,
    pub flags: ColliderFlags,
}

impl Collider {
    pub fn circle(radius: f64) -> Self {
        Self {
            shape: ColliderShape::Circle { radius },
            ..Self::default()
        }
    }

    pub fn cuboid(half_extents: DVec2) -> Self {
        Self {
            shape: ColliderShape::Box { half_extents },
            ..Self::default()
        }
    }

    pub fn polygon(polygon: ConvexPolygon) -> Self {
        Self {
            shape: ColliderShape::Polygon(polygon),
            friction: 0.4,
            flags: ColliderFlags::GROUND,
        }
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_flags(mut self, flags: ColliderFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            shape: ColliderShape::Circle { radius: 1.0 },
            friction: 0.2,
            flags: ColliderFlags::DEFAULT,
        }
    }
}

/// Axis-aligned trigger volume centred on the entity's transform.
///
/// Dynamic bodies whose collider flags intersect `flags` produce enter/exit
/// events when their bounds start or stop overlapping the volume.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub half_extents: DVec2,
    pub flags: ColliderFlags,
    pub(crate) occupants: Vec<hecs::Entity>,
}

impl Trigger {
    pub fn new(half_extents: DVec2) -> Self {
        Self {
            half_extents,
            flags: ColliderFlags::PLAYER,
            occupants: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: ColliderFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Bodies currently inside the volume.
    pub fn occupants(&self) -> &[hecs::Entity] {
        &self.occupants
    }
}
