//! Rein 2D physics core
//!
//! Rigid body simulation for circles and oriented boxes colliding with static
//! convex polygons, stored in a `hecs` world.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **ecs** - Components: transforms, rigid bodies, colliders, triggers
//! 2. **physics::geometry** - Convex polygons, box corners, segment math
//! 3. **physics::narrowphase** - SAT tests, contact manifolds, ray queries
//! 4. **physics::solver** - Impulse resolution with friction and positional correction
//! 5. **physics::rigid_body** - Semi-implicit Euler integration
//! 6. **physics** - `PhysicsWorld`, the simulation context driving one tick
//! 7. **physics::scheduler** - Fixed-timestep worker thread

pub mod ecs;
pub mod physics;

pub use ecs::prelude::*;

pub use physics::contact::{ContactManifold, RayHit};
pub use physics::debug::{Color, DebugDraw, DebugRecorder, NullDraw};
pub use physics::error::{PhysicsError, PhysicsResult};
pub use physics::events::UpdatePhysicsDefaults;
pub use physics::geometry::ConvexPolygon;
pub use physics::raycast::Ray;
pub use physics::scheduler::{PhysicsScheduler, Scene, SharedScene};
pub use physics::trigger::TriggerEvent;
pub use physics::{BodyHandle, ColliderDesc, ColliderHandle, PhysicsConfig, PhysicsWorld};

// Re-export glam and hecs for convenience
pub use glam;
pub use hecs;
