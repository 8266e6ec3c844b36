//! Ray casting over registered colliders.

use glam::DVec2;

use crate::ecs::components::physics::{Collider, ColliderFlags};
use crate::ecs::components::transform::Transform2d;

use super::contact::RayHit;
use super::narrowphase::ray_shape;

/// Length of the debug line drawn for rays without a limit.
pub(crate) const DEBUG_RAY_LENGTH: f64 = 100.0;

/// A ray query. Only colliders whose flags intersect `flags` are considered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: DVec2,
    pub direction: DVec2,
    pub flags: ColliderFlags,
    /// Hits farther than this from the origin are ignored.
    pub max_length: f64,
    /// Emit debug lines for the ray and its hit.
    pub debug: bool,
}

impl Ray {
    pub fn new(origin: DVec2, direction: DVec2) -> Self {
        Self {
            origin,
            direction,
            flags: ColliderFlags::ALL,
            max_length: f64::INFINITY,
            debug: false,
        }
    }

    pub fn with_flags(mut self, flags: ColliderFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_max_length(mut self, max_length: f64) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// End point used for debug drawing.
    pub fn debug_end(&self) -> DVec2 {
        let length = if self.max_length.is_finite() {
            self.max_length
        } else {
            DEBUG_RAY_LENGTH
        };
        self.origin + self.direction.normalize_or_zero() * length
    }
}

/// Nearest hit among `candidates` by squared distance from the ray origin.
/// Crossings within `eps_small` of parallel are ignored.
pub fn cast<I>(world: &hecs::World, candidates: I, ray: &Ray, eps_small: f64) -> Option<RayHit>
where
    I: IntoIterator<Item = hecs::Entity>,
{
    let mut nearest: Option<RayHit> = None;

    for entity in candidates {
        let Ok(mut query) = world.query_one::<(&Transform2d, &Collider)>(entity) else {
            continue;
        };
        let Some((transform, collider)) = query.get() else {
            continue;
        };
        if !collider.flags.intersects(ray.flags) {
            continue;
        }
        let Some(result) = ray_shape(
            ray.origin,
            ray.direction,
            &collider.shape,
            transform,
            ray.max_length,
            eps_small,
        ) else {
            continue;
        };

        let distance_squared = result.position.distance_squared(ray.origin);
        if nearest.map_or(true, |hit| distance_squared < hit.distance_squared) {
            nearest = Some(RayHit {
                entity,
                position: result.position,
                direction: result.direction,
                distance_squared,
            });
        }
    }

    nearest
}
