//! Contact data structures for collision response.

use glam::DVec2;

use super::debug::{Color, DebugDraw};

/// Information about a single contact between two primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInfo {
    /// Contact normal (from shape A to shape B).
    pub normal: DVec2,
    /// Penetration depth.
    pub penetration: f64,
    /// Contact point in world space.
    pub point: DVec2,
}

/// Narrow-phase output consumed by the solver within the same tick.
///
/// Against static geometry the normal points from the geometry toward the
/// dynamic body. Between two bodies it points from body A to body B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactManifold {
    /// Unit contact normal.
    pub normal: DVec2,
    pub contacts: [DVec2; 2],
    /// Number of valid entries in `contacts` (0, 1 or 2).
    pub contact_count: usize,
    /// Penetration depth, never negative.
    pub depth: f64,
}

impl ContactManifold {
    pub fn single(normal: DVec2, point: DVec2, depth: f64) -> Self {
        Self {
            normal,
            contacts: [point, point],
            contact_count: 1,
            depth: depth.max(0.0),
        }
    }

    pub fn pair(normal: DVec2, a: DVec2, b: DVec2, depth: f64) -> Self {
        Self {
            normal,
            contacts: [a, b],
            contact_count: 2,
            depth: depth.max(0.0),
        }
    }

    #[inline]
    pub fn points(&self) -> &[DVec2] {
        &self.contacts[..self.contact_count.min(2)]
    }

    /// Midpoint of two contacts, or the single contact.
    pub fn contact_center(&self) -> Option<DVec2> {
        match self.points() {
            [] => None,
            [p] => Some(*p),
            [a, b, ..] => Some((*a + *b) * 0.5),
        }
    }

    pub fn debug_draw(&self, sink: &mut dyn DebugDraw) {
        for &p in self.points() {
            sink.circle(p, 0.1, Color::CONTACT);
            sink.line(p, p + self.normal * self.depth, Color::NORMAL);
        }
    }
}

/// Result of a primitive ray test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastResult {
    /// Hit position in world space.
    pub position: DVec2,
    /// Incoming ray direction (unit length).
    pub direction: DVec2,
}

/// Nearest hit returned by [`PhysicsWorld::ray_cast`](super::PhysicsWorld::ray_cast).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: hecs::Entity,
    pub position: DVec2,
    pub direction: DVec2,
    /// Squared distance from the ray origin to `position`.
    pub distance_squared: f64,
}
