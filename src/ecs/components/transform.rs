//! Transform components for ECS entities.

use glam::{DAffine2, DVec2};

/// World-space 2D transform. Physics reads and writes it every tick; other
/// code may move it between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2d {
    pub position: DVec2,
    /// Rotation in radians, counter-clockwise.
    pub rotation: f64,
}

impl Transform2d {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: DVec2::ZERO,
            rotation: 0.0,
        }
    }

    /// Create a transform from a position.
    pub fn from_position(position: DVec2) -> Self {
        Self {
            position,
            rotation: 0.0,
        }
    }

    pub fn from_position_rotation(position: DVec2, rotation: f64) -> Self {
        Self { position, rotation }
    }

    /// Unit vector of the local X axis in world space.
    #[inline]
    pub fn right(&self) -> DVec2 {
        DVec2::from_angle(self.rotation)
    }

    /// Unit vector of the local Y axis in world space.
    #[inline]
    pub fn up(&self) -> DVec2 {
        self.right().perp()
    }

    /// Convert to an affine matrix (translation * rotation).
    pub fn to_affine(&self) -> DAffine2 {
        DAffine2::from_angle_translation(self.rotation, self.position)
    }

    /// Map a local-space point to world space.
    pub fn transform_point(&self, local: DVec2) -> DVec2 {
        self.position + DVec2::from_angle(self.rotation).rotate(local)
    }

    /// Map a world-space point into local space.
    pub fn inverse_transform_point(&self, world: DVec2) -> DVec2 {
        DVec2::from_angle(-self.rotation).rotate(world - self.position)
    }
}

impl Default for Transform2d {
    fn default() -> Self {
        Self::identity()
    }
}

/// Identifier of the host-side actor that owns an entity. Only used for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner(pub u64);
