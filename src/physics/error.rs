//! Error type for configuration-time failures.
//!
//! The per-tick hot path never returns errors: degenerate geometry resolves
//! to "no contact" and invalid masses are clamped with a warning.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhysicsError {
    /// A dynamic body was attached without any collision geometry.
    #[error("entity {entity:?} has a rigid body but no collider shape")]
    MissingShape { entity: hecs::Entity },

    #[error("entity {entity:?} is missing required component {component}")]
    MissingComponent {
        entity: hecs::Entity,
        component: &'static str,
    },

    /// Only circles and boxes can move; polygons are static geometry.
    #[error("entity {entity:?}: {shape} colliders cannot be attached to a dynamic body")]
    UnsupportedBodyShape {
        entity: hecs::Entity,
        shape: &'static str,
    },

    #[error("degenerate polygon: {reason}")]
    DegeneratePolygon { reason: &'static str },

    #[error("entity {entity:?} is not registered with the physics world")]
    UnknownBody { entity: hecs::Entity },

    #[error("failed to spawn physics worker thread")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("invalid persisted record: {0}")]
    Persistence(#[from] serde_json::Error),
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;
