//! Flat key/value save and load of per-entity physics tunables.
//!
//! Records are plain JSON objects. Missing tunables fall back to the
//! compiled-in defaults, so old saves keep loading when fields are added.
//! Missing shape keys leave the target's shape alone.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::ecs::components::physics::{
    Collider, ColliderFlags, ColliderShape, DebugFlags, RigidBody,
};

use super::error::{PhysicsError, PhysicsResult};
use super::geometry::ConvexPolygon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Circle,
    Box,
}

const DEFAULT_RADIUS: f64 = 1.0;
const DEFAULT_SIZE: DVec2 = DVec2::splat(2.0);

/// Tunables of a dynamic body and its collider.
///
/// The shape keys are optional: a record without them leaves the target's
/// shape untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BodyRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<BodyKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    /// Full box size (twice the half extents).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<DVec2>,
    pub mass: f64,
    pub friction: f64,
    pub linear_drag: DVec2,
    pub angular_drag: f64,
    pub restitution: f64,
    pub restitution_threshold: f64,
    pub gravity_scale: DVec2,
    pub min_velocity: DVec2,
    pub min_angular_velocity: f64,
    pub lock_rotation: bool,
    pub flags: ColliderFlags,
    pub show: bool,
    pub show_manifolds: bool,
}

impl Default for BodyRecord {
    fn default() -> Self {
        let rb = RigidBody::default();
        let collider = Collider::default();
        Self {
            kind: None,
            radius: None,
            size: None,
            mass: rb.mass(),
            friction: collider.friction,
            linear_drag: rb.linear_drag,
            angular_drag: rb.angular_drag,
            restitution: rb.restitution,
            restitution_threshold: rb.restitution_threshold,
            gravity_scale: rb.gravity_scale,
            min_velocity: rb.min_velocity,
            min_angular_velocity: rb.min_angular_velocity,
            lock_rotation: rb.lock_rotation,
            flags: collider.flags,
            show: rb.debug.show,
            show_manifolds: rb.debug.show_manifolds,
        }
    }
}

impl BodyRecord {
    /// Snapshot a body. Returns `None` for polygon colliders, which are never dynamic.
    pub fn capture(rb: &RigidBody, collider: &Collider) -> Option<Self> {
        let mut record = Self {
            mass: rb.mass(),
            friction: collider.friction,
            linear_drag: rb.linear_drag,
            angular_drag: rb.angular_drag,
            restitution: rb.restitution,
            restitution_threshold: rb.restitution_threshold,
            gravity_scale: rb.gravity_scale,
            min_velocity: rb.min_velocity,
            min_angular_velocity: rb.min_angular_velocity,
            lock_rotation: rb.lock_rotation,
            flags: collider.flags,
            show: rb.debug.show,
            show_manifolds: rb.debug.show_manifolds,
            ..Self::default()
        };
        match collider.shape {
            ColliderShape::Circle { radius } => {
                record.kind = Some(BodyKind::Circle);
                record.radius = Some(radius);
            }
            ColliderShape::Box { half_extents } => {
                record.kind = Some(BodyKind::Box);
                record.size = Some(half_extents * 2.0);
            }
            ColliderShape::Polygon(_) => return None,
        }
        Some(record)
    }

    /// Overwrite the tunables of `rb` and `collider`. Invalid masses are clamped.
    pub fn apply(&self, rb: &mut RigidBody, collider: &mut Collider) {
        rb.set_mass(self.mass);
        rb.linear_drag = self.linear_drag;
        rb.angular_drag = self.angular_drag;
        rb.restitution = self.restitution;
        rb.restitution_threshold = self.restitution_threshold;
        rb.gravity_scale = self.gravity_scale;
        rb.min_velocity = self.min_velocity;
        rb.min_angular_velocity = self.min_angular_velocity;
        rb.lock_rotation = self.lock_rotation;
        rb.debug = DebugFlags {
            show: self.show,
            show_manifolds: self.show_manifolds,
        };

        collider.friction = self.friction;
        collider.flags = self.flags;
        if let Some(shape) = self.merged_shape(&collider.shape) {
            collider.shape = shape;
        }
    }

    /// The shape this record describes, with absent keys taken from `current`.
    /// `None` leaves the current shape as it is.
    fn merged_shape(&self, current: &ColliderShape) -> Option<ColliderShape> {
        let kind = match (self.kind, current) {
            (Some(kind), _) => kind,
            (None, ColliderShape::Circle { .. }) if self.radius.is_some() => BodyKind::Circle,
            (None, ColliderShape::Box { .. }) if self.size.is_some() => BodyKind::Box,
            (None, _) => return None,
        };
        let shape = match (kind, current) {
            (BodyKind::Circle, ColliderShape::Circle { radius }) => ColliderShape::Circle {
                radius: self.radius.unwrap_or(*radius),
            },
            (BodyKind::Circle, _) => ColliderShape::Circle {
                radius: self.radius.unwrap_or(DEFAULT_RADIUS),
            },
            (BodyKind::Box, ColliderShape::Box { half_extents }) => ColliderShape::Box {
                half_extents: self.size.map_or(*half_extents, |size| size * 0.5),
            },
            (BodyKind::Box, _) => ColliderShape::Box {
                half_extents: self.size.unwrap_or(DEFAULT_SIZE) * 0.5,
            },
        };
        Some(shape)
    }
}

/// Tunables and outline of a static polygon collider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColliderRecord {
    pub friction: f64,
    pub flags: ColliderFlags,
    pub debug_normals: bool,
    pub points: Vec<DVec2>,
}

impl Default for ColliderRecord {
    fn default() -> Self {
        Self {
            friction: 0.4,
            flags: ColliderFlags::GROUND,
            debug_normals: false,
            points: Vec::new(),
        }
    }
}

impl ColliderRecord {
    pub fn capture(polygon: &ConvexPolygon, collider: &Collider) -> Self {
        Self {
            friction: collider.friction,
            flags: collider.flags,
            debug_normals: polygon.debug_normals,
            points: polygon.vertices().to_vec(),
        }
    }

    pub fn into_collider(self) -> PhysicsResult<Collider> {
        let mut polygon = ConvexPolygon::new(&self.points)?;
        polygon.debug_normals = self.debug_normals;
        Ok(Collider::polygon(polygon)
            .with_friction(self.friction)
            .with_flags(self.flags))
    }
}

fn missing(entity: hecs::Entity, component: &'static str) -> PhysicsError {
    PhysicsError::MissingComponent { entity, component }
}

/// Serialize the body tunables of `entity`.
pub fn save_body(world: &hecs::World, entity: hecs::Entity) -> PhysicsResult<serde_json::Value> {
    let rb = world
        .get::<&RigidBody>(entity)
        .map_err(|_| missing(entity, "RigidBody"))?;
    let collider = world
        .get::<&Collider>(entity)
        .map_err(|_| PhysicsError::MissingShape { entity })?;
    let record =
        BodyRecord::capture(&rb, &collider).ok_or(PhysicsError::UnsupportedBodyShape {
            entity,
            shape: collider.shape.kind(),
        })?;
    Ok(serde_json::to_value(record)?)
}

/// Apply a saved record to the body of `entity`.
pub fn load_body(
    world: &mut hecs::World,
    entity: hecs::Entity,
    value: serde_json::Value,
) -> PhysicsResult<()> {
    let record: BodyRecord = serde_json::from_value(value)?;
    let (rb, collider) = world
        .query_one_mut::<(&mut RigidBody, &mut Collider)>(entity)
        .map_err(|_| missing(entity, "RigidBody + Collider"))?;
    record.apply(rb, collider);
    Ok(())
}

/// Serialize the static polygon collider of `entity`.
pub fn save_collider(
    world: &hecs::World,
    entity: hecs::Entity,
) -> PhysicsResult<serde_json::Value> {
    let collider = world
        .get::<&Collider>(entity)
        .map_err(|_| missing(entity, "Collider"))?;
    let ColliderShape::Polygon(polygon) = &collider.shape else {
        return Err(PhysicsError::UnsupportedBodyShape {
            entity,
            shape: collider.shape.kind(),
        });
    };
    Ok(serde_json::to_value(ColliderRecord::capture(polygon, &collider))?)
}

/// Rebuild the static polygon collider of `entity` from a saved record.
pub fn load_collider(
    world: &mut hecs::World,
    entity: hecs::Entity,
    value: serde_json::Value,
) -> PhysicsResult<()> {
    let record: ColliderRecord = serde_json::from_value(value)?;
    let collider = record.into_collider()?;
    world
        .insert_one(entity, collider)
        .map_err(|_| missing(entity, "entity"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_then_load_restores_tunables() {
        let mut world = hecs::World::new();
        let mut rb = RigidBody::new(3.0);
        rb.restitution = 0.25;
        rb.linear_drag = DVec2::new(0.1, 0.2);
        let collider = Collider::cuboid(DVec2::new(1.0, 0.5))
            .with_friction(0.7)
            .with_flags(ColliderFlags::PLAYER);
        let source = world.spawn((rb, collider));
        let target = world.spawn((RigidBody::default(), Collider::default()));

        let saved = save_body(&world, source).unwrap();
        assert_eq!(saved["kind"], json!("box"));
        assert_eq!(saved["size"], json!([2.0, 1.0]));
        load_body(&mut world, target, saved).unwrap();

        let rb = world.get::<&RigidBody>(target).unwrap();
        let collider = world.get::<&Collider>(target).unwrap();
        assert_eq!(rb.mass(), 3.0);
        assert_eq!(rb.restitution, 0.25);
        assert_eq!(rb.linear_drag, DVec2::new(0.1, 0.2));
        assert_eq!(collider.friction, 0.7);
        assert_eq!(collider.flags, ColliderFlags::PLAYER);
        assert!(matches!(
            collider.shape,
            ColliderShape::Box { half_extents } if half_extents == DVec2::new(1.0, 0.5)
        ));
    }

    #[test]
    fn test_absent_keys_keep_defaults() {
        let mut world = hecs::World::new();
        let entity = world.spawn((RigidBody::new(5.0), Collider::circle(2.0)));

        load_body(&mut world, entity, json!({ "restitution": 0.1 })).unwrap();

        let rb = world.get::<&RigidBody>(entity).unwrap();
        let collider = world.get::<&Collider>(entity).unwrap();
        let defaults = BodyRecord::default();
        assert_eq!(rb.restitution, 0.1);
        assert_eq!(rb.mass(), defaults.mass);
        assert_eq!(rb.restitution_threshold, defaults.restitution_threshold);
        assert!(matches!(collider.shape, ColliderShape::Circle { radius } if radius == 2.0));
    }

    #[test]
    fn test_partial_record_keeps_box_shape() {
        let mut world = hecs::World::new();
        let entity = world.spawn((
            RigidBody::default(),
            Collider::cuboid(DVec2::new(2.0, 0.5)),
        ));

        load_body(&mut world, entity, json!({ "restitution": 0.1 })).unwrap();

        let collider = world.get::<&Collider>(entity).unwrap();
        assert!(
            matches!(
                collider.shape,
                ColliderShape::Box { half_extents } if half_extents == DVec2::new(2.0, 0.5)
            ),
            "shape after partial load: {:?}",
            collider.shape
        );
    }

    #[test]
    fn test_shape_keys_merge_with_current_shape() {
        let mut world = hecs::World::new();
        let entity = world.spawn((
            RigidBody::default(),
            Collider::cuboid(DVec2::new(2.0, 0.5)),
        ));

        // Size alone resizes the box.
        load_body(&mut world, entity, json!({ "size": [1.0, 3.0] })).unwrap();
        assert!(matches!(
            world.get::<&Collider>(entity).unwrap().shape,
            ColliderShape::Box { half_extents } if half_extents == DVec2::new(0.5, 1.5)
        ));

        // A radius without a kind does not turn a box into a circle.
        load_body(&mut world, entity, json!({ "radius": 4.0 })).unwrap();
        assert!(matches!(
            world.get::<&Collider>(entity).unwrap().shape,
            ColliderShape::Box { .. }
        ));

        // An explicit kind does.
        load_body(&mut world, entity, json!({ "kind": "circle", "radius": 4.0 })).unwrap();
        assert!(matches!(
            world.get::<&Collider>(entity).unwrap().shape,
            ColliderShape::Circle { radius } if radius == 4.0
        ));
    }

    #[test]
    fn test_loaded_invalid_mass_is_clamped() {
        let mut world = hecs::World::new();
        let entity = world.spawn((RigidBody::new(5.0), Collider::circle(2.0)));
        load_body(&mut world, entity, json!({ "mass": -2.0 })).unwrap();
        assert_eq!(world.get::<&RigidBody>(entity).unwrap().mass(), 1.0);
    }

    #[test]
    fn test_bad_record_is_persistence_error() {
        let mut world = hecs::World::new();
        let entity = world.spawn((RigidBody::default(), Collider::default()));
        let err = load_body(&mut world, entity, json!({ "mass": "heavy" })).unwrap_err();
        assert!(matches!(err, PhysicsError::Persistence(_)));
    }

    #[test]
    fn test_collider_record() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());
        let value = json!({
            "friction": 0.9,
            "points": [[0.0, 0.0], [4.0, 0.0], [4.0, 1.0], [0.0, 1.0]]
        });
        load_collider(&mut world, entity, value).unwrap();

        let saved = save_collider(&world, entity).unwrap();
        assert_eq!(saved["friction"], json!(0.9));
        assert_eq!(saved["flags"], json!("GROUND"));
        assert_eq!(saved["points"].as_array().map(Vec::len), Some(4));

        let degenerate = json!({ "points": [[0.0, 0.0], [1.0, 1.0]] });
        assert!(matches!(
            load_collider(&mut world, entity, degenerate),
            Err(PhysicsError::DegeneratePolygon { .. })
        ));
    }
}
