//! Trigger volumes: axis-aligned regions that report bodies entering and leaving.

use glam::DVec2;

use crate::ecs::components::physics::{Collider, ColliderFlags, ColliderShape, Trigger};
use crate::ecs::components::transform::Transform2d;

use super::geometry::box_corners;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Enter {
        trigger: hecs::Entity,
        body: hecs::Entity,
    },
    Exit {
        trigger: hecs::Entity,
        body: hecs::Entity,
    },
}

/// Axis-aligned bounds of a collider placed at `transform`.
pub fn shape_bounds(shape: &ColliderShape, transform: &Transform2d) -> (DVec2, DVec2) {
    match shape {
        ColliderShape::Circle { radius } => (
            transform.position - DVec2::splat(*radius),
            transform.position + DVec2::splat(*radius),
        ),
        ColliderShape::Box { half_extents } => {
            box_corners(transform.position, *half_extents, transform.rotation)
                .iter()
                .fold(
                    (DVec2::splat(f64::MAX), DVec2::splat(f64::MIN)),
                    |(min, max), &c| (min.min(c), max.max(c)),
                )
        }
        ColliderShape::Polygon(polygon) => polygon.bounds(),
    }
}

#[inline]
fn overlaps(a: (DVec2, DVec2), b: (DVec2, DVec2)) -> bool {
    a.0.cmple(b.1).all() && b.0.cmple(a.1).all()
}

struct BodyBounds {
    entity: hecs::Entity,
    flags: ColliderFlags,
    bounds: (DVec2, DVec2),
}

/// Test every registered body against every trigger and queue enter/exit events.
///
/// A body already inside a trigger does not fire again. Bodies that vanished
/// from `bodies` since the last update leave with an exit event.
pub fn update_triggers(
    world: &hecs::World,
    triggers: &[hecs::Entity],
    bodies: &[hecs::Entity],
    events: &mut Vec<TriggerEvent>,
) {
    let body_bounds: Vec<BodyBounds> = bodies
        .iter()
        .filter_map(|&entity| {
            let mut query = world.query_one::<(&Transform2d, &Collider)>(entity).ok()?;
            let (transform, collider) = query.get()?;
            Some(BodyBounds {
                entity,
                flags: collider.flags,
                bounds: shape_bounds(&collider.shape, transform),
            })
        })
        .collect();

    for &trigger_entity in triggers {
        let Ok(mut query) = world.query_one::<(&Transform2d, &mut Trigger)>(trigger_entity) else {
            continue;
        };
        let Some((transform, trigger)) = query.get() else {
            continue;
        };
        let region = (
            transform.position - trigger.half_extents,
            transform.position + trigger.half_extents,
        );

        trigger.occupants.retain(|&body| {
            let still_registered = body_bounds.iter().any(|b| b.entity == body);
            if !still_registered {
                events.push(TriggerEvent::Exit {
                    trigger: trigger_entity,
                    body,
                });
            }
            still_registered
        });

        for body in &body_bounds {
            // A body whose flags stop matching leaves like one that moved out.
            let inside = body.flags.intersects(trigger.flags) && overlaps(region, body.bounds);
            let known = trigger.occupants.contains(&body.entity);

            if inside && !known {
                trigger.occupants.push(body.entity);
                events.push(TriggerEvent::Enter {
                    trigger: trigger_entity,
                    body: body.entity,
                });
                tracing::debug!(?trigger_entity, body = ?body.entity, "body entered trigger");
            } else if !inside && known {
                trigger.occupants.retain(|&e| e != body.entity);
                events.push(TriggerEvent::Exit {
                    trigger: trigger_entity,
                    body: body.entity,
                });
                tracing::debug!(?trigger_entity, body = ?body.entity, "body left trigger");
            }
        }
    }
}
