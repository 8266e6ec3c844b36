//! Narrowphase collision detection: primitive queries, SAT and manifold generation.
//!
//! Every routine returns `None` for "no contact", including degenerate inputs
//! (zero-length directions, parallel segments), so callers never see
//! non-finite values.

use glam::DVec2;

use crate::ecs::components::physics::ColliderShape;
use crate::ecs::components::transform::Transform2d;

use super::contact::{ContactInfo, ContactManifold, RayCastResult};
use super::geometry::{
    box_axes, box_corners, outline_segments, project_points, segment_intersection, ConvexPolygon,
    DEGENERATE_EPSILON,
};

/// Circle against circle. The normal points from circle 1 toward circle 2.
///
/// Coincident centres fall back to `+Y`.
pub fn circle_circle(p1: DVec2, r1: f64, p2: DVec2, r2: f64) -> Option<ContactInfo> {
    let diff = p2 - p1;
    let dist_sq = diff.length_squared();
    let min_dist = r1 + r2;

    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > DEGENERATE_EPSILON {
        diff / dist
    } else {
        DVec2::Y
    };

    let penetration = min_dist - dist;
    let point = p1 + normal * (r1 - penetration * 0.5);

    Some(ContactInfo {
        normal,
        penetration,
        point,
    })
}

/// Extent of an oriented box projected onto `axis`.
#[inline]
fn box_extent(half_extents: DVec2, axes: &[DVec2; 2], axis: DVec2) -> f64 {
    half_extents.x * axes[0].dot(axis).abs() + half_extents.y * axes[1].dot(axis).abs()
}

/// SAT test for two oriented boxes over their four face axes.
///
/// The normal is the axis of least overlap, oriented from box 1 toward box 2;
/// the penetration is that raw axis overlap, not rescaled by the distance
/// between the centres.
pub fn obb_obb(
    p1: DVec2,
    half_1: DVec2,
    angle_1: f64,
    p2: DVec2,
    half_2: DVec2,
    angle_2: f64,
) -> Option<ContactInfo> {
    let axes_1 = box_axes(angle_1);
    let axes_2 = box_axes(angle_2);
    let t = p2 - p1;

    let mut min_overlap = f64::MAX;
    let mut best_axis = DVec2::ZERO;
    let mut best_extent_1 = 0.0;

    for axis in axes_1.into_iter().chain(axes_2) {
        let extent_1 = box_extent(half_1, &axes_1, axis);
        let extent_2 = box_extent(half_2, &axes_2, axis);
        let overlap = extent_1 + extent_2 - t.dot(axis).abs();

        if overlap <= 0.0 {
            return None;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            best_axis = axis;
            best_extent_1 = extent_1;
        }
    }

    let normal = if best_axis.dot(t) < 0.0 {
        -best_axis
    } else {
        best_axis
    };
    let point = p1 + normal * (best_extent_1 - min_overlap * 0.5);

    Some(ContactInfo {
        normal,
        penetration: min_overlap,
        point,
    })
}

/// Circle against an oriented box. The normal points from the circle toward the box.
pub fn circle_obb(
    center: DVec2,
    radius: f64,
    box_center: DVec2,
    half_extents: DVec2,
    angle: f64,
) -> Option<ContactInfo> {
    let box_transform = Transform2d::from_position_rotation(box_center, angle);
    let local = box_transform.inverse_transform_point(center);
    let clamped = local.clamp(-half_extents, half_extents);

    if clamped != local {
        let closest = box_transform.transform_point(clamped);
        let diff = closest - center;
        let dist_sq = diff.length_squared();
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        let normal = if dist > DEGENERATE_EPSILON {
            diff / dist
        } else {
            (box_center - center).normalize_or(DVec2::Y)
        };
        return Some(ContactInfo {
            normal,
            penetration: radius - dist,
            point: closest,
        });
    }

    // Centre inside the box: push out through the nearest face.
    let gap = half_extents - local.abs();
    let (local_face, face_gap) = if gap.x < gap.y {
        (DVec2::new(local.x.signum() * half_extents.x, local.y), gap.x)
    } else {
        (DVec2::new(local.x, local.y.signum() * half_extents.y), gap.y)
    };
    let face_point = box_transform.transform_point(local_face);
    let outward = (face_point - center).normalize_or(DVec2::Y);

    Some(ContactInfo {
        normal: -outward,
        penetration: radius + face_gap,
        point: face_point,
    })
}

pub fn point_in_circle(point: DVec2, center: DVec2, radius: f64) -> bool {
    point.distance_squared(center) < radius * radius
}

pub fn point_in_obb(point: DVec2, center: DVec2, half_extents: DVec2, angle: f64) -> bool {
    let local = Transform2d::from_position_rotation(center, angle).inverse_transform_point(point);
    local.x.abs() < half_extents.x && local.y.abs() < half_extents.y
}

/// Unit direction, or `None` when the input has no usable length.
#[inline]
fn ray_direction(direction: DVec2) -> Option<DVec2> {
    direction.try_normalize()
}

/// Ray against circle. Rays starting inside the circle do not hit it.
pub fn ray_circle(
    origin: DVec2,
    direction: DVec2,
    center: DVec2,
    radius: f64,
    limit: f64,
) -> Option<RayCastResult> {
    let dir = ray_direction(direction)?;
    let m = origin - center;
    let b = m.dot(dir);
    let c = m.length_squared() - radius * radius;

    if c <= 0.0 || b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let t = -b - discriminant.sqrt();
    if t < 0.0 || t > limit {
        return None;
    }

    Some(RayCastResult {
        position: origin + dir * t,
        direction: dir,
    })
}

/// Slab test in the box's local frame. Rays starting inside the box do not hit it.
pub fn ray_obb(
    origin: DVec2,
    direction: DVec2,
    center: DVec2,
    half_extents: DVec2,
    angle: f64,
    limit: f64,
    eps_small: f64,
) -> Option<RayCastResult> {
    let dir = ray_direction(direction)?;
    let frame = Transform2d::from_position_rotation(center, angle);
    let local_origin = frame.inverse_transform_point(origin);
    let local_dir = DVec2::from_angle(-angle).rotate(dir);

    let mut t_min = f64::NEG_INFINITY;
    let mut t_max = f64::INFINITY;

    for i in 0..2 {
        let o = local_origin[i];
        let d = local_dir[i];
        let h = half_extents[i];
        if d.abs() <= eps_small {
            if o.abs() > h {
                return None;
            }
            continue;
        }
        let t1 = (-h - o) / d;
        let t2 = (h - o) / d;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
    }

    if t_min > t_max || t_min < 0.0 || t_min > limit {
        return None;
    }

    Some(RayCastResult {
        position: origin + dir * t_min,
        direction: dir,
    })
}

/// Parameter along the ray (unit `dir`) where it crosses segment `a-b`.
/// Near-parallel crossings, within `eps_small`, are ignored.
fn ray_segment(origin: DVec2, dir: DVec2, a: DVec2, b: DVec2, eps_small: f64) -> Option<f64> {
    let s = b - a;
    let denom = dir.perp_dot(s);
    if denom.abs() <= eps_small {
        return None;
    }
    let qp = a - origin;
    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(dir) / denom;
    (t >= 0.0 && (0.0..=1.0).contains(&u)).then_some(t)
}

/// Ray against a static polygon: nearest edge crossing. Rays starting inside do not hit it.
pub fn ray_polygon(
    origin: DVec2,
    direction: DVec2,
    polygon: &ConvexPolygon,
    limit: f64,
    eps_small: f64,
) -> Option<RayCastResult> {
    let dir = ray_direction(direction)?;
    if polygon.contains_point(origin) {
        return None;
    }

    let t = polygon
        .edges()
        .iter()
        .filter_map(|edge| ray_segment(origin, dir, edge.p1, edge.p2, eps_small))
        .fold(f64::INFINITY, f64::min);

    if !t.is_finite() || t > limit {
        return None;
    }

    Some(RayCastResult {
        position: origin + dir * t,
        direction: dir,
    })
}

/// Ray against any collider shape placed at `transform`.
pub fn ray_shape(
    origin: DVec2,
    direction: DVec2,
    shape: &ColliderShape,
    transform: &Transform2d,
    limit: f64,
    eps_small: f64,
) -> Option<RayCastResult> {
    match shape {
        ColliderShape::Circle { radius } => {
            ray_circle(origin, direction, transform.position, *radius, limit)
        }
        ColliderShape::Box { half_extents } => ray_obb(
            origin,
            direction,
            transform.position,
            *half_extents,
            transform.rotation,
            limit,
            eps_small,
        ),
        ColliderShape::Polygon(polygon) => {
            ray_polygon(origin, direction, polygon, limit, eps_small)
        }
    }
}

/// Best candidate axis while scanning polygon edges.
struct Candidate {
    biased: f64,
    depth: f64,
    edge: usize,
}

/// SAT of an oriented box against a static polygon.
///
/// Polygon edge normals are the candidate axes; the box's own axes are only
/// tested for separation. The winning edge is the one with least overlap after
/// biasing by `eps` times the squared distance from the nearest box corner to
/// the edge, so the edge the box rests on beats its parallel opposite. Contacts
/// are where the box outline crosses the winning edge; box edges within
/// `eps_small` of parallel to it are skipped.
pub fn box_polygon_manifold(
    center: DVec2,
    half_extents: DVec2,
    rotation: f64,
    polygon: &ConvexPolygon,
    eps: f64,
    eps_small: f64,
) -> Option<ContactManifold> {
    let corners = box_corners(center, half_extents, rotation);
    let vertices = polygon.vertices();
    let mut best: Option<Candidate> = None;

    for (index, edge) in polygon.edges().iter().enumerate() {
        let (min_poly, max_poly) = project_points(vertices, edge.normal);
        let (min_box, max_box) = project_points(&corners, edge.normal);

        if max_box < min_poly || min_box > max_poly {
            return None;
        }

        let overlap = (max_poly - min_box).min(max_box - min_poly);
        let nearest_sq = corners
            .iter()
            .map(|&c| c.distance_squared(edge.closest_point(c)))
            .fold(f64::MAX, f64::min);
        let biased = overlap + eps * nearest_sq;

        if best.as_ref().map_or(true, |b| biased < b.biased) {
            best = Some(Candidate {
                biased,
                depth: overlap,
                edge: index,
            });
        }
    }

    for axis in box_axes(rotation) {
        let (min_poly, max_poly) = project_points(vertices, axis);
        let (min_box, max_box) = project_points(&corners, axis);
        if max_box < min_poly || min_box > max_poly {
            return None;
        }
    }

    let best = best?;
    let edge = polygon.edges()[best.edge];

    let mut contacts: Vec<DVec2> = Vec::with_capacity(2);
    for (a, b) in outline_segments(&corners) {
        if let Some(point) = segment_intersection(a, b, edge.p1, edge.p2, eps_small) {
            if contacts
                .iter()
                .all(|c| c.distance_squared(point) > eps * eps)
            {
                contacts.push(point);
            }
        }
    }

    Some(match contacts.as_slice() {
        [a, b, ..] => ContactManifold::pair(edge.normal, *a, *b, best.depth),
        [a] => ContactManifold::single(edge.normal, *a, best.depth),
        [] => ContactManifold::single(edge.normal, center, best.depth),
    })
}

/// SAT of a circle against a static polygon.
///
/// Candidate axes are the edge normals, biased like [`box_polygon_manifold`].
/// The axis toward the nearest polygon vertex is tested for separation only,
/// which rejects circles sitting just off a corner. Contacts lie on the chord
/// where the circle crosses the winning edge's supporting line.
pub fn circle_polygon_manifold(
    center: DVec2,
    radius: f64,
    polygon: &ConvexPolygon,
    eps: f64,
) -> Option<ContactManifold> {
    let vertices = polygon.vertices();
    let mut best: Option<Candidate> = None;

    for (index, edge) in polygon.edges().iter().enumerate() {
        let (min_poly, max_poly) = project_points(vertices, edge.normal);
        let projected = center.dot(edge.normal);
        let (min_circle, max_circle) = (projected - radius, projected + radius);

        if max_circle < min_poly || min_circle > max_poly {
            return None;
        }

        let overlap = (max_poly - min_circle).min(max_circle - min_poly);
        let biased = overlap + eps * center.distance_squared(edge.closest_point(center));

        if best.as_ref().map_or(true, |b| biased < b.biased) {
            best = Some(Candidate {
                biased,
                depth: overlap,
                edge: index,
            });
        }
    }

    let nearest_vertex = vertices
        .iter()
        .copied()
        .min_by(|a, b| a.distance_squared(center).total_cmp(&b.distance_squared(center)))?;
    if let Some(axis) = (center - nearest_vertex).try_normalize() {
        let (min_poly, max_poly) = project_points(vertices, axis);
        let projected = center.dot(axis);
        if projected + radius < min_poly || projected - radius > max_poly {
            return None;
        }
    }

    let best = best?;
    let normal = polygon.edges()[best.edge].normal;
    let tangent = normal.perp();

    let dist_to_plane = (radius - best.depth).max(0.0);
    let chord_half = (radius * radius - dist_to_plane * dist_to_plane).max(0.0).sqrt();
    let base = center - normal * dist_to_plane;

    Some(if chord_half <= eps {
        ContactManifold::single(normal, base, best.depth)
    } else {
        ContactManifold::pair(
            normal,
            base - tangent * chord_half,
            base + tangent * chord_half,
            best.depth,
        )
    })
}

/// Dynamic shape against static polygon. Normal points from the polygon toward the body.
pub fn detect_static(
    shape: &ColliderShape,
    transform: &Transform2d,
    polygon: &ConvexPolygon,
    eps: f64,
    eps_small: f64,
) -> Option<ContactManifold> {
    match shape {
        ColliderShape::Circle { radius } => {
            circle_polygon_manifold(transform.position, *radius, polygon, eps)
        }
        ColliderShape::Box { half_extents } => box_polygon_manifold(
            transform.position,
            *half_extents,
            transform.rotation,
            polygon,
            eps,
            eps_small,
        ),
        ColliderShape::Polygon(_) => None,
    }
}

/// Dynamic shape against dynamic shape. Normal points from A toward B.
pub fn detect_pair(
    shape_a: &ColliderShape,
    transform_a: &Transform2d,
    shape_b: &ColliderShape,
    transform_b: &Transform2d,
) -> Option<ContactManifold> {
    let info = match (shape_a, shape_b) {
        (ColliderShape::Circle { radius: ra }, ColliderShape::Circle { radius: rb }) => {
            circle_circle(transform_a.position, *ra, transform_b.position, *rb)
        }
        (
            ColliderShape::Box {
                half_extents: half_a,
            },
            ColliderShape::Box {
                half_extents: half_b,
            },
        ) => obb_obb(
            transform_a.position,
            *half_a,
            transform_a.rotation,
            transform_b.position,
            *half_b,
            transform_b.rotation,
        ),
        (ColliderShape::Circle { radius }, ColliderShape::Box { half_extents }) => circle_obb(
            transform_a.position,
            *radius,
            transform_b.position,
            *half_extents,
            transform_b.rotation,
        ),
        (ColliderShape::Box { half_extents }, ColliderShape::Circle { radius }) => circle_obb(
            transform_b.position,
            *radius,
            transform_a.position,
            *half_extents,
            transform_a.rotation,
        )
        .map(|info| ContactInfo {
            normal: -info.normal,
            ..info
        }),
        (ColliderShape::Polygon(_), _) | (_, ColliderShape::Polygon(_)) => None,
    }?;

    Some(ContactManifold::single(
        info.normal,
        info.point,
        info.penetration,
    ))
}
