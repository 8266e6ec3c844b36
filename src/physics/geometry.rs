//! Static convex geometry and the small vector helpers shared by the narrow phase.

use glam::DVec2;

use super::debug::{Color, DebugDraw};
use super::error::{PhysicsError, PhysicsResult};

/// Below this, lengths and cross products count as zero.
pub const DEGENERATE_EPSILON: f64 = 1e-12;

/// One boundary segment of a [`ConvexPolygon`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub p1: DVec2,
    pub p2: DVec2,
    /// Outward unit normal.
    pub normal: DVec2,
    /// Unit direction from `p1` to `p2`.
    pub tangent: DVec2,
    pub length: f64,
}

impl Edge {
    fn new(p1: DVec2, p2: DVec2, winding: f64) -> Self {
        let delta = p2 - p1;
        let length = delta.length();
        let tangent = delta / length;
        // perp() is the left-hand normal; outward is to the right for CCW outlines.
        let normal = -tangent.perp() * winding;
        Self {
            p1,
            p2,
            normal,
            tangent,
            length,
        }
    }

    /// Closest point on the segment to `point`.
    #[inline]
    pub fn closest_point(&self, point: DVec2) -> DVec2 {
        closest_point_on_segment(point, self.p1, self.p2)
    }
}

/// Immutable convex outline in world space.
///
/// Built once from an ordered point list (either winding). Edges cover every
/// consecutive pair including the closing one, with normals pointing away from
/// the interior.
#[derive(Debug, Clone)]
pub struct ConvexPolygon {
    vertices: Vec<DVec2>,
    edges: Vec<Edge>,
    min: DVec2,
    max: DVec2,
    /// Draw edge normals when debug drawing.
    pub debug_normals: bool,
}

impl ConvexPolygon {
    pub fn new(points: &[DVec2]) -> PhysicsResult<Self> {
        if points.iter().any(|p| !p.is_finite()) {
            return Err(PhysicsError::DegeneratePolygon {
                reason: "non-finite vertex",
            });
        }

        let mut vertices: Vec<DVec2> = Vec::with_capacity(points.len());
        for &p in points {
            if vertices
                .last()
                .map_or(true, |last| last.distance_squared(p) > DEGENERATE_EPSILON)
            {
                vertices.push(p);
            }
        }
        while vertices.len() > 1
            && vertices[0].distance_squared(vertices[vertices.len() - 1]) <= DEGENERATE_EPSILON
        {
            vertices.pop();
        }

        if vertices.len() < 3 {
            return Err(PhysicsError::DegeneratePolygon {
                reason: "fewer than three distinct points",
            });
        }

        let area = signed_area(&vertices);
        if area.abs() <= DEGENERATE_EPSILON {
            return Err(PhysicsError::DegeneratePolygon {
                reason: "zero area",
            });
        }
        let winding = area.signum();

        let n = vertices.len();
        for i in 0..n {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            let c = vertices[(i + 2) % n];
            if (b - a).perp_dot(c - b) * winding < -DEGENERATE_EPSILON {
                return Err(PhysicsError::DegeneratePolygon {
                    reason: "outline is not convex",
                });
            }
        }

        let edges = (0..n)
            .map(|i| Edge::new(vertices[i], vertices[(i + 1) % n], winding))
            .collect();

        let (min, max) = vertices.iter().fold(
            (DVec2::splat(f64::MAX), DVec2::splat(f64::MIN)),
            |(min, max), &v| (min.min(v), max.max(v)),
        );

        Ok(Self {
            vertices,
            edges,
            min,
            max,
            debug_normals: false,
        })
    }

    /// Axis-aligned rectangle centred on `center`.
    pub fn rectangle(center: DVec2, half_extents: DVec2) -> PhysicsResult<Self> {
        Self::new(&box_corners(center, half_extents, 0.0))
    }

    #[inline]
    pub fn vertices(&self) -> &[DVec2] {
        &self.vertices
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Bounding box as `(min, max)`.
    #[inline]
    pub fn bounds(&self) -> (DVec2, DVec2) {
        (self.min, self.max)
    }

    pub fn centroid(&self) -> DVec2 {
        self.vertices.iter().copied().sum::<DVec2>() / self.vertices.len() as f64
    }

    pub fn contains_point(&self, point: DVec2) -> bool {
        self.edges
            .iter()
            .all(|edge| (point - edge.p1).dot(edge.normal) <= 0.0)
    }

    pub fn debug_draw(&self, sink: &mut dyn DebugDraw, color: Color) {
        sink.polygon(&self.vertices, color);
        if self.debug_normals {
            for edge in &self.edges {
                let mid = (edge.p1 + edge.p2) * 0.5;
                sink.line(mid, mid + edge.normal * 0.5, Color::NORMAL);
            }
        }
    }
}

/// Shoelace area. Positive for counter-clockwise outlines.
pub fn signed_area(points: &[DVec2]) -> f64 {
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum();
    twice * 0.5
}

/// Interval `(min, max)` of `points` projected onto `axis`.
pub fn project_points(points: &[DVec2], axis: DVec2) -> (f64, f64) {
    points
        .iter()
        .fold((f64::MAX, f64::MIN), |(min, max), p| {
            let d = p.dot(axis);
            (min.min(d), max.max(d))
        })
}

/// World-space corners of an oriented box, counter-clockwise starting bottom-left.
pub fn box_corners(center: DVec2, half_extents: DVec2, rotation: f64) -> [DVec2; 4] {
    let rot = DVec2::from_angle(rotation);
    [
        DVec2::new(-half_extents.x, -half_extents.y),
        DVec2::new(half_extents.x, -half_extents.y),
        DVec2::new(half_extents.x, half_extents.y),
        DVec2::new(-half_extents.x, half_extents.y),
    ]
    .map(|local| center + rot.rotate(local))
}

/// The box's local X and Y axes in world space.
#[inline]
pub fn box_axes(rotation: f64) -> [DVec2; 2] {
    let x = DVec2::from_angle(rotation);
    [x, x.perp()]
}

/// Closed edge list of an outline given as corners.
pub fn outline_segments(corners: &[DVec2; 4]) -> [(DVec2, DVec2); 4] {
    [
        (corners[0], corners[1]),
        (corners[1], corners[2]),
        (corners[2], corners[3]),
        (corners[3], corners[0]),
    ]
}

pub fn closest_point_on_segment(point: DVec2, a: DVec2, b: DVec2) -> DVec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= DEGENERATE_EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Intersection of segments `a1-a2` and `b1-b2`.
///
/// Parallel (or near-parallel within `eps`) segments never intersect, and the
/// hit must lie within `[0, 1]` on both segments.
pub fn segment_intersection(
    a1: DVec2,
    a2: DVec2,
    b1: DVec2,
    b2: DVec2,
    eps: f64,
) -> Option<DVec2> {
    let r = a2 - a1;
    let s = b2 - b1;
    let denom = r.perp_dot(s);
    if denom.abs() <= eps {
        return None;
    }
    let qp = b1 - a1;
    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a1 + r * t)
    } else {
        None
    }
}
