//! Sequential impulse contact resolution.
//!
//! Bodies are copied out of the ECS into [`BodyState`], resolved, and written
//! back, so one contact never holds two component borrows at once.

use glam::DVec2;

use crate::ecs::components::physics::{Collider, RigidBody};
use crate::ecs::components::transform::Transform2d;

use super::contact::ContactManifold;

/// Share of the angular impulse actually applied. Full angular response
/// produces spin spikes on box corners.
pub const ANGULAR_BLEND: f64 = 0.5;

/// Positional-correction tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionParams {
    /// Penetration tolerated without correction.
    pub slop: f64,
    /// Fraction of the remaining penetration removed per resolution.
    pub percentage: f64,
}

/// Solver-side copy of one body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: DVec2,
    pub linear_velocity: DVec2,
    pub angular_velocity: f64,
    pub inv_mass: f64,
    pub inv_inertia: f64,
    pub restitution: f64,
    pub restitution_threshold: f64,
    pub friction: f64,
    pub min_velocity: DVec2,
    pub min_angular_velocity: f64,
}

impl BodyState {
    pub fn from_body(rb: &RigidBody, collider: &Collider, transform: &Transform2d) -> Self {
        let inv_inertia = if rb.lock_rotation {
            0.0
        } else {
            1.0 / collider.shape.moment_of_inertia(rb.mass())
        };
        Self {
            position: transform.position,
            linear_velocity: rb.linear_velocity,
            angular_velocity: rb.angular_velocity,
            inv_mass: rb.inverse_mass(),
            inv_inertia,
            restitution: rb.restitution,
            restitution_threshold: rb.restitution_threshold,
            friction: collider.friction,
            min_velocity: rb.min_velocity,
            min_angular_velocity: rb.min_angular_velocity,
        }
    }

    pub fn write_back(&self, rb: &mut RigidBody, transform: &mut Transform2d) {
        rb.linear_velocity = self.linear_velocity;
        rb.angular_velocity = self.angular_velocity;
        transform.position = self.position;
    }

    /// Velocity of the material point at offset `r` from the centre.
    #[inline]
    fn point_velocity(&self, r: DVec2) -> DVec2 {
        self.linear_velocity + r.perp() * self.angular_velocity
    }

    /// Restitution after applying this body's own threshold.
    #[inline]
    fn effective_restitution(&self, normal_speed: f64) -> f64 {
        if normal_speed.abs() > self.restitution_threshold {
            self.restitution
        } else {
            0.0
        }
    }

    /// Remove tiny normal bounce. A body with no tangential drive at the
    /// contact is then snapped to rest; a driven one keeps its small velocity
    /// so it can pick up speed along the surface.
    fn settle(&mut self, normal: DVec2, driven: bool) {
        let normal_speed = self.linear_velocity.dot(normal);
        if normal_speed.abs() < self.min_velocity.y {
            self.linear_velocity -= normal * normal_speed;
        }
        if driven {
            return;
        }
        if self
            .linear_velocity
            .abs()
            .cmplt(self.min_velocity)
            .all()
        {
            self.linear_velocity = DVec2::ZERO;
        }
        if self.angular_velocity.abs() < self.min_angular_velocity {
            self.angular_velocity = 0.0;
        }
    }
}

/// Tangential speed below this counts as no drive along the surface.
const DRIVE_EPSILON: f64 = 1e-9;

/// What a single resolution did; used by tests and tick statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolutionReport {
    pub normal_impulse: f64,
    pub tangent_impulse: f64,
    /// Restitution coefficient used in the normal impulse.
    pub restitution: f64,
    /// Distance the body (or both bodies together) moved along the normal.
    pub correction: f64,
}

/// Resolve a dynamic body against static geometry.
///
/// The manifold normal must point from the geometry toward the body.
pub fn resolve_against_static(
    body: &mut BodyState,
    manifold: &ContactManifold,
    static_friction: f64,
    params: CorrectionParams,
) -> ResolutionReport {
    let mut report = ResolutionReport::default();
    if body.inv_mass <= 0.0 {
        return report;
    }
    let Some(contact) = manifold.contact_center() else {
        return report;
    };

    let normal = manifold.normal;
    let tangent = normal.perp();
    let r = contact - body.position;

    let velocity = body.point_velocity(r);
    let normal_speed = velocity.dot(normal);
    let tangent_speed = velocity.dot(tangent);

    if normal_speed < 0.0 {
        let restitution = body.effective_restitution(normal_speed);
        let friction = (body.friction * static_friction).max(0.0).sqrt();

        let rn = r.perp_dot(normal);
        let normal_mass = body.inv_mass + rn * rn * body.inv_inertia;
        let normal_impulse = -(1.0 + restitution) * normal_speed / normal_mass;

        let rt = r.perp_dot(tangent);
        let tangent_mass = body.inv_mass + rt * rt * body.inv_inertia;
        let max_friction = friction * normal_impulse.abs();
        let tangent_impulse = (-tangent_speed / tangent_mass).clamp(-max_friction, max_friction);

        let impulse = normal * normal_impulse + tangent * tangent_impulse;
        body.linear_velocity += impulse * body.inv_mass;
        body.angular_velocity += ANGULAR_BLEND * body.inv_inertia * r.perp_dot(impulse);

        report.normal_impulse = normal_impulse;
        report.tangent_impulse = tangent_impulse;
        report.restitution = restitution;
    }

    let correction = (manifold.depth - params.slop).max(0.0) * params.percentage;
    body.position += normal * correction;
    report.correction = correction;

    let residual = body.linear_velocity.dot(normal);
    if residual < 0.0 {
        body.linear_velocity -= normal * residual;
    }
    body.settle(normal, tangent_speed.abs() > DRIVE_EPSILON);

    report
}

/// Resolve two dynamic bodies. The manifold normal must point from `a` toward `b`.
pub fn resolve_pair(
    a: &mut BodyState,
    b: &mut BodyState,
    manifold: &ContactManifold,
    params: CorrectionParams,
) -> ResolutionReport {
    let mut report = ResolutionReport::default();
    let inv_mass_sum = a.inv_mass + b.inv_mass;
    if inv_mass_sum <= 0.0 {
        return report;
    }
    let Some(contact) = manifold.contact_center() else {
        return report;
    };

    let normal = manifold.normal;
    let tangent = normal.perp();
    let r_a = contact - a.position;
    let r_b = contact - b.position;

    let relative = b.point_velocity(r_b) - a.point_velocity(r_a);
    let normal_speed = relative.dot(normal);
    let tangent_speed = relative.dot(tangent);

    if normal_speed < 0.0 {
        let restitution = a
            .effective_restitution(normal_speed)
            .min(b.effective_restitution(normal_speed));
        let friction = (a.friction * b.friction).max(0.0).sqrt();

        let (ran, rbn) = (r_a.perp_dot(normal), r_b.perp_dot(normal));
        let normal_mass =
            inv_mass_sum + ran * ran * a.inv_inertia + rbn * rbn * b.inv_inertia;
        let normal_impulse = -(1.0 + restitution) * normal_speed / normal_mass;

        let (rat, rbt) = (r_a.perp_dot(tangent), r_b.perp_dot(tangent));
        let tangent_mass =
            inv_mass_sum + rat * rat * a.inv_inertia + rbt * rbt * b.inv_inertia;
        let max_friction = friction * normal_impulse.abs();
        let tangent_impulse = (-tangent_speed / tangent_mass).clamp(-max_friction, max_friction);

        let impulse = normal * normal_impulse + tangent * tangent_impulse;
        a.linear_velocity -= impulse * a.inv_mass;
        a.angular_velocity -= ANGULAR_BLEND * a.inv_inertia * r_a.perp_dot(impulse);
        b.linear_velocity += impulse * b.inv_mass;
        b.angular_velocity += ANGULAR_BLEND * b.inv_inertia * r_b.perp_dot(impulse);

        report.normal_impulse = normal_impulse;
        report.tangent_impulse = tangent_impulse;
        report.restitution = restitution;
    }

    let correction = (manifold.depth - params.slop).max(0.0) * params.percentage;
    let per_mass = normal * (correction / inv_mass_sum);
    a.position -= per_mass * a.inv_mass;
    b.position += per_mass * b.inv_mass;
    report.correction = correction;

    let residual = (b.linear_velocity - a.linear_velocity).dot(normal);
    if residual < 0.0 {
        let impulse = normal * (-residual / inv_mass_sum);
        a.linear_velocity -= impulse * a.inv_mass;
        b.linear_velocity += impulse * b.inv_mass;
    }
    let driven = tangent_speed.abs() > DRIVE_EPSILON;
    a.settle(normal, driven);
    b.settle(normal, driven);

    report
}
