//! Rigid body integration functions.

use glam::DVec2;

use crate::ecs::components::physics::RigidBody;
use crate::ecs::components::transform::Transform2d;

/// Drain the force/torque queues and advance velocities by one step
/// (semi-implicit Euler), then apply exponential drag and snap a slow body to
/// rest.
pub fn integrate_velocity(rb: &mut RigidBody, inertia: f64, gravity: DVec2, dt: f64) {
    let force: DVec2 = rb.force_queue.drain(..).sum();
    let torque: f64 = rb.torque_queue.drain(..).sum();

    let accel = force * rb.inverse_mass() + gravity * rb.gravity_scale;
    rb.linear_velocity += accel * dt;

    if !rb.lock_rotation && inertia > 0.0 {
        rb.angular_velocity += torque / inertia * dt;
    }

    // v *= exp(-drag * dt) stays stable for any drag value
    let damping = (-rb.linear_drag * dt).exp();
    rb.linear_velocity *= damping;
    rb.angular_velocity *= (-rb.angular_drag * dt).exp();

    snap_velocity(rb);
}

/// Zero the velocity once every component is below the body's threshold.
///
/// A body still moving on one axis keeps its small components, so a slow
/// build-up along a slope is not cancelled on every tick.
pub fn snap_velocity(rb: &mut RigidBody) {
    let at_rest = rb.linear_velocity.abs().cmplt(rb.min_velocity).all();
    if at_rest {
        rb.linear_velocity = DVec2::ZERO;
    }
    if rb.lock_rotation || (at_rest && rb.angular_velocity.abs() < rb.min_angular_velocity) {
        rb.angular_velocity = 0.0;
    }
}

/// Advance position and rotation by the current velocities.
pub fn integrate_position(rb: &RigidBody, transform: &mut Transform2d, dt: f64) {
    transform.position += rb.linear_velocity * dt;
    transform.rotation += rb.angular_velocity * dt;
}

/// Stop every body in the world. Pending forces are dropped too.
pub fn reset_velocities(world: &mut hecs::World) {
    for (_, rb) in world.query_mut::<&mut RigidBody>() {
        rb.reset_velocity();
        rb.force_queue.clear();
        rb.torque_queue.clear();
    }
}
