use crate::math::utils::normalize_or_identity;
use crate::math::{Quat, Vec3};

use super::rigid_body::RigidBody;

/// Below this angular speed the orientation is left untouched
const MIN_ANGULAR_SPEED: f32 = 1e-6;

/// Integrates velocities (applies gravity and accumulated forces)
pub fn integrate_velocities(body: &mut RigidBody, gravity: Vec3, dt: f32) {
    if !body.is_dynamic() || !body.is_awake() {
        return;
    }

    // Torque response depends on the orientation the body starts the step in
    body.update_world_inertia();

    body.linear_velocity += (gravity + body.force() * body.inv_mass()) * dt;
    body.angular_velocity += body.inv_inertia_world() * body.torque() * dt;

    body.linear_velocity *= damping_factor(body.linear_damping, dt);
    body.angular_velocity *= damping_factor(body.angular_damping, dt);
}

/// Advances the pose by the current velocities.
///
/// Static bodies never move; kinematic bodies follow whatever velocity the
/// host gave them.
pub fn integrate_transform(body: &mut RigidBody, dt: f32) {
    if body.is_static() || !body.is_awake() {
        return;
    }

    body.position += body.linear_velocity * dt;

    let omega = body.angular_velocity;
    let speed = omega.length();
    if speed > MIN_ANGULAR_SPEED {
        let delta = Quat::from_axis_angle(omega / speed, speed * dt);
        body.rotation = normalize_or_identity(delta * body.rotation);
    }

    body.update_world_inertia();
}

/// Full semi-implicit Euler step for a lone body: velocities first, then the
/// pose with the new velocities. Forces are cleared afterwards.
pub fn integrate_semi_implicit_euler(body: &mut RigidBody, gravity: Vec3, dt: f32) {
    integrate_velocities(body, gravity, dt);
    integrate_transform(body, dt);
    body.clear_forces();
}

#[inline]
fn damping_factor(damping: f32, dt: f32) -> f32 {
    (1.0 - damping * dt).max(0.0)
}
