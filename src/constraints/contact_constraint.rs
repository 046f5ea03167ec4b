use crate::collision::{AccumulatedImpulse, ContactPoint};
use crate::dynamics::RigidBody;
use crate::math::utils::orthonormal_basis;
use crate::math::Vec3;

/// A velocity constraint for one contact point.
///
/// The normal points from body A to body B; a positive normal impulse pushes
/// B along the normal and A against it.
#[derive(Debug, Clone, Copy)]
pub struct ContactConstraint {
    /// Slot of body A in the body array
    pub body_a: usize,
    /// Slot of body B in the body array
    pub body_b: usize,
    /// Contact point in world space
    pub point: Vec3,
    pub normal: Vec3,
    /// Friction directions, orthonormal to the normal and each other
    pub tangents: [Vec3; 2],
    /// Offset from body A's centre of mass to the contact point
    pub r_a: Vec3,
    /// Offset from body B's centre of mass to the contact point
    pub r_b: Vec3,
    /// Effective mass along the normal
    pub normal_mass: f32,
    /// Effective masses along the two tangents
    pub tangent_mass: [f32; 2],
    /// Combined friction coefficient
    pub friction: f32,
    /// Combined restitution coefficient
    pub restitution: f32,
    /// Baumgarte velocity target from residual penetration
    pub bias: f32,
    /// Restitution velocity target, fixed on the first iteration
    bounce: f32,
    /// Impulses accumulated so far, seeded from the previous step
    pub impulse: AccumulatedImpulse,
}

/// Per-contact parameters shared by every point of a pair
#[derive(Debug, Clone, Copy)]
pub struct ContactParams {
    pub friction: f32,
    pub restitution: f32,
    pub penetration_slop: f32,
    pub baumgarte: f32,
    pub inv_dt: f32,
}

impl ContactConstraint {
    /// Creates a new contact velocity constraint
    pub fn new(
        (index_a, body_a): (usize, &RigidBody),
        (index_b, body_b): (usize, &RigidBody),
        contact: &ContactPoint,
        params: &ContactParams,
    ) -> Self {
        let point = contact.position;
        let normal = contact.normal;
        let (t1, t2) = orthonormal_basis(normal);

        let r_a = point - body_a.position;
        let r_b = point - body_b.position;

        let bias =
            (contact.depth - params.penetration_slop).max(0.0) * params.baumgarte * params.inv_dt;

        Self {
            body_a: index_a,
            body_b: index_b,
            point,
            normal,
            tangents: [t1, t2],
            r_a,
            r_b,
            normal_mass: effective_mass(body_a, body_b, r_a, r_b, normal),
            tangent_mass: [
                effective_mass(body_a, body_b, r_a, r_b, t1),
                effective_mass(body_a, body_b, r_a, r_b, t2),
            ],
            friction: params.friction,
            restitution: params.restitution,
            bias,
            bounce: 0.0,
            impulse: contact.impulse,
        }
    }

    /// Applies the seeded impulses to both bodies
    pub fn warm_start(&self, body_a: &mut RigidBody, body_b: &mut RigidBody) {
        let p = self.normal * self.impulse.normal
            + self.tangents[0] * self.impulse.tangent[0]
            + self.tangents[1] * self.impulse.tangent[1];

        apply_impulse(body_a, body_b, p, self.r_a, self.r_b);
    }

    /// Solves the non-penetration constraint and returns the magnitude of
    /// the normal velocity change it applied.
    ///
    /// On the first iteration a closing speed above `restitution_threshold`
    /// sets the bounce target used for the rest of the solve.
    pub fn solve_normal(
        &mut self,
        body_a: &mut RigidBody,
        body_b: &mut RigidBody,
        first_iteration: bool,
        restitution_threshold: f32,
    ) -> f32 {
        let vn = relative_velocity(body_a, body_b, self.r_a, self.r_b).dot(self.normal);

        if first_iteration {
            self.bounce = if vn < -restitution_threshold {
                -self.restitution * vn
            } else {
                0.0
            };
        }

        let lambda = self.normal_mass * (self.bias + self.bounce - vn);

        // Contacts push, never pull
        let old = self.impulse.normal;
        self.impulse.normal = (old + lambda).max(0.0);
        let delta = self.impulse.normal - old;

        apply_impulse(body_a, body_b, self.normal * delta, self.r_a, self.r_b);

        if self.normal_mass > 0.0 {
            (delta / self.normal_mass).abs()
        } else {
            0.0
        }
    }

    /// Solves both friction directions, each clamped to the Coulomb limit of
    /// the current normal impulse.
    pub fn solve_friction(&mut self, body_a: &mut RigidBody, body_b: &mut RigidBody) {
        let max_friction = self.friction * self.impulse.normal;

        for axis in 0..2 {
            let tangent = self.tangents[axis];
            let vt = relative_velocity(body_a, body_b, self.r_a, self.r_b).dot(tangent);
            let lambda = -self.tangent_mass[axis] * vt;

            let old = self.impulse.tangent[axis];
            self.impulse.tangent[axis] = (old + lambda).clamp(-max_friction, max_friction);
            let delta = self.impulse.tangent[axis] - old;

            apply_impulse(body_a, body_b, tangent * delta, self.r_a, self.r_b);
        }
    }
}

/// Inverse of the constraint-space inverse mass along `axis`
fn effective_mass(body_a: &RigidBody, body_b: &RigidBody, r_a: Vec3, r_b: Vec3, axis: Vec3) -> f32 {
    let rn_a = r_a.cross(axis);
    let rn_b = r_b.cross(axis);

    let k = body_a.inv_mass()
        + body_b.inv_mass()
        + rn_a.dot(body_a.inv_inertia_world() * rn_a)
        + rn_b.dot(body_b.inv_inertia_world() * rn_b);

    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

/// Velocity of B's contact point relative to A's
#[inline]
fn relative_velocity(body_a: &RigidBody, body_b: &RigidBody, r_a: Vec3, r_b: Vec3) -> Vec3 {
    let vel_a = body_a.linear_velocity + body_a.angular_velocity.cross(r_a);
    let vel_b = body_b.linear_velocity + body_b.angular_velocity.cross(r_b);
    vel_b - vel_a
}

/// Applies `-impulse` to A and `+impulse` to B.
///
/// Works on the inverse mass and inertia directly, so static and kinematic
/// bodies (both zero) are untouched.
fn apply_impulse(body_a: &mut RigidBody, body_b: &mut RigidBody, impulse: Vec3, r_a: Vec3, r_b: Vec3) {
    body_a.linear_velocity -= impulse * body_a.inv_mass();
    body_a.angular_velocity -= body_a.inv_inertia_world() * r_a.cross(impulse);

    body_b.linear_velocity += impulse * body_b.inv_mass();
    body_b.angular_velocity += body_b.inv_inertia_world() * r_b.cross(impulse);
}
