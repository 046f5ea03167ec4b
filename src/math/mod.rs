//! Math types used throughout the engine.
//!
//! Vector, quaternion and matrix types are re-exported from [`glam`]; this module
//! adds the [`Pose`] capability the collision code is generic over plus a few
//! helpers glam does not provide.

mod node_transform;
mod pose;

pub use glam::{Mat3, Mat4, Quat, Vec3};
pub use node_transform::NodeTransform;
pub use pose::{Pose, Transform};

/// Common math constants
pub mod consts {
    /// A small epsilon value for floating point comparisons
    pub const EPSILON: f32 = 1e-6;

    /// Determinant magnitude below which a 3x3 inverse is clamped
    pub const MIN_DETERMINANT: f32 = 1e-8;

    /// `1 / sqrt(2)`, the tangent-basis branch threshold
    pub const FRAC_1_SQRT_2: f32 = std::f32::consts::FRAC_1_SQRT_2;
}

/// Utility functions
pub mod utils {
    use super::consts::{EPSILON, FRAC_1_SQRT_2, MIN_DETERMINANT};
    use glam::{Mat3, Quat, Vec3};

    /// Returns two unit vectors `(t1, t2)` such that `n, t1, t2` form a right-handed
    /// orthonormal basis. `n` must be unit length.
    #[inline]
    pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
        let t1 = if n.z.abs() > FRAC_1_SQRT_2 {
            let k = 1.0 / (n.y * n.y + n.z * n.z).sqrt();
            Vec3::new(0.0, -n.z * k, n.y * k)
        } else {
            let k = 1.0 / (n.x * n.x + n.y * n.y).sqrt();
            Vec3::new(-n.y * k, n.x * k, 0.0)
        };
        (t1, n.cross(t1))
    }

    /// Returns some unit vector perpendicular to `v`, or `Vec3::X` when `v` is zero
    #[inline]
    pub fn any_perpendicular(v: Vec3) -> Vec3 {
        let axis = if v.x.abs() < 0.57735 { Vec3::X } else { Vec3::Y };
        v.cross(axis).try_normalize().unwrap_or(Vec3::X)
    }

    /// Normalizes `q`, falling back to `Quat::IDENTITY` when it is near zero or not finite
    #[inline]
    pub fn normalize_or_identity(q: Quat) -> Quat {
        let length_squared = q.length_squared();
        if !length_squared.is_finite() || length_squared < EPSILON * EPSILON {
            Quat::IDENTITY
        } else {
            q * length_squared.sqrt().recip()
        }
    }

    /// Returns true if the vector is shorter than [`EPSILON`]
    #[inline]
    pub fn is_near_zero(v: Vec3) -> bool {
        v.length_squared() < EPSILON * EPSILON
    }

    /// Inverts `m` via its adjugate. A determinant smaller than
    /// [`MIN_DETERMINANT`] in magnitude is replaced by `MIN_DETERMINANT`, so the
    /// result is always finite for finite input.
    pub fn inverse_clamped(m: Mat3) -> Mat3 {
        let (c0, c1, c2) = (m.x_axis, m.y_axis, m.z_axis);
        let r0 = c1.cross(c2);
        let r1 = c2.cross(c0);
        let r2 = c0.cross(c1);

        let mut det = c0.dot(r0);
        if det.abs() < MIN_DETERMINANT {
            det = MIN_DETERMINANT;
        }
        let inv_det = 1.0 / det;

        Mat3::from_cols(r0 * inv_det, r1 * inv_det, r2 * inv_det).transpose()
    }

    /// Returns `m` with every entry replaced by its absolute value
    #[inline]
    pub fn abs_matrix(m: Mat3) -> Mat3 {
        Mat3::from_cols(m.x_axis.abs(), m.y_axis.abs(), m.z_axis.abs())
    }
}
