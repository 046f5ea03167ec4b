use glam::{Mat4, Quat, Vec3};

use super::utils::normalize_or_identity;

/// Anything that can place a shape in world space.
///
/// Collision routines are generic over this trait so a host can pass its own
/// scene-graph node type instead of copying poses into [`Transform`].
pub trait Pose {
    /// World-space position of the local origin
    fn position(&self) -> Vec3;

    /// World-space orientation (unit quaternion)
    fn orientation(&self) -> Quat;

    /// Transforms a point from local space to world space
    #[inline]
    fn transform_point(&self, point: Vec3) -> Vec3 {
        self.orientation() * point + self.position()
    }

    /// Rotates a direction from local space to world space
    #[inline]
    fn transform_direction(&self, direction: Vec3) -> Vec3 {
        self.orientation() * direction
    }

    /// Transforms a world-space point into local space
    #[inline]
    fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.orientation().conjugate() * (point - self.position())
    }

    /// Rotates a world-space direction into local space
    #[inline]
    fn inverse_transform_direction(&self, direction: Vec3) -> Vec3 {
        self.orientation().conjugate() * direction
    }

    /// Rigid local-to-world matrix
    #[inline]
    fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation(), self.position())
    }
}

/// A rigid transformation: position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    /// Position (translation)
    pub position: Vec3,
    /// Rotation (unit quaternion)
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform (no translation or rotation)
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Creates a new transform; the rotation is normalized.
    #[inline]
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation: normalize_or_identity(rotation),
        }
    }

    /// Creates a transform with only translation
    #[inline]
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Creates a transform with only rotation
    #[inline]
    pub fn from_rotation(rotation: Quat) -> Self {
        Self::new(Vec3::ZERO, rotation)
    }

    /// Returns the inverse of this transform
    #[inline]
    pub fn inverse(self) -> Self {
        let rotation = self.rotation.conjugate();
        Self {
            position: rotation * -self.position,
            rotation,
        }
    }

    /// `self * other`: maps from `other`'s local space through `self` to world.
    #[inline]
    pub fn compose(self, other: Self) -> Self {
        Self {
            position: Pose::transform_point(&self, other.position),
            rotation: normalize_or_identity(self.rotation * other.rotation),
        }
    }

    /// Interpolates position linearly and rotation spherically
    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            rotation: self.rotation.slerp(other.rotation, t),
        }
    }
}

impl Pose for Transform {
    #[inline]
    fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    fn orientation(&self) -> Quat {
        self.rotation
    }
}

impl<P: Pose + ?Sized> Pose for &P {
    #[inline]
    fn position(&self) -> Vec3 {
        (**self).position()
    }

    #[inline]
    fn orientation(&self) -> Quat {
        (**self).orientation()
    }
}
