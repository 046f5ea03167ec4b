use glam::{Mat4, Quat, Vec3};

use super::pose::Pose;
use super::utils::normalize_or_identity;
use crate::error::{PhysicsError, Result};

/// Scene-graph style transform with a non-uniform scale.
///
/// Useful for hosts that keep render and physics poses in one node. The
/// [`Pose`] implementation ignores scale; bake scale into the collider shape.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeTransform {
    pub position: Vec3,
    rotation: Quat,
    scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl NodeTransform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation: normalize_or_identity(rotation),
            scale: Vec3::ONE,
        }
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = normalize_or_identity(rotation);
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Sets the scale. Every component must be finite and positive.
    pub fn set_scale(&mut self, scale: Vec3) -> Result<()> {
        if !scale.is_finite() || scale.min_element() <= 0.0 {
            return Err(PhysicsError::InvalidTransform {
                reason: "scale components must be finite and positive",
            });
        }
        self.scale = scale;
        Ok(())
    }

    /// Local -Z in world space
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Local +X in world space
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Local +Y in world space
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Applies a world-space rotation of `angle` radians about `axis`.
    pub fn rotate(&mut self, axis: Vec3, angle: f32) -> Result<()> {
        let axis = axis.try_normalize().ok_or(PhysicsError::InvalidTransform {
            reason: "rotation axis must be non-zero",
        })?;
        self.rotation = normalize_or_identity(Quat::from_axis_angle(axis, angle) * self.rotation);
        Ok(())
    }

    /// Local-to-world matrix including scale
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Pose for NodeTransform {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn orientation(&self) -> Quat {
        self.rotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_basis_vectors() {
        let node = NodeTransform::default();
        assert!(node.forward().abs_diff_eq(-Vec3::Z, EPSILON));
        assert!(node.right().abs_diff_eq(Vec3::X, EPSILON));
        assert!(node.up().abs_diff_eq(Vec3::Y, EPSILON));
    }

    #[test]
    fn test_rotate() {
        let mut node = NodeTransform::default();
        node.rotate(Vec3::Y, FRAC_PI_2).unwrap();
        assert!(node.right().abs_diff_eq(-Vec3::Z, EPSILON));

        assert!(matches!(
            node.rotate(Vec3::ZERO, 1.0),
            Err(PhysicsError::InvalidTransform { .. })
        ));
    }

    #[test]
    fn test_scale_is_validated() {
        let mut node = NodeTransform::default();
        assert!(node.set_scale(Vec3::new(1.0, 0.0, 1.0)).is_err());
        assert!(node.set_scale(Vec3::new(1.0, f32::NAN, 1.0)).is_err());
        node.set_scale(Vec3::new(2.0, 1.0, 1.0)).unwrap();
        assert_eq!(node.scale(), Vec3::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn test_pose_ignores_scale() {
        let mut node = NodeTransform::new(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY);
        node.set_scale(Vec3::splat(3.0)).unwrap();

        assert!(node
            .transform_point(Vec3::X)
            .abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), EPSILON));
        assert!(node
            .local_matrix()
            .transform_point3(Vec3::X)
            .abs_diff_eq(Vec3::new(3.0, 1.0, 0.0), EPSILON));
    }

    #[test]
    fn test_translate() {
        let mut node = NodeTransform::default();
        node.translate(Vec3::new(1.0, 2.0, 3.0));
        node.translate(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(node.position, Vec3::new(2.0, 2.0, 3.0));
    }
}
