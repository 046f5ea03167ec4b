use std::f32::consts::PI;

use crate::math::utils::abs_matrix;
use crate::math::{Mat3, Pose, Vec3};

use super::aabb::Aabb;

/// Smallest accepted radius, half-height or half-extent
pub const MIN_EXTENT: f32 = 1e-4;

/// Directions shorter than this fall back to a fixed support point
const SUPPORT_EPSILON: f32 = 1e-6;

#[inline]
fn clamp_extent(value: f32) -> f32 {
    if value.is_finite() {
        value.max(MIN_EXTENT)
    } else {
        MIN_EXTENT
    }
}

/// A convex collision shape in its local frame.
///
/// Capsules and cylinders are aligned with the local Y axis; every shape is
/// centred on its local origin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    /// A sphere defined by its radius
    Sphere(Sphere),
    /// A box (cuboid) defined by half-extents
    Box(BoxShape),
    /// A capsule defined by radius and half-height of its core segment
    Capsule(Capsule),
    /// A cylinder defined by radius and half-height
    Cylinder(Cylinder),
}

impl Shape {
    #[inline]
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere(Sphere::new(radius))
    }

    /// Creates a box shape from half-extents
    #[inline]
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Box(BoxShape::new(half_extents))
    }

    #[inline]
    pub fn capsule(radius: f32, half_height: f32) -> Self {
        Self::Capsule(Capsule::new(radius, half_height))
    }

    #[inline]
    pub fn cylinder(radius: f32, half_height: f32) -> Self {
        Self::Cylinder(Cylinder::new(radius, half_height))
    }

    /// Farthest point of the shape along `direction`, in local space.
    ///
    /// `direction` need not be normalized; a zero direction yields a fixed point
    /// on the surface.
    #[inline]
    pub fn support(&self, direction: Vec3) -> Vec3 {
        match self {
            Shape::Sphere(s) => s.support(direction),
            Shape::Box(b) => b.support(direction),
            Shape::Capsule(c) => c.support(direction),
            Shape::Cylinder(c) => c.support(direction),
        }
    }

    /// Support point in world space for a shape placed at `pose`
    #[inline]
    pub fn support_world<P: Pose>(&self, pose: &P, direction: Vec3) -> Vec3 {
        let local_dir = pose.inverse_transform_direction(direction);
        pose.transform_point(self.support(local_dir))
    }

    /// Bounding box in local space
    #[inline]
    pub fn local_bounds(&self) -> Aabb {
        match self {
            Shape::Sphere(s) => s.local_bounds(),
            Shape::Box(b) => b.local_bounds(),
            Shape::Capsule(c) => c.local_bounds(),
            Shape::Cylinder(c) => c.local_bounds(),
        }
    }

    /// Bounding box of the shape placed at `pose`
    pub fn world_aabb<P: Pose>(&self, pose: &P) -> Aabb {
        match self {
            Shape::Sphere(s) => {
                let r = Vec3::splat(s.radius);
                Aabb::new(pose.position() - r, pose.position() + r)
            }
            Shape::Capsule(c) => {
                let axis = pose.transform_direction(Vec3::Y) * c.half_height;
                let (p0, p1) = (pose.position() - axis, pose.position() + axis);
                let r = Vec3::splat(c.radius);
                Aabb::new(p0.min(p1) - r, p0.max(p1) + r)
            }
            Shape::Box(_) | Shape::Cylinder(_) => {
                let local = self.local_bounds();
                let rot = abs_matrix(Mat3::from_quat(pose.orientation()));
                let center = pose.transform_point(local.center());
                Aabb::from_center_half_extents(center, rot * local.half_extents())
            }
        }
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        match self {
            Shape::Sphere(s) => s.volume(),
            Shape::Box(b) => b.volume(),
            Shape::Capsule(c) => c.volume(),
            Shape::Cylinder(c) => c.volume(),
        }
    }

    /// Diagonal inertia tensor about the local origin for the given mass
    #[inline]
    pub fn inertia(&self, mass: f32) -> Mat3 {
        let diagonal = match self {
            Shape::Sphere(s) => s.inertia(mass),
            Shape::Box(b) => b.inertia(mass),
            Shape::Capsule(c) => c.inertia(mass),
            Shape::Cylinder(c) => c.inertia(mass),
        };
        Mat3::from_diagonal(diagonal)
    }

    /// Mass and inertia of a solid of uniform `density`
    #[inline]
    pub fn mass_properties(&self, density: f32) -> MassProperties {
        let mass = self.volume() * density;
        MassProperties {
            mass,
            inertia: self.inertia(mass),
        }
    }
}

/// Mass and local inertia tensor of a shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    /// Total mass
    pub mass: f32,
    /// Inertia tensor in local coordinates (diagonal for primitive shapes)
    pub inertia: Mat3,
}

/// A sphere collision shape
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sphere {
    pub radius: f32,
}

impl Sphere {
    #[inline]
    pub fn new(radius: f32) -> Self {
        Self {
            radius: clamp_extent(radius),
        }
    }

    #[inline]
    pub fn support(&self, direction: Vec3) -> Vec3 {
        let len = direction.length();
        if len < SUPPORT_EPSILON {
            return Vec3::X * self.radius;
        }
        direction * (self.radius / len)
    }

    #[inline]
    pub fn local_bounds(&self) -> Aabb {
        let r = Vec3::splat(self.radius);
        Aabb::new(-r, r)
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        (4.0 / 3.0) * PI * self.radius.powi(3)
    }

    #[inline]
    fn inertia(&self, mass: f32) -> Vec3 {
        Vec3::splat(0.4 * mass * self.radius * self.radius)
    }
}

/// A box (cuboid) collision shape
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoxShape {
    /// Half-extents (half the size in each dimension)
    pub half_extents: Vec3,
}

impl BoxShape {
    #[inline]
    pub fn new(half_extents: Vec3) -> Self {
        Self {
            half_extents: Vec3::new(
                clamp_extent(half_extents.x),
                clamp_extent(half_extents.y),
                clamp_extent(half_extents.z),
            ),
        }
    }

    /// Picks the corner on the side of each non-negative direction component
    #[inline]
    pub fn support(&self, direction: Vec3) -> Vec3 {
        let h = self.half_extents;
        Vec3::new(
            if direction.x >= 0.0 { h.x } else { -h.x },
            if direction.y >= 0.0 { h.y } else { -h.y },
            if direction.z >= 0.0 { h.z } else { -h.z },
        )
    }

    #[inline]
    pub fn local_bounds(&self) -> Aabb {
        Aabb::new(-self.half_extents, self.half_extents)
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }

    #[inline]
    fn inertia(&self, mass: f32) -> Vec3 {
        let size = self.half_extents * 2.0;
        let sq = size * size;
        Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) * (mass / 12.0)
    }
}

/// A capsule collision shape (cylinder with hemispherical caps)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capsule {
    /// Radius of the cylinder and hemispherical caps
    pub radius: f32,
    /// Half-height of the core segment (total height = 2 * half_height + 2 * radius)
    pub half_height: f32,
}

impl Capsule {
    #[inline]
    pub fn new(radius: f32, half_height: f32) -> Self {
        Self {
            radius: clamp_extent(radius),
            half_height: clamp_extent(half_height),
        }
    }

    /// Sphere support around whichever segment end faces `direction`
    #[inline]
    pub fn support(&self, direction: Vec3) -> Vec3 {
        let len = direction.length();
        if len < SUPPORT_EPSILON {
            return Vec3::new(self.radius, self.half_height, 0.0);
        }
        let dir = direction / len;
        let y = if dir.y >= 0.0 {
            self.half_height
        } else {
            -self.half_height
        };
        Vec3::new(0.0, y, 0.0) + dir * self.radius
    }

    #[inline]
    pub fn local_bounds(&self) -> Aabb {
        let r = self.radius;
        let h = self.half_height + r;
        Aabb::new(Vec3::new(-r, -h, -r), Vec3::new(r, h, r))
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        let r = self.radius;
        PI * r * r * (2.0 * self.half_height) + (4.0 / 3.0) * PI * r * r * r
    }

    /// Splits the mass between the core cylinder and the two caps by volume,
    /// then shifts the caps out to the segment ends.
    fn inertia(&self, mass: f32) -> Vec3 {
        let r = self.radius;
        let h = self.half_height;
        let cylinder_volume = PI * r * r * 2.0 * h;
        let sphere_volume = (4.0 / 3.0) * PI * r * r * r;
        let total = cylinder_volume + sphere_volume;

        let cylinder_mass = mass * cylinder_volume / total;
        let caps_mass = mass - cylinder_mass;

        let cyl_axial = 0.5 * cylinder_mass * r * r;
        let cyl_lateral = cylinder_mass * (3.0 * r * r + 4.0 * h * h) / 12.0;

        let caps_axial = 0.4 * caps_mass * r * r;
        // Hemisphere centroid sits 3r/8 beyond the segment end
        let offset = h + 0.375 * r;
        let caps_lateral = caps_axial + caps_mass * offset * offset;

        let axial = cyl_axial + caps_axial;
        let lateral = cyl_lateral + caps_lateral;
        Vec3::new(lateral, axial, lateral)
    }
}

/// A solid cylinder collision shape
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cylinder {
    pub radius: f32,
    /// Half the distance between the two flat caps
    pub half_height: f32,
}

impl Cylinder {
    #[inline]
    pub fn new(radius: f32, half_height: f32) -> Self {
        Self {
            radius: clamp_extent(radius),
            half_height: clamp_extent(half_height),
        }
    }

    /// Rim point of the cap facing `direction`
    #[inline]
    pub fn support(&self, direction: Vec3) -> Vec3 {
        let radial_len = (direction.x * direction.x + direction.z * direction.z).sqrt();
        let (x, z) = if radial_len > SUPPORT_EPSILON {
            let k = self.radius / radial_len;
            (direction.x * k, direction.z * k)
        } else {
            (self.radius, 0.0)
        };
        let y = if direction.y >= 0.0 {
            self.half_height
        } else {
            -self.half_height
        };
        Vec3::new(x, y, z)
    }

    #[inline]
    pub fn local_bounds(&self) -> Aabb {
        let e = Vec3::new(self.radius, self.half_height, self.radius);
        Aabb::new(-e, e)
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        PI * self.radius * self.radius * 2.0 * self.half_height
    }

    #[inline]
    fn inertia(&self, mass: f32) -> Vec3 {
        let r2 = self.radius * self.radius;
        let h2 = self.half_height * self.half_height;
        let lateral = mass * (3.0 * r2 + 4.0 * h2) / 12.0;
        Vec3::new(lateral, 0.5 * mass * r2, lateral)
    }
}

/// Surface response parameters of a collider
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    /// kg/m^3, used when a dynamic body is created without an explicit mass
    pub density: f32,
    pub restitution: f32,
    pub friction: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 1000.0, // water
            restitution: 0.2,
            friction: 0.5,
        }
    }
}

impl Material {
    pub fn new(density: f32, restitution: f32, friction: f32) -> Self {
        Self {
            density,
            restitution,
            friction,
        }
    }
}

/// A shape paired with its material; each rigid body owns exactly one.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Collider {
    pub shape: Shape,
    pub material: Material,
}

impl Collider {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            material: Material::default(),
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }
}

impl From<Shape> for Collider {
    fn from(shape: Shape) -> Self {
        Self::new(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quat, Transform};
    use std::f32::consts::FRAC_PI_4;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_sphere_support() {
        let sphere = Sphere::new(2.0);

        assert!(sphere.support(Vec3::X).abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), EPSILON));
        assert!(approx_eq(sphere.support(Vec3::new(1.0, 1.0, 0.0)).length(), 2.0));
        // Zero direction falls back to +X
        assert_eq!(sphere.support(Vec3::ZERO), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_box_support() {
        let b = BoxShape::new(Vec3::new(1.0, 2.0, 3.0));

        assert_eq!(b.support(Vec3::X), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.support(-Vec3::X), Vec3::new(-1.0, 2.0, 3.0));
        assert_eq!(b.support(-Vec3::ONE), Vec3::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn test_capsule_support() {
        let capsule = Capsule::new(1.0, 2.0);

        assert!(approx_eq(capsule.support(Vec3::Y).y, 3.0));
        assert!(approx_eq(capsule.support(-Vec3::Y).y, -3.0));

        let side = capsule.support(Vec3::new(1.0, 0.1, 0.0));
        assert!(approx_eq(side.y - 2.0, 0.1 / (1.01_f32).sqrt()));

        assert_eq!(capsule.support(Vec3::ZERO), Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_cylinder_support() {
        let cylinder = Cylinder::new(1.0, 2.0);

        let s = cylinder.support(Vec3::new(1.0, 1.0, 0.0));
        assert!(s.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), EPSILON));

        let s = cylinder.support(Vec3::new(0.0, -1.0, 3.0));
        assert!(s.abs_diff_eq(Vec3::new(0.0, -2.0, 1.0), EPSILON));

        // Straight up: radial part falls back to +X
        assert_eq!(cylinder.support(Vec3::Y), Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_degenerate_dimensions_are_clamped() {
        assert_eq!(Sphere::new(0.0).radius, MIN_EXTENT);
        assert_eq!(Sphere::new(-3.0).radius, MIN_EXTENT);
        assert_eq!(
            BoxShape::new(Vec3::new(1.0, 0.0, -1.0)).half_extents,
            Vec3::new(1.0, MIN_EXTENT, MIN_EXTENT)
        );
        assert_eq!(Capsule::new(f32::NAN, 1.0).radius, MIN_EXTENT);
        assert_eq!(Cylinder::new(1.0, 0.0).half_height, MIN_EXTENT);
    }

    #[test]
    fn test_sphere_mass() {
        let props = Shape::sphere(1.0).mass_properties(1.0);

        assert!(approx_eq(props.mass, (4.0 / 3.0) * PI));
        assert!(approx_eq(props.inertia.x_axis.x, 0.4 * props.mass));
    }

    #[test]
    fn test_box_inertia() {
        let inertia = Shape::cuboid(Vec3::new(1.0, 1.0, 1.0)).inertia(12.0);
        // Side 2: I = m/12 * (4 + 4)
        assert!(approx_eq(inertia.x_axis.x, 8.0));
        assert!(approx_eq(inertia.y_axis.y, 8.0));
        assert!(approx_eq(inertia.z_axis.z, 8.0));
        assert_eq!(inertia.x_axis.y, 0.0);
    }

    #[test]
    fn test_cylinder_inertia() {
        let inertia = Shape::cylinder(1.0, 1.0).inertia(6.0);
        assert!(approx_eq(inertia.y_axis.y, 3.0));
        assert!(approx_eq(inertia.x_axis.x, 6.0 * 7.0 / 12.0));
    }

    #[test]
    fn test_capsule_inertia_exceeds_inner_cylinder() {
        let mass = 2.0;
        let capsule = Shape::capsule(0.5, 1.0).inertia(mass);
        let cylinder = Shape::cylinder(0.5, 1.0).inertia(mass);

        // Same mass spread further along the axis
        assert!(capsule.x_axis.x > cylinder.x_axis.x);
        assert!(approx_eq(capsule.x_axis.x, capsule.z_axis.z));
    }

    #[test]
    fn test_box_world_aabb() {
        let shape = Shape::cuboid(Vec3::new(1.0, 2.0, 3.0));

        let t = Transform::from_position(Vec3::new(10.0, 0.0, 0.0));
        let aabb = shape.world_aabb(&t);
        assert!(aabb.min.abs_diff_eq(Vec3::new(9.0, -2.0, -3.0), EPSILON));
        assert!(aabb.max.abs_diff_eq(Vec3::new(11.0, 2.0, 3.0), EPSILON));

        let t = Transform::from_rotation(Quat::from_rotation_z(FRAC_PI_4));
        let aabb = shape.world_aabb(&t);
        let expected = (1.0 + 2.0) * FRAC_PI_4.cos();
        assert!(approx_eq(aabb.max.x, expected));
        assert!(approx_eq(aabb.max.y, expected));
        assert!(approx_eq(aabb.max.z, 3.0));
    }

    #[test]
    fn test_capsule_world_aabb_follows_axis() {
        let shape = Shape::capsule(0.5, 2.0);
        let lying = Transform::from_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let aabb = shape.world_aabb(&lying);

        assert!(approx_eq(aabb.max.x, 2.5));
        assert!(approx_eq(aabb.max.y, 0.5));
    }

    #[test]
    fn test_world_aabb_contains_supports() {
        let shapes = [
            Shape::sphere(0.7),
            Shape::cuboid(Vec3::new(0.5, 1.0, 1.5)),
            Shape::capsule(0.3, 0.8),
            Shape::cylinder(0.6, 0.9),
        ];
        let pose = Transform::new(
            Vec3::new(1.0, -2.0, 3.0),
            Quat::from_axis_angle(Vec3::new(1.0, 2.0, 3.0).normalize(), 1.1),
        );
        let dirs = [
            Vec3::X,
            -Vec3::X,
            Vec3::Y,
            -Vec3::Y,
            Vec3::Z,
            -Vec3::Z,
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 0.5, -2.0),
        ];

        for shape in shapes {
            let aabb = shape.world_aabb(&pose).expand(1e-4);
            for d in dirs {
                let p = shape.support_world(&pose, d);
                assert!(aabb.contains_aabb(crate::geometry::Aabb::new(p, p)));
            }
        }
    }

    #[test]
    fn test_support_world() {
        let shape = Shape::sphere(1.0);
        let pose = Transform::from_position(Vec3::new(5.0, 0.0, 0.0));

        let support = shape.support_world(&pose, Vec3::X);
        assert!(approx_eq(support.x, 6.0));
    }

    #[test]
    fn test_material_defaults() {
        let collider = Collider::from(Shape::sphere(1.0));
        assert_eq!(collider.material.density, 1000.0);
        assert_eq!(collider.material.restitution, 0.2);
        assert_eq!(collider.material.friction, 0.5);
    }
}
