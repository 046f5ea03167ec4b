use crate::geometry::Shape;
use crate::math::utils::{any_perpendicular, is_near_zero};
use crate::math::{Pose, Vec3};

/// Maximum iterations for the GJK loop
pub const GJK_MAX_ITERATIONS: usize = 32;

/// Result of a GJK query
#[derive(Debug, Clone, PartialEq)]
pub enum GjkResult {
    /// The final tetrahedron encloses the origin; EPA starts from it
    Intersecting(Simplex),
    /// No overlap, or the iteration cap was hit
    Separated,
}

impl GjkResult {
    pub fn is_intersecting(&self) -> bool {
        matches!(self, GjkResult::Intersecting(_))
    }
}

/// Up to four points of the Minkowski difference `A - B`.
///
/// The most recently added point is always last.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Simplex {
    points: [Vec3; 4],
    size: usize,
}

impl Simplex {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn points(&self) -> &[Vec3] {
        &self.points[..self.size]
    }

    fn push(&mut self, point: Vec3) {
        debug_assert!(self.size < 4);
        self.points[self.size] = point;
        self.size += 1;
    }

    fn set(&mut self, points: &[Vec3]) {
        self.points[..points.len()].copy_from_slice(points);
        self.size = points.len();
    }

    #[inline]
    fn get(&self, index: usize) -> Vec3 {
        self.points[index]
    }
}

/// Support point of the Minkowski difference `A - B` in world space
#[inline]
pub fn minkowski_support<PA: Pose, PB: Pose>(
    shape_a: &Shape,
    pose_a: &PA,
    shape_b: &Shape,
    pose_b: &PB,
    direction: Vec3,
) -> Vec3 {
    shape_a.support_world(pose_a, direction) - shape_b.support_world(pose_b, -direction)
}

/// Boolean GJK: grows a simplex inside `A - B` until it encloses the origin or
/// a support point fails to pass it.
pub fn gjk<PA: Pose, PB: Pose>(
    shape_a: &Shape,
    pose_a: &PA,
    shape_b: &Shape,
    pose_b: &PB,
) -> GjkResult {
    let mut direction = pose_a.position() - pose_b.position();
    if is_near_zero(direction) {
        direction = Vec3::X;
    }

    let mut simplex = Simplex::new();
    let first = minkowski_support(shape_a, pose_a, shape_b, pose_b, direction);
    simplex.push(first);
    direction = -first;

    for _ in 0..GJK_MAX_ITERATIONS {
        if is_near_zero(direction) {
            // Origin lies on the current simplex; keep growing sideways
            direction = any_perpendicular(simplex.get(simplex.len() - 1));
        }

        let point = minkowski_support(shape_a, pose_a, shape_b, pose_b, direction);
        if point.dot(direction) < 0.0 {
            return GjkResult::Separated;
        }

        simplex.push(point);
        if do_simplex(&mut simplex, &mut direction) {
            return GjkResult::Intersecting(simplex);
        }
    }

    GjkResult::Separated
}

/// Reduces the simplex to the feature closest to the origin and picks the next
/// search direction. Returns true once a tetrahedron encloses the origin.
fn do_simplex(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    match simplex.len() {
        2 => line_case(simplex, direction),
        3 => triangle_case(simplex, direction),
        4 => tetrahedron_case(simplex, direction),
        _ => false,
    }
}

/// Direction from segment `ab` towards `ao`, perpendicular to the segment
#[inline]
fn edge_normal(ab: Vec3, ao: Vec3) -> Vec3 {
    let n = ab.cross(ao).cross(ab);
    if is_near_zero(n) {
        any_perpendicular(ab)
    } else {
        n
    }
}

fn line_case(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.get(1);
    let b = simplex.get(0);
    let ab = b - a;
    let ao = -a;

    if ab.dot(ao) > 0.0 {
        *direction = edge_normal(ab, ao);
    } else {
        simplex.set(&[a]);
        *direction = ao;
    }
    false
}

/// Leaves the triangle wound so that `(b - a) x (c - a)` faces the origin.
fn triangle_case(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.get(2);
    let b = simplex.get(1);
    let c = simplex.get(0);

    let ab = b - a;
    let ac = c - a;
    let ao = -a;
    let abc = ab.cross(ac);

    if ab.cross(abc).dot(ao) > 0.0 {
        simplex.set(&[b, a]);
        *direction = edge_normal(ab, ao);
        return false;
    }

    if abc.cross(ac).dot(ao) > 0.0 {
        simplex.set(&[c, a]);
        *direction = edge_normal(ac, ao);
        return false;
    }

    if abc.dot(ao) > 0.0 {
        *direction = abc;
    } else {
        simplex.set(&[b, c, a]);
        *direction = -abc;
    }
    false
}

/// `a` is the newest vertex; the three faces touching it have outward normals
/// given the winding left by [`triangle_case`].
fn tetrahedron_case(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.get(3);
    let b = simplex.get(2);
    let c = simplex.get(1);
    let d = simplex.get(0);

    let ab = b - a;
    let ac = c - a;
    let ad = d - a;
    let ao = -a;

    if ab.cross(ac).dot(ao) > 0.0 {
        simplex.set(&[c, b, a]);
        return triangle_case(simplex, direction);
    }

    if ac.cross(ad).dot(ao) > 0.0 {
        simplex.set(&[d, c, a]);
        return triangle_case(simplex, direction);
    }

    if ad.cross(ab).dot(ao) > 0.0 {
        simplex.set(&[b, d, a]);
        return triangle_case(simplex, direction);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quat, Transform};

    fn at(x: f32, y: f32, z: f32) -> Transform {
        Transform::from_position(Vec3::new(x, y, z))
    }

    #[test]
    fn test_simplex_set_replaces_points() {
        let mut s = Simplex::new();
        s.push(Vec3::X);
        s.push(Vec3::Y);
        s.push(Vec3::Z);
        s.set(&[Vec3::Y, Vec3::Z]);
        assert_eq!(s.points(), &[Vec3::Y, Vec3::Z]);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_spheres_intersecting() {
        let sphere = Shape::sphere(1.0);
        let result = gjk(&sphere, &at(0.0, 0.0, 0.0), &sphere, &at(1.5, 0.0, 0.0));

        match result {
            GjkResult::Intersecting(simplex) => assert_eq!(simplex.len(), 4),
            GjkResult::Separated => panic!("expected overlap"),
        }
    }

    #[test]
    fn test_spheres_separated() {
        let sphere = Shape::sphere(1.0);
        let result = gjk(&sphere, &at(0.0, 0.0, 0.0), &sphere, &at(3.0, 0.0, 0.0));
        assert_eq!(result, GjkResult::Separated);
    }

    #[test]
    fn test_boxes() {
        let cube = Shape::cuboid(Vec3::splat(0.5));

        assert!(gjk(&cube, &at(0.0, 0.0, 0.0), &cube, &at(0.8, 0.3, 0.0)).is_intersecting());
        assert!(!gjk(&cube, &at(0.0, 0.0, 0.0), &cube, &at(0.0, 1.2, 0.0)).is_intersecting());

        // A cube rotated 45 degrees reaches sqrt(0.5) along x
        let rotated = Transform::new(Vec3::new(1.15, 0.0, 0.0), Quat::from_rotation_y(0.785_398_2));
        assert!(gjk(&cube, &at(0.0, 0.0, 0.0), &cube, &rotated).is_intersecting());
    }

    #[test]
    fn test_coincident_centers() {
        let sphere = Shape::sphere(0.5);
        let cube = Shape::cuboid(Vec3::splat(0.5));
        assert!(gjk(&sphere, &at(1.0, 1.0, 1.0), &cube, &at(1.0, 1.0, 1.0)).is_intersecting());
    }

    #[test]
    fn test_capsule_and_cylinder() {
        let capsule = Shape::capsule(0.5, 1.0);
        let cylinder = Shape::cylinder(0.5, 1.0);

        assert!(gjk(&capsule, &at(0.0, 0.0, 0.0), &cylinder, &at(0.9, 0.5, 0.0)).is_intersecting());
        assert!(!gjk(&capsule, &at(0.0, 0.0, 0.0), &cylinder, &at(0.0, 3.0, 0.0)).is_intersecting());
    }

    #[test]
    fn test_enclosing_tetrahedron_contains_origin() {
        let cube = Shape::cuboid(Vec3::new(1.0, 0.5, 2.0));
        let sphere = Shape::sphere(0.75);
        let result = gjk(&cube, &at(0.2, -0.1, 0.3), &sphere, &at(0.9, 0.6, -0.4));

        let GjkResult::Intersecting(simplex) = result else {
            panic!("expected overlap");
        };
        let p = simplex.points();
        let centroid = (p[0] + p[1] + p[2] + p[3]) * 0.25;
        for (i, j, k, l) in [(0, 1, 2, 3), (0, 1, 3, 2), (0, 2, 3, 1), (1, 2, 3, 0)] {
            let mut n = (p[j] - p[i]).cross(p[k] - p[i]);
            if n.dot(p[l] - p[i]) > 0.0 {
                n = -n;
            }
            // Origin is on the inner side of every face (within rounding)
            assert!(n.dot(-p[i]) <= 1e-4, "origin outside face {i}{j}{k}");
            assert!(n.dot(centroid - p[i]) <= 0.0);
        }
    }
}
