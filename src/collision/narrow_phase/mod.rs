//! Exact overlap tests between pairs of convex shapes.
//!
//! Sphere pairs are resolved analytically. Everything else runs GJK to detect
//! overlap and EPA to measure it. All entry points are generic over [`Pose`]
//! so callers can pass whatever pose type they store.

pub mod epa;
pub mod gjk;

use crate::geometry::Shape;
use crate::math::utils::is_near_zero;
use crate::math::{Pose, Vec3};

use super::contact::{BodyHandle, ContactManifold, ContactPoint};

pub use epa::{epa, epa_bounded, EpaError, EPA_MAX_ITERATIONS};
pub use gjk::{gjk, GjkResult, Simplex};

/// Minimum translation separating two overlapping shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Unit normal pointing from shape A towards shape B
    pub normal: Vec3,
    /// Overlap along `normal` (non-negative)
    pub depth: f32,
}

/// Outcome of a narrowphase query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intersection {
    Separated,
    Penetrating(Penetration),
    /// GJK found an overlap but EPA could not measure it
    Unresolved(EpaError),
}

/// Classifies a pair of posed shapes as separated, penetrating or unresolved.
pub fn classify<PA: Pose, PB: Pose>(
    shape_a: &Shape,
    pose_a: &PA,
    shape_b: &Shape,
    pose_b: &PB,
) -> Intersection {
    classify_bounded(shape_a, pose_a, shape_b, pose_b, EPA_MAX_ITERATIONS)
}

/// [`classify`] with at most `max_epa_iterations` penetration refinements.
///
/// A GJK overlap EPA fails to measure within the cap is `Unresolved`.
pub fn classify_bounded<PA: Pose, PB: Pose>(
    shape_a: &Shape,
    pose_a: &PA,
    shape_b: &Shape,
    pose_b: &PB,
    max_epa_iterations: usize,
) -> Intersection {
    if let (Shape::Sphere(a), Shape::Sphere(b)) = (shape_a, shape_b) {
        return sphere_sphere(pose_a.position(), a.radius, pose_b.position(), b.radius);
    }

    match gjk(shape_a, pose_a, shape_b, pose_b) {
        GjkResult::Separated => Intersection::Separated,
        GjkResult::Intersecting(simplex) => {
            match epa_bounded(&simplex, shape_a, pose_a, shape_b, pose_b, max_epa_iterations) {
                Ok(penetration) => Intersection::Penetrating(penetration),
                Err(err) => Intersection::Unresolved(err),
            }
        }
    }
}

/// Penetration between two posed shapes, or `None` when they do not overlap.
///
/// An overlap EPA cannot measure is reported as no contact.
pub fn intersect<PA: Pose, PB: Pose>(
    shape_a: &Shape,
    pose_a: &PA,
    shape_b: &Shape,
    pose_b: &PB,
) -> Option<Penetration> {
    match classify(shape_a, pose_a, shape_b, pose_b) {
        Intersection::Penetrating(penetration) => Some(penetration),
        Intersection::Separated => None,
        Intersection::Unresolved(err) => {
            log::debug!("dropping unresolved overlap: {err}");
            None
        }
    }
}

/// Builds the single-point manifold for a penetration between two bodies.
///
/// Sphere pairs place the point on the surface of A; other pairs use the
/// midpoint of the two centres pulled back by half the depth.
pub fn contact_manifold<PA: Pose, PB: Pose>(
    (body_a, shape_a, pose_a): (BodyHandle, &Shape, &PA),
    (body_b, shape_b, pose_b): (BodyHandle, &Shape, &PB),
    penetration: Penetration,
) -> ContactManifold {
    let Penetration { normal, depth } = penetration;
    let position = match (shape_a, shape_b) {
        (Shape::Sphere(a), Shape::Sphere(_)) => pose_a.position() + normal * a.radius,
        _ => (pose_a.position() + pose_b.position()) * 0.5 - normal * (depth * 0.5),
    };

    let mut manifold = ContactManifold::new(body_a, body_b);
    manifold.add_point(ContactPoint::new(position, normal, depth));
    manifold
}

/// Runs [`intersect`] and wraps a hit in a one-point manifold.
pub fn collide<PA: Pose, PB: Pose>(
    a: (BodyHandle, &Shape, &PA),
    b: (BodyHandle, &Shape, &PB),
) -> Option<ContactManifold> {
    intersect(a.1, a.2, b.1, b.2).map(|penetration| contact_manifold(a, b, penetration))
}

fn sphere_sphere(center_a: Vec3, radius_a: f32, center_b: Vec3, radius_b: f32) -> Intersection {
    let delta = center_b - center_a;
    let radius_sum = radius_a + radius_b;
    let dist_sq = delta.length_squared();
    if dist_sq >= radius_sum * radius_sum {
        return Intersection::Separated;
    }

    let dist = dist_sq.sqrt();
    // Concentric spheres get an arbitrary but stable axis
    let normal = if is_near_zero(delta) {
        Vec3::Y
    } else {
        delta / dist
    };

    Intersection::Penetrating(Penetration {
        normal,
        depth: radius_sum - dist,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{NodeTransform, Quat, Transform};
    use proptest::prelude::*;

    fn at(x: f32, y: f32, z: f32) -> Transform {
        Transform::from_position(Vec3::new(x, y, z))
    }

    #[test]
    fn test_sphere_sphere_fast_path() {
        let a = Shape::sphere(1.0);
        let b = Shape::sphere(0.5);
        let p = intersect(&a, &at(0.0, 0.0, 0.0), &b, &at(1.2, 0.0, 0.0)).unwrap();

        assert!((p.depth - 0.3).abs() < 1e-6);
        assert!(p.normal.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn test_concentric_spheres() {
        let s = Shape::sphere(1.0);
        let p = intersect(&s, &at(0.0, 0.0, 0.0), &s, &at(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(p.normal, Vec3::Y);
        assert!((p.depth - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_mixed_pose_types() {
        let cube = Shape::cuboid(Vec3::splat(0.5));
        let node = NodeTransform::new(Vec3::new(0.0, 0.9, 0.0), Quat::IDENTITY);
        let p = intersect(&cube, &Transform::IDENTITY, &cube, &node).unwrap();
        assert!((p.depth - 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_separated_boxes() {
        let cube = Shape::cuboid(Vec3::splat(0.5));
        assert_eq!(
            classify(&cube, &at(0.0, 0.0, 0.0), &cube, &at(2.0, 0.0, 0.0)),
            Intersection::Separated
        );
    }

    #[test]
    fn test_exhausted_epa_is_unresolved() {
        let cube = Shape::cuboid(Vec3::splat(0.5));
        let (pa, pb) = (at(0.0, 0.0, 0.0), at(0.0, 0.8, 0.0));

        assert_eq!(
            classify_bounded(&cube, &pa, &cube, &pb, 0),
            Intersection::Unresolved(EpaError::NoConvergence(0))
        );
        // The same overlap resolves with the default cap
        assert!(matches!(
            classify(&cube, &pa, &cube, &pb),
            Intersection::Penetrating(p) if (p.depth - 0.2).abs() < 1e-3
        ));
    }

    #[test]
    fn test_manifold_point_for_spheres() {
        let s = Shape::sphere(1.0);
        let (pa, pb) = (at(0.0, 0.0, 0.0), at(0.0, 1.5, 0.0));
        let manifold = collide((BodyHandle(0), &s, &pa), (BodyHandle(1), &s, &pb)).unwrap();

        assert_eq!(manifold.len(), 1);
        let point = manifold.iter().next().unwrap();
        assert!(point.position.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6));
        assert!((point.depth - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_manifold_point_is_midpoint() {
        let cube = Shape::cuboid(Vec3::splat(0.5));
        let (pa, pb) = (at(0.0, 0.0, 0.0), at(0.0, 0.8, 0.0));
        let manifold = collide((BodyHandle(0), &cube, &pa), (BodyHandle(1), &cube, &pb)).unwrap();

        let point = manifold.iter().next().unwrap();
        // (0.4) - 0.2 / 2
        assert!(point.position.abs_diff_eq(Vec3::new(0.0, 0.3, 0.0), 1e-3));
        assert!(point.normal.abs_diff_eq(Vec3::Y, 1e-3));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            failure_persistence: None,
            ..ProptestConfig::default()
        })]

        #[test]
        fn sphere_pairs_match_center_distance(
            ra in 0.1f32..3.0,
            rb in 0.1f32..3.0,
            dist in 0.01f32..8.0,
            (x, y, z) in (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0),
        ) {
            let axis = Vec3::new(x, y, z).try_normalize().unwrap_or(Vec3::X);
            let a = Shape::sphere(ra);
            let b = Shape::sphere(rb);
            let pa = at(1.0, 2.0, 3.0);
            let pb = Transform::from_position(pa.position + axis * dist);

            match intersect(&a, &pa, &b, &pb) {
                Some(p) => {
                    prop_assert!(dist < ra + rb + 1e-5);
                    prop_assert!((p.depth - (ra + rb - dist)).abs() < 1e-4);
                    prop_assert!(p.normal.abs_diff_eq(axis, 1e-3));
                }
                None => prop_assert!(dist >= ra + rb - 1e-5),
            }
        }
    }
}
