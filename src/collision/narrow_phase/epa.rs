use thiserror::Error;

use crate::geometry::Shape;
use crate::math::{Pose, Vec3};

use super::gjk::{minkowski_support, Simplex};
use super::Penetration;

/// Maximum polytope expansions before giving up
pub const EPA_MAX_ITERATIONS: usize = 64;

/// Convergence tolerance on the support distance
pub const EPA_TOLERANCE: f32 = 1e-4;

/// Faces whose normal is shorter than this are dropped
const DEGENERATE_AREA: f32 = 1e-10;

/// Why EPA could not produce a penetration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EpaError {
    /// The support distance never came within tolerance of the closest face.
    #[error("penetration search did not converge within {0} iterations")]
    NoConvergence(usize),
    /// The starting simplex or the expanded polytope collapsed.
    #[error("degenerate polytope")]
    Degenerate,
}

#[derive(Debug, Clone, Copy)]
struct Face {
    indices: [usize; 3],
    /// Outward unit normal
    normal: Vec3,
    /// Distance of the face plane from the origin
    distance: f32,
}

impl Face {
    /// Builds a face whose normal points away from `interior`, or `None` for a
    /// sliver triangle.
    fn new(vertices: &[Vec3], [i, j, k]: [usize; 3], interior: Vec3) -> Option<Self> {
        let (a, b, c) = (vertices[i], vertices[j], vertices[k]);
        let normal = (b - a).cross(c - a);
        let len = normal.length();
        if len < DEGENERATE_AREA {
            return None;
        }

        let mut normal = normal / len;
        let mut indices = [i, j, k];
        if normal.dot(a - interior) < 0.0 {
            normal = -normal;
            indices.swap(1, 2);
        }

        Some(Self {
            indices,
            normal,
            distance: normal.dot(a),
        })
    }
}

/// Records a horizon edge, cancelling it if the reverse edge was already seen
fn add_or_remove_edge(edges: &mut Vec<(usize, usize)>, edge: (usize, usize)) {
    if let Some(pos) = edges.iter().position(|&(a, b)| a == edge.1 && b == edge.0) {
        edges.swap_remove(pos);
    } else {
        edges.push(edge);
    }
}

/// Expands the enclosing tetrahedron from GJK towards the boundary of
/// `A - B` and returns the minimum translation that separates the shapes.
///
/// The returned normal points from A towards B.
pub fn epa<PA: Pose, PB: Pose>(
    simplex: &Simplex,
    shape_a: &Shape,
    pose_a: &PA,
    shape_b: &Shape,
    pose_b: &PB,
) -> Result<Penetration, EpaError> {
    epa_bounded(simplex, shape_a, pose_a, shape_b, pose_b, EPA_MAX_ITERATIONS)
}

/// [`epa`] with an explicit cap on polytope expansions
pub fn epa_bounded<PA: Pose, PB: Pose>(
    simplex: &Simplex,
    shape_a: &Shape,
    pose_a: &PA,
    shape_b: &Shape,
    pose_b: &PB,
    max_iterations: usize,
) -> Result<Penetration, EpaError> {
    if simplex.len() != 4 {
        return Err(EpaError::Degenerate);
    }

    let mut vertices: Vec<Vec3> = simplex.points().to_vec();
    // The polytope only grows, so the starting centroid stays inside it
    let interior = vertices.iter().copied().sum::<Vec3>() * 0.25;

    let mut faces: Vec<Face> = [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]]
        .into_iter()
        .filter_map(|indices| Face::new(&vertices, indices, interior))
        .collect();
    if faces.len() < 4 {
        return Err(EpaError::Degenerate);
    }

    let mut horizon: Vec<(usize, usize)> = Vec::new();

    for _ in 0..max_iterations {
        let closest = faces
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .copied()
            .ok_or(EpaError::Degenerate)?;

        let point = minkowski_support(shape_a, pose_a, shape_b, pose_b, closest.normal);
        let distance = point.dot(closest.normal);

        if distance - closest.distance < EPA_TOLERANCE {
            return Ok(Penetration {
                normal: closest.normal,
                depth: distance,
            });
        }

        let new_index = vertices.len();
        vertices.push(point);

        horizon.clear();
        faces.retain(|face| {
            let visible = face.normal.dot(point - vertices[face.indices[0]]) > 0.0;
            if visible {
                for e in 0..3 {
                    let edge = (face.indices[e], face.indices[(e + 1) % 3]);
                    add_or_remove_edge(&mut horizon, edge);
                }
            }
            !visible
        });

        faces.extend(
            horizon
                .iter()
                .filter_map(|&(a, b)| Face::new(&vertices, [a, b, new_index], interior)),
        );
    }

    Err(EpaError::NoConvergence(max_iterations))
}
