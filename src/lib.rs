//! # rigidcore
//!
//! A 3D rigid-body physics core written in Rust.
//!
//! ## Features
//!
//! - **Rigid Body Dynamics**: static, kinematic and dynamic bodies with linear and angular motion
//! - **Collision Shapes**: sphere, box, capsule and cylinder primitives
//! - **Broad Phase**: dynamic AABB tree with surface-area-heuristic insertion
//! - **Collision Detection**: GJK + EPA, generic over any [`math::Pose`]
//! - **Contact Solver**: sequential impulses with friction, restitution and Baumgarte stabilization
//! - **Warm Starting**: per-pair accumulated impulses carried between steps
//!
//! ## Quick Start
//!
//! ```rust
//! use rigidcore::prelude::*;
//!
//! # fn main() -> Result<(), PhysicsError> {
//! let mut world = World::default();
//! world.set_gravity(Vec3::new(0.0, -9.81, 0.0));
//!
//! // A static floor whose top face sits at y = 0.5
//! world.add_body(RigidBodyDesc::fixed(Shape::cuboid(Vec3::new(10.0, 0.5, 10.0))))?;
//!
//! // A dynamic ball dropped from above
//! let ball = world.add_body(
//!     RigidBodyDesc::dynamic(Shape::sphere(0.5))
//!         .with_position(Vec3::new(0.0, 5.0, 0.0))
//!         .with_mass(1.0),
//! )?;
//!
//! let dt = 1.0 / 60.0;
//! for _ in 0..600 {
//!     world.step(dt)?;
//! }
//!
//! let pose = world.pose(ball)?;
//! assert!(pose.position.y > 0.9 && pose.position.y < 1.1);
//! # Ok(())
//! # }
//! ```

pub mod collision;
pub mod constraints;
pub mod dynamics;
pub mod error;
pub mod geometry;
pub mod math;
pub mod solver;
mod world;

pub use error::{PhysicsError, Result};
pub use world::{RayCastHit, SleepSettings, StepReport, World, WorldConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::collision::{BodyHandle, ContactManifold, ContactPoint};
    pub use crate::dynamics::{CollisionFilter, MotionType, RigidBody, RigidBodyDesc};
    pub use crate::error::PhysicsError;
    pub use crate::geometry::{Aabb, Collider, Material, Shape};
    pub use crate::math::{Mat3, NodeTransform, Pose, Quat, Transform, Vec3};
    pub use crate::solver::{CombineMode, SolverSettings};
    pub use crate::world::{RayCastHit, SleepSettings, StepReport, World, WorldConfig};
}
