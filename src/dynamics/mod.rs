mod integrator;
mod rigid_body;

pub use integrator::{integrate_semi_implicit_euler, integrate_transform, integrate_velocities};
pub use rigid_body::{CollisionFilter, MotionType, RigidBody, RigidBodyDesc};
