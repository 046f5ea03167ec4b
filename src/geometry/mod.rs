mod aabb;
mod shape;

pub use aabb::Aabb;
pub use shape::{
    BoxShape, Capsule, Collider, Cylinder, MassProperties, Material, Shape, Sphere, MIN_EXTENT,
};
