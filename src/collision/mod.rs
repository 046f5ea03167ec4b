pub mod broad_phase;
pub mod contact;
pub mod narrow_phase;

pub use broad_phase::{DynamicAabbTree, ProxyId};
pub use contact::{
    AccumulatedImpulse, BodyHandle, CollisionPair, ContactManifold, ContactPoint,
    MAX_CONTACT_POINTS,
};
pub use narrow_phase::{
    classify, classify_bounded, collide, intersect, EpaError, Intersection, Penetration,
};
