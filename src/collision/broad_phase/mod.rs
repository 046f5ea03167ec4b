//! Broadphase culling: a dynamic bounding-volume tree over world-space boxes.

mod tree;

pub use tree::{DynamicAabbTree, ProxyId};
