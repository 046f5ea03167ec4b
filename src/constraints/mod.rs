mod contact_constraint;

pub use contact_constraint::{ContactConstraint, ContactParams};
