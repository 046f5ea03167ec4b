//! Error types for fallible engine operations.
//!
//! Numeric degeneracies inside the collision pipeline are guarded with epsilons
//! and never surface here; these errors cover invalid input from the host.

use thiserror::Error;

use crate::collision::BodyHandle;

/// Errors returned by the public API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// A step was requested with a timestep that is not finite and positive.
    #[error("invalid timestep {0}: must be finite and greater than zero")]
    InvalidTimestep(f32),

    /// A dynamic body was given a mass that is not finite and positive.
    #[error("invalid mass {0} for a dynamic body: must be finite and greater than zero")]
    InvalidMass(f32),

    /// The handle refers to a body that was removed (or never existed).
    #[error("stale body handle {0:?}")]
    StaleHandle(BodyHandle),

    /// A solver or world configuration value is out of range.
    #[error("invalid settings: {reason}")]
    InvalidSettings {
        /// Which value was rejected
        reason: &'static str,
    },

    /// A transform operation received an unusable argument.
    #[error("invalid transform: {reason}")]
    InvalidTransform {
        /// Which argument was rejected
        reason: &'static str,
    },
}

/// Result alias used by the public API.
pub type Result<T> = std::result::Result<T, PhysicsError>;
