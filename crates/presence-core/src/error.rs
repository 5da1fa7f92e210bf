//! Error types for presence transitions.

use thiserror::Error;

use crate::animation::types::{ClipId, ElementId};
use crate::presence::arena::PresenceId;

/// Result type for presence operations.
pub type Result<T> = std::result::Result<T, PresenceError>;

/// Invalid or missing configuration. Raised synchronously at construction
/// and never recovered internally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// No motion descriptor was supplied.
    #[error("presence requires `variants`")]
    MissingVariants,

    /// No initial visibility was supplied.
    #[error("presence requires an `initial` visibility")]
    MissingInitial,

    /// `wait` was combined with `enter` or `exit`.
    #[error("you cannot use wait if you use enter or exit")]
    WaitConflict,

    /// A spring parameter is zero, negative or not finite.
    #[error("spring {field} must be a positive number, got {value}")]
    InvalidSpring { field: &'static str, value: f64 },
}

/// Failures reported by an animation engine.
///
/// The presence controller recovers from all of them as a silent no-op.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The element is not mounted in the engine.
    #[error("{0} is not attached")]
    Detached(ElementId),

    /// The clip does not exist (never created, or already discarded).
    #[error("unknown {0}")]
    UnknownClip(ClipId),

    /// A clip needs at least one keyframe.
    #[error("cannot animate an empty keyframe track")]
    EmptyKeyframes,
}

/// Errors surfaced by the presence arena.
#[derive(Error, Debug)]
pub enum PresenceError {
    /// Configuration rejected at construction.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The id does not refer to a live presence.
    #[error("unknown presence {0:?}")]
    UnknownPresence(PresenceId),
}
