//! Spring-driven presence transitions.
//!
//! A presence animates an element in when it becomes visible and out, reversibly,
//! when it is hidden. Motion comes from a spring simulation rather than fixed
//! easing curves, and the element is only reported hidden once its exit clip
//! has finished.
//!
//! - [`animation`]: keyframe composition, spring solving and the timeline engine
//! - [`presence`]: the per-element state machine and the arena that hosts many of them
//! - [`error`]: configuration, engine and lookup errors

pub mod animation;
pub mod error;
pub mod presence;

pub use animation::{
    AnimationEngine, ClipEvent, ClipId, DampedSpringSolver, ElementId, KeyframeComposer,
    MotionDescriptor, ScaleMotion, SpringParameters, SpringSolver, TimelineEngine, Visibility,
};
pub use error::{ConfigurationError, EngineError, PresenceError, Result};
pub use presence::{
    LifecycleCallbacks, PresenceArena, PresenceController, PresenceId, PresenceOptions,
    PresencePhase, ResumeToken,
};
