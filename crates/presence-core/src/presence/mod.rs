//! Presence state machine and its host-facing storage.

pub mod arena;
pub mod controller;
pub mod handle;
pub mod lifecycle;

pub use arena::{PresenceArena, PresenceId};
pub use controller::{PresenceController, PresenceOptions, PresencePhase};
pub use handle::{AnimationHandle, Completion, ExitCallback};
pub use lifecycle::{LifecycleCallbacks, LifecycleGate, LifecycleHook, ResumeToken};
