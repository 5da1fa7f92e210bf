//! Animation building blocks for presence transitions.
//!
//! This module provides:
//! - **Keyframe composition**: Motion descriptor + spring → keyframes and duration
//! - **Spring solving**: Damped oscillator sampled at 60 Hz
//! - **Timeline engine**: Clips that play, reverse and finish on explicit time steps
//! - **Clip events**: Queued completion notifications
//!
//! # Architecture
//!
//! ```text
//! KeyframeComposer
//!   └── SpringSolver (DampedSpringSolver)
//!
//! AnimationEngine (TimelineEngine)
//!   ├── Clips (keyframe track + timeline position + playback rate)
//!   └── EventQueue (Started / Reversed / Finished / Cancelled)
//! ```

pub mod composer;
pub mod engine;
pub mod events;
pub mod interpolate;
pub mod keyframes;
pub mod spring;
pub mod types;

pub use composer::{
    compose, ComposedClip, KeyframeComposer, MotionDescriptor, OpacityRange, Range, ScaleMotion,
    DEFAULT_DURATION_MS,
};
pub use engine::{AnimationEngine, Clip, ClipOptions, TimelineEngine};
pub use events::{ClipEvent, EventQueue};
pub use interpolate::Interpolate;
pub use keyframes::{FillMode, Keyframe, KeyframeTrack};
pub use spring::{
    DampedSpringSolver, SpringFrames, SpringParameters, SpringRequest, SpringSolver,
    FRAMES_PER_SECOND,
};
pub use types::{
    AnimatableProperty, AnimatableTransform, AnimatableValue, ClipId, ElementId, PlayState,
    Visibility,
};
