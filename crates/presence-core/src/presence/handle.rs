//! Thin adapter over an engine clip with a single completion slot.

use std::fmt;

use tracing::warn;

use crate::animation::engine::{AnimationEngine, ClipOptions};
use crate::animation::keyframes::KeyframeTrack;
use crate::animation::types::{ClipId, ElementId};

/// Callback run once when an exit transition completes.
pub type ExitCallback = Box<dyn FnOnce()>;

/// What to do when the handle's clip finishes.
pub enum Completion {
    /// Invoke the effective `enter` hook, if one is configured.
    Enter,
    /// Mark the presence hidden, then run the caller's callback.
    FinalizeExit(Option<ExitCallback>),
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => f.write_str("Enter"),
            Self::FinalizeExit(cb) => f
                .debug_tuple("FinalizeExit")
                .field(&cb.as_ref().map(|_| "callback"))
                .finish(),
        }
    }
}

/// A started clip plus the one-shot action to run when it finishes.
#[derive(Debug)]
pub struct AnimationHandle {
    clip: ClipId,
    element: ElementId,
    completion: Option<Completion>,
}

impl AnimationHandle {
    /// Create and play a clip. Engine failures are logged and yield `None`.
    pub fn start(
        engine: &mut dyn AnimationEngine,
        element: ElementId,
        keyframes: KeyframeTrack,
        duration_ms: f64,
    ) -> Option<Self> {
        let clip = match engine.create_clip(element, keyframes, ClipOptions::new(duration_ms)) {
            Ok(clip) => clip,
            Err(err) => {
                warn!(?err, %element, "failed to create clip");
                return None;
            }
        };

        if let Err(err) = engine.play(clip) {
            warn!(?err, %clip, "failed to play clip");
            engine.cancel(clip);
            return None;
        }

        Some(Self {
            clip,
            element,
            completion: None,
        })
    }

    pub fn clip(&self) -> ClipId {
        self.clip
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn is_running(&self, engine: &dyn AnimationEngine) -> bool {
        engine
            .play_state(self.clip)
            .is_some_and(|state| state.is_running())
    }

    /// Invert the clip's direction in place. Returns false if the engine refused.
    pub fn reverse_direction(&mut self, engine: &mut dyn AnimationEngine) -> bool {
        match engine.reverse(self.clip) {
            Ok(()) => true,
            Err(err) => {
                warn!(?err, clip = %self.clip, "failed to reverse clip");
                false
            }
        }
    }

    /// Register the completion action, replacing any previous one.
    pub fn on_completion(&mut self, completion: Completion) {
        self.completion = Some(completion);
    }

    pub fn take_completion(&mut self) -> Option<Completion> {
        self.completion.take()
    }

    /// Stop the clip on the engine. Its completion is dropped unrun.
    pub fn cancel(self, engine: &mut dyn AnimationEngine) {
        engine.cancel(self.clip);
    }
}
