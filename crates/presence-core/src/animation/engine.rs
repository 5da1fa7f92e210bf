//! Animation engine seam and the bundled timeline engine.
//!
//! [`AnimationEngine`] is the narrow surface presence controllers need from a
//! platform animation engine: build a clip from keyframes and a duration,
//! play it, reverse it, cancel it and query its play state. Completion is
//! reported through queued [`ClipEvent`]s rather than callbacks.
//!
//! [`TimelineEngine`] implements the seam in-process. It advances clips by
//! explicit `update(delta_ms)` calls, samples keyframes linearly, implements
//! reversal as playback-rate negation and keeps finished values applied
//! according to the clip's [`FillMode`].
//!
//! # Usage
//!
//! ```ignore
//! let mut engine = TimelineEngine::new();
//! engine.mount(ElementId(1));
//! let clip = engine.create_clip(ElementId(1), track, ClipOptions::new(300.0))?;
//! engine.play(clip)?;
//!
//! // Each frame
//! engine.update(16.67);
//! let values = engine.current_values(ElementId(1));
//! for event in engine.drain_events() { /* route to the presence arena */ }
//! ```

use std::collections::{HashMap, HashSet};

use super::events::{ClipEvent, EventQueue};
use super::keyframes::{FillMode, KeyframeTrack};
use super::types::{AnimatableProperty, AnimatableValue, ClipId, ElementId, PlayState};
use crate::error::EngineError;

/// Timing options of a clip. Sampling is always linear with one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipOptions {
    pub duration_ms: f64,
    pub fill: FillMode,
}

impl ClipOptions {
    /// Options with the given duration and fill-both semantics.
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            fill: FillMode::Both,
        }
    }

    pub fn fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }
}

/// Platform animation engine primitives used by presence controllers.
pub trait AnimationEngine {
    /// Build a clip for `element`. The clip does not run until [`play`](Self::play).
    fn create_clip(
        &mut self,
        element: ElementId,
        keyframes: KeyframeTrack,
        options: ClipOptions,
    ) -> Result<ClipId, EngineError>;

    /// Start (or restart) playback in the clip's current direction.
    fn play(&mut self, clip: ClipId) -> Result<(), EngineError>;

    /// Invert the playback direction, keeping the current position.
    fn reverse(&mut self, clip: ClipId) -> Result<(), EngineError>;

    /// Stop the clip and drop its effect. Unknown clips are ignored.
    fn cancel(&mut self, clip: ClipId);

    /// Current play state, or `None` if the clip is unknown.
    fn play_state(&self, clip: ClipId) -> Option<PlayState>;
}

/// A clip owned by the [`TimelineEngine`].
#[derive(Debug, Clone)]
pub struct Clip {
    id: ClipId,
    element: ElementId,
    keyframes: KeyframeTrack,
    options: ClipOptions,
    /// Position on the timeline in milliseconds, within `[0, duration]`.
    current_ms: f64,
    /// +1.0 forwards, -1.0 backwards.
    playback_rate: f64,
    state: PlayState,
}

impl Clip {
    fn new(id: ClipId, element: ElementId, keyframes: KeyframeTrack, options: ClipOptions) -> Self {
        Self {
            id,
            element,
            keyframes,
            options: ClipOptions {
                duration_ms: options.duration_ms.max(0.0),
                ..options
            },
            current_ms: 0.0,
            playback_rate: 1.0,
            state: PlayState::Idle,
        }
    }

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn keyframes(&self) -> &KeyframeTrack {
        &self.keyframes
    }

    pub fn duration_ms(&self) -> f64 {
        self.options.duration_ms
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    /// True if the clip currently plays backwards.
    pub fn is_reversed(&self) -> bool {
        self.playback_rate < 0.0
    }

    /// Timeline position as an offset from 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        if self.options.duration_ms <= 0.0 {
            return if self.is_reversed() { 0.0 } else { 1.0 };
        }
        (self.current_ms / self.options.duration_ms).clamp(0.0, 1.0)
    }

    /// Offset at which the clip ends in its current direction.
    fn end_offset(&self) -> f64 {
        if self.is_reversed() { 0.0 } else { 1.0 }
    }

    /// Values this clip applies to its element right now.
    pub fn current_values(&self) -> HashMap<AnimatableProperty, AnimatableValue> {
        match self.state {
            PlayState::Running => self.keyframes.values_at(self.progress()),
            PlayState::Idle if self.options.fill.applies_backwards() => {
                self.keyframes.values_at(self.progress())
            }
            PlayState::Finished if self.options.fill.applies_forwards() => {
                self.keyframes.values_at(self.end_offset())
            }
            _ => HashMap::new(),
        }
    }

    /// Advance by `delta_ms` of wall time. Returns true if the clip finished.
    fn advance(&mut self, delta_ms: f64) -> bool {
        if self.state != PlayState::Running {
            return false;
        }

        let duration = self.options.duration_ms;
        self.current_ms = (self.current_ms + delta_ms * self.playback_rate).clamp(0.0, duration);

        let at_end = if self.is_reversed() {
            self.current_ms <= 0.0
        } else {
            self.current_ms >= duration
        };
        if at_end {
            self.state = PlayState::Finished;
        }
        at_end
    }
}

/// In-process animation engine driven by explicit time steps.
///
/// Thread safety: the engine is `Send` so hosts can move it onto their UI thread.
#[derive(Debug, Default)]
pub struct TimelineEngine {
    mounted: HashSet<ElementId>,
    clips: HashMap<ClipId, Clip>,
    /// Most recent clip per element; its values stay applied under fill.
    element_clips: HashMap<ElementId, ClipId>,
    events: EventQueue,
}

impl TimelineEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an element available for animation.
    pub fn mount(&mut self, element: ElementId) {
        self.mounted.insert(element);
    }

    /// Remove an element, cancelling and discarding its clips.
    pub fn unmount(&mut self, element: ElementId) {
        self.mounted.remove(&element);
        let ids: Vec<ClipId> = self
            .clips
            .values()
            .filter(|c| c.element == element)
            .map(|c| c.id)
            .collect();
        for id in ids {
            self.cancel(id);
            self.clips.remove(&id);
        }
        self.element_clips.remove(&element);
    }

    pub fn is_mounted(&self, element: ElementId) -> bool {
        self.mounted.contains(&element)
    }

    /// Get a clip by ID.
    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.get(&id)
    }

    /// Number of clips currently running.
    pub fn running_count(&self) -> usize {
        self.clips
            .values()
            .filter(|c| c.state.is_running())
            .count()
    }

    pub fn has_running_clips(&self) -> bool {
        self.running_count() > 0
    }

    /// Advance every running clip by `delta_ms`.
    ///
    /// Finished clips queue a [`ClipEvent::Finished`], in clip id order.
    pub fn update(&mut self, delta_ms: f64) {
        let mut finished: Vec<(ClipId, ElementId)> = self
            .clips
            .values_mut()
            .filter_map(|clip| clip.advance(delta_ms).then_some((clip.id, clip.element)))
            .collect();
        finished.sort();

        for (clip, element) in finished {
            self.events.push(ClipEvent::Finished { clip, element });
        }

        // Superseded clips have no values left to contribute once they stop.
        let latest = &self.element_clips;
        self.clips.retain(|id, clip| {
            matches!(clip.state, PlayState::Idle | PlayState::Running)
                || latest.get(&clip.element) == Some(id)
        });
    }

    /// Values currently applied to `element` by its most recent clip.
    pub fn current_values(&self, element: ElementId) -> HashMap<AnimatableProperty, AnimatableValue> {
        self.element_clips
            .get(&element)
            .and_then(|id| self.clips.get(id))
            .map(Clip::current_values)
            .unwrap_or_default()
    }

    /// Drain all queued clip events, oldest first.
    pub fn drain_events(&mut self) -> impl Iterator<Item = ClipEvent> + '_ {
        self.events.drain()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    fn clip_mut(&mut self, id: ClipId) -> Result<&mut Clip, EngineError> {
        self.clips.get_mut(&id).ok_or(EngineError::UnknownClip(id))
    }
}

impl AnimationEngine for TimelineEngine {
    fn create_clip(
        &mut self,
        element: ElementId,
        keyframes: KeyframeTrack,
        options: ClipOptions,
    ) -> Result<ClipId, EngineError> {
        if !self.mounted.contains(&element) {
            return Err(EngineError::Detached(element));
        }
        if keyframes.is_empty() {
            return Err(EngineError::EmptyKeyframes);
        }

        let id = ClipId::new();
        self.clips
            .insert(id, Clip::new(id, element, keyframes, options));

        // The previous clip on this element stops contributing values; drop
        // it once it is no longer running.
        if let Some(previous) = self.element_clips.insert(element, id) {
            let superseded = self
                .clips
                .get(&previous)
                .is_some_and(|c| !c.state.is_running());
            if superseded {
                self.clips.remove(&previous);
            }
        }

        Ok(id)
    }

    fn play(&mut self, id: ClipId) -> Result<(), EngineError> {
        let clip = self.clip_mut(id)?;
        if clip.state == PlayState::Finished {
            clip.current_ms = if clip.is_reversed() {
                clip.options.duration_ms
            } else {
                0.0
            };
        }
        clip.state = PlayState::Running;
        let element = clip.element;
        self.events.push(ClipEvent::Started { clip: id, element });
        Ok(())
    }

    fn reverse(&mut self, id: ClipId) -> Result<(), EngineError> {
        let clip = self.clip_mut(id)?;
        clip.playback_rate = -clip.playback_rate;
        if clip.state != PlayState::Running {
            clip.state = PlayState::Running;
        }
        let element = clip.element;
        self.events.push(ClipEvent::Reversed { clip: id, element });
        Ok(())
    }

    fn cancel(&mut self, id: ClipId) {
        let Some(clip) = self.clips.get_mut(&id) else {
            return;
        };
        if matches!(clip.state, PlayState::Cancelled) {
            return;
        }
        clip.state = PlayState::Cancelled;
        let element = clip.element;
        self.events.push(ClipEvent::Cancelled { clip: id, element });
        if self.element_clips.get(&element) != Some(&id) {
            self.clips.remove(&id);
        }
    }

    fn play_state(&self, id: ClipId) -> Option<PlayState> {
        self.clips.get(&id).map(|c| c.state)
    }
}

static_assertions::assert_impl_all!(TimelineEngine: Send);
