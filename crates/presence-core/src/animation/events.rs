//! Clip lifecycle events.
//!
//! Engines never call back into presence controllers directly. Instead they
//! queue [`ClipEvent`]s during `update`, and the host drains them and hands
//! them to the presence arena. This keeps completion handling on the same
//! logical thread as `toggle()` and rules out re-entrant mutation.
//!
//! # Usage
//!
//! ```ignore
//! engine.update(16.67);
//! for event in engine.drain_events() {
//!     if let ClipEvent::Finished { clip, .. } = event {
//!         println!("{clip} finished");
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::types::{ClipId, ElementId};

/// Event emitted when a clip changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClipEvent {
    /// Clip has started playing.
    Started { clip: ClipId, element: ElementId },
    /// Clip playback direction was inverted.
    Reversed { clip: ClipId, element: ElementId },
    /// Clip reached the end of its timeline in its current direction.
    Finished { clip: ClipId, element: ElementId },
    /// Clip was cancelled before completion.
    Cancelled { clip: ClipId, element: ElementId },
}

impl ClipEvent {
    /// Get the clip this event refers to.
    pub fn clip(&self) -> ClipId {
        match self {
            Self::Started { clip, .. }
            | Self::Reversed { clip, .. }
            | Self::Finished { clip, .. }
            | Self::Cancelled { clip, .. } => *clip,
        }
    }

    /// Get the element the clip animates.
    pub fn element(&self) -> ElementId {
        match self {
            Self::Started { element, .. }
            | Self::Reversed { element, .. }
            | Self::Finished { element, .. }
            | Self::Cancelled { element, .. } => *element,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}

/// Queue for collecting clip events during update cycles.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<ClipEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ClipEvent) {
        self.events.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn pop(&mut self) -> Option<ClipEvent> {
        self.events.pop_front()
    }

    /// Drain all events from the queue, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = ClipEvent> + '_ {
        self.events.drain(..)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Get events for a specific element.
    pub fn events_for_element(&self, element: ElementId) -> Vec<&ClipEvent> {
        self.events
            .iter()
            .filter(|e| e.element() == element)
            .collect()
    }
}
