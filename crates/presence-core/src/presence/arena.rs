//! Index-addressed storage for presence controllers.
//!
//! Controllers live in a `Vec` and are addressed by [`PresenceId`]. The host
//! drains clip events from the engine and hands them to [`PresenceArena::dispatch`],
//! which routes each event to the controller owning the clip.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::controller::{PresenceController, PresenceOptions};
use super::lifecycle::ResumeToken;
use crate::animation::engine::{AnimationEngine, TimelineEngine};
use crate::animation::events::ClipEvent;
use crate::animation::types::ClipId;
use crate::error::{PresenceError, Result};

/// Index of a controller in a [`PresenceArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PresenceId(pub usize);

impl fmt::Display for PresenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "presence#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct PresenceArena {
    slots: Vec<Option<PresenceController>>,
}

impl PresenceArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `options` and store a new controller.
    pub fn create(&mut self, options: PresenceOptions) -> Result<PresenceId> {
        let controller = PresenceController::new(options)?;
        Ok(self.insert(controller))
    }

    pub fn insert(&mut self, controller: PresenceController) -> PresenceId {
        let id = PresenceId(self.slots.len());
        self.slots.push(Some(controller));
        id
    }

    /// Drop a controller, cancelling its clip. Ids are never reused.
    pub fn remove(&mut self, id: PresenceId, engine: &mut dyn AnimationEngine) -> Option<PresenceController> {
        let controller = self.slots.get_mut(id.0)?.take()?;
        if let Some(clip) = controller.current_clip() {
            engine.cancel(clip);
        }
        Some(controller)
    }

    pub fn get(&self, id: PresenceId) -> Option<&PresenceController> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: PresenceId) -> Option<&mut PresenceController> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn controller(&self, id: PresenceId) -> Result<&PresenceController> {
        self.get(id).ok_or(PresenceError::UnknownPresence(id))
    }

    pub fn controller_mut(&mut self, id: PresenceId) -> Result<&mut PresenceController> {
        self.get_mut(id).ok_or(PresenceError::UnknownPresence(id))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (PresenceId, &PresenceController)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|c| (PresenceId(i), c)))
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut PresenceController> {
        self.slots.iter_mut().flatten()
    }

    pub fn toggle(&mut self, id: PresenceId, engine: &mut dyn AnimationEngine) -> Result<()> {
        self.controller_mut(id)?.toggle(engine);
        Ok(())
    }

    pub fn toggle_then(
        &mut self,
        id: PresenceId,
        engine: &mut dyn AnimationEngine,
        on_complete: impl FnOnce() + 'static,
    ) -> Result<()> {
        self.controller_mut(id)?.toggle_then(engine, on_complete);
        Ok(())
    }

    /// Hand a resume token back to whichever controller issued it.
    pub fn resume_exit(&mut self, engine: &mut dyn AnimationEngine, token: ResumeToken) -> bool {
        self.iter_mut()
            .any(|controller| controller.resume_exit(engine, token))
    }

    /// Commit every controller after a host render pass.
    pub fn commit_all(&mut self, engine: &mut dyn AnimationEngine) {
        for controller in self.iter_mut() {
            controller.commit(engine);
        }
    }

    /// Find the controller whose current clip is `clip`.
    pub fn owner_of(&self, clip: ClipId) -> Option<PresenceId> {
        self.iter()
            .find(|(_, c)| c.current_clip() == Some(clip))
            .map(|(id, _)| id)
    }

    /// Route events to their controllers. Returns how many were consumed.
    pub fn dispatch(&mut self, events: impl IntoIterator<Item = ClipEvent>) -> usize {
        let mut handled = 0;
        for event in events {
            let Some(id) = self.owner_of(event.clip()) else {
                continue;
            };
            if let Some(controller) = self.get_mut(id) {
                if controller.handle_event(&event) {
                    handled += 1;
                }
            }
        }
        handled
    }

    /// Advance the engine, deliver its events, then commit every controller.
    pub fn advance(&mut self, engine: &mut TimelineEngine, delta_ms: f64) -> usize {
        engine.update(delta_ms);
        let events: Vec<ClipEvent> = engine.drain_events().collect();
        let handled = self.dispatch(events);
        self.commit_all(engine);
        handled
    }
}
