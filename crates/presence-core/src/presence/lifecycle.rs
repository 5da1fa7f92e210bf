//! Lifecycle hooks (`enter`, `exit`, `wait`) and their resolution.
//!
//! Hooks are shared closures receiving an optional [`ResumeToken`]. Exit-side
//! invocations pass `Some(token)`; the exit clip only starts once the host
//! hands that token back through `resume_exit`. The enter completion passes
//! `None`.
//!
//! Hooks run while the controller is mutably borrowed, so they must not call
//! back into it. Store the token and resume on the next turn of the host loop:
//!
//! ```ignore
//! let parked = Rc::new(Cell::new(None));
//! let slot = parked.clone();
//! let callbacks = LifecycleCallbacks::new().on_exit(move |token| slot.set(token));
//! // later
//! if let Some(token) = parked.take() {
//!     controller.resume_exit(&mut engine, token);
//! }
//! ```

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Ticket handed to an exit gate. Only the most recently issued ticket of a
/// controller resumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResumeToken(u64);

impl ResumeToken {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resume#{}", self.0)
    }
}

/// A caller-supplied lifecycle hook.
pub type LifecycleHook = Rc<dyn Fn(Option<ResumeToken>)>;

/// The hooks a caller configured. At most one of `wait` or `enter`/`exit`.
#[derive(Clone, Default)]
pub struct LifecycleCallbacks {
    pub enter: Option<LifecycleHook>,
    pub exit: Option<LifecycleHook>,
    pub wait: Option<LifecycleHook>,
}

impl LifecycleCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_enter(mut self, hook: impl Fn(Option<ResumeToken>) + 'static) -> Self {
        self.enter = Some(Rc::new(hook));
        self
    }

    pub fn on_exit(mut self, hook: impl Fn(Option<ResumeToken>) + 'static) -> Self {
        self.exit = Some(Rc::new(hook));
        self
    }

    /// Single hook used both after entering and before exiting.
    pub fn on_wait(mut self, hook: impl Fn(Option<ResumeToken>) + 'static) -> Self {
        self.wait = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for LifecycleCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleCallbacks")
            .field("enter", &self.enter.is_some())
            .field("exit", &self.exit.is_some())
            .field("wait", &self.wait.is_some())
            .finish()
    }
}

/// Effective `enter` and `exit` hooks after collapsing `wait`.
#[derive(Clone, Default)]
pub struct LifecycleGate {
    enter: Option<LifecycleHook>,
    exit: Option<LifecycleHook>,
}

impl LifecycleGate {
    pub fn resolve(callbacks: &LifecycleCallbacks) -> Result<Self, ConfigurationError> {
        match (&callbacks.wait, &callbacks.enter, &callbacks.exit) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(ConfigurationError::WaitConflict),
            (Some(wait), None, None) => Ok(Self {
                enter: Some(wait.clone()),
                exit: Some(wait.clone()),
            }),
            (None, enter, exit) => Ok(Self {
                enter: enter.clone(),
                exit: exit.clone(),
            }),
        }
    }

    pub fn enter(&self) -> Option<&LifecycleHook> {
        self.enter.as_ref()
    }

    pub fn exit(&self) -> Option<&LifecycleHook> {
        self.exit.as_ref()
    }
}

impl fmt::Debug for LifecycleGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleGate")
            .field("enter", &self.enter.is_some())
            .field("exit", &self.exit.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn noop(_: Option<ResumeToken>) {}

    #[test]
    fn test_wait_conflicts_with_enter_or_exit() {
        let both = LifecycleCallbacks::new().on_wait(noop).on_enter(noop);
        assert_eq!(
            LifecycleGate::resolve(&both).unwrap_err(),
            ConfigurationError::WaitConflict
        );

        let both = LifecycleCallbacks::new().on_wait(noop).on_exit(noop);
        assert_eq!(
            LifecycleGate::resolve(&both).unwrap_err(),
            ConfigurationError::WaitConflict
        );
    }

    #[test]
    fn test_valid_combinations() {
        let none = LifecycleGate::resolve(&LifecycleCallbacks::new()).unwrap();
        assert!(none.enter().is_none());
        assert!(none.exit().is_none());

        let split = LifecycleCallbacks::new().on_enter(noop).on_exit(noop);
        let gate = LifecycleGate::resolve(&split).unwrap();
        assert!(gate.enter().is_some());
        assert!(gate.exit().is_some());

        let exit_only = LifecycleCallbacks::new().on_exit(noop);
        let gate = LifecycleGate::resolve(&exit_only).unwrap();
        assert!(gate.enter().is_none());
        assert!(gate.exit().is_some());
    }

    #[test]
    fn test_wait_serves_both_sides() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let callbacks = LifecycleCallbacks::new().on_wait(move |_| counter.set(counter.get() + 1));
        let gate = LifecycleGate::resolve(&callbacks).unwrap();

        (gate.enter().unwrap())(None);
        (gate.exit().unwrap())(Some(ResumeToken::next()));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = ResumeToken::next();
        let b = ResumeToken::next();
        assert_ne!(a, b);
    }
}
