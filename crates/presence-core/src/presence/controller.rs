//! Presence controller: the visibility state machine.
//!
//! A controller owns the logical visibility (`variant`), the handle of the clip
//! it last started, a one-way `has_ever_rendered` latch and a `pending_exit`
//! flag recording which way the running clip is headed. Its phase is derived
//! from those fields:
//!
//! ```text
//!            toggle                      resume_exit
//! VisibleIdle ──────► ExitGatePending ───────────────► Exiting ──finish──► Hidden
//!     ▲   │ toggle (no exit hook)                        ▲ │                  │
//!     │   └──────────────────────────────────────────────┘ │ toggle (reverse) │
//!     │                                                     ▼                  │
//!     └──────────────finish──────────────────────────── Entering ◄──commit─────┘
//! ```
//!
//! The host drives it from one thread:
//! - `attach` / `detach` fill the element slot
//! - `commit` runs once per render pass and may start an entering clip
//! - `toggle` shows or hides, reversing a running clip in place
//! - `handle_event` receives the engine's clip events
//!
//! `variant` only becomes `Hidden` when an exit clip completes.

use std::fmt;
use std::rc::Rc;

use presence_config::PresenceConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::handle::{AnimationHandle, Completion, ExitCallback};
use super::lifecycle::{LifecycleCallbacks, LifecycleGate, ResumeToken};
use crate::animation::composer::{
    ComposedClip, KeyframeComposer, MotionDescriptor, DEFAULT_DURATION_MS,
};
use crate::animation::engine::AnimationEngine;
use crate::animation::events::ClipEvent;
use crate::animation::spring::{DampedSpringSolver, SpringParameters, SpringSolver};
use crate::animation::types::{ClipId, ElementId, Visibility};
use crate::error::ConfigurationError;

/// Configuration of one presence.
///
/// `variants` and `initial` are required; everything else has a default.
#[derive(Clone)]
pub struct PresenceOptions {
    pub variants: Option<MotionDescriptor>,
    pub initial: Option<Visibility>,
    pub spring: SpringParameters,
    /// Play the entering clip on the very first attachment.
    pub animate_first_render: bool,
    /// Name attached to every log record of this presence.
    pub debug_name: String,
    /// Duration of clips without physical motion and no explicit duration.
    pub default_duration_ms: f64,
    pub callbacks: LifecycleCallbacks,
    /// Spring solver; the damped solver when unset.
    pub solver: Option<Rc<dyn SpringSolver>>,
}

impl Default for PresenceOptions {
    fn default() -> Self {
        Self {
            variants: None,
            initial: None,
            spring: SpringParameters::default(),
            animate_first_render: true,
            debug_name: "unknown".to_string(),
            default_duration_ms: DEFAULT_DURATION_MS,
            callbacks: LifecycleCallbacks::default(),
            solver: None,
        }
    }
}

impl PresenceOptions {
    pub fn new(variants: MotionDescriptor, initial: Visibility) -> Self {
        Self {
            variants: Some(variants),
            initial: Some(initial),
            ..Self::default()
        }
    }

    /// Options seeded from a loaded configuration. `initial` stays unset.
    pub fn from_config(config: &PresenceConfig) -> Self {
        Self {
            variants: config.variants.as_ref().map(MotionDescriptor::from),
            initial: None,
            spring: SpringParameters::from(&config.spring),
            animate_first_render: config.presence.animate_first_render,
            debug_name: config.presence.debug_name.clone(),
            default_duration_ms: config.timing.default_duration_ms,
            callbacks: LifecycleCallbacks::default(),
            solver: Some(Rc::new(DampedSpringSolver::from(&config.spring))),
        }
    }

    pub fn variants(mut self, variants: MotionDescriptor) -> Self {
        self.variants = Some(variants);
        self
    }

    pub fn initial(mut self, initial: Visibility) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn spring(mut self, spring: SpringParameters) -> Self {
        self.spring = spring;
        self
    }

    pub fn animate_first_render(mut self, animate: bool) -> Self {
        self.animate_first_render = animate;
        self
    }

    pub fn debug_name(mut self, name: impl Into<String>) -> Self {
        self.debug_name = name.into();
        self
    }

    pub fn default_duration_ms(mut self, duration_ms: f64) -> Self {
        self.default_duration_ms = duration_ms;
        self
    }

    pub fn callbacks(mut self, callbacks: LifecycleCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn solver(mut self, solver: Rc<dyn SpringSolver>) -> Self {
        self.solver = Some(solver);
        self
    }
}

impl fmt::Debug for PresenceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceOptions")
            .field("variants", &self.variants)
            .field("initial", &self.initial)
            .field("spring", &self.spring)
            .field("animate_first_render", &self.animate_first_render)
            .field("debug_name", &self.debug_name)
            .field("default_duration_ms", &self.default_duration_ms)
            .field("callbacks", &self.callbacks)
            .field("solver", &self.solver.is_some())
            .finish()
    }
}

/// Phase derived from visibility, the running clip and `pending_exit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresencePhase {
    Hidden,
    VisibleIdle,
    Entering,
    /// Exit requested; waiting for the exit hook to resume or for an element.
    ExitGatePending,
    Exiting,
}

/// Validated options.
struct Settings {
    descriptor: MotionDescriptor,
    spring: SpringParameters,
    animate_first_render: bool,
    debug_name: String,
    gate: LifecycleGate,
    composer: KeyframeComposer<Rc<dyn SpringSolver>>,
}

impl Settings {
    fn resolve(options: PresenceOptions) -> Result<Self, ConfigurationError> {
        let descriptor = options
            .variants
            .ok_or(ConfigurationError::MissingVariants)?;
        let gate = LifecycleGate::resolve(&options.callbacks)?;
        let spring = options.spring.validate()?;
        let solver = options
            .solver
            .unwrap_or_else(|| Rc::new(DampedSpringSolver::default()) as Rc<dyn SpringSolver>);

        Ok(Self {
            descriptor,
            spring,
            animate_first_render: options.animate_first_render,
            debug_name: options.debug_name,
            gate,
            composer: KeyframeComposer::new(solver)
                .with_default_duration(options.default_duration_ms),
        })
    }

    fn compose(&self, entering: bool) -> ComposedClip {
        self.composer
            .compose(&self.descriptor, self.spring, entering)
    }
}

/// Inputs of the attachment effect; it reruns when any of them changes.
#[derive(Debug, Clone, PartialEq)]
struct EffectDeps {
    visibility: Visibility,
    animate_first_render: bool,
    element: Option<ElementId>,
    debug_name: String,
}

/// An exit that was requested but has not started its clip yet.
enum ParkedExit {
    /// Waiting for the exit hook to hand back `token`.
    Gate {
        token: ResumeToken,
        on_complete: Option<ExitCallback>,
    },
    /// Waiting for an element the engine accepts.
    Detached { on_complete: Option<ExitCallback> },
}

/// Visibility state machine for one element.
///
/// Not `Send`: hooks are reference counted and everything runs on the host's
/// UI thread.
pub struct PresenceController {
    settings: Settings,
    variant: Visibility,
    current_animation: Option<AnimationHandle>,
    has_ever_rendered: bool,
    pending_exit: bool,
    element: Option<ElementId>,
    committed: Option<EffectDeps>,
    parked_exit: Option<ParkedExit>,
}

impl PresenceController {
    /// Validate `options` and build a controller. No animation starts here.
    pub fn new(options: PresenceOptions) -> Result<Self, ConfigurationError> {
        let initial = options.initial;
        let settings = Settings::resolve(options)?;
        let initial = initial.ok_or(ConfigurationError::MissingInitial)?;

        debug!(presence = %settings.debug_name, %initial, "presence created");
        Ok(Self {
            settings,
            variant: initial,
            current_animation: None,
            has_ever_rendered: false,
            pending_exit: false,
            element: None,
            committed: None,
            parked_exit: None,
        })
    }

    /// Replace the options. Hooks are re-validated; `initial` is ignored.
    pub fn reconfigure(&mut self, options: PresenceOptions) -> Result<(), ConfigurationError> {
        self.settings = Settings::resolve(options)?;
        debug!(presence = %self.settings.debug_name, "presence reconfigured");
        Ok(())
    }

    pub fn variant(&self) -> Visibility {
        self.variant
    }

    pub fn is_visible(&self) -> bool {
        self.variant.is_visible()
    }

    /// Whether the host should keep the element mounted.
    pub fn is_rendered(&self) -> bool {
        self.is_visible()
    }

    pub fn has_ever_rendered(&self) -> bool {
        self.has_ever_rendered
    }

    pub fn pending_exit(&self) -> bool {
        self.pending_exit
    }

    pub fn debug_name(&self) -> &str {
        &self.settings.debug_name
    }

    pub fn element(&self) -> Option<ElementId> {
        self.element
    }

    /// Clip of the most recently started transition.
    pub fn current_clip(&self) -> Option<ClipId> {
        self.current_animation.as_ref().map(AnimationHandle::clip)
    }

    pub fn is_animating(&self, engine: &dyn AnimationEngine) -> bool {
        self.current_animation
            .as_ref()
            .is_some_and(|h| h.is_running(engine))
    }

    pub fn phase(&self, engine: &dyn AnimationEngine) -> PresencePhase {
        match self.variant {
            Visibility::Hidden => PresencePhase::Hidden,
            Visibility::Visible if self.is_animating(engine) => {
                if self.pending_exit {
                    PresencePhase::Exiting
                } else {
                    PresencePhase::Entering
                }
            }
            Visibility::Visible if self.parked_exit.is_some() => PresencePhase::ExitGatePending,
            Visibility::Visible => PresencePhase::VisibleIdle,
        }
    }

    /// Fill the element slot. Takes effect at the next `commit`.
    pub fn attach(&mut self, element: ElementId) {
        debug!(presence = %self.settings.debug_name, %element, "element attached");
        self.element = Some(element);
    }

    /// Empty the element slot, returning the previous element.
    pub fn detach(&mut self) -> Option<ElementId> {
        debug!(presence = %self.settings.debug_name, "element detached");
        self.element.take()
    }

    /// Run the post-render effects of one host render pass.
    pub fn commit(&mut self, engine: &mut dyn AnimationEngine) {
        let deps = EffectDeps {
            visibility: self.variant,
            animate_first_render: self.settings.animate_first_render,
            element: self.element,
            debug_name: self.settings.debug_name.clone(),
        };
        if self.committed.as_ref() != Some(&deps) {
            self.committed = Some(deps);
            self.run_attachment_effect(engine);
        }

        if self.variant.is_visible() && !self.has_ever_rendered {
            self.has_ever_rendered = true;
            debug!(presence = %self.settings.debug_name, "first visible render");
        }
    }

    /// Show if hidden, hide if visible, or turn a running clip around.
    pub fn toggle(&mut self, engine: &mut dyn AnimationEngine) {
        self.toggle_inner(engine, None);
    }

    /// Like [`toggle`](Self::toggle), running `on_complete` once if the
    /// resulting exit transition completes.
    pub fn toggle_then(&mut self, engine: &mut dyn AnimationEngine, on_complete: impl FnOnce() + 'static) {
        self.toggle_inner(engine, Some(Box::new(on_complete)));
    }

    /// Start the exit clip held back by the exit hook.
    ///
    /// Returns false for stale or unknown tokens.
    pub fn resume_exit(&mut self, engine: &mut dyn AnimationEngine, token: ResumeToken) -> bool {
        match self.parked_exit.take() {
            Some(ParkedExit::Gate {
                token: expected,
                on_complete,
            }) if expected == token => {
                debug!(presence = %self.settings.debug_name, %token, "exit resumed");
                self.start_exit(engine, on_complete);
                true
            }
            other => {
                self.parked_exit = other;
                debug!(presence = %self.settings.debug_name, %token, "ignoring stale resume token");
                false
            }
        }
    }

    /// React to an engine event. Returns true if it concerned this controller's clip.
    pub fn handle_event(&mut self, event: &ClipEvent) -> bool {
        match *event {
            ClipEvent::Finished { clip, .. } => self.complete(clip),
            ClipEvent::Cancelled { clip, .. } if self.current_clip() == Some(clip) => {
                debug!(presence = %self.settings.debug_name, %clip, "clip cancelled by engine");
                self.current_animation = None;
                true
            }
            _ => false,
        }
    }

    /// Run the completion registered for `clip`, if it is the current clip.
    pub fn complete(&mut self, clip: ClipId) -> bool {
        let Some(handle) = self
            .current_animation
            .as_mut()
            .filter(|h| h.clip() == clip)
        else {
            debug!(presence = %self.settings.debug_name, %clip, "ignoring stale completion");
            return false;
        };

        match handle.take_completion() {
            Some(Completion::Enter) => {
                debug!(presence = %self.settings.debug_name, %clip, "entered");
                if let Some(enter) = self.settings.gate.enter().cloned() {
                    enter(None);
                }
            }
            Some(Completion::FinalizeExit(on_complete)) => {
                self.variant = Visibility::Hidden;
                self.pending_exit = false;
                debug!(presence = %self.settings.debug_name, %clip, "exited");
                if let Some(on_complete) = on_complete {
                    on_complete();
                }
            }
            None => {}
        }
        true
    }

    fn toggle_inner(&mut self, engine: &mut dyn AnimationEngine, on_complete: Option<ExitCallback>) {
        if self.is_animating(&*engine) {
            self.reverse_running(engine, on_complete);
            return;
        }

        match self.variant {
            Visibility::Visible => {
                self.pending_exit = true;
                match self.settings.gate.exit().cloned() {
                    Some(exit) => {
                        let token = ResumeToken::next();
                        self.parked_exit = Some(ParkedExit::Gate { token, on_complete });
                        debug!(presence = %self.settings.debug_name, %token, "waiting on exit hook");
                        exit(Some(token));
                    }
                    None => self.start_exit(engine, on_complete),
                }
            }
            Visibility::Hidden => {
                self.pending_exit = false;
                self.parked_exit = None;
                self.variant = Visibility::Visible;
                debug!(presence = %self.settings.debug_name, "showing");
            }
        }
    }

    fn reverse_running(&mut self, engine: &mut dyn AnimationEngine, on_complete: Option<ExitCallback>) {
        let Some(handle) = self.current_animation.as_mut() else {
            return;
        };
        if !handle.reverse_direction(engine) {
            return;
        }

        if self.pending_exit {
            self.pending_exit = false;
            handle.on_completion(Completion::Enter);
        } else {
            self.pending_exit = true;
            handle.on_completion(Completion::FinalizeExit(on_complete));
        }
        debug!(
            presence = %self.settings.debug_name,
            clip = %handle.clip(),
            pending_exit = self.pending_exit,
            "reversed running clip"
        );
    }

    fn run_attachment_effect(&mut self, engine: &mut dyn AnimationEngine) {
        let Some(element) = self.element else {
            debug!(presence = %self.settings.debug_name, "no element attached");
            return;
        };

        match self.parked_exit.take() {
            Some(ParkedExit::Detached { on_complete }) => {
                debug!(presence = %self.settings.debug_name, %element, "replaying deferred exit");
                self.start_exit(engine, on_complete);
                return;
            }
            // The element will animate out once the exit hook resumes.
            Some(gate @ ParkedExit::Gate { .. }) => {
                self.parked_exit = Some(gate);
                return;
            }
            None => {}
        }

        let first = !self.has_ever_rendered;
        let enter = if first {
            self.settings.animate_first_render
        } else {
            self.variant.is_visible()
        };
        if enter {
            self.play_enter(engine, element);
        }
    }

    fn play_enter(&mut self, engine: &mut dyn AnimationEngine, element: ElementId) {
        let clip = self.settings.compose(true);
        let duration_ms = clip.duration_ms;
        let Some(mut handle) = AnimationHandle::start(engine, element, clip.keyframes, duration_ms) else {
            return;
        };
        if self.settings.gate.enter().is_some() {
            handle.on_completion(Completion::Enter);
        }

        self.pending_exit = false;
        debug!(presence = %self.settings.debug_name, clip = %handle.clip(), duration_ms, "entering");
        self.replace_animation(engine, handle);
    }

    fn start_exit(&mut self, engine: &mut dyn AnimationEngine, on_complete: Option<ExitCallback>) {
        let Some(element) = self.element else {
            debug!(presence = %self.settings.debug_name, "no element attached, deferring exit");
            self.parked_exit = Some(ParkedExit::Detached { on_complete });
            return;
        };

        let clip = self.settings.compose(false);
        let duration_ms = clip.duration_ms;
        match AnimationHandle::start(engine, element, clip.keyframes, duration_ms) {
            Some(mut handle) => {
                handle.on_completion(Completion::FinalizeExit(on_complete));
                debug!(presence = %self.settings.debug_name, clip = %handle.clip(), duration_ms, "exiting");
                self.replace_animation(engine, handle);
            }
            None => {
                debug!(presence = %self.settings.debug_name, %element, "exit clip rejected, deferring exit");
                self.parked_exit = Some(ParkedExit::Detached { on_complete });
            }
        }
    }

    fn replace_animation(&mut self, engine: &mut dyn AnimationEngine, handle: AnimationHandle) {
        if let Some(previous) = self.current_animation.replace(handle) {
            previous.cancel(engine);
        }
    }
}

impl fmt::Debug for PresenceController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceController")
            .field("debug_name", &self.settings.debug_name)
            .field("variant", &self.variant)
            .field("current_animation", &self.current_animation)
            .field("has_ever_rendered", &self.has_ever_rendered)
            .field("pending_exit", &self.pending_exit)
            .field("element", &self.element)
            .finish()
    }
}

static_assertions::assert_not_impl_any!(PresenceController: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::engine::TimelineEngine;
    use crate::animation::spring::{SpringFrames, SpringRequest};
    use std::cell::{Cell, RefCell};

    const EL: ElementId = ElementId(1);

    fn slide() -> MotionDescriptor {
        MotionDescriptor::new().y(40.0, 0.0).opacity(0.0, 1.0)
    }

    fn options(initial: Visibility) -> PresenceOptions {
        PresenceOptions::new(slide(), initial).debug_name("test")
    }

    fn mounted_engine() -> TimelineEngine {
        let mut engine = TimelineEngine::new();
        engine.mount(EL);
        engine
    }

    fn dispatch(engine: &mut TimelineEngine, controller: &mut PresenceController) {
        let events: Vec<_> = engine.drain_events().collect();
        for event in &events {
            controller.handle_event(event);
        }
    }

    fn settle(engine: &mut TimelineEngine, controller: &mut PresenceController) {
        engine.update(60_000.0);
        dispatch(engine, controller);
        controller.commit(engine);
    }

    fn shown(options: PresenceOptions) -> (TimelineEngine, PresenceController) {
        let mut engine = mounted_engine();
        let mut controller = PresenceController::new(options).unwrap();
        controller.attach(EL);
        controller.commit(&mut engine);
        settle(&mut engine, &mut controller);
        (engine, controller)
    }

    /// Records solver directions and delegates to the damped solver.
    #[derive(Default)]
    struct RecordingSolver {
        inner: DampedSpringSolver,
        entering: RefCell<Vec<bool>>,
    }

    impl SpringSolver for RecordingSolver {
        fn solve(&self, request: &SpringRequest) -> SpringFrames {
            self.entering.borrow_mut().push(!request.reverse);
            self.inner.solve(request)
        }
    }

    #[test]
    fn test_required_options() {
        let err = PresenceController::new(PresenceOptions::default()).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingVariants);

        let err = PresenceController::new(PresenceOptions::default().variants(slide())).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingInitial);

        let err = PresenceController::new(
            options(Visibility::Visible).spring(SpringParameters::new(150.0, 3.0, 0.0)),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSpring { field: "damping", .. }));
    }

    #[test]
    fn test_wait_conflict_rejected() {
        let callbacks = LifecycleCallbacks::new().on_wait(|_| {}).on_exit(|_| {});
        let err = PresenceController::new(options(Visibility::Visible).callbacks(callbacks)).unwrap_err();
        assert_eq!(err, ConfigurationError::WaitConflict);

        let mut controller = PresenceController::new(options(Visibility::Visible)).unwrap();
        let callbacks = LifecycleCallbacks::new().on_wait(|_| {}).on_enter(|_| {});
        assert_eq!(
            controller
                .reconfigure(options(Visibility::Visible).callbacks(callbacks))
                .unwrap_err(),
            ConfigurationError::WaitConflict
        );
    }

    #[test]
    fn test_hidden_without_first_render_animation() {
        let mut engine = mounted_engine();
        let mut controller = PresenceController::new(
            options(Visibility::Hidden).animate_first_render(false),
        )
        .unwrap();
        controller.attach(EL);
        controller.commit(&mut engine);

        assert!(controller.current_clip().is_none());
        assert!(!controller.is_visible());
        assert!(!controller.is_rendered());
        assert_eq!(controller.phase(&engine), PresencePhase::Hidden);
        assert!(!engine.has_running_clips());
    }

    #[test]
    fn test_first_render_plays_one_entering_clip() {
        let solver = Rc::new(RecordingSolver::default());
        let mut engine = mounted_engine();
        let mut controller =
            PresenceController::new(options(Visibility::Visible).solver(solver.clone())).unwrap();
        controller.attach(EL);
        controller.commit(&mut engine);
        controller.commit(&mut engine);

        assert_eq!(*solver.entering.borrow(), vec![true]);
        assert_eq!(controller.phase(&engine), PresencePhase::Entering);
        assert_eq!(engine.running_count(), 1);
    }

    #[test]
    fn test_first_render_skipped_when_disabled() {
        let mut engine = mounted_engine();
        let mut controller =
            PresenceController::new(options(Visibility::Visible).animate_first_render(false)).unwrap();
        controller.attach(EL);
        controller.commit(&mut engine);

        assert!(controller.current_clip().is_none());
        assert_eq!(controller.phase(&engine), PresencePhase::VisibleIdle);
        assert!(controller.has_ever_rendered());
    }

    #[test]
    fn test_commit_without_element_is_noop() {
        let mut engine = mounted_engine();
        let mut controller = PresenceController::new(options(Visibility::Visible)).unwrap();
        controller.commit(&mut engine);
        assert!(controller.current_clip().is_none());
        assert!(controller.has_ever_rendered());
    }

    #[test]
    fn test_toggle_without_exit_hook_hides() {
        let (mut engine, mut controller) = shown(options(Visibility::Visible));
        assert_eq!(controller.phase(&engine), PresencePhase::VisibleIdle);

        let done = Rc::new(Cell::new(0));
        let counter = done.clone();
        controller.toggle_then(&mut engine, move || counter.set(counter.get() + 1));
        assert_eq!(controller.phase(&engine), PresencePhase::Exiting);
        assert!(controller.is_visible());

        settle(&mut engine, &mut controller);
        assert_eq!(controller.variant(), Visibility::Hidden);
        assert_eq!(done.get(), 1);

        // A repeated finish for the same clip must not fire the callback again.
        let clip = controller.current_clip().unwrap();
        controller.complete(clip);
        assert_eq!(done.get(), 1);
    }

    #[test]
    fn test_exit_hook_gates_exit_clip() {
        let parked = Rc::new(Cell::new(None));
        let slot = parked.clone();
        let callbacks = LifecycleCallbacks::new().on_exit(move |token| slot.set(token));
        let (mut engine, mut controller) = shown(options(Visibility::Visible).callbacks(callbacks));
        let entered = controller.current_clip();

        controller.toggle(&mut engine);
        let token = parked.take().expect("exit hook receives a resume token");
        assert_eq!(controller.phase(&engine), PresencePhase::ExitGatePending);
        assert_eq!(controller.current_clip(), entered);
        assert!(controller.is_visible());

        settle(&mut engine, &mut controller);
        assert!(controller.is_visible());

        assert!(controller.resume_exit(&mut engine, token));
        assert_eq!(controller.phase(&engine), PresencePhase::Exiting);
        assert!(!controller.resume_exit(&mut engine, token));

        settle(&mut engine, &mut controller);
        assert_eq!(controller.variant(), Visibility::Hidden);
    }

    #[test]
    fn test_toggle_during_gate_reissues_token() {
        let tokens = Rc::new(RefCell::new(Vec::new()));
        let sink = tokens.clone();
        let callbacks = LifecycleCallbacks::new().on_exit(move |token| sink.borrow_mut().extend(token));
        let (mut engine, mut controller) = shown(options(Visibility::Visible).callbacks(callbacks));

        controller.toggle(&mut engine);
        controller.toggle(&mut engine);
        let issued = tokens.borrow().clone();
        assert_eq!(issued.len(), 2);

        assert!(!controller.resume_exit(&mut engine, issued[0]));
        assert!(controller.resume_exit(&mut engine, issued[1]));
    }

    #[test]
    fn test_toggle_while_entering_reverses() {
        let mut engine = mounted_engine();
        let mut controller = PresenceController::new(options(Visibility::Visible)).unwrap();
        controller.attach(EL);
        controller.commit(&mut engine);
        let clip = controller.current_clip().unwrap();

        engine.update(50.0);
        let done = Rc::new(Cell::new(false));
        let flag = done.clone();
        controller.toggle_then(&mut engine, move || flag.set(true));

        assert_eq!(controller.current_clip(), Some(clip));
        assert!(engine.clip(clip).unwrap().is_reversed());
        assert_eq!(controller.phase(&engine), PresencePhase::Exiting);

        settle(&mut engine, &mut controller);
        assert_eq!(controller.variant(), Visibility::Hidden);
        assert!(done.get());
    }

    #[test]
    fn test_double_toggle_returns_to_visible() {
        let entered = Rc::new(Cell::new(0));
        let counter = entered.clone();
        let callbacks = LifecycleCallbacks::new().on_enter(move |token| {
            assert!(token.is_none());
            counter.set(counter.get() + 1);
        });
        let mut engine = mounted_engine();
        let mut controller =
            PresenceController::new(options(Visibility::Visible).callbacks(callbacks)).unwrap();
        controller.attach(EL);
        controller.commit(&mut engine);

        engine.update(50.0);
        let exited = Rc::new(Cell::new(false));
        let flag = exited.clone();
        controller.toggle_then(&mut engine, move || flag.set(true));
        engine.update(20.0);
        controller.toggle(&mut engine);
        assert!(!controller.pending_exit());

        for _ in 0..1_000 {
            engine.update(16.0);
            dispatch(&mut engine, &mut controller);
            assert!(controller.is_visible());
        }
        assert_eq!(entered.get(), 1);
        assert!(!exited.get());
        assert_eq!(controller.phase(&engine), PresencePhase::VisibleIdle);
    }

    #[test]
    fn test_has_ever_rendered_latches() {
        let mut engine = mounted_engine();
        let mut controller = PresenceController::new(options(Visibility::Hidden)).unwrap();
        controller.commit(&mut engine);
        assert!(!controller.has_ever_rendered());

        controller.toggle(&mut engine);
        controller.attach(EL);
        controller.commit(&mut engine);
        assert!(controller.has_ever_rendered());

        settle(&mut engine, &mut controller);
        controller.toggle(&mut engine);
        settle(&mut engine, &mut controller);
        assert_eq!(controller.variant(), Visibility::Hidden);
        assert!(controller.has_ever_rendered());
    }

    #[test]
    fn test_show_again_plays_entering_clip() {
        let (mut engine, mut controller) = shown(options(Visibility::Visible));
        controller.toggle(&mut engine);
        settle(&mut engine, &mut controller);
        let exit_clip = controller.current_clip();

        controller.toggle(&mut engine);
        assert!(controller.is_visible());
        controller.commit(&mut engine);
        assert_ne!(controller.current_clip(), exit_clip);
        assert_eq!(controller.phase(&engine), PresencePhase::Entering);
    }

    #[test]
    fn test_exit_deferred_until_attach() {
        let mut engine = mounted_engine();
        let mut controller =
            PresenceController::new(options(Visibility::Visible).animate_first_render(false)).unwrap();
        controller.commit(&mut engine);

        let done = Rc::new(Cell::new(false));
        let flag = done.clone();
        controller.toggle_then(&mut engine, move || flag.set(true));
        assert_eq!(controller.phase(&engine), PresencePhase::ExitGatePending);
        assert!(controller.current_clip().is_none());

        controller.attach(EL);
        controller.commit(&mut engine);
        assert_eq!(controller.phase(&engine), PresencePhase::Exiting);

        settle(&mut engine, &mut controller);
        assert_eq!(controller.variant(), Visibility::Hidden);
        assert!(done.get());
    }

    #[test]
    fn test_rejected_exit_replays_on_next_attach() {
        let (mut engine, mut controller) = shown(options(Visibility::Visible));
        engine.unmount(EL);
        dispatch(&mut engine, &mut controller);

        let done = Rc::new(Cell::new(0));
        let counter = done.clone();
        controller.toggle_then(&mut engine, move || counter.set(counter.get() + 1));
        assert_eq!(controller.phase(&engine), PresencePhase::ExitGatePending);
        assert!(controller.pending_exit());
        assert!(controller.current_clip().is_none());
        assert!(controller.is_visible());

        let replacement = ElementId(2);
        engine.mount(replacement);
        controller.attach(replacement);
        controller.commit(&mut engine);
        assert_eq!(controller.phase(&engine), PresencePhase::Exiting);

        settle(&mut engine, &mut controller);
        assert_eq!(controller.variant(), Visibility::Hidden);
        assert!(!controller.pending_exit());
        assert_eq!(done.get(), 1);
    }

    #[test]
    fn test_gate_pending_suppresses_enter_on_reattach() {
        let parked = Rc::new(Cell::new(None));
        let slot = parked.clone();
        let callbacks = LifecycleCallbacks::new().on_exit(move |token| slot.set(token));
        let (mut engine, mut controller) = shown(options(Visibility::Visible).callbacks(callbacks));
        let entered = controller.current_clip();

        controller.toggle(&mut engine);
        let token = parked.take().expect("exit hook receives a resume token");

        let replacement = ElementId(2);
        engine.mount(replacement);
        controller.attach(replacement);
        controller.commit(&mut engine);
        assert_eq!(controller.current_clip(), entered);
        assert!(!engine.has_running_clips());
        assert_eq!(controller.phase(&engine), PresencePhase::ExitGatePending);

        assert!(controller.resume_exit(&mut engine, token));
        assert_eq!(controller.phase(&engine), PresencePhase::Exiting);
        settle(&mut engine, &mut controller);
        assert_eq!(controller.variant(), Visibility::Hidden);
    }

    #[test]
    fn test_stale_events_ignored() {
        let (mut engine, mut controller) = shown(options(Visibility::Visible));
        assert!(!controller.complete(ClipId(u64::MAX)));
        assert!(!controller.handle_event(&ClipEvent::Cancelled {
            clip: ClipId(u64::MAX),
            element: EL,
        }));
        assert!(controller.is_visible());
        assert_eq!(controller.phase(&engine), PresencePhase::VisibleIdle);

        engine.unmount(EL);
        dispatch(&mut engine, &mut controller);
        assert!(controller.is_visible());
    }
}
