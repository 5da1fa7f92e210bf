use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Context, Result};
use presence_config::PresenceConfig;
use presence_core::animation::{AnimatableProperty, AnimatableValue};
use presence_core::{
    ElementId, LifecycleCallbacks, MotionDescriptor, PresenceArena, PresenceId, PresenceOptions,
    ScaleMotion, TimelineEngine, Visibility,
};

/// Frames after which a demo stage gives up waiting for the engine.
const STAGE_FRAME_LIMIT: usize = 2_000;

fn default_variants() -> MotionDescriptor {
    MotionDescriptor::new()
        .y(32.0, 0.0)
        .scale(ScaleMotion::Ratio { from: 0.95, to: 1.0 })
        .opacity(0.0, 1.0)
}

fn describe(engine: &TimelineEngine, element: ElementId) -> String {
    let values = engine.current_values(element);
    let transform = values
        .get(&AnimatableProperty::Transform)
        .and_then(AnimatableValue::as_transform)
        .map(|t| t.to_css())
        .unwrap_or_else(|| "none".to_string());
    let opacity = values
        .get(&AnimatableProperty::Opacity)
        .and_then(AnimatableValue::as_f64)
        .unwrap_or(1.0);
    format!("transform: {transform}; opacity: {opacity:.3}")
}

/// Advance frames until nothing is animating, logging every tenth frame.
fn run_stage(
    stage: &str,
    arena: &mut PresenceArena,
    engine: &mut TimelineEngine,
    element: ElementId,
    frame_ms: f64,
    max_frames: usize,
) -> usize {
    let mut frames = 0;
    while engine.has_running_clips() && frames < max_frames {
        arena.advance(engine, frame_ms);
        frames += 1;
        if frames % 10 == 0 {
            log::info!("[{stage}] frame {frames}: {}", describe(engine, element));
        }
    }
    log::info!("[{stage}] settled after {frames} frames: {}", describe(engine, element));
    frames
}

fn report(arena: &PresenceArena, engine: &TimelineEngine, id: PresenceId) -> Result<()> {
    let controller = arena.controller(id)?;
    log::info!(
        "{}: variant={} phase={:?} has_ever_rendered={}",
        controller.debug_name(),
        controller.variant(),
        controller.phase(engine),
        controller.has_ever_rendered()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PresenceConfig::load();
    let frame_ms = config.demo.frame_ms;
    let initial = if config.demo.start_hidden {
        Visibility::Hidden
    } else {
        Visibility::Visible
    };

    let entered = Rc::new(Cell::new(0));
    let counter = entered.clone();
    let callbacks =
        LifecycleCallbacks::new().on_enter(move |_| counter.set(counter.get() + 1));

    let mut options = PresenceOptions::from_config(&config)
        .initial(initial)
        .callbacks(callbacks);
    if options.variants.is_none() {
        options = options.variants(default_variants());
    }

    let mut engine = TimelineEngine::new();
    let mut arena = PresenceArena::new();
    let id = arena
        .create(options)
        .context("invalid presence configuration")?;
    let element = ElementId(1);

    // First render pass. A hidden presence is shown before it is mounted.
    if !arena.controller(id)?.is_rendered() {
        arena.toggle(id, &mut engine)?;
    }
    engine.mount(element);
    arena.controller_mut(id)?.attach(element);
    arena.commit_all(&mut engine);
    report(&arena, &engine, id)?;
    run_stage("enter", &mut arena, &mut engine, element, frame_ms, STAGE_FRAME_LIMIT);
    report(&arena, &engine, id)?;

    // Hide, then change our mind a few frames in.
    arena.toggle(id, &mut engine)?;
    run_stage("exit", &mut arena, &mut engine, element, frame_ms, 8);
    arena.toggle(id, &mut engine)?;
    report(&arena, &engine, id)?;
    run_stage("re-enter", &mut arena, &mut engine, element, frame_ms, STAGE_FRAME_LIMIT);

    let hidden = Rc::new(Cell::new(false));
    let flag = hidden.clone();
    arena.toggle_then(id, &mut engine, move || flag.set(true))?;
    run_stage("exit", &mut arena, &mut engine, element, frame_ms, STAGE_FRAME_LIMIT);
    report(&arena, &engine, id)?;

    if !arena.controller(id)?.is_rendered() {
        arena.controller_mut(id)?.detach();
        engine.unmount(element);
    }

    log::info!(
        "enter hook ran {} time(s), exit callback ran: {}",
        entered.get(),
        hidden.get()
    );
    Ok(())
}
