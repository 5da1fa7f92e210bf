//! Keyframe composition for presence clips.
//!
//! [`KeyframeComposer::compose`] turns a directionless [`MotionDescriptor`]
//! plus spring parameters and a direction into the keyframes and duration of
//! one clip:
//!
//! 1. Displacement deltas are `from - to` per axis (zero when absent).
//! 2. The scale factor comes from the explicit [`ScaleMotion`] mode.
//! 3. The solver produces transform keyframes and a frame count.
//! 4. With no physical motion, two empty keyframes are synthesized so opacity
//!    still has a start and an end frame.
//! 5. Opacity, when configured, is stitched onto the first and last keyframe
//!    in the direction of this clip.
//!
//! Composition is pure and may be repeated freely.

use presence_config::{RangeConfig, ScaleConfig, ScaleModeConfig, VariantsConfig};
use serde::{Deserialize, Serialize};

use super::keyframes::KeyframeTrack;
use super::spring::{
    DampedSpringSolver, FRAMES_PER_SECOND, SpringParameters, SpringRequest, SpringSolver,
};
use super::types::AnimatableProperty;

/// Duration used for motion-less clips when the descriptor gives none.
pub const DEFAULT_DURATION_MS: f64 = 1000.0;

/// A directionless `from`/`to` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub from: f64,
    pub to: f64,
}

impl Range {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// `from - to`.
    pub fn delta(&self) -> f64 {
        self.from - self.to
    }

    /// The pair ordered for a clip direction: `(from, to)` when entering,
    /// `(to, from)` when exiting.
    pub fn directed(&self, entering: bool) -> (f64, f64) {
        if entering {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        }
    }
}

impl From<RangeConfig> for Range {
    fn from(config: RangeConfig) -> Self {
        Self::new(config.from, config.to)
    }
}

/// Opacity range, fully opaque at both ends by default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpacityRange(pub Range);

impl Default for OpacityRange {
    fn default() -> Self {
        Self(Range::new(1.0, 1.0))
    }
}

/// How a descriptor's scale entry becomes the solver's scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScaleMotion {
    /// Factor is `1 + (from - to)`.
    Additive { from: f64, to: f64 },
    /// Factor is `from / to`; a zero `to` means no scaling.
    Ratio { from: f64, to: f64 },
    /// Factor used as given.
    Factor { factor: f64 },
}

impl ScaleMotion {
    /// Scale factor at the displaced end of the motion.
    pub fn factor(&self) -> f64 {
        match *self {
            Self::Additive { from, to } => 1.0 + (from - to),
            Self::Ratio { from, to } => {
                if to == 0.0 {
                    1.0
                } else {
                    from / to
                }
            }
            Self::Factor { factor } => factor,
        }
    }
}

impl From<ScaleConfig> for ScaleMotion {
    fn from(config: ScaleConfig) -> Self {
        match config.mode {
            ScaleModeConfig::Additive => Self::Additive {
                from: config.from,
                to: config.to,
            },
            ScaleModeConfig::Ratio => Self::Ratio {
                from: config.from,
                to: config.to,
            },
        }
    }
}

/// Declarative description of how an element moves in and out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionDescriptor {
    pub x: Option<Range>,
    pub y: Option<Range>,
    pub scale: Option<ScaleMotion>,
    /// Rotation in degrees at the displaced end.
    pub rotation: Option<f64>,
    pub opacity: Option<OpacityRange>,
    /// Duration for clips without physical motion.
    pub duration_ms: Option<f64>,
}

impl MotionDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x(mut self, from: f64, to: f64) -> Self {
        self.x = Some(Range::new(from, to));
        self
    }

    pub fn y(mut self, from: f64, to: f64) -> Self {
        self.y = Some(Range::new(from, to));
        self
    }

    pub fn scale(mut self, scale: ScaleMotion) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn rotation(mut self, degrees: f64) -> Self {
        self.rotation = Some(degrees);
        self
    }

    pub fn opacity(mut self, from: f64, to: f64) -> Self {
        self.opacity = Some(OpacityRange(Range::new(from, to)));
        self
    }

    pub fn duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    fn solver_request(&self, spring: SpringParameters, entering: bool) -> SpringRequest {
        SpringRequest {
            dx: self.x.map_or(0.0, |r| r.delta()),
            dy: self.y.map_or(0.0, |r| r.delta()),
            spring,
            scale: self.scale.map_or(1.0, |s| s.factor()),
            rotation_degrees: self.rotation.unwrap_or(0.0),
            reverse: !entering,
        }
    }
}

impl From<&VariantsConfig> for MotionDescriptor {
    fn from(config: &VariantsConfig) -> Self {
        Self {
            x: config.x.map(Range::from),
            y: config.y.map(Range::from),
            scale: config.scale.map(ScaleMotion::from),
            rotation: config.rotation,
            opacity: config.opacity.map(|r| OpacityRange(r.into())),
            duration_ms: config.duration_ms,
        }
    }
}

/// Keyframes and duration of one composed clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedClip {
    pub keyframes: KeyframeTrack,
    pub duration_ms: f64,
    /// False when the solver produced no motion and endpoints were synthesized.
    pub has_motion: bool,
}

/// Builds clips from motion descriptors using a spring solver.
#[derive(Debug, Clone)]
pub struct KeyframeComposer<S = DampedSpringSolver> {
    solver: S,
    default_duration_ms: f64,
}

impl Default for KeyframeComposer {
    fn default() -> Self {
        Self::new(DampedSpringSolver::default())
    }
}

impl<S: SpringSolver> KeyframeComposer<S> {
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            default_duration_ms: DEFAULT_DURATION_MS,
        }
    }

    /// Fallback duration for motion-less clips without an explicit one.
    pub fn with_default_duration(mut self, duration_ms: f64) -> Self {
        self.default_duration_ms = duration_ms;
        self
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Compose the keyframes and duration of a clip in the given direction.
    pub fn compose(
        &self,
        descriptor: &MotionDescriptor,
        spring: SpringParameters,
        entering: bool,
    ) -> ComposedClip {
        let frames = self
            .solver
            .solve(&descriptor.solver_request(spring, entering));

        let has_motion = !frames.keyframes.is_empty();
        let mut keyframes = if has_motion {
            KeyframeTrack::evenly_spaced(frames.keyframes)
        } else {
            KeyframeTrack::endpoints()
        };

        if let Some(OpacityRange(range)) = descriptor.opacity {
            let (start, end) = range.directed(entering);
            if let Some(first) = keyframes.first_mut() {
                first.insert(AnimatableProperty::Opacity, start);
            }
            if let Some(last) = keyframes.last_mut() {
                last.insert(AnimatableProperty::Opacity, end);
            }
        }

        let duration_ms = if has_motion {
            frames.frame_count as f64 / FRAMES_PER_SECOND * 1000.0
        } else {
            descriptor.duration_ms.unwrap_or(self.default_duration_ms)
        };

        ComposedClip {
            keyframes,
            duration_ms,
            has_motion,
        }
    }
}

/// Compose a clip with the bundled damped spring solver.
pub fn compose(
    descriptor: &MotionDescriptor,
    spring: SpringParameters,
    entering: bool,
) -> ComposedClip {
    KeyframeComposer::new(DampedSpringSolver::default()).compose(descriptor, spring, entering)
}
