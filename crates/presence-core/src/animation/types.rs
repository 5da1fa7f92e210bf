//! Core animation types and data structures.
//!
//! This module defines the fundamental types shared by the composer, the
//! engine and the presence controller:
//! - `AnimatableValue`: Enum for all animatable property values
//! - `AnimatableProperty`: The properties a presence clip can touch
//! - `ClipId` / `ElementId`: Identifiers for clips and host elements
//! - `PlayState`: Current state of a clip
//! - `Visibility`: Whether an element should be rendered

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an animation clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub u64);

impl ClipId {
    /// Generate a new unique clip ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip#{}", self.0)
    }
}

/// Host-assigned identifier of the UI element a clip animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Current play state of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    /// Clip has been created but `play()` was not called yet.
    #[default]
    Idle,
    /// Clip is actively running (in either direction).
    Running,
    /// Clip reached the end of its timeline in the current direction.
    Finished,
    /// Clip was cancelled before completion.
    Cancelled,
}

impl PlayState {
    /// Returns true while the clip is still advancing.
    pub fn is_running(&self) -> bool {
        *self == Self::Running
    }
}

/// Visibility variant of a presence.
///
/// `Visible` is the single source of truth for "should be rendered".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Element is rendered (possibly still animating out).
    Visible,
    /// Element is not rendered.
    Hidden,
}

impl Visibility {
    pub fn is_visible(&self) -> bool {
        *self == Self::Visible
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible => f.write_str("visible"),
            Self::Hidden => f.write_str("hidden"),
        }
    }
}

/// 2D transform for position, scale, and rotation animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimatableTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation in degrees.
    pub rotate: f64,
}

impl Default for AnimatableTransform {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotate: 0.0,
        }
    }
}

impl AnimatableTransform {
    /// Returns true if this transform leaves the element untouched.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Render the transform as a CSS `transform` value.
    pub fn to_css(&self) -> String {
        format!(
            "translate({}px, {}px) scale({}, {}) rotate({}deg)",
            self.translate_x, self.translate_y, self.scale_x, self.scale_y, self.rotate
        )
    }
}

/// Enum representing all animatable value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnimatableValue {
    /// Numeric value (opacity).
    F64 { value: f64 },
    /// 2D transform (translate, scale, rotate).
    Transform {
        #[serde(flatten)]
        transform: AnimatableTransform,
    },
}

impl AnimatableValue {
    /// Try to extract an f64 value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64 { value } => Some(*value),
            _ => None,
        }
    }

    /// Try to extract a transform.
    pub fn as_transform(&self) -> Option<AnimatableTransform> {
        match self {
            Self::Transform { transform } => Some(*transform),
            _ => None,
        }
    }
}

impl From<f64> for AnimatableValue {
    fn from(v: f64) -> Self {
        Self::F64 { value: v }
    }
}

impl From<AnimatableTransform> for AnimatableValue {
    fn from(t: AnimatableTransform) -> Self {
        Self::Transform { transform: t }
    }
}

/// Properties a presence clip animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimatableProperty {
    /// Grouped translate/scale/rotate.
    Transform,
    Opacity,
}

impl AnimatableProperty {
    /// Name of the property as understood by CSS-like engines.
    pub fn css_name(&self) -> &'static str {
        match self {
            Self::Transform => "transform",
            Self::Opacity => "opacity",
        }
    }
}
