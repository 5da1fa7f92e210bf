//! Keyframe tracks for presence clips.
//!
//! This module provides:
//! - `Keyframe`: A single point in a clip with property values
//! - `KeyframeTrack`: An ordered sequence of keyframes with per-property sampling
//! - `FillMode`: What values a clip applies outside its active interval
//!
//! Sampling is linear between neighbouring keyframes. A property that is only
//! present on some keyframes (opacity is stitched onto the first and last
//! frames only) is interpolated between the nearest keyframes that carry it,
//! matching how web animation engines treat sparse keyframes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::interpolate::Interpolate;
use super::types::{AnimatableProperty, AnimatableValue};

/// What values to apply before/after the clip's active interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Don't apply any values outside the clip.
    None,
    /// Retain the final keyframe values after the clip ends.
    Forwards,
    /// Apply the first keyframe values before the clip starts.
    Backwards,
    /// Apply both forwards and backwards behavior.
    #[default]
    Both,
}

impl FillMode {
    /// Should apply values before the clip starts?
    pub fn applies_backwards(&self) -> bool {
        matches!(self, Self::Backwards | Self::Both)
    }

    /// Should retain values after the clip ends?
    pub fn applies_forwards(&self) -> bool {
        matches!(self, Self::Forwards | Self::Both)
    }
}

/// A single keyframe in a clip.
///
/// Each keyframe specifies property values at a specific point of the
/// timeline, identified by an offset from 0.0 (start) to 1.0 (end).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Position in the timeline (0.0 to 1.0).
    pub offset: f64,
    /// Property values at this keyframe.
    pub values: HashMap<AnimatableProperty, AnimatableValue>,
}

impl Keyframe {
    /// Create a new empty keyframe at the given offset.
    pub fn new(offset: f64) -> Self {
        Self {
            offset: offset.clamp(0.0, 1.0),
            values: HashMap::new(),
        }
    }

    /// Set a property value for this keyframe.
    pub fn set(mut self, property: AnimatableProperty, value: impl Into<AnimatableValue>) -> Self {
        self.values.insert(property, value.into());
        self
    }

    /// Overwrite a property value in place.
    pub fn insert(&mut self, property: AnimatableProperty, value: impl Into<AnimatableValue>) {
        self.values.insert(property, value.into());
    }

    /// Get a property value from this keyframe.
    pub fn get(&self, property: AnimatableProperty) -> Option<&AnimatableValue> {
        self.values.get(&property)
    }

    /// True if the keyframe carries no property values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered sequence of keyframes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyframeTrack {
    keyframes: Vec<Keyframe>,
}

impl KeyframeTrack {
    /// Create an empty track.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a track from keyframes, sorting them by offset.
    pub fn from_keyframes(mut keyframes: Vec<Keyframe>) -> Self {
        keyframes.sort_by(|a, b| {
            a.offset
                .partial_cmp(&b.offset)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { keyframes }
    }

    /// Build a track from frames sampled at a fixed rate, spacing offsets evenly.
    pub fn evenly_spaced(frames: Vec<Keyframe>) -> Self {
        let last = frames.len().saturating_sub(1).max(1) as f64;
        let keyframes = frames
            .into_iter()
            .enumerate()
            .map(|(i, mut kf)| {
                kf.offset = i as f64 / last;
                kf
            })
            .collect();
        Self { keyframes }
    }

    /// Two empty keyframes at offsets 0 and 1.
    pub fn endpoints() -> Self {
        Self {
            keyframes: vec![Keyframe::new(0.0), Keyframe::new(1.0)],
        }
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyframe> {
        self.keyframes.iter()
    }

    pub fn as_slice(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn first(&self) -> Option<&Keyframe> {
        self.keyframes.first()
    }

    pub fn last(&self) -> Option<&Keyframe> {
        self.keyframes.last()
    }

    pub fn first_mut(&mut self) -> Option<&mut Keyframe> {
        self.keyframes.first_mut()
    }

    pub fn last_mut(&mut self) -> Option<&mut Keyframe> {
        self.keyframes.last_mut()
    }

    /// Get all properties animated by this track, in a stable order.
    pub fn animated_properties(&self) -> Vec<AnimatableProperty> {
        let mut props: Vec<AnimatableProperty> = self
            .keyframes
            .iter()
            .flat_map(|kf| kf.values.keys().copied())
            .collect();
        props.sort();
        props.dedup();
        props
    }

    /// Get the value of a property at a given offset.
    ///
    /// Only keyframes carrying the property take part; outside the first/last
    /// such keyframe the nearest value is held.
    pub fn value_at(&self, property: AnimatableProperty, offset: f64) -> Option<AnimatableValue> {
        let offset = offset.clamp(0.0, 1.0);

        let mut before: Option<(f64, &AnimatableValue)> = None;
        let mut after: Option<(f64, &AnimatableValue)> = None;
        for kf in &self.keyframes {
            let Some(value) = kf.get(property) else {
                continue;
            };
            if kf.offset <= offset {
                before = Some((kf.offset, value));
            }
            if kf.offset >= offset {
                after = Some((kf.offset, value));
                break;
            }
        }

        match (before, after) {
            (Some((from_offset, from)), Some((to_offset, to))) => {
                let range = to_offset - from_offset;
                let local = if range > 0.0 {
                    (offset - from_offset) / range
                } else {
                    0.0
                };
                Some(from.interpolate(to, local))
            }
            (Some((_, value)), None) | (None, Some((_, value))) => Some(value.clone()),
            (None, None) => None,
        }
    }

    /// Sample every animated property at `offset`.
    pub fn values_at(&self, offset: f64) -> HashMap<AnimatableProperty, AnimatableValue> {
        self.animated_properties()
            .into_iter()
            .filter_map(|p| self.value_at(p, offset).map(|v| (p, v)))
            .collect()
    }
}

impl From<Vec<Keyframe>> for KeyframeTrack {
    fn from(keyframes: Vec<Keyframe>) -> Self {
        Self::from_keyframes(keyframes)
    }
}
