//! Interpolation between animatable values.
//!
//! The timeline engine samples keyframes linearly, so every value type only
//! needs a plain lerp.

use super::types::{AnimatableTransform, AnimatableValue};

/// Trait for types that can be interpolated between two values.
pub trait Interpolate: Sized {
    /// Interpolate between self and another value.
    ///
    /// When t = 0.0, returns self.
    /// When t = 1.0, returns to.
    fn interpolate(&self, to: &Self, t: f64) -> Self;
}

#[inline]
fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

impl Interpolate for f64 {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        lerp(*self, *to, t)
    }
}

impl Interpolate for AnimatableTransform {
    /// Each component (translate, scale, rotate) is interpolated independently.
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        Self {
            translate_x: lerp(self.translate_x, to.translate_x, t),
            translate_y: lerp(self.translate_y, to.translate_y, t),
            scale_x: lerp(self.scale_x, to.scale_x, t),
            scale_y: lerp(self.scale_y, to.scale_y, t),
            rotate: lerp(self.rotate, to.rotate, t),
        }
    }
}

impl Interpolate for AnimatableValue {
    /// Both values must be of the same variant. If they differ, returns self unchanged.
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        match (self, to) {
            (Self::F64 { value: from }, Self::F64 { value: to_val }) => Self::F64 {
                value: from.interpolate(to_val, t),
            },
            (Self::Transform { transform: from }, Self::Transform { transform: to_val }) => {
                Self::Transform {
                    transform: from.interpolate(to_val, t),
                }
            }
            _ => self.clone(),
        }
    }
}
