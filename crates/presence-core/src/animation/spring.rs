//! Spring physics for presence clips.
//!
//! The composer treats the solver as an external collaborator behind the
//! [`SpringSolver`] trait: given a displacement, a starting scale factor, a
//! rotation and a stiffness/mass/damping triple it returns one keyframe per
//! simulated frame plus the number of frames.
//!
//! [`DampedSpringSolver`] is the bundled implementation. It integrates a
//! damped harmonic oscillator
//!
//!   m·a = -stiffness × (position - 1) - damping × velocity
//!
//! on a normalized position that travels from 0 (displaced) to 1 (at rest),
//! sampling once per 60 Hz frame with semi-implicit Euler sub-steps.

use presence_config::SpringConfig;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use super::keyframes::Keyframe;
use super::types::{AnimatableProperty, AnimatableTransform};
use crate::error::ConfigurationError;

/// Frame rate the solver samples at and the composer converts frames with.
pub const FRAMES_PER_SECOND: f64 = 60.0;

/// Maximum dt per integration step (4ms).
const MAX_STEP_SECS: f64 = 0.004;

/// Position delta below which the spring is considered at rest.
const REST_THRESHOLD: f64 = 0.001;

/// Velocity below which (with the position threshold) the spring is at rest.
const VELOCITY_THRESHOLD: f64 = 0.01;

/// Stiffness, mass and damping of a spring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringParameters {
    pub stiffness: f64,
    pub mass: f64,
    pub damping: f64,
}

impl Default for SpringParameters {
    fn default() -> Self {
        Self {
            stiffness: 150.0,
            mass: 3.0,
            damping: 27.0,
        }
    }
}

impl SpringParameters {
    pub fn new(stiffness: f64, mass: f64, damping: f64) -> Self {
        Self {
            stiffness,
            mass,
            damping,
        }
    }

    /// Check that every parameter is a positive, finite number.
    pub fn validate(self) -> Result<Self, ConfigurationError> {
        for (field, value) in [
            ("stiffness", self.stiffness),
            ("mass", self.mass),
            ("damping", self.damping),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigurationError::InvalidSpring { field, value });
            }
        }
        Ok(self)
    }

    /// Damping ratio ζ; below 1.0 the spring overshoots its rest position.
    pub fn damping_ratio(&self) -> f64 {
        self.damping / (2.0 * (self.stiffness * self.mass).sqrt())
    }
}

impl From<&SpringConfig> for SpringParameters {
    fn from(config: &SpringConfig) -> Self {
        Self::new(config.stiffness, config.mass, config.damping)
    }
}

/// Input to a spring solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringRequest {
    /// Horizontal displacement at the displaced end of the motion.
    pub dx: f64,
    /// Vertical displacement at the displaced end of the motion.
    pub dy: f64,
    pub spring: SpringParameters,
    /// Scale factor at the displaced end; 1.0 means no scaling.
    pub scale: f64,
    /// Rotation in degrees at the displaced end.
    pub rotation_degrees: f64,
    /// Emit frames from rest towards the displaced state.
    pub reverse: bool,
}

impl SpringRequest {
    /// True if the request describes no positional, scale or rotation motion.
    pub fn is_still(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0 && self.scale == 1.0 && self.rotation_degrees == 0.0
    }
}

/// Solver output: one keyframe per sample and the simulated frame count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpringFrames {
    pub keyframes: Vec<Keyframe>,
    pub frame_count: usize,
}

/// Converts a displacement and spring parameters into keyframes.
pub trait SpringSolver {
    fn solve(&self, request: &SpringRequest) -> SpringFrames;
}

impl<S: SpringSolver + ?Sized> SpringSolver for Rc<S> {
    fn solve(&self, request: &SpringRequest) -> SpringFrames {
        (**self).solve(request)
    }
}

impl<S: SpringSolver + ?Sized> SpringSolver for Box<S> {
    fn solve(&self, request: &SpringRequest) -> SpringFrames {
        (**self).solve(request)
    }
}

/// Damped harmonic oscillator solver sampling at 60 Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DampedSpringSolver {
    /// Hard cap on simulated frames, for springs that never settle.
    pub max_frames: usize,
}

impl Default for DampedSpringSolver {
    fn default() -> Self {
        Self { max_frames: 600 }
    }
}

impl From<&SpringConfig> for DampedSpringSolver {
    fn from(config: &SpringConfig) -> Self {
        Self {
            max_frames: config.max_frames.max(1),
        }
    }
}

impl DampedSpringSolver {
    /// Normalized positions, one per frame, starting at 0 and ending at exactly 1.
    pub fn trajectory(&self, spring: SpringParameters) -> Vec<f64> {
        let frame_dt = 1.0 / FRAMES_PER_SECOND;
        let mut position = 0.0_f64;
        let mut velocity = 0.0_f64;
        let mut samples = vec![position];

        while samples.len() <= self.max_frames {
            let mut remaining = frame_dt;
            while remaining > 0.0 {
                let dt = remaining.min(MAX_STEP_SECS);
                let spring_force = -spring.stiffness * (position - 1.0);
                let damping_force = -spring.damping * velocity;
                velocity += (spring_force + damping_force) / spring.mass * dt;
                position += velocity * dt;
                remaining -= dt;
            }

            if (position - 1.0).abs() < REST_THRESHOLD && velocity.abs() < VELOCITY_THRESHOLD {
                samples.push(1.0);
                return samples;
            }
            samples.push(position);
        }

        if let Some(last) = samples.last_mut() {
            *last = 1.0;
        }
        samples
    }
}

impl SpringSolver for DampedSpringSolver {
    fn solve(&self, request: &SpringRequest) -> SpringFrames {
        if request.is_still() {
            return SpringFrames::default();
        }

        let trajectory = self.trajectory(request.spring);
        let frame_count = trajectory.len() - 1;
        let mut keyframes: Vec<Keyframe> = trajectory
            .into_iter()
            .map(|progress| {
                let remaining = 1.0 - progress;
                let scale = 1.0 + (request.scale - 1.0) * remaining;
                let transform = AnimatableTransform {
                    translate_x: request.dx * remaining,
                    translate_y: request.dy * remaining,
                    scale_x: scale,
                    scale_y: scale,
                    rotate: request.rotation_degrees * remaining,
                };
                Keyframe::default().set(AnimatableProperty::Transform, transform)
            })
            .collect();

        if request.reverse {
            keyframes.reverse();
        }

        SpringFrames {
            keyframes,
            frame_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(dy: f64, reverse: bool) -> SpringRequest {
        SpringRequest {
            dx: 0.0,
            dy,
            spring: SpringParameters::default(),
            scale: 1.0,
            rotation_degrees: 0.0,
            reverse,
        }
    }

    fn transform(kf: &Keyframe) -> AnimatableTransform {
        kf.get(AnimatableProperty::Transform)
            .and_then(|v| v.as_transform())
            .unwrap()
    }

    #[test]
    fn test_default_parameters() {
        let spring = SpringParameters::default();
        assert_eq!(spring, SpringParameters::new(150.0, 3.0, 27.0));
        assert!(spring.damping_ratio() < 1.0);
        assert!(spring.validate().is_ok());
    }

    #[test]
    fn test_invalid_parameters() {
        let err = SpringParameters::new(150.0, 0.0, 27.0).validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSpring { field: "mass", .. }));
        assert!(SpringParameters::new(f64::NAN, 3.0, 27.0).validate().is_err());
        assert!(SpringParameters::new(150.0, 3.0, -1.0).validate().is_err());
    }

    #[test]
    fn test_trajectory_settles() {
        let samples = DampedSpringSolver::default().trajectory(SpringParameters::default());
        assert_eq!(samples[0], 0.0);
        assert_eq!(*samples.last().unwrap(), 1.0);
        assert!(samples.len() > 10);
        assert!(samples.len() <= 601);
    }

    #[test]
    fn test_underdamped_spring_overshoots() {
        let samples = DampedSpringSolver::default().trajectory(SpringParameters::new(300.0, 1.0, 5.0));
        let max = samples.iter().cloned().fold(f64::MIN, f64::max);
        assert!(max > 1.0, "expected overshoot, got {max}");
    }

    #[test]
    fn test_frame_cap() {
        let solver = DampedSpringSolver { max_frames: 5 };
        let samples = solver.trajectory(SpringParameters::new(1.0, 100.0, 0.1));
        assert_eq!(samples.len(), 6);
        assert_eq!(*samples.last().unwrap(), 1.0);
    }

    #[test]
    fn test_still_request_yields_nothing() {
        let frames = DampedSpringSolver::default().solve(&request(0.0, false));
        assert!(frames.keyframes.is_empty());
        assert_eq!(frames.frame_count, 0);
    }

    #[test]
    fn test_entering_moves_from_displacement_to_rest() {
        let frames = DampedSpringSolver::default().solve(&request(40.0, false));
        assert_eq!(frames.keyframes.len(), frames.frame_count + 1);

        let first = transform(frames.keyframes.first().unwrap());
        let last = transform(frames.keyframes.last().unwrap());
        assert_eq!(first.translate_y, 40.0);
        assert!(last.is_identity());
    }

    #[test]
    fn test_reverse_mirrors_frames() {
        let solver = DampedSpringSolver::default();
        let forward = solver.solve(&request(40.0, false));
        let backward = solver.solve(&request(40.0, true));

        assert_eq!(forward.frame_count, backward.frame_count);
        assert!(transform(backward.keyframes.first().unwrap()).is_identity());
        assert_eq!(transform(backward.keyframes.last().unwrap()).translate_y, 40.0);
    }

    #[test]
    fn test_scale_and_rotation() {
        let frames = DampedSpringSolver::default().solve(&SpringRequest {
            scale: 0.5,
            rotation_degrees: 360.0,
            ..request(0.0, false)
        });
        let first = transform(frames.keyframes.first().unwrap());
        assert_eq!(first.scale_x, 0.5);
        assert_eq!(first.scale_y, 0.5);
        assert_eq!(first.rotate, 360.0);
    }
}
