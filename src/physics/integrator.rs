//! Trapezoidal time integration of body state.
//!
//! Each step averages the current and previous rates:
//!
//! ```text
//! location += (v + v_prev) / 2 * dt
//! ω_avg     = (ω + ω_prev) / 2
//! rotation  = normalize(axis_angle(ω_avg / |ω_avg|, |ω_avg| * dt) * rotation)
//! ```
//!
//! Angular velocity is a world-frame axis scaled by radians per second, so the
//! step rotation pre-multiplies.

use glam::{Quat, Vec3};

use crate::animation::values::unit_or_identity;
use crate::errors::{OrreryError, Result};

/// Rotation angles below this are treated as no rotation.
pub const ANGLE_EPSILON: f32 = 1e-9;

/// Physical state of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub location: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    /// World-frame axis × radians per second.
    pub angular_velocity: Vec3,
    pub last_velocity: Vec3,
    pub last_angular_velocity: Vec3,
}

impl Default for Kinematics {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            last_velocity: Vec3::ZERO,
            last_angular_velocity: Vec3::ZERO,
        }
    }
}

/// Which parts of the placement a step changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOutcome {
    pub translated: bool,
    pub rotated: bool,
}

impl StepOutcome {
    #[inline]
    #[must_use]
    pub fn any(self) -> bool {
        self.translated || self.rotated
    }
}

impl Kinematics {
    /// Normalized rotation, identity if the stored value has degenerated.
    #[inline]
    #[must_use]
    pub fn orientation(&self) -> Quat {
        unit_or_identity(self.rotation)
    }

    /// Advances by `dt` seconds. Non-positive or non-finite `dt` is a no-op.
    pub fn step(&mut self, dt: f32) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        if !dt.is_finite() || dt <= 0.0 {
            return outcome;
        }

        let displacement = (self.velocity + self.last_velocity) * 0.5 * dt;
        self.last_velocity = self.velocity;
        if displacement != Vec3::ZERO && displacement.is_finite() {
            self.location += displacement;
            outcome.translated = true;
        }

        let average = (self.angular_velocity + self.last_angular_velocity) * 0.5;
        self.last_angular_velocity = self.angular_velocity;
        let rate = average.length();
        let angle = rate * dt;
        if angle.is_finite() && angle > ANGLE_EPSILON {
            let delta = Quat::from_axis_angle(average / rate, angle);
            self.rotation = (delta * self.orientation()).normalize();
            outcome.rotated = true;
        }

        outcome
    }
}

/// Normalizes a caller-supplied rotation, rejecting zero-length and
/// non-finite quaternions.
pub fn checked_rotation(rotation: Quat) -> Result<Quat> {
    if !rotation.is_finite() || rotation.length_squared() <= 1e-12 {
        return Err(OrreryError::DegenerateRotation);
    }
    Ok(rotation.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn trapezoid_averages_velocity_change() {
        let mut k = Kinematics {
            velocity: Vec3::new(2.0, 0.0, 0.0),
            ..Default::default()
        };
        // Previous velocity zero: first step moves half as far.
        let out = k.step(1.0);
        assert!(out.translated);
        assert!(k.location.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-6));

        k.step(1.0);
        assert!(k.location.abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn angular_step_is_world_frame() {
        let mut k = Kinematics {
            rotation: Quat::from_rotation_x(FRAC_PI_2),
            angular_velocity: Vec3::new(0.0, FRAC_PI_2, 0.0),
            last_angular_velocity: Vec3::new(0.0, FRAC_PI_2, 0.0),
            ..Default::default()
        };
        let out = k.step(1.0);
        assert!(out.rotated && !out.translated);

        let expected = Quat::from_rotation_y(FRAC_PI_2) * Quat::from_rotation_x(FRAC_PI_2);
        assert!(k.rotation.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn idle_step_changes_nothing() {
        let mut k = Kinematics::default();
        assert!(!k.step(0.016).any());
        assert!(!k.step(-1.0).any());
        assert_eq!(k, Kinematics::default());
    }
}
