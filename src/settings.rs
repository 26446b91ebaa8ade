//! Engine Settings
//!
//! Plain configuration structs consumed when a [`Universe`](crate::scene::Universe)
//! is created. Every field has a default, so a settings file only needs to
//! name what it overrides.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use orrery::settings::{EngineSettings, SamplingPolicy};
//!
//! // Defaults: 16 ms ticks, stepped sampling at a quarter of the clip duration
//! let settings = EngineSettings::default();
//!
//! // Smoother playback at the declared clip length
//! let mut settings = EngineSettings::default();
//! settings.animation.policy = SamplingPolicy::Interpolated;
//! settings.animation.duration_scale = 1.0;
//!
//! // Or from JSON
//! let settings = EngineSettings::from_json_str(r#"{ "refresh_interval_ms": 8 }"#)?;
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{OrreryError, Result};

// ---------------------------------------------------------------------------
// SamplingPolicy
// ---------------------------------------------------------------------------

/// How the pose evaluator turns a fractional key index into key values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingPolicy {
    /// Use key `floor(index)` only.
    #[default]
    Stepped,
    /// Blend key `floor(index)` toward the next key by the fractional part.
    Interpolated,
}

// ---------------------------------------------------------------------------
// AnimationSettings
// ---------------------------------------------------------------------------

/// Skeletal playback configuration.
///
/// | Field            | Description                                   | Default   |
/// |------------------|-----------------------------------------------|-----------|
/// | `policy`         | Key sampling policy                           | `Stepped` |
/// | `duration_scale` | Factor applied to the declared clip duration  | `0.25`    |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub policy: SamplingPolicy,

    /// Effective loop length is `clip.duration * duration_scale`.
    ///
    /// Imported clips play back at four times their declared speed by
    /// default; set to `1.0` for the declared length.
    pub duration_scale: f32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            policy: SamplingPolicy::Stepped,
            duration_scale: 0.25,
        }
    }
}

// ---------------------------------------------------------------------------
// ChaseCamSettings / ThrusterSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaseCamSettings {
    /// Distance along the target's local +Z that the camera looks at.
    pub look_ahead: f32,
}

impl Default for ChaseCamSettings {
    fn default() -> Self {
        Self { look_ahead: 5.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrusterSettings {
    /// Magnitude of each directional linear thruster (units / s²).
    pub linear: f32,
    /// Magnitude of each roll thruster (rad / s²).
    pub angular: f32,
}

impl Default for ThrusterSettings {
    fn default() -> Self {
        Self {
            linear: 20.0,
            angular: 1.5,
        }
    }
}

// ---------------------------------------------------------------------------
// EngineSettings
// ---------------------------------------------------------------------------

/// Global configuration for a universe and everything spawned into it.
///
/// | Field                 | Description                                | Default |
/// |-----------------------|--------------------------------------------|---------|
/// | `refresh_interval_ms` | Tick period of every ticker in the scene   | `16`    |
/// | `animation`           | See [`AnimationSettings`]                  |         |
/// | `chase_cam`           | See [`ChaseCamSettings`]                   |         |
/// | `thrusters`           | See [`ThrusterSettings`]                   |         |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub refresh_interval_ms: u64,
    pub animation: AnimationSettings,
    pub chase_cam: ChaseCamSettings,
    pub thrusters: ThrusterSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 16,
            animation: AnimationSettings::default(),
            chase_cam: ChaseCamSettings::default(),
            thrusters: ThrusterSettings::default(),
        }
    }
}

impl EngineSettings {
    /// Parses settings from JSON and validates them.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a JSON file and validates them.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    #[inline]
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_ms == 0 {
            return Err(OrreryError::InvalidSettings(
                "refresh_interval_ms must be positive".to_string(),
            ));
        }
        let scale = self.animation.duration_scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(OrreryError::InvalidSettings(format!(
                "animation.duration_scale must be positive and finite, got {scale}"
            )));
        }
        if !self.chase_cam.look_ahead.is_finite() {
            return Err(OrreryError::InvalidSettings(
                "chase_cam.look_ahead must be finite".to_string(),
            ));
        }
        if !self.thrusters.linear.is_finite() || !self.thrusters.angular.is_finite() {
            return Err(OrreryError::InvalidSettings(
                "thruster magnitudes must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let s = EngineSettings::from_json_str(r#"{ "animation": { "policy": "interpolated" } }"#)
            .unwrap();
        assert_eq!(s.animation.policy, SamplingPolicy::Interpolated);
        assert!((s.animation.duration_scale - 0.25).abs() < f32::EPSILON);
        assert_eq!(s.refresh_interval_ms, 16);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = EngineSettings::from_json_str(r#"{ "refresh_interval_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, OrreryError::InvalidSettings(_)));
    }

    #[test]
    fn negative_duration_scale_is_rejected() {
        let mut s = EngineSettings::default();
        s.animation.duration_scale = -1.0;
        assert!(s.validate().is_err());
    }
}
