//! Pose Evaluation
//!
//! Samples one clip of a skeleton at a point in time and composes the bone
//! hierarchy into flat, id-indexed arrays of global and skinning matrices.
//!
//! # Sampling
//!
//! The key index is not derived from key timestamps. Instead the clip loops
//! over an effective duration (`clip.duration * duration_scale`) and the
//! reference channel's position key count is spread evenly across it:
//!
//! ```text
//! wrapped = time mod duration
//! index   = wrapped * (reference_key_count / duration)
//! k       = floor(index)
//! ```
//!
//! A key sequence shorter than `k + 1` contributes identity rotation, zero
//! translation and zero scale for that bone, not its bind transform.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::animation::clip::{AnimationChannel, AnimationClip, Keyframe};
use crate::animation::values::{Interpolatable, unit_or_identity};
use crate::errors::{OrreryError, Result};
use crate::scene::skeleton::{BoneId, Skeleton};
use crate::settings::{AnimationSettings, SamplingPolicy};

/// Global and skinning matrices for every bone, indexed by bone id.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub(crate) globals: Vec<Mat4>,
    pub(crate) skin: Vec<Mat4>,
}

impl Pose {
    #[must_use]
    pub fn new(bone_count: usize) -> Self {
        Self {
            globals: vec![Mat4::IDENTITY; bone_count],
            skin: vec![Mat4::IDENTITY; bone_count],
        }
    }

    /// Bone transforms in model space.
    #[inline]
    #[must_use]
    pub fn globals(&self) -> &[Mat4] {
        &self.globals
    }

    /// `global * offset` per bone, as uploaded for skinning.
    #[inline]
    #[must_use]
    pub fn skin_matrices(&self) -> &[Mat4] {
        &self.skin
    }

    #[must_use]
    pub fn into_skin_matrices(self) -> Vec<Mat4> {
        self.skin
    }

    fn resize(&mut self, bone_count: usize) {
        self.globals.resize(bone_count, Mat4::IDENTITY);
        self.skin.resize(bone_count, Mat4::IDENTITY);
    }
}

/// Forward-kinematics sampler for one skeleton playing one fixed clip.
#[derive(Debug, Clone)]
pub struct PoseEvaluator {
    skeleton: Arc<Skeleton>,
    clip: Arc<AnimationClip>,
    settings: AnimationSettings,

    // Bone id -> index into `clip.channels`.
    channels: FxHashMap<BoneId, usize>,
    duration: f32,
    keys_per_second: f64,
}

impl PoseEvaluator {
    /// Plays the first clip.
    pub fn new(
        skeleton: Arc<Skeleton>,
        clips: &[Arc<AnimationClip>],
        settings: AnimationSettings,
    ) -> Result<Self> {
        Self::with_clip_index(skeleton, clips, 0, settings)
    }

    /// Plays `clips[index]`. The choice is fixed for the evaluator's lifetime.
    pub fn with_clip_index(
        skeleton: Arc<Skeleton>,
        clips: &[Arc<AnimationClip>],
        index: usize,
        settings: AnimationSettings,
    ) -> Result<Self> {
        if clips.is_empty() {
            return Err(OrreryError::EmptyClipList);
        }
        let clip = clips
            .get(index)
            .cloned()
            .ok_or(OrreryError::ClipIndexOutOfRange {
                index,
                count: clips.len(),
            })?;

        let scale = settings.duration_scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(OrreryError::InvalidSettings(format!(
                "duration_scale must be positive and finite, got {scale}"
            )));
        }
        let duration = clip.duration * scale;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(OrreryError::DegenerateClipDuration {
                clip: clip.name.clone(),
                duration,
            });
        }

        let key_count = clip
            .reference_channel()
            .map_or(0, |channel| channel.position_keys.len());
        if key_count == 0 {
            return Err(OrreryError::MissingReferenceChannel(clip.name.clone()));
        }

        let mut channels = FxHashMap::default();
        for (i, channel) in clip.channels.iter().enumerate() {
            if channel.bone_id < skeleton.len() {
                channels.insert(channel.bone_id, i);
            } else {
                log::debug!(
                    "Clip '{}' channel targets bone {} outside skeleton '{}'",
                    clip.name,
                    channel.bone_id,
                    skeleton.name
                );
            }
        }

        Ok(Self {
            keys_per_second: key_count as f64 / f64::from(duration),
            skeleton,
            clip,
            settings,
            channels,
            duration,
        })
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    #[inline]
    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> AnimationSettings {
        self.settings
    }

    /// Loop length in seconds after applying the duration scale.
    #[inline]
    #[must_use]
    pub fn effective_duration(&self) -> f32 {
        self.duration
    }

    /// Fractional key index reached `time` seconds into playback.
    #[must_use]
    pub fn key_position(&self, time: f64) -> f32 {
        let duration = f64::from(self.duration);
        let mut wrapped = time.rem_euclid(duration);
        if wrapped >= duration {
            wrapped = 0.0;
        }
        (wrapped * self.keys_per_second) as f32
    }

    #[must_use]
    pub fn evaluate(&self, time: f64) -> Pose {
        let mut pose = Pose::new(self.skeleton.len());
        self.evaluate_into(time, &mut pose);
        pose
    }

    /// Samples into an existing pose, reusing its allocations.
    pub fn evaluate_into(&self, time: f64, pose: &mut Pose) {
        let position = self.key_position(time);
        let key = position.floor();
        let frame = KeyFrame {
            index: key as usize,
            blend: match self.settings.policy {
                SamplingPolicy::Stepped => None,
                SamplingPolicy::Interpolated => Some(position - key),
            },
        };

        pose.resize(self.skeleton.len());
        let bones = self.skeleton.bones();

        for &id in self.skeleton.evaluation_order() {
            let bone = &bones[id];
            let local = match self.channels.get(&id) {
                Some(&channel) => channel_transform(&self.clip.channels[channel], frame),
                None => bone.transform,
            };
            let parent = bone.parent.map_or(Mat4::IDENTITY, |p| pose.globals[p]);
            let global = parent * local;

            pose.globals[id] = global;
            pose.skin[id] = global * bone.offset;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct KeyFrame {
    index: usize,
    /// Fraction toward `index + 1`; `None` samples `index` alone.
    blend: Option<f32>,
}

fn channel_transform(channel: &AnimationChannel, frame: KeyFrame) -> Mat4 {
    let bone = channel.bone_id;
    let rotation = sample_keys(&channel.rotation_keys, frame, Quat::IDENTITY, bone, "rotation");
    let position = sample_keys(&channel.position_keys, frame, Vec3::ZERO, bone, "position");
    let scale = sample_keys(&channel.scale_keys, frame, Vec3::ZERO, bone, "scale");

    Mat4::from_translation(position)
        * Mat4::from_quat(unit_or_identity(rotation))
        * Mat4::from_scale(scale)
}

fn sample_keys<T: Interpolatable>(
    keys: &[Keyframe<T>],
    frame: KeyFrame,
    fallback: T,
    bone: BoneId,
    what: &str,
) -> T {
    let Some(current) = keys.get(frame.index) else {
        if cfg!(debug_assertions) {
            log::trace!("bone {bone} missing {what} key {}", frame.index);
        }
        return fallback;
    };

    match frame.blend {
        Some(t) if t > 0.0 => {
            let next = &keys[(frame.index + 1).min(keys.len() - 1)];
            T::interpolate_linear(current.value, next.value, t)
        }
        _ => current.value,
    }
}
