use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::scene::skeleton::BoneId;

/// A time-stamped key value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
}

impl<T> Keyframe<T> {
    #[must_use]
    pub const fn new(time: f32, value: T) -> Self {
        Self { time, value }
    }
}

pub type VectorKey = Keyframe<Vec3>;
pub type QuatKey = Keyframe<Quat>;

/// Keyframes driving a single bone.
///
/// The three sequences are independent: any of them may be shorter than the
/// others, or empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationChannel {
    pub bone_id: BoneId,
    pub rotation_keys: Vec<QuatKey>,
    pub position_keys: Vec<VectorKey>,
    pub scale_keys: Vec<VectorKey>,
}

impl AnimationChannel {
    #[must_use]
    pub fn new(bone_id: BoneId) -> Self {
        Self {
            bone_id,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_rotation_keys(mut self, keys: Vec<QuatKey>) -> Self {
        self.rotation_keys = keys;
        self
    }

    #[must_use]
    pub fn with_position_keys(mut self, keys: Vec<VectorKey>) -> Self {
        self.position_keys = keys;
        self
    }

    #[must_use]
    pub fn with_scale_keys(mut self, keys: Vec<VectorKey>) -> Self {
        self.scale_keys = keys;
        self
    }
}

/// A named animation: a declared duration plus per-bone channels.
///
/// The first channel is the reference channel; its position key count sets
/// how many keys are stepped through per loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    /// Declared duration in seconds.
    pub duration: f32,
    #[serde(default)]
    pub channels: Vec<AnimationChannel>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: impl Into<String>, duration: f32, channels: Vec<AnimationChannel>) -> Self {
        Self {
            name: name.into(),
            duration,
            channels,
        }
    }

    #[inline]
    #[must_use]
    pub fn reference_channel(&self) -> Option<&AnimationChannel> {
        self.channels.first()
    }

    /// Returns the channel driving `bone`. When several channels target the
    /// same bone the last one wins.
    #[must_use]
    pub fn channel_for(&self, bone: BoneId) -> Option<&AnimationChannel> {
        self.channels.iter().rev().find(|c| c.bone_id == bone)
    }
}
