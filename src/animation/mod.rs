//! Skeletal animation: clip data, pose evaluation and the ticker-driven
//! animator that feeds mesh bone buffers.

pub mod animator;
pub mod clip;
pub mod pose;
pub mod values;

pub use animator::Animator;
pub use clip::{AnimationChannel, AnimationClip, Keyframe, QuatKey, VectorKey};
pub use pose::{Pose, PoseEvaluator};
pub use values::Interpolatable;
