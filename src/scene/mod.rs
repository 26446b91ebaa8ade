//! Scene Module
//!
//! - [`Body`]: kinematic body owning meshes, animators and an integrator
//! - [`Universe`]: registry that spawns and removes bodies
//! - [`BodyObserver`]: placement-change protocol, implemented by
//!   [`ChaseCam`] and [`Attachment`]
//! - [`Skeleton`]: validated bone hierarchy
//! - [`Mesh`]: per-mesh render state read by the renderer

pub mod attachment;
pub mod body;
pub mod chase_cam;
pub mod free_cam;
pub mod mesh;
pub mod observer;
pub mod skeleton;
pub mod universe;

pub use attachment::{Attachment, PickupOutcome};
pub use body::Body;
pub use chase_cam::{CameraView, ChaseCam};
pub use free_cam::FreeCam;
pub use mesh::Mesh;
pub use observer::{BodyObserver, ObserverKey};
pub use skeleton::{Bone, BoneId, Skeleton};
pub use universe::{BodyDesc, BodyHandle, BodyKey, Universe};
