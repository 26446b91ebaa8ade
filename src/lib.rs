#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod animation;
pub mod assets;
pub mod errors;
pub mod physics;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod utils;

pub use animation::{AnimationChannel, AnimationClip, Animator, Pose, PoseEvaluator};
pub use assets::{Importer, JsonImporter, MeshRecord};
pub use errors::{OrreryError, Result};
pub use physics::{Acceleration, Thrust, ThrusterSet};
pub use renderer::{DrawCall, HeadlessBackend, Program, RenderBackend};
pub use scene::{Attachment, Body, BodyDesc, BodyObserver, ChaseCam, FreeCam, Skeleton, Universe};
pub use settings::{AnimationSettings, EngineSettings, SamplingPolicy};
pub use utils::{Ticker, TickerState};
