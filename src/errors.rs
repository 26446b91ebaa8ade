//! Error Types
//!
//! This module defines the error types used throughout the engine core.
//!
//! # Overview
//!
//! The main error type [`OrreryError`] covers:
//! - Construction failures (assets, meshes, skeletons, clips)
//! - Numeric degeneracy that would otherwise leak NaN into the render state
//! - Lifecycle violations (using a ticker or body after it was closed)
//!
//! Keyframe sampling edge cases are never reported here; the pose evaluator
//! recovers from them locally.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, OrreryError>`.
//!
//! ```rust,ignore
//! use orrery::errors::Result;
//!
//! fn spawn() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the engine core.
#[derive(Error, Debug)]
pub enum OrreryError {
    // ========================================================================
    // Construction Errors
    // ========================================================================
    /// The requested model file does not exist.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error (model files, settings).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Textures were supplied but do not line up with the imported meshes.
    #[error("{textures} textures don't match {meshes} meshes")]
    TextureCountMismatch {
        /// Number of textures supplied
        textures: usize,
        /// Number of meshes imported
        meshes: usize,
    },

    /// An imported mesh record is internally inconsistent.
    #[error("Invalid mesh '{mesh}': {reason}")]
    InvalidMesh {
        /// Mesh name
        mesh: String,
        /// What is wrong with it
        reason: String,
    },

    /// Bone hierarchy failed validation.
    #[error("Invalid skeleton: {0}")]
    InvalidSkeleton(String),

    /// An animator was built without any clip to play.
    #[error("Animator requires at least one animation clip")]
    EmptyClipList,

    /// The requested active clip does not exist.
    #[error("Clip index {index} out of range ({count} clips)")]
    ClipIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of clips available
        count: usize,
    },

    /// The clip has no first channel (or it has no position keys), so there is
    /// no key rate to sample with.
    #[error("Clip '{0}' has no reference channel with position keys")]
    MissingReferenceChannel(String),

    /// A skinned mesh was imported without any animation data.
    #[error("Skinned mesh '{0}' has bones but no animation clips")]
    EmptyClipData(String),

    /// The render backend refused an upload.
    #[error("Render backend error: {0}")]
    Backend(String),

    // ========================================================================
    // Numeric Errors
    // ========================================================================
    /// Clip duration (after scaling) is zero, negative or not finite.
    #[error("Clip '{clip}' has degenerate effective duration {duration}")]
    DegenerateClipDuration {
        /// Clip name
        clip: String,
        /// Effective duration in seconds
        duration: f32,
    },

    /// A rotation quaternion of zero length or with non-finite components.
    #[error("Degenerate rotation quaternion")]
    DegenerateRotation,

    /// Settings failed validation.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The ticker was already closed.
    #[error("Ticker '{0}' is closed")]
    TickerClosed(String),

    /// A ticker control method was called from that ticker's own callback.
    #[error("Ticker '{0}' cannot be controlled from its own callback")]
    TickerReentrant(String),

    /// The ticker worker thread could not be spawned.
    #[error("Failed to spawn ticker thread: {0}")]
    TickerSpawn(String),

    /// The body was closed (removed from its universe).
    #[error("Body is closed")]
    BodyClosed,

    /// No body is registered under the given key.
    #[error("Body not found in universe")]
    BodyNotFound,
}

/// Alias for `Result<T, OrreryError>`.
pub type Result<T> = std::result::Result<T, OrreryError>;
