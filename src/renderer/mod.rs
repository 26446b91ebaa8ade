//! Renderer boundary.
//!
//! The core never talks to a GPU. Geometry is uploaded once through a
//! [`RenderBackend`] when a body is spawned, and every frame the backend's
//! draw pass pulls a [`DrawCall`] per mesh out of [`Body::draw`].
//!
//! [`Body::draw`]: crate::scene::Body::draw

pub mod headless;

use glam::Mat4;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::assets::MeshRecord;
use crate::errors::Result;

pub use headless::{GeometryInfo, HeadlessBackend, RecordedDraw};

new_key_type! {
    pub struct GeometryHandle;
    pub struct TextureHandle;
}

/// Shader program a mesh is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Program {
    /// Rigid mesh, world transform only.
    #[default]
    Standard,
    /// Vertex skinning with the mesh's bone matrices.
    Skinned,
}

/// Everything a backend needs to draw one mesh.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub geometry: GeometryHandle,
    pub texture: Option<TextureHandle>,
    pub program: Program,
    pub world: Mat4,
    /// Skinning matrices, indexed by bone id. `None` for rigid meshes.
    pub bones: Option<&'a [Mat4]>,
}

pub trait RenderBackend {
    /// Uploads the geometry of `mesh` and returns its handle.
    fn upload(&mut self, mesh: &MeshRecord) -> Result<GeometryHandle>;

    /// Frees geometry previously returned by [`upload`](Self::upload).
    fn release(&mut self, geometry: GeometryHandle);

    fn draw(&mut self, call: &DrawCall<'_>);
}
