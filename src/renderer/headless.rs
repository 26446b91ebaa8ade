use glam::Mat4;
use slotmap::SlotMap;

use crate::assets::MeshRecord;
use crate::errors::{OrreryError, Result};

use super::{DrawCall, GeometryHandle, Program, RenderBackend, TextureHandle};

/// What the headless backend remembers about an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryInfo {
    pub name: String,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub skinned: bool,
}

/// An owned copy of a [`DrawCall`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub geometry: GeometryHandle,
    pub texture: Option<TextureHandle>,
    pub program: Program,
    pub world: Mat4,
    pub bones: Option<Vec<Mat4>>,
}

/// A backend without a device: it keeps upload bookkeeping and records draw
/// calls. Used by tests and tools.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    geometries: SlotMap<GeometryHandle, GeometryInfo>,
    textures: SlotMap<TextureHandle, String>,
    draws: Vec<RecordedDraw>,
    upload_limit: Option<usize>,
}

impl HeadlessBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses every upload after the first `uploads` succeed.
    #[must_use]
    pub fn with_upload_limit(mut self, uploads: usize) -> Self {
        self.upload_limit = Some(uploads);
        self
    }

    pub fn register_texture(&mut self, name: impl Into<String>) -> TextureHandle {
        self.textures.insert(name.into())
    }

    #[must_use]
    pub fn texture_name(&self, handle: TextureHandle) -> Option<&str> {
        self.textures.get(handle).map(String::as_str)
    }

    #[must_use]
    pub fn geometry(&self, handle: GeometryHandle) -> Option<&GeometryInfo> {
        self.geometries.get(handle)
    }

    /// Number of live (uploaded, not yet released) geometries.
    #[must_use]
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    #[must_use]
    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    pub fn take_draws(&mut self) -> Vec<RecordedDraw> {
        std::mem::take(&mut self.draws)
    }
}

impl RenderBackend for HeadlessBackend {
    fn upload(&mut self, mesh: &MeshRecord) -> Result<GeometryHandle> {
        if let Some(limit) = self.upload_limit {
            if limit == 0 {
                return Err(OrreryError::Backend(format!(
                    "upload limit reached for '{}'",
                    mesh.name
                )));
            }
            self.upload_limit = Some(limit - 1);
        }

        Ok(self.geometries.insert(GeometryInfo {
            name: mesh.name.clone(),
            vertex_count: mesh.vertex_count(),
            triangle_count: mesh.triangles.len(),
            skinned: mesh.is_skinned(),
        }))
    }

    fn release(&mut self, geometry: GeometryHandle) {
        if self.geometries.remove(geometry).is_none() {
            log::warn!("Released unknown geometry {geometry:?}");
        }
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        self.draws.push(RecordedDraw {
            geometry: call.geometry,
            texture: call.texture,
            program: call.program,
            world: call.world,
            bones: call.bones.map(<[Mat4]>::to_vec),
        });
    }
}
