use std::path::Path;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::animation::clip::AnimationClip;
use crate::errors::{OrreryError, Result};
use crate::scene::skeleton::{Bone, Skeleton};

/// Maximum bone influences per vertex.
pub const MAX_INFLUENCES: usize = 4;

// ============================================================================
// 1. Mesh Record
// ============================================================================

/// One mesh as produced by a model importer: geometry, optional skin and the
/// clips that animate it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshRecord {
    pub name: String,
    pub positions: Vec<Vec3>,
    /// Single UV channel; empty or one entry per vertex.
    pub uvs: Vec<Vec2>,
    /// Empty or one entry per vertex.
    pub normals: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,

    pub bones: Vec<Bone>,
    /// Per-vertex bone ids; `-1` marks an unused influence slot.
    pub bone_ids: Vec<[i32; MAX_INFLUENCES]>,
    pub bone_weights: Vec<[f32; MAX_INFLUENCES]>,

    pub clips: Vec<AnimationClip>,
}

impl MeshRecord {
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_skinned(&self) -> bool {
        !self.bones.is_empty()
    }

    /// Builds the validated bone hierarchy of this mesh.
    pub fn skeleton(&self) -> Result<Skeleton> {
        Skeleton::new(&self.name, self.bones.clone())
    }

    /// Checks attribute lengths, triangle index bounds and bone influences.
    pub fn validate(&self) -> Result<()> {
        let vertices = self.vertex_count();

        self.check_attribute("uvs", self.uvs.len(), vertices)?;
        self.check_attribute("normals", self.normals.len(), vertices)?;

        if let Some((t, tri)) = self
            .triangles
            .iter()
            .enumerate()
            .find(|(_, tri)| tri.iter().any(|&i| i as usize >= vertices))
        {
            return Err(self.invalid(format!(
                "triangle {t} {tri:?} indexes past {vertices} vertices"
            )));
        }

        if self.bone_ids.len() != self.bone_weights.len() {
            return Err(self.invalid(format!(
                "{} bone id sets but {} weight sets",
                self.bone_ids.len(),
                self.bone_weights.len()
            )));
        }
        self.check_attribute("bone_ids", self.bone_ids.len(), vertices)?;

        let bone_count = self.bones.len();
        for (v, ids) in self.bone_ids.iter().enumerate() {
            for &id in ids {
                let in_range = usize::try_from(id).is_ok_and(|id| id < bone_count);
                if id != -1 && !in_range {
                    return Err(self.invalid(format!(
                        "vertex {v} references bone {id} of {bone_count}"
                    )));
                }
            }
        }
        if let Some(v) = self
            .bone_weights
            .iter()
            .position(|w| w.iter().any(|x| !x.is_finite()))
        {
            return Err(self.invalid(format!("vertex {v} has a non-finite bone weight")));
        }

        Ok(())
    }

    fn check_attribute(&self, attribute: &str, len: usize, vertices: usize) -> Result<()> {
        if len != 0 && len != vertices {
            return Err(self.invalid(format!(
                "{attribute} has {len} entries for {vertices} vertices"
            )));
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> OrreryError {
        OrreryError::InvalidMesh {
            mesh: self.name.clone(),
            reason,
        }
    }
}

// ============================================================================
// 2. Importer Boundary
// ============================================================================

/// Turns a model file into mesh records.
pub trait Importer {
    fn import(&self, path: &Path) -> Result<Vec<MeshRecord>>;
}

/// On-disk layout read by [`JsonImporter`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(default)]
    pub meshes: Vec<MeshRecord>,
}

/// Reads `{"meshes": [MeshRecord, ...]}` JSON model files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonImporter;

impl JsonImporter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn parse(text: &str) -> Result<Vec<MeshRecord>> {
        let model: ModelFile = serde_json::from_str(text)?;
        Ok(model.meshes)
    }
}

impl Importer for JsonImporter {
    fn import(&self, path: &Path) -> Result<Vec<MeshRecord>> {
        if !path.exists() {
            return Err(OrreryError::AssetNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let meshes = Self::parse(&text)?;
        log::debug!("Imported {} meshes from {}", meshes.len(), path.display());
        Ok(meshes)
    }
}
