//! Scene registry.
//!
//! A [`Universe`] owns every live [`Body`] and is passed explicitly to
//! whatever spawns or removes them. Spawning imports a model, uploads its
//! geometry, builds meshes and animators, and starts the body. Removal stops
//! every ticker the body owns before releasing its geometry.

use std::path::Path;
use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

use crate::animation::animator::Animator;
use crate::animation::clip::AnimationClip;
use crate::animation::pose::PoseEvaluator;
use crate::assets::{Importer, MeshRecord};
use crate::errors::{OrreryError, Result};
use crate::renderer::{GeometryHandle, Program, RenderBackend, TextureHandle};
use crate::settings::EngineSettings;

use super::body::Body;
use super::mesh::Mesh;

new_key_type! {
    pub struct BodyKey;
}

/// How to build a body from a model file.
#[derive(Debug, Clone, Default)]
pub struct BodyDesc {
    pub program: Program,
    /// Either empty or one texture per imported mesh, in import order.
    pub textures: Vec<TextureHandle>,
}

impl BodyDesc {
    #[must_use]
    pub fn new(program: Program) -> Self {
        Self {
            program,
            textures: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_textures(mut self, textures: Vec<TextureHandle>) -> Self {
        self.textures = textures;
        self
    }
}

/// A spawned body and the key it is registered under.
#[derive(Debug, Clone)]
pub struct BodyHandle {
    pub key: BodyKey,
    pub body: Arc<Body>,
}

/// Everything needed to build one mesh, checked before anything is uploaded.
struct MeshPlan<'a> {
    record: &'a MeshRecord,
    texture: Option<TextureHandle>,
    evaluator: Option<PoseEvaluator>,
}

pub struct Universe {
    settings: EngineSettings,
    bodies: SlotMap<BodyKey, Arc<Body>>,
}

impl Universe {
    pub fn new(settings: EngineSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            bodies: SlotMap::with_key(),
        })
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Imports `path` and registers a running body built from it.
    ///
    /// Fails without registering anything when the model is invalid, the
    /// texture count does not match the mesh count, a skinned mesh has no
    /// clips, or the backend rejects an upload. Geometry uploaded before the
    /// failure is released again.
    pub fn spawn_body(
        &mut self,
        path: impl AsRef<Path>,
        desc: &BodyDesc,
        importer: &dyn Importer,
        backend: &mut dyn RenderBackend,
    ) -> Result<BodyHandle> {
        let path = path.as_ref();
        let records = importer.import(path)?;
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());

        let plans = self.plan_meshes(&records, desc)?;

        let mut uploaded: Vec<GeometryHandle> = Vec::with_capacity(plans.len());
        let built = self.build_body(&name, plans, desc.program, backend, &mut uploaded);
        let body = match built {
            Ok(body) => body,
            Err(e) => {
                for geometry in uploaded {
                    backend.release(geometry);
                }
                log::warn!("Failed to spawn '{name}': {e}");
                return Err(e);
            }
        };

        if let Err(e) = body.start() {
            if let Err(close_err) = body.close() {
                log::warn!("Closing '{name}' after failed start: {close_err}");
            }
            for mesh in body.meshes() {
                backend.release(mesh.geometry());
            }
            return Err(e);
        }

        let key = self.bodies.insert(Arc::clone(&body));
        log::info!(
            "Spawned body '{name}' ({} meshes, {} animators)",
            body.meshes().len(),
            body.animators().len()
        );
        Ok(BodyHandle { key, body })
    }

    /// Registers an already built body as-is (it is not started).
    pub fn insert_body(&mut self, body: Arc<Body>) -> BodyKey {
        self.bodies.insert(body)
    }

    #[must_use]
    pub fn body(&self, key: BodyKey) -> Option<&Arc<Body>> {
        self.bodies.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: BodyKey) -> bool {
        self.bodies.contains_key(key)
    }

    /// Unregisters and closes the body, then releases its geometry. Returns
    /// once none of its tickers is running, except when called from that
    /// body's own integrator thread (see [`Body::close`]).
    pub fn remove_body(&mut self, key: BodyKey, backend: &mut dyn RenderBackend) -> Result<()> {
        let body = self.bodies.remove(key).ok_or(OrreryError::BodyNotFound)?;
        let closed = body.close();
        for mesh in body.meshes() {
            backend.release(mesh.geometry());
        }
        log::info!("Removed body '{}'", body.name());
        closed
    }

    /// Removes every body.
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) -> Result<()> {
        let keys: Vec<BodyKey> = self.bodies.keys().collect();
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.remove_body(key, backend) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyKey, &Arc<Body>)> {
        self.bodies.iter()
    }

    /// Draws every body.
    pub fn draw(&self, backend: &mut dyn RenderBackend) {
        for body in self.bodies.values() {
            body.draw(backend);
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    fn plan_meshes<'a>(
        &self,
        records: &'a [MeshRecord],
        desc: &BodyDesc,
    ) -> Result<Vec<MeshPlan<'a>>> {
        if !desc.textures.is_empty() && desc.textures.len() != records.len() {
            return Err(OrreryError::TextureCountMismatch {
                textures: desc.textures.len(),
                meshes: records.len(),
            });
        }

        records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                record.validate()?;
                let evaluator = if desc.program == Program::Skinned && record.is_skinned() {
                    Some(self.plan_skin(record)?)
                } else {
                    None
                };
                Ok(MeshPlan {
                    record,
                    texture: desc.textures.get(i).copied(),
                    evaluator,
                })
            })
            .collect()
    }

    fn plan_skin(&self, record: &MeshRecord) -> Result<PoseEvaluator> {
        if record.clips.is_empty() {
            return Err(OrreryError::EmptyClipData(record.name.clone()));
        }
        let skeleton = Arc::new(record.skeleton()?);
        let clips: Vec<Arc<AnimationClip>> = record.clips.iter().cloned().map(Arc::new).collect();
        PoseEvaluator::new(skeleton, &clips, self.settings.animation)
    }

    fn build_body(
        &self,
        name: &str,
        plans: Vec<MeshPlan<'_>>,
        program: Program,
        backend: &mut dyn RenderBackend,
        uploaded: &mut Vec<GeometryHandle>,
    ) -> Result<Arc<Body>> {
        let interval = self.settings.refresh_interval();

        for plan in &plans {
            uploaded.push(backend.upload(plan.record)?);
        }

        let mut meshes = Vec::with_capacity(plans.len());
        let mut animators = Vec::new();
        for (plan, &geometry) in plans.into_iter().zip(uploaded.iter()) {
            let bone_count = plan.evaluator.as_ref().map_or(0, |e| e.skeleton().len());
            let mesh = Arc::new(Mesh::new(
                plan.record.name.clone(),
                geometry,
                plan.texture,
                program,
                bone_count,
            ));
            if let Some(evaluator) = plan.evaluator {
                animators.push(Animator::new(evaluator, Arc::clone(&mesh), interval)?);
            }
            meshes.push(mesh);
        }

        Body::new(name, meshes, animators, interval)
    }
}

impl std::fmt::Debug for Universe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Universe")
            .field("settings", &self.settings)
            .field("bodies", &self.bodies.len())
            .finish()
    }
}
