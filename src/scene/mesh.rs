use glam::{Mat4, Quat, Vec3};
use parking_lot::{Mutex, RwLock};

use crate::renderer::{DrawCall, GeometryHandle, Program, RenderBackend, TextureHandle};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    location: Vec3,
    rotation: Quat,
}

/// Render state of one mesh: uploaded handles, the world placement pushed in
/// by its body, and the skinning matrices written by its animator.
///
/// The bone buffer is only ever replaced whole, under its lock, so a draw
/// never sees a partially written pose.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    geometry: GeometryHandle,
    texture: Option<TextureHandle>,
    program: Program,

    placement: RwLock<Placement>,
    bones: Mutex<Vec<Mat4>>,
}

impl Mesh {
    /// `bone_count` identity matrices are allocated up front; rigid meshes
    /// pass zero.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        geometry: GeometryHandle,
        texture: Option<TextureHandle>,
        program: Program,
        bone_count: usize,
    ) -> Self {
        Self {
            name: name.into(),
            geometry,
            texture,
            program,
            placement: RwLock::new(Placement {
                location: Vec3::ZERO,
                rotation: Quat::IDENTITY,
            }),
            bones: Mutex::new(vec![Mat4::IDENTITY; bone_count]),
        }
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> GeometryHandle {
        self.geometry
    }

    #[inline]
    #[must_use]
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    #[inline]
    #[must_use]
    pub fn program(&self) -> Program {
        self.program
    }

    pub fn set_transform(&self, location: Vec3, rotation: Quat) {
        *self.placement.write() = Placement { location, rotation };
    }

    #[must_use]
    pub fn location(&self) -> Vec3 {
        self.placement.read().location
    }

    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.placement.read().rotation
    }

    /// `T(location) · R(rotation)`.
    #[must_use]
    pub fn world_transform(&self) -> Mat4 {
        let p = *self.placement.read();
        Mat4::from_rotation_translation(p.rotation, p.location)
    }

    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.lock().len()
    }

    #[must_use]
    pub fn is_skinned(&self) -> bool {
        self.bone_count() > 0
    }

    /// Exchanges the bone buffer with `pose` in one step. `pose` receives the
    /// previous matrices and can be reused as the next off-screen buffer.
    pub fn swap_bone_matrices(&self, pose: &mut Vec<Mat4>) {
        std::mem::swap(&mut *self.bones.lock(), pose);
    }

    /// Runs `f` on the bone buffer while holding its lock.
    pub fn with_bone_matrices<R>(&self, f: impl FnOnce(&[Mat4]) -> R) -> R {
        f(&self.bones.lock())
    }

    #[must_use]
    pub fn bone_matrices(&self) -> Vec<Mat4> {
        self.bones.lock().clone()
    }

    /// Issues one draw call with the current placement and pose.
    pub fn draw(&self, backend: &mut dyn RenderBackend) {
        let world = self.world_transform();
        let program = self.program;
        self.with_bone_matrices(|bones| {
            let skinned = program == Program::Skinned && !bones.is_empty();
            backend.draw(&DrawCall {
                geometry: self.geometry,
                texture: self.texture,
                program,
                world,
                bones: skinned.then_some(bones),
            });
        });
    }
}
