use glam::{Mat4, Quat, Vec3};
use parking_lot::RwLock;

use crate::errors::Result;
use crate::physics::integrator::checked_rotation;

use super::chase_cam::CameraView;

#[derive(Debug, Clone, Copy)]
struct Placement {
    location: Vec3,
    rotation: Quat,
}

/// Unattached camera. `location` and `rotation` are applied to the world, so
/// the view matrix is `R(rotation) · T(location)`.
#[derive(Debug)]
pub struct FreeCam {
    placement: RwLock<Placement>,
}

impl Default for FreeCam {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

impl FreeCam {
    #[must_use]
    pub fn new(location: Vec3, rotation: Quat) -> Self {
        Self {
            placement: RwLock::new(Placement {
                location,
                rotation: checked_rotation(rotation).unwrap_or(Quat::IDENTITY),
            }),
        }
    }

    #[must_use]
    pub fn location(&self) -> Vec3 {
        self.placement.read().location
    }

    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.placement.read().rotation
    }

    pub fn set_location(&self, location: Vec3) {
        self.placement.write().location = location;
    }

    pub fn translate(&self, offset: Vec3) {
        self.placement.write().location += offset;
    }

    pub fn set_rotation(&self, rotation: Quat) -> Result<()> {
        self.placement.write().rotation = checked_rotation(rotation)?;
        Ok(())
    }

    /// Composes `rotation * offset`.
    pub fn rotate(&self, offset: Quat) -> Result<()> {
        let offset = checked_rotation(offset)?;
        let mut placement = self.placement.write();
        placement.rotation = (placement.rotation * offset).normalize();
        Ok(())
    }

    #[must_use]
    pub fn view(&self) -> CameraView {
        let p = *self.placement.read();
        let view = Mat4::from_quat(p.rotation) * Mat4::from_translation(p.location);
        CameraView {
            view,
            eye: view.inverse().transform_point3(Vec3::ZERO),
        }
    }
}
