use std::sync::{Arc, Weak};

use glam::{Mat4, Quat, Vec3};
use parking_lot::Mutex;

use crate::errors::Result;
use crate::physics::integrator::checked_rotation;
use crate::settings::ChaseCamSettings;

use super::body::Body;
use super::observer::BodyObserver;

/// A view matrix and the eye position it was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub view: Mat4,
    pub eye: Vec3,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            eye: Vec3::ZERO,
        }
    }
}

#[derive(Debug)]
struct ChaseState {
    /// Offset in the target's frame.
    location: Vec3,
    /// Orbits `location` around the target.
    rotation: Quat,
    view: CameraView,
}

/// Camera that keeps a fixed offset from a body and looks ahead of it.
///
/// The camera registers itself as an observer of its target and recomputes
/// its view on every notification:
///
/// ```text
/// anchor = T(target.location) · R(target.rotation)
/// eye    = anchor · R(rotation) · location
/// center = anchor · (0, 0, look_ahead)
/// view   = look_at_rh(eye, center, +Y)
/// ```
///
/// Call [`remove`](Self::remove) when the camera is no longer needed.
pub struct ChaseCam {
    target: Weak<Body>,
    look_ahead: f32,
    state: Mutex<ChaseState>,
}

impl ChaseCam {
    pub fn new(target: &Arc<Body>, offset: Vec3, settings: ChaseCamSettings) -> Result<Arc<Self>> {
        let cam = Arc::new(Self {
            target: Arc::downgrade(target),
            look_ahead: settings.look_ahead,
            state: Mutex::new(ChaseState {
                location: offset,
                rotation: Quat::IDENTITY,
                view: CameraView::default(),
            }),
        });
        target.add_observer(&cam)?;
        cam.refresh_from(target);
        Ok(cam)
    }

    /// Stops following the target.
    pub fn remove(&self) {
        if let Some(target) = self.target.upgrade() {
            target.remove_observer(self);
        }
    }

    #[must_use]
    pub fn view(&self) -> CameraView {
        self.state.lock().view
    }

    #[must_use]
    pub fn location(&self) -> Vec3 {
        self.state.lock().location
    }

    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.state.lock().rotation
    }

    pub fn set_location(&self, location: Vec3) {
        self.state.lock().location = location;
        self.refresh();
    }

    pub fn translate(&self, offset: Vec3) {
        self.state.lock().location += offset;
        self.refresh();
    }

    pub fn set_rotation(&self, rotation: Quat) -> Result<()> {
        let rotation = checked_rotation(rotation)?;
        self.state.lock().rotation = rotation;
        self.refresh();
        Ok(())
    }

    pub fn rotate(&self, offset: Quat) -> Result<()> {
        let offset = checked_rotation(offset)?;
        {
            let mut state = self.state.lock();
            state.rotation = (state.rotation * offset).normalize();
        }
        self.refresh();
        Ok(())
    }

    fn refresh(&self) {
        if let Some(target) = self.target.upgrade() {
            self.refresh_from(&target);
        }
    }

    fn refresh_from(&self, target: &Body) {
        let anchor = target.world_transform();
        let mut state = self.state.lock();

        let eye = anchor.transform_point3(state.rotation * state.location);
        let center = anchor.transform_point3(Vec3::new(0.0, 0.0, self.look_ahead));

        // Looking straight along +Y (or at the eye itself) has no defined
        // view; keep the last good one.
        let forward = center - eye;
        if forward.length_squared() < 1e-12
            || forward.normalize().cross(Vec3::Y).length_squared() < 1e-12
        {
            log::trace!("Chase camera view degenerate, keeping previous");
            return;
        }

        state.view = CameraView {
            view: Mat4::look_at_rh(eye, center, Vec3::Y),
            eye,
        };
    }
}

impl BodyObserver for ChaseCam {
    fn body_translated(&self, body: &Body) {
        self.refresh_from(body);
    }

    fn body_rotated(&self, body: &Body) {
        self.refresh_from(body);
    }
}

impl std::fmt::Debug for ChaseCam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaseCam")
            .field("look_ahead", &self.look_ahead)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
