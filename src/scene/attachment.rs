use std::sync::{Arc, Weak};

use glam::Vec3;
use parking_lot::Mutex;

use crate::errors::Result;

use super::body::Body;
use super::observer::BodyObserver;

/// Carriers further away than this cannot pick an attachment up.
pub const DEFAULT_PICKUP_RADIUS: f32 = 10.0;

/// Where a carried attachment sits, in the carrier's frame.
pub const DEFAULT_CARRY_OFFSET: Vec3 = Vec3::new(0.0, 0.0, -1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupOutcome {
    PickedUp,
    SetDown,
    OutOfRange,
}

/// A body that can be picked up and carried by another body.
///
/// While carried it observes the carrier and, on every carrier notification,
/// moves to `carrier ⊕ offset` and takes the carrier's rotation.
pub struct Attachment {
    body: Arc<Body>,
    offset: Vec3,
    pickup_radius: f32,
    carrier: Mutex<Option<Weak<Body>>>,
}

impl Attachment {
    #[must_use]
    pub fn new(body: Arc<Body>) -> Arc<Self> {
        Self::with_geometry(body, DEFAULT_CARRY_OFFSET, DEFAULT_PICKUP_RADIUS)
    }

    #[must_use]
    pub fn with_geometry(body: Arc<Body>, offset: Vec3, pickup_radius: f32) -> Arc<Self> {
        Arc::new(Self {
            body,
            offset,
            pickup_radius,
            carrier: Mutex::new(None),
        })
    }

    #[inline]
    #[must_use]
    pub fn body(&self) -> &Arc<Body> {
        &self.body
    }

    #[must_use]
    pub fn carrier(&self) -> Option<Arc<Body>> {
        self.carrier.lock().as_ref().and_then(Weak::upgrade)
    }

    #[must_use]
    pub fn is_carried(&self) -> bool {
        self.carrier().is_some()
    }

    /// Toggles carrying. Within `pickup_radius` of `carrier` this picks the
    /// attachment up, or sets it down if it is already being carried.
    pub fn pick_up(self: &Arc<Self>, carrier: &Arc<Body>) -> Result<PickupOutcome> {
        let distance = carrier.location().distance(self.body.location());
        if distance >= self.pickup_radius {
            log::debug!("'{}' out of pickup range ({distance:.2})", self.body.name());
            return Ok(PickupOutcome::OutOfRange);
        }

        if self.set_down() {
            return Ok(PickupOutcome::SetDown);
        }

        carrier.add_observer(self)?;
        *self.carrier.lock() = Some(Arc::downgrade(carrier));
        self.follow(carrier);
        log::debug!("'{}' picked up by '{}'", self.body.name(), carrier.name());
        Ok(PickupOutcome::PickedUp)
    }

    /// Stops following the current carrier. Returns `false` if not carried.
    pub fn set_down(&self) -> bool {
        let Some(previous) = self.carrier.lock().take() else {
            return false;
        };
        if let Some(carrier) = previous.upgrade() {
            carrier.remove_observer(self);
            log::debug!("'{}' set down by '{}'", self.body.name(), carrier.name());
        }
        true
    }

    fn follow(&self, carrier: &Body) {
        let rotation = carrier.rotation();
        let location = carrier.world_transform().transform_point3(self.offset);
        let moved = self
            .body
            .set_rotation(rotation)
            .and_then(|()| self.body.set_location(location));
        if let Err(e) = moved {
            log::debug!("'{}' cannot follow '{}': {e}", self.body.name(), carrier.name());
        }
    }
}

impl BodyObserver for Attachment {
    fn body_translated(&self, body: &Body) {
        self.follow(body);
    }

    fn body_rotated(&self, body: &Body) {
        self.follow(body);
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("body", &self.body.name())
            .field("offset", &self.offset)
            .field("pickup_radius", &self.pickup_radius)
            .field("carried", &self.is_carried())
            .finish()
    }
}
