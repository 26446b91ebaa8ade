//! Kinematic Body
//!
//! A [`Body`] owns a placement (location + rotation), the velocities that move
//! it, the meshes that draw it and the animators that pose those meshes.
//!
//! # Update protocol
//!
//! Every placement change, whether from a caller or from the body's own
//! integrator thread, runs the same sequence:
//!
//! 1. mutate the state under the body lock
//! 2. push the new placement into every mesh (still under the lock)
//! 3. release the lock
//! 4. snapshot the observer set and notify each observer on this thread
//!
//! Observers are never deduplicated by value: setting the same location twice
//! notifies twice.
//!
//! # Lifecycle
//!
//! A body is live from construction until [`Body::close`], which stops the
//! integrator and every animator before returning. Mutating a closed body
//! returns [`OrreryError::BodyClosed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use glam::{Mat4, Quat, Vec3};
use parking_lot::Mutex;

use crate::animation::animator::Animator;
use crate::errors::{OrreryError, Result};
use crate::physics::integrator::{Kinematics, StepOutcome, checked_rotation};
use crate::renderer::RenderBackend;
use crate::utils::ticker::{Ticker, TickerState};

use super::mesh::Mesh;
use super::observer::{BodyObserver, ObserverKey, ObserverSet};

pub struct Body {
    name: String,
    state: Mutex<Kinematics>,
    meshes: Vec<Arc<Mesh>>,
    animators: Vec<Animator>,
    observers: ObserverSet,
    /// Taken on close. Cloned out before any blocking call.
    integrator: Mutex<Option<Arc<Ticker>>>,
    closed: AtomicBool,
}

impl Body {
    /// Builds a body at the origin with its integrator ticking every
    /// `interval` once started. Nothing runs until [`start`](Self::start).
    pub fn new(
        name: impl Into<String>,
        meshes: Vec<Arc<Mesh>>,
        animators: Vec<Animator>,
        interval: Duration,
    ) -> Result<Arc<Self>> {
        let body = Arc::new(Self {
            name: name.into(),
            state: Mutex::new(Kinematics::default()),
            meshes,
            animators,
            observers: ObserverSet::default(),
            integrator: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let weak: Weak<Self> = Arc::downgrade(&body);
        let ticker = Ticker::new(format!("body:{}", body.name), interval, move |dt| {
            if let Some(body) = weak.upgrade() {
                body.integrate(dt);
            }
        })?;
        *body.integrator.lock() = Some(Arc::new(ticker));

        body.push_placement(&body.state.lock());
        Ok(body)
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn meshes(&self) -> &[Arc<Mesh>] {
        &self.meshes
    }

    #[inline]
    #[must_use]
    pub fn animators(&self) -> &[Animator] {
        &self.animators
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// State of the integration ticker.
    #[must_use]
    pub fn integrator_state(&self) -> TickerState {
        self.integrator()
            .map_or(TickerState::Closed, |ticker| ticker.state())
    }

    fn integrator(&self) -> Option<Arc<Ticker>> {
        self.integrator.lock().clone()
    }

    // ========================================================================
    // Placement
    // ========================================================================

    #[must_use]
    pub fn location(&self) -> Vec3 {
        self.state.lock().location
    }

    /// Normalized rotation.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.state.lock().orientation()
    }

    /// `T(location) · R(rotation)`.
    #[must_use]
    pub fn world_transform(&self) -> Mat4 {
        let state = self.state.lock();
        Mat4::from_rotation_translation(state.orientation(), state.location)
    }

    pub fn set_location(&self, location: Vec3) -> Result<()> {
        self.mutate_placement(|state| {
            state.location = location;
            translated()
        })
    }

    pub fn translate(&self, offset: Vec3) -> Result<()> {
        self.mutate_placement(|state| {
            state.location += offset;
            translated()
        })
    }

    /// Rejects zero-length and non-finite quaternions.
    pub fn set_rotation(&self, rotation: Quat) -> Result<()> {
        let rotation = checked_rotation(rotation)?;
        self.mutate_placement(|state| {
            state.rotation = rotation;
            rotated()
        })
    }

    /// Composes `rotation * offset`, i.e. `offset` is in the body's frame.
    pub fn rotate(&self, offset: Quat) -> Result<()> {
        let offset = checked_rotation(offset)?;
        self.mutate_placement(|state| {
            state.rotation = (state.orientation() * offset).normalize();
            rotated()
        })
    }

    // ========================================================================
    // Velocities
    // ========================================================================

    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.state.lock().velocity
    }

    #[must_use]
    pub fn angular_velocity(&self) -> Vec3 {
        self.state.lock().angular_velocity
    }

    /// Snapshot of the full physical state.
    #[must_use]
    pub fn kinematics(&self) -> Kinematics {
        *self.state.lock()
    }

    /// Replaces the velocity and its history, so the next step moves by
    /// exactly `velocity * dt`.
    pub fn set_velocity(&self, velocity: Vec3) -> Result<()> {
        self.update_kinematics(|state| {
            state.velocity = velocity;
            state.last_velocity = velocity;
        })
    }

    pub fn add_velocity(&self, delta: Vec3) -> Result<()> {
        self.update_kinematics(|state| state.velocity += delta)
    }

    /// World-frame axis scaled by radians per second. Resets the history like
    /// [`set_velocity`](Self::set_velocity).
    pub fn set_angular_velocity(&self, angular_velocity: Vec3) -> Result<()> {
        self.update_kinematics(|state| {
            state.angular_velocity = angular_velocity;
            state.last_angular_velocity = angular_velocity;
        })
    }

    pub fn add_angular_velocity(&self, delta: Vec3) -> Result<()> {
        self.update_kinematics(|state| state.angular_velocity += delta)
    }

    /// Runs `f` on the state under the body lock. Velocities only; placement
    /// changes go through [`mutate_placement`](Self::mutate_placement).
    pub(crate) fn update_kinematics<R>(&self, f: impl FnOnce(&mut Kinematics) -> R) -> Result<R> {
        self.ensure_open()?;
        Ok(f(&mut self.state.lock()))
    }

    // ========================================================================
    // Integration
    // ========================================================================

    /// One trapezoidal step of `dt` seconds. Called by the integrator ticker;
    /// public for deterministic driving. A closed body does not move.
    pub fn integrate(&self, dt: f32) {
        if self.is_closed() {
            return;
        }
        let outcome = {
            let mut state = self.state.lock();
            let outcome = state.step(dt);
            if outcome.any() {
                self.push_placement(&state);
            }
            outcome
        };
        self.notify(outcome);
    }

    /// Starts the integrator and every animator.
    pub fn start(&self) -> Result<()> {
        self.ensure_open()?;
        if let Some(ticker) = self.integrator() {
            ticker.start()?;
        }
        for animator in &self.animators {
            animator.start()?;
        }
        Ok(())
    }

    /// Pauses the integrator and every animator. Velocities are kept.
    pub fn pause(&self) -> Result<()> {
        self.ensure_open()?;
        if let Some(ticker) = self.integrator() {
            ticker.stop()?;
        }
        for animator in &self.animators {
            animator.pause()?;
        }
        Ok(())
    }

    /// Stops every ticker this body owns and drops all observers. Returns once
    /// no integrator or animator thread is left running. Closing twice is a
    /// no-op.
    ///
    /// Called from the body's own integrator thread (an observer closing the
    /// body it watches), the integrator cannot be joined. It is released
    /// instead and its thread exits as soon as the current step returns.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let integrator = self.integrator.lock().take();
        let integrator = integrator.and_then(|ticker| match ticker.close() {
            Err(OrreryError::TickerReentrant(_)) => {
                log::debug!("Body '{}' closed from its integrator thread", self.name);
                drop(ticker);
                None
            }
            result => Some(result),
        });

        let mut first_error = None;
        let tickers = integrator
            .into_iter()
            .chain(self.animators.iter().map(Animator::close));
        for result in tickers {
            if let Err(e) = result {
                log::warn!("Closing body '{}': {e}", self.name);
                first_error.get_or_insert(e);
            }
        }
        self.observers.clear();

        log::debug!("Body '{}' closed", self.name);
        first_error.map_or(Ok(()), Err)
    }

    // ========================================================================
    // Observers & drawing
    // ========================================================================

    /// Registers `observer` by identity. The body holds it weakly; adding the
    /// same observer twice keeps one registration.
    pub fn add_observer<O: BodyObserver + 'static>(&self, observer: &Arc<O>) -> Result<()> {
        self.ensure_open()?;
        self.observers.insert(observer);
        Ok(())
    }

    /// Returns whether `observer` was registered.
    pub fn remove_observer(&self, observer: &dyn BodyObserver) -> bool {
        self.observers.remove(ObserverKey::of(observer))
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Issues one draw call per mesh. A closed body draws nothing.
    pub fn draw(&self, backend: &mut dyn RenderBackend) {
        if self.is_closed() {
            return;
        }
        for mesh in &self.meshes {
            mesh.draw(backend);
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(OrreryError::BodyClosed);
        }
        Ok(())
    }

    fn mutate_placement(&self, f: impl FnOnce(&mut Kinematics) -> StepOutcome) -> Result<()> {
        self.ensure_open()?;
        let outcome = {
            let mut state = self.state.lock();
            let outcome = f(&mut state);
            self.push_placement(&state);
            outcome
        };
        self.notify(outcome);
        Ok(())
    }

    fn push_placement(&self, state: &Kinematics) {
        let rotation = state.orientation();
        for mesh in &self.meshes {
            mesh.set_transform(state.location, rotation);
        }
    }

    fn notify(&self, outcome: StepOutcome) {
        if !outcome.any() {
            return;
        }
        for observer in self.observers.snapshot() {
            if outcome.translated {
                observer.body_translated(self);
            }
            if outcome.rotated {
                observer.body_rotated(self);
            }
        }
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body")
            .field("name", &self.name)
            .field("state", &*self.state.lock())
            .field("meshes", &self.meshes.len())
            .field("animators", &self.animators.len())
            .field("observers", &self.observers)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn translated() -> StepOutcome {
    StepOutcome {
        translated: true,
        rotated: false,
    }
}

fn rotated() -> StepOutcome {
    StepOutcome {
        translated: false,
        rotated: true,
    }
}
