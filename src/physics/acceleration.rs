use std::sync::{Arc, Weak};
use std::time::Duration;

use glam::Vec3;
use parking_lot::Mutex;

use crate::errors::{OrreryError, Result};
use crate::scene::body::Body;
use crate::utils::ticker::{Ticker, TickerState};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rates {
    /// Body-local, units / s².
    linear: Vec3,
    /// Body-local axis × rad / s².
    angular: Vec3,
}

/// A constant acceleration expressed in a body's own frame.
///
/// While running, every tick adds `rotation * (linear * dt)` to the body's
/// velocity and `rotation * (angular * dt)` to its angular velocity. Pausing
/// only stops the contribution: the body keeps whatever velocity it gained
/// and keeps integrating it.
///
/// The body is held weakly; once it is gone ticks do nothing.
pub struct Acceleration {
    body: Weak<Body>,
    rates: Arc<Mutex<Rates>>,
    ticker: Ticker,
}

impl Acceleration {
    /// Created paused.
    pub fn new(body: &Arc<Body>, linear: Vec3, angular: Vec3, interval: Duration) -> Result<Self> {
        let rates = Arc::new(Mutex::new(Rates { linear, angular }));
        let weak = Arc::downgrade(body);

        let ticker = {
            let rates = Arc::clone(&rates);
            let weak = weak.clone();
            Ticker::new(format!("accel:{}", body.name()), interval, move |dt| {
                let rates = *rates.lock();
                apply_rates(&weak, rates, dt);
            })?
        };

        Ok(Self {
            body: weak,
            rates,
            ticker,
        })
    }

    /// Purely linear acceleration.
    pub fn linear(body: &Arc<Body>, linear: Vec3, interval: Duration) -> Result<Self> {
        Self::new(body, linear, Vec3::ZERO, interval)
    }

    /// Purely angular acceleration.
    pub fn angular(body: &Arc<Body>, angular: Vec3, interval: Duration) -> Result<Self> {
        Self::new(body, Vec3::ZERO, angular, interval)
    }

    #[must_use]
    pub fn linear_rate(&self) -> Vec3 {
        self.rates.lock().linear
    }

    #[must_use]
    pub fn angular_rate(&self) -> Vec3 {
        self.rates.lock().angular
    }

    pub fn set_linear_rate(&self, linear: Vec3) {
        self.rates.lock().linear = linear;
    }

    pub fn set_angular_rate(&self, angular: Vec3) {
        self.rates.lock().angular = angular;
    }

    #[must_use]
    pub fn state(&self) -> TickerState {
        self.ticker.state()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == TickerState::Running
    }

    pub fn start(&self) -> Result<()> {
        self.ticker.start()
    }

    pub fn pause(&self) -> Result<()> {
        self.ticker.stop()
    }

    /// One contribution of `dt` seconds, applied synchronously.
    pub fn apply(&self, dt: f32) -> Result<()> {
        let rates = *self.rates.lock();
        let body = self.body.upgrade().ok_or(OrreryError::BodyNotFound)?;
        accelerate(&body, rates, dt)
    }

    /// Stops the ticker and waits for its thread.
    pub fn destroy(self) -> Result<()> {
        self.ticker.close()
    }
}

impl std::fmt::Debug for Acceleration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acceleration")
            .field("rates", &*self.rates.lock())
            .field("ticker", &self.ticker)
            .finish_non_exhaustive()
    }
}

fn apply_rates(body: &Weak<Body>, rates: Rates, dt: f32) {
    let Some(body) = body.upgrade() else {
        return;
    };
    if let Err(e) = accelerate(&body, rates, dt) {
        log::trace!("Acceleration on '{}' skipped: {e}", body.name());
    }
}

fn accelerate(body: &Body, rates: Rates, dt: f32) -> Result<()> {
    body.update_kinematics(|state| {
        let rotation = state.orientation();
        state.velocity += rotation * (rates.linear * dt);
        state.angular_velocity += rotation * (rates.angular * dt);
    })
}
