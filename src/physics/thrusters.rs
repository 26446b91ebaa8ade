use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;

use crate::errors::Result;
use crate::scene::body::Body;
use crate::settings::ThrusterSettings;

use super::acceleration::Acceleration;

/// One of the eight directional thrusters of a [`ThrusterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Thrust {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
    RollLeft,
    RollRight,
}

impl Thrust {
    pub const ALL: [Thrust; 8] = [
        Thrust::Forward,
        Thrust::Back,
        Thrust::Left,
        Thrust::Right,
        Thrust::Up,
        Thrust::Down,
        Thrust::RollLeft,
        Thrust::RollRight,
    ];

    /// Body-local `(linear, angular)` rates of this thruster.
    #[must_use]
    pub fn rates(self, settings: ThrusterSettings) -> (Vec3, Vec3) {
        let l = settings.linear;
        let a = settings.angular;
        match self {
            Thrust::Forward => (Vec3::new(0.0, 0.0, l), Vec3::ZERO),
            Thrust::Back => (Vec3::new(0.0, 0.0, -l), Vec3::ZERO),
            Thrust::Left => (Vec3::new(l, 0.0, 0.0), Vec3::ZERO),
            Thrust::Right => (Vec3::new(-l, 0.0, 0.0), Vec3::ZERO),
            Thrust::Up => (Vec3::new(0.0, l, 0.0), Vec3::ZERO),
            Thrust::Down => (Vec3::new(0.0, -l, 0.0), Vec3::ZERO),
            Thrust::RollLeft => (Vec3::ZERO, Vec3::new(0.0, a, 0.0)),
            Thrust::RollRight => (Vec3::ZERO, Vec3::new(0.0, -a, 0.0)),
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Eight paused accelerations on one body, toggled by [`Thrust`].
#[derive(Debug)]
pub struct ThrusterSet {
    // Indexed by `Thrust as usize`.
    thrusters: Vec<Acceleration>,
}

impl ThrusterSet {
    pub fn new(body: &Arc<Body>, settings: ThrusterSettings, interval: Duration) -> Result<Self> {
        let thrusters = Thrust::ALL
            .iter()
            .map(|thrust| {
                let (linear, angular) = thrust.rates(settings);
                Acceleration::new(body, linear, angular, interval)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { thrusters })
    }

    #[must_use]
    pub fn get(&self, thrust: Thrust) -> &Acceleration {
        &self.thrusters[thrust.index()]
    }

    /// Starts or pauses the matching acceleration.
    pub fn set(&self, thrust: Thrust, enabled: bool) -> Result<()> {
        let acceleration = self.get(thrust);
        if enabled {
            acceleration.start()
        } else {
            acceleration.pause()
        }
    }

    #[must_use]
    pub fn is_enabled(&self, thrust: Thrust) -> bool {
        self.get(thrust).is_running()
    }

    /// Closes all eight tickers. Every one is closed even if an earlier one
    /// fails; the first error is returned.
    pub fn destroy(self) -> Result<()> {
        let mut first_error = None;
        for acceleration in self.thrusters {
            if let Err(e) = acceleration.destroy() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
