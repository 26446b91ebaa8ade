use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::animation::pose::{Pose, PoseEvaluator};
use crate::errors::{OrreryError, Result};
use crate::scene::mesh::Mesh;
use crate::utils::ticker::{Ticker, TickerState};

struct Sampler {
    evaluator: PoseEvaluator,
    /// Off-screen buffer; swapped with the mesh's bone buffer after each pass.
    scratch: Pose,
    epoch: Instant,
    mesh: Arc<Mesh>,
}

impl Sampler {
    fn sample_at(&mut self, time: f64) {
        self.evaluator.evaluate_into(time, &mut self.scratch);
        self.mesh.swap_bone_matrices(&mut self.scratch.skin);
    }

    fn sample_now(&mut self) {
        let time = self.epoch.elapsed().as_secs_f64();
        self.sample_at(time);
    }
}

/// Plays one clip onto one skinned mesh from a background ticker.
///
/// Each tick samples at the wall-clock time since construction, so pausing
/// does not hold the clip in place: playback picks up wherever the clock is
/// when resumed.
pub struct Animator {
    clip_name: String,
    sampler: Arc<Mutex<Sampler>>,
    ticker: Ticker,
}

impl Animator {
    /// The animator starts paused. Fails when `mesh` was not sized for the
    /// evaluator's skeleton.
    pub fn new(evaluator: PoseEvaluator, mesh: Arc<Mesh>, interval: Duration) -> Result<Self> {
        let bones = evaluator.skeleton().len();
        if mesh.bone_count() != bones {
            return Err(OrreryError::InvalidMesh {
                mesh: mesh.name.clone(),
                reason: format!(
                    "bone buffer holds {} matrices, skeleton has {bones} bones",
                    mesh.bone_count()
                ),
            });
        }

        let clip_name = evaluator.clip().name.clone();
        let sampler = Arc::new(Mutex::new(Sampler {
            scratch: Pose::new(bones),
            evaluator,
            epoch: Instant::now(),
            mesh,
        }));

        let ticker = {
            let sampler = Arc::clone(&sampler);
            Ticker::new(format!("animator:{clip_name}"), interval, move |_| {
                sampler.lock().sample_now();
            })?
        };

        Ok(Self {
            clip_name,
            sampler,
            ticker,
        })
    }

    #[inline]
    #[must_use]
    pub fn clip_name(&self) -> &str {
        &self.clip_name
    }

    #[must_use]
    pub fn mesh(&self) -> Arc<Mesh> {
        Arc::clone(&self.sampler.lock().mesh)
    }

    #[must_use]
    pub fn state(&self) -> TickerState {
        self.ticker.state()
    }

    pub fn start(&self) -> Result<()> {
        self.ticker.start()
    }

    pub fn pause(&self) -> Result<()> {
        self.ticker.stop()
    }

    /// Stops sampling for good; returns once the ticker thread has exited.
    pub fn close(&self) -> Result<()> {
        self.ticker.close()
    }

    /// One synchronous sampling pass at the current playback time.
    pub fn sample_now(&self) {
        self.sampler.lock().sample_now();
    }

    /// One synchronous sampling pass at `time` seconds into playback.
    pub fn sample_at(&self, time: f64) {
        self.sampler.lock().sample_at(time);
    }
}

impl std::fmt::Debug for Animator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animator")
            .field("clip", &self.clip_name)
            .field("ticker", &self.ticker)
            .finish_non_exhaustive()
    }
}
