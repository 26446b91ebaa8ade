//! Periodic Scheduler
//!
//! A [`Ticker`] calls its target once per interval on a dedicated worker
//! thread. It starts out stopped, can be started and paused any number of
//! times from any thread, and must eventually be closed (dropping it closes it
//! too).
//!
//! Control messages travel over a zero-capacity channel, so [`Ticker::start`]
//! and [`Ticker::stop`] only return once the worker has taken the transition.
//! A callback therefore never runs after `stop` returns, and [`Ticker::close`]
//! joins the worker before returning.
//!
//! ```rust,ignore
//! let ticker = Ticker::new("integrator", Duration::from_millis(16), |dt| {
//!     body.integrate(dt);
//! })?;
//! ticker.start()?;
//! // ...
//! ticker.close()?;
//! ```

use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::errors::{OrreryError, Result};

/// Lifecycle state of a [`Ticker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerState {
    /// Never started; the target has not been called.
    Stopped,
    /// Calling the target once per interval.
    Running,
    /// Suspended; resumes with the remainder of the interrupted interval.
    Paused,
    /// Terminated; the worker thread has exited.
    Closed,
}

enum Control {
    Start,
    Stop,
    Close,
}

struct Channel {
    sender: Option<Sender<Control>>,
    worker: Option<JoinHandle<()>>,
}

/// Cancellable, pausable fixed-interval invoker backed by one thread.
pub struct Ticker {
    name: String,
    interval: Duration,
    worker_id: ThreadId,
    /// Serializes transitions and is held across the rendezvous. Nothing a
    /// callback may call takes it.
    channel: Mutex<Channel>,
    /// Committed after the worker accepted the transition. Only ever held
    /// briefly, so `state()` is safe from inside the callback.
    state: Mutex<TickerState>,
}

impl Ticker {
    /// Spawns the worker thread. The ticker is [`TickerState::Stopped`] until
    /// [`start`](Self::start) is called.
    ///
    /// `target` receives the active time (seconds) since its previous call;
    /// time spent paused is not counted.
    pub fn new<F>(name: impl Into<String>, interval: Duration, target: F) -> Result<Self>
    where
        F: FnMut(f32) + Send + 'static,
    {
        let name = name.into();
        if interval.is_zero() {
            return Err(OrreryError::InvalidSettings(format!(
                "ticker '{name}' needs a positive interval"
            )));
        }

        let (sender, receiver) = flume::bounded(0);
        let worker = thread::Builder::new()
            .name(format!("ticker:{name}"))
            .spawn(move || run_worker(interval, &receiver, target))
            .map_err(|e| OrreryError::TickerSpawn(e.to_string()))?;
        let worker_id = worker.thread().id();

        log::debug!("Ticker '{name}' spawned ({interval:?})");

        Ok(Self {
            name,
            interval,
            worker_id,
            channel: Mutex::new(Channel {
                sender: Some(sender),
                worker: Some(worker),
            }),
            state: Mutex::new(TickerState::Stopped),
        })
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Last committed state. While another thread is inside `start` / `stop`
    /// this still reports the state from before that call.
    #[must_use]
    pub fn state(&self) -> TickerState {
        *self.state.lock()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == TickerState::Closed
    }

    /// Starts (or resumes) ticking. No-op when already running.
    pub fn start(&self) -> Result<()> {
        self.transition(TickerState::Running, Control::Start)
    }

    /// Pauses ticking. No-op when not running.
    pub fn stop(&self) -> Result<()> {
        self.transition(TickerState::Paused, Control::Stop)
    }

    /// Permanently stops the ticker and waits for its worker thread to exit.
    ///
    /// A callback already in progress finishes first. Closing twice returns
    /// [`OrreryError::TickerClosed`].
    pub fn close(&self) -> Result<()> {
        self.guard_reentrant()?;

        let (sender, worker) = {
            let mut channel = self.channel.lock();
            let mut state = self.state.lock();
            if *state == TickerState::Closed {
                return Err(OrreryError::TickerClosed(self.name.clone()));
            }
            *state = TickerState::Closed;
            (channel.sender.take(), channel.worker.take())
        };

        if let Some(sender) = sender {
            // Err means the worker is already gone (its target panicked).
            let _ = sender.send(Control::Close);
        }
        if let Some(worker) = worker
            && worker.join().is_err()
        {
            log::error!("Ticker '{}' worker panicked", self.name);
        }

        log::debug!("Ticker '{}' closed", self.name);
        Ok(())
    }

    fn transition(&self, target: TickerState, message: Control) -> Result<()> {
        self.guard_reentrant()?;

        let channel = self.channel.lock();
        match (self.state(), target) {
            (TickerState::Closed, _) => {
                return Err(OrreryError::TickerClosed(self.name.clone()));
            }
            (current, wanted) if current == wanted => return Ok(()),
            // Nothing to pause.
            (TickerState::Stopped, TickerState::Paused) => return Ok(()),
            _ => {}
        }

        let sender = channel
            .sender
            .as_ref()
            .ok_or_else(|| OrreryError::TickerClosed(self.name.clone()))?;
        // Blocks until the worker is between callbacks.
        sender
            .send(message)
            .map_err(|_| OrreryError::TickerClosed(self.name.clone()))?;
        *self.state.lock() = target;
        Ok(())
    }

    fn guard_reentrant(&self) -> Result<()> {
        if self.on_worker_thread() {
            return Err(OrreryError::TickerReentrant(self.name.clone()));
        }
        Ok(())
    }

    fn on_worker_thread(&self) -> bool {
        thread::current().id() == self.worker_id
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if *state == TickerState::Closed {
            return;
        }
        *state = TickerState::Closed;

        let on_worker = self.on_worker_thread();
        let channel = self.channel.get_mut();
        let sender = channel.sender.take();
        let worker = channel.worker.take();

        if on_worker {
            // Dropped from inside our own callback: disconnecting ends the
            // loop once the callback returns. Joining would wait on ourselves.
            drop(sender);
            drop(worker);
            return;
        }

        if let Some(sender) = sender {
            let _ = sender.send(Control::Close);
        }
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn run_worker<F: FnMut(f32)>(interval: Duration, control: &Receiver<Control>, mut target: F) {
    let mut clock = TickClock::new(interval, Instant::now());

    loop {
        let message = match clock.deadline() {
            Some(deadline) => match control.recv_deadline(deadline) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => {
                    let elapsed = clock.begin_tick(Instant::now());
                    target(elapsed);
                    clock.end_tick(Instant::now());
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match control.recv() {
                Ok(message) => message,
                Err(_) => break,
            },
        };

        match message {
            Control::Start => clock.resume(Instant::now()),
            Control::Stop => clock.pause(Instant::now()),
            Control::Close => break,
        }
    }
}

// ---------------------------------------------------------------------------
// TickClock
// ---------------------------------------------------------------------------

/// Deadline bookkeeping for the worker loop, kept free of threads so it can be
/// driven with synthetic instants.
#[derive(Debug, Clone)]
struct TickClock {
    interval: Duration,
    running: bool,
    /// Reference point for the next `elapsed`; shifted forward over pauses.
    last_tick: Instant,
    /// Deadline of the next tick while running.
    next: Instant,
    /// Time left until the next tick while paused.
    remaining: Duration,
    /// Active time since the previous tick while paused.
    carried: Duration,
}

impl TickClock {
    fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            running: false,
            last_tick: now,
            next: now + interval,
            remaining: interval,
            carried: Duration::ZERO,
        }
    }

    fn deadline(&self) -> Option<Instant> {
        self.running.then_some(self.next)
    }

    fn resume(&mut self, now: Instant) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_tick = now.checked_sub(self.carried).unwrap_or(now);
        self.next = now + self.remaining;
    }

    fn pause(&mut self, now: Instant) {
        if !self.running {
            return;
        }
        self.running = false;
        self.carried = now.saturating_duration_since(self.last_tick);
        self.remaining = self.next.saturating_duration_since(now);
    }

    /// Returns the active seconds since the previous tick.
    fn begin_tick(&mut self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        elapsed.as_secs_f32()
    }

    /// Schedules from the deadline that just fired, not from when the callback
    /// returned. An overrun fires once immediately instead of bursting.
    fn end_tick(&mut self, now: Instant) {
        let next = self.next + self.interval;
        self.next = if next > now { next } else { now };
    }
}
