//! Clock driver: one tick per second while a phase runs.
//!
//! The driver only schedules and cancels. Each run is stamped with an
//! epoch; the engine drops ticks whose epoch is no longer current, so a
//! tick already in flight when `stop()` lands cannot touch the next run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Callback invoked on every tick of a scheduled run.
pub type TickFn = Arc<dyn Fn() + Send + Sync>;

/// Receives the epoch of the run that produced a tick.
pub type TickSink = Arc<dyn Fn(u64) + Send + Sync>;

/// Cancellable handle to a repeating schedule.
pub trait TickHandle: Send {
    fn cancel(&mut self);
}

/// Source of repeating ticks.
pub trait Scheduler: Send {
    fn schedule_repeating(&mut self, period: Duration, tick: TickFn) -> Box<dyn TickHandle>;
}

// ── Tokio ────────────────────────────────────────────────────────────

/// Ticks from a tokio interval task.
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime the caller is running on.
    ///
    /// # Errors
    /// Fails when called outside a tokio runtime.
    pub fn current() -> Result<Self, tokio::runtime::TryCurrentError> {
        Ok(Self::new(Handle::try_current()?))
    }
}

struct TokioTickHandle {
    task: Option<JoinHandle<()>>,
}

impl TickHandle for TokioTickHandle {
    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TokioTickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&mut self, period: Duration, tick: TickFn) -> Box<dyn TickHandle> {
        let task = self.handle.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick();
            }
        });
        Box::new(TokioTickHandle { task: Some(task) })
    }
}

// ── Manual ───────────────────────────────────────────────────────────

/// Fake clock advanced by hand. Clones share the same schedule.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    slot: Arc<Mutex<Option<(u64, TickFn)>>>,
    next_id: Arc<AtomicU64>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_scheduled(&self) -> bool {
        self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Deliver up to `ticks` ticks, stopping early if the run is
    /// cancelled. Returns how many were delivered.
    pub fn advance(&self, ticks: u64) -> u64 {
        let mut delivered = 0;
        for _ in 0..ticks {
            // The callback may cancel this schedule, so never hold the slot lock across it.
            let tick = match self.slot.lock() {
                Ok(slot) => slot.as_ref().map(|(_, f)| Arc::clone(f)),
                Err(_) => None,
            };
            match tick {
                Some(tick) => {
                    tick();
                    delivered += 1;
                }
                None => break,
            }
        }
        delivered
    }
}

struct ManualTickHandle {
    id: u64,
    slot: Arc<Mutex<Option<(u64, TickFn)>>>,
}

impl TickHandle for ManualTickHandle {
    fn cancel(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            if slot.as_ref().is_some_and(|(id, _)| *id == self.id) {
                *slot = None;
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&mut self, _period: Duration, tick: TickFn) -> Box<dyn TickHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some((id, tick));
        }
        Box::new(ManualTickHandle {
            id,
            slot: Arc::clone(&self.slot),
        })
    }
}

// ── Driver ───────────────────────────────────────────────────────────

pub struct ClockDriver {
    scheduler: Box<dyn Scheduler>,
    sink: TickSink,
    handle: Option<Box<dyn TickHandle>>,
    epoch: u64,
}

impl ClockDriver {
    pub fn new(scheduler: Box<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            sink: Arc::new(|_| {}),
            handle: None,
            epoch: 0,
        }
    }

    /// Route ticks of future runs to `sink`.
    pub fn connect(&mut self, sink: TickSink) {
        self.sink = sink;
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Epoch of the current (or most recent) run.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Begin ticking. No-op when already running.
    pub fn start(&mut self) -> Option<u64> {
        if self.handle.is_some() {
            return None;
        }
        self.epoch += 1;
        let epoch = self.epoch;
        let sink = Arc::clone(&self.sink);
        let tick: TickFn = Arc::new(move || sink(epoch));
        self.handle = Some(self.scheduler.schedule_repeating(TICK_PERIOD, tick));
        Some(epoch)
    }

    /// Stop ticking. Returns false when nothing was running.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(mut handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }
}

impl Drop for ClockDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ClockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockDriver")
            .field("running", &self.is_running())
            .field("epoch", &self.epoch)
            .finish()
    }
}
