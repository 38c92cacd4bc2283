//! Shared engine runtime.
//!
//! All commands and ticks go through one mutex, so transitions never
//! interleave. The clock's tick callback holds only a weak reference, so
//! dropping the last [`SharedEngine`] drops the engine and cancels any
//! scheduled ticks with it.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::events::Event;
use crate::session::{ActivityLabel, Group};
use crate::timer::{DurationConfig, DurationField, Snapshot, TimerEngine, TimerMode};

#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<TimerEngine>>,
}

impl SharedEngine {
    pub fn new(engine: TimerEngine) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Mutex<TimerEngine>>| {
            let weak = weak.clone();
            let mut engine = engine;
            engine.connect_clock(Arc::new(move |epoch| {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner).tick_epoch(epoch);
                }
            }));
            Mutex::new(engine)
        });
        Self { inner }
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut TimerEngine) -> R) -> R {
        f(&mut lock(&self.inner))
    }

    /// Run a host command, then broadcast the resulting state.
    fn command<R>(&self, f: impl FnOnce(&mut TimerEngine) -> R) -> R {
        self.with(|e| {
            let out = f(e);
            e.publish_snapshot();
            out
        })
    }

    pub fn start(&self) -> Option<Event> {
        self.command(|e| e.start())
    }

    pub fn stop(&self) -> Option<Event> {
        self.command(|e| e.stop())
    }

    pub fn reset(&self) -> Option<Event> {
        self.command(|e| e.reset())
    }

    pub fn set_mode(&self, mode: TimerMode) {
        self.command(|e| e.set_mode(mode))
    }

    pub fn set_label(&self, label: ActivityLabel) {
        self.command(|e| e.set_label(label))
    }

    pub fn set_duration(&self, field: DurationField, value: u32) {
        self.command(|e| e.set_duration(field, value))
    }

    pub fn durations(&self) -> DurationConfig {
        self.with(|e| *e.durations())
    }

    pub fn delete_group(&self, id: Uuid) -> usize {
        self.command(|e| e.delete_group(id))
    }

    pub fn clear_all(&self) {
        self.command(|e| e.clear_all())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.with(|e| e.snapshot())
    }

    pub fn grouped_sessions(&self) -> Vec<Group> {
        self.with(|e| e.grouped_sessions())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.with(|e| e.subscribe())
    }
}

/// A panic mid-transition must not wedge the timer for good.
fn lock(inner: &Mutex<TimerEngine>) -> MutexGuard<'_, TimerEngine> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
