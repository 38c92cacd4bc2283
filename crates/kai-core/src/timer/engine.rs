//! Timer engine implementation.
//!
//! The engine owns the countdown, the pomodoro cycle, and the session
//! ledger. Ticks arrive from the [`ClockDriver`]; commands arrive from
//! the host. Both must be serialized by the caller (see
//! [`crate::service::SharedEngine`]).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Idle                (stop: phase abandoned)
//! Idle -> Running -> CycleCompleted -> Idle   (natural completion)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(store, Box::new(ManualScheduler::new()));
//! engine.start();
//! engine.tick(); // one second
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::clock::{ClockDriver, Scheduler, TickSink};
use super::cycle::{CycleState, Phase, TimerMode};
use super::durations::{DurationConfig, DurationField};
use crate::events::{Event, EventBus};
use crate::ledger::SessionLedger;
use crate::notify::{completion_body, Notifier, NullNotifier, COMPLETION_TITLE};
use crate::session::{ActivityLabel, Group, Session, SessionKind};
use crate::storage::Store;

/// Point-in-time view of the engine for hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: TimerMode,
    pub label: ActivityLabel,
    pub phase: Phase,
    pub remaining_secs: u64,
    pub initial_secs: u64,
    /// 0.0 .. 1.0 through the active phase.
    pub progress: f64,
    pub is_running: bool,
    pub is_cycle_completed: bool,
    pub cycle_position: u8,
    pub completed_pomodoros: u32,
    pub group_id: Option<Uuid>,
    pub session_start: Option<DateTime<Utc>>,
}

/// Core timer engine.
pub struct TimerEngine {
    mode: TimerMode,
    /// Mode requested while running; applied once the run ends.
    pending_mode: Option<TimerMode>,
    label: ActivityLabel,
    durations: DurationConfig,
    remaining_secs: u64,
    /// Length of the active phase, for progress.
    initial_secs: u64,
    is_running: bool,
    is_cycle_completed: bool,
    cycle: CycleState,
    session_start: Option<DateTime<Utc>>,
    auto_open_window: bool,
    clock: ClockDriver,
    ledger: SessionLedger,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    events: EventBus,
}

impl TimerEngine {
    /// Create an idle engine in pomodoro mode, loading history and
    /// durations from `store`.
    pub fn new(store: Arc<dyn Store>, scheduler: Box<dyn Scheduler>) -> Self {
        let durations = DurationConfig::load(store.as_ref());
        let ledger = SessionLedger::load(Arc::clone(&store));
        let remaining_secs = durations.pomodoro_secs();
        Self {
            mode: TimerMode::Pomodoro,
            pending_mode: None,
            label: ActivityLabel::default(),
            durations,
            remaining_secs,
            initial_secs: remaining_secs,
            is_running: false,
            is_cycle_completed: false,
            cycle: CycleState::new(),
            session_start: None,
            auto_open_window: true,
            clock: ClockDriver::new(scheduler),
            ledger,
            store,
            notifier: Arc::new(NullNotifier),
            events: EventBus::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_auto_open_window(mut self, enabled: bool) -> Self {
        self.auto_open_window = enabled;
        self
    }

    /// Route clock ticks to `sink`. Used by the shared runtime wrapper.
    pub(crate) fn connect_clock(&mut self, sink: TickSink) {
        self.clock.connect(sink);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn label(&self) -> ActivityLabel {
        self.label
    }

    pub fn durations(&self) -> &DurationConfig {
        &self.durations
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn initial_secs(&self) -> u64 {
        self.initial_secs
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn is_cycle_completed(&self) -> bool {
        self.is_cycle_completed
    }

    pub fn cycle(&self) -> &CycleState {
        &self.cycle
    }

    pub fn auto_open_window(&self) -> bool {
        self.auto_open_window
    }

    pub fn sessions(&self) -> &[Session] {
        self.ledger.sessions()
    }

    pub fn grouped_sessions(&self) -> Vec<Group> {
        self.ledger.grouped_sessions()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Phase the countdown currently represents.
    pub fn phase(&self) -> Phase {
        match self.mode {
            TimerMode::Simple => Phase::Simple,
            TimerMode::Pomodoro => self.cycle.pending_phase(),
        }
    }

    /// 0.0 .. 1.0 progress within the active phase.
    pub fn progress(&self) -> f64 {
        if self.initial_secs == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs as f64 / self.initial_secs as f64)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.mode,
            label: self.label,
            phase: self.phase(),
            remaining_secs: self.remaining_secs,
            initial_secs: self.initial_secs,
            progress: self.progress(),
            is_running: self.is_running,
            is_cycle_completed: self.is_cycle_completed,
            cycle_position: self.cycle.position(),
            completed_pomodoros: self.cycle.completed_pomodoros(),
            group_id: self.cycle.group_id(),
            session_start: self.session_start,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.is_running {
            return None;
        }
        self.is_running = true;
        self.is_cycle_completed = false;
        self.session_start = Some(Utc::now());

        if self.mode == TimerMode::Pomodoro {
            if let Some(group_id) = self.cycle.begin() {
                debug!(%group_id, "new pomodoro cycle");
            }
        }

        if self.remaining_secs == 0 {
            self.remaining_secs = self.mode_duration_secs();
        }
        self.initial_secs = self.remaining_secs;
        self.clock.start();

        let event = Event::TimerStarted {
            mode: self.mode,
            phase: self.phase(),
            duration_secs: self.remaining_secs,
            cycle_position: self.pomodoro_position(),
            group_id: self.cycle.group_id(),
            at: Utc::now(),
        };
        info!(mode = ?self.mode, phase = ?self.phase(), secs = self.remaining_secs, "timer started");
        self.events.publish(event.clone());
        Some(event)
    }

    /// Abandon the running phase, recording it as not completed.
    pub fn stop(&mut self) -> Option<Event> {
        if !self.is_running {
            return None;
        }
        self.halt();
        self.record_session(false);

        let event = Event::TimerStopped {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        };
        info!(remaining = self.remaining_secs, "timer stopped");
        self.events.publish(event.clone());
        self.apply_pending_mode();
        Some(event)
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.stop();
        self.remaining_secs = self.mode_duration_secs();
        self.initial_secs = self.remaining_secs;
        self.cycle.reset();
        self.is_cycle_completed = false;

        let event = Event::TimerReset { at: Utc::now() };
        info!("timer reset");
        self.events.publish(event.clone());
        Some(event)
    }

    /// Deliver one tick of the current run.
    pub fn tick(&mut self) -> Option<Event> {
        self.tick_epoch(self.clock.epoch())
    }

    /// Deliver a tick stamped with the run epoch that produced it. Ticks
    /// from an earlier run, or arriving after stop, are dropped.
    pub(crate) fn tick_epoch(&mut self, epoch: u64) -> Option<Event> {
        if !self.is_running || epoch != self.clock.epoch() {
            debug!(epoch, current = self.clock.epoch(), "dropping stale tick");
            return None;
        }

        if self.remaining_secs > 0 {
            self.remaining_secs -= 1;
            let event = Event::Tick {
                remaining_secs: self.remaining_secs,
                at: Utc::now(),
            };
            self.events.publish(event.clone());
            return Some(event);
        }

        Some(self.complete_phase())
    }

    pub fn set_mode(&mut self, mode: TimerMode) {
        if self.is_running {
            if mode != self.mode {
                debug!(?mode, "mode change deferred until the run ends");
                self.pending_mode = Some(mode);
            } else {
                self.pending_mode = None;
            }
            return;
        }
        if mode == self.mode {
            return;
        }

        self.mode = mode;
        match mode {
            TimerMode::Pomodoro => {
                self.cycle.reset();
                self.remaining_secs = self.durations.pomodoro_secs();
            }
            TimerMode::Simple => {
                self.remaining_secs = self.durations.simple_secs();
            }
        }
        self.initial_secs = self.remaining_secs;
        self.publish_settings_changed();
    }

    pub fn set_label(&mut self, label: ActivityLabel) {
        if label != self.label {
            self.label = label;
            self.publish_settings_changed();
        }
    }

    pub fn set_auto_open_window(&mut self, enabled: bool) {
        self.auto_open_window = enabled;
    }

    /// Change one configured duration and persist all of them. While
    /// idle the countdown is reloaded from the cycle state; a running
    /// countdown is left alone.
    pub fn set_duration(&mut self, field: DurationField, value: u32) {
        self.durations.set(field, value);
        self.durations_changed();
    }

    pub fn set_pomodoro_minutes(&mut self, minutes: u32) {
        self.set_duration(DurationField::PomodoroMinutes, minutes);
    }

    pub fn set_short_break_minutes(&mut self, minutes: u32) {
        self.set_duration(DurationField::ShortBreakMinutes, minutes);
    }

    pub fn set_long_break_minutes(&mut self, minutes: u32) {
        self.set_duration(DurationField::LongBreakMinutes, minutes);
    }

    pub fn set_simple_duration(&mut self, hours: u32, minutes: u32, seconds: u32) {
        self.durations.set(DurationField::SimpleHours, hours);
        self.durations.set(DurationField::SimpleMinutes, minutes);
        self.durations.set(DurationField::SimpleSeconds, seconds);
        self.durations_changed();
    }

    /// Returns how many sessions were removed.
    pub fn delete_group(&mut self, id: Uuid) -> usize {
        let removed = self.ledger.delete_group(id);
        if removed > 0 {
            self.publish_history_changed();
        }
        removed
    }

    pub fn clear_all(&mut self) {
        self.ledger.clear_all();
        self.publish_history_changed();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn halt(&mut self) {
        self.clock.stop();
        self.is_running = false;
    }

    fn durations_changed(&mut self) {
        if let Err(e) = self.durations.save(self.store.as_ref()) {
            warn!(error = %e, "failed to persist durations");
        }
        if !self.is_running {
            self.reload_idle_countdown();
        }
        self.publish_settings_changed();
    }

    /// Re-derive the idle countdown from the cycle state. A finished cycle
    /// and position 8 both load the work length.
    fn reload_idle_countdown(&mut self) {
        let phase = match self.mode {
            TimerMode::Simple => Phase::Simple,
            TimerMode::Pomodoro => self.cycle.idle_reload_phase(),
        };
        self.remaining_secs = phase.duration_secs(&self.durations);
        self.initial_secs = self.remaining_secs;
    }

    fn mode_duration_secs(&self) -> u64 {
        match self.mode {
            TimerMode::Pomodoro => self.durations.pomodoro_secs(),
            TimerMode::Simple => self.durations.simple_secs(),
        }
    }

    fn pomodoro_position(&self) -> Option<u8> {
        (self.mode == TimerMode::Pomodoro).then(|| self.cycle.position())
    }

    fn complete_phase(&mut self) -> Event {
        let finished = self.phase();
        self.halt();
        self.is_cycle_completed = true;
        self.record_session(true);

        let next = match self.mode {
            TimerMode::Simple => {
                self.remaining_secs = 0;
                self.cycle.clear_group();
                Phase::Simple
            }
            TimerMode::Pomodoro => {
                let next = self.cycle.advance();
                self.remaining_secs = next.duration_secs(&self.durations);
                next
            }
        };
        self.initial_secs = self.remaining_secs;

        info!(?finished, ?next, position = self.cycle.position(), "phase completed");
        let now = Utc::now();
        let event = Event::PhaseCompleted {
            mode: self.mode,
            finished,
            next,
            next_duration_secs: self.remaining_secs,
            cycle_finished: finished == Phase::LongBreak && !self.cycle.in_progress(),
            at: now,
        };
        self.events.publish(event.clone());

        if let Err(e) = self
            .notifier
            .notify(COMPLETION_TITLE, &completion_body(self.label))
        {
            warn!(error = %e, "completion notification dropped");
        }
        self.events.publish(Event::ForegroundRequested { at: now });
        if self.auto_open_window {
            self.events.publish(Event::WindowRaiseRequested { at: now });
        }

        self.apply_pending_mode();
        event
    }

    /// Write the in-flight session. Runs at most once per start.
    fn record_session(&mut self, completed: bool) {
        let Some(start_time) = self.session_start.take() else {
            return;
        };

        let is_pomodoro = self.mode == TimerMode::Pomodoro;
        let session = Session {
            id: Uuid::new_v4(),
            start_time,
            end_time: Some(Utc::now()),
            duration_secs: self.initial_secs.saturating_sub(self.remaining_secs),
            kind: if is_pomodoro {
                SessionKind::Pomodoro
            } else {
                SessionKind::Simple
            },
            label: self.label,
            completed,
            group_id: if is_pomodoro { self.cycle.group_id() } else { None },
            cycle_position: self.pomodoro_position(),
        };

        self.ledger.record(session.clone());
        self.events.publish(Event::SessionRecorded { session });
    }

    fn apply_pending_mode(&mut self) {
        if let Some(mode) = self.pending_mode.take() {
            self.set_mode(mode);
        }
    }

    /// Broadcast the full state, for hosts that redraw from one message.
    pub(crate) fn publish_snapshot(&self) {
        self.events.publish(Event::StateSnapshot(self.snapshot()));
    }

    fn publish_settings_changed(&self) {
        self.events.publish(Event::SettingsChanged { at: Utc::now() });
    }

    fn publish_history_changed(&self) {
        self.events.publish(Event::HistoryChanged {
            total_sessions: self.ledger.len(),
            at: Utc::now(),
        });
    }
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("mode", &self.mode)
            .field("remaining_secs", &self.remaining_secs)
            .field("is_running", &self.is_running)
            .field("cycle", &self.cycle)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
