use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::session::Session;
use crate::timer::{Phase, Snapshot, TimerMode};

/// Every state change in the engine produces an Event.
/// Hosts subscribe to redraw; nothing in the engine waits on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        phase: Phase,
        duration_secs: u64,
        cycle_position: Option<u8>,
        group_id: Option<Uuid>,
        at: DateTime<Utc>,
    },
    Tick {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerStopped {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    PhaseCompleted {
        mode: TimerMode,
        finished: Phase,
        next: Phase,
        next_duration_secs: u64,
        /// The long break just ended and the cycle closed.
        cycle_finished: bool,
        at: DateTime<Utc>,
    },
    /// Completion wants the host in the foreground.
    ForegroundRequested {
        at: DateTime<Utc>,
    },
    /// Completion wants the main window raised (auto-open enabled).
    WindowRaiseRequested {
        at: DateTime<Utc>,
    },
    SessionRecorded {
        session: Session,
    },
    HistoryChanged {
        total_sessions: usize,
        at: DateTime<Utc>,
    },
    SettingsChanged {
        at: DateTime<Utc>,
    },
    StateSnapshot(Snapshot),
}

const EVENT_CAPACITY: usize = 256;

/// Fan-out of engine events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers. Having none is fine.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Text shown after a phase completes, describing what comes next.
/// Only [`Event::PhaseCompleted`] carries a message.
pub fn next_phase_message(event: &Event) -> Option<String> {
    let Event::PhaseCompleted {
        mode,
        next,
        next_duration_secs,
        cycle_finished,
        ..
    } = event
    else {
        return None;
    };

    if *mode == TimerMode::Simple {
        return Some("Timer finished! Start another one?".to_string());
    }
    if *cycle_finished {
        return Some("Pomodoro cycle complete! Start a new cycle?".to_string());
    }

    let minutes = next_duration_secs / 60;
    let message = if next.is_break() {
        format!("Pomodoro finished! Next: {minutes}-minute break")
    } else {
        format!("Break finished! Next: {minutes}-minute pomodoro")
    };
    Some(message)
}
