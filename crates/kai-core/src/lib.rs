//! # KAI Core Library
//!
//! Business logic for the KAI focus timer: a pomodoro cycle engine plus a
//! plain countdown, with a persisted history of every phase. Hosts (the
//! `kai` CLI, a menu-bar shell) construct one engine, drive it through
//! [`SharedEngine`], and redraw from the [`Event`] stream.
//!
//! ## Architecture
//!
//! - **Timer Engine**: state machine for start/stop/reset and phase
//!   completion, ticked once per second by a pluggable clock
//! - **Cycle**: eight-phase pomodoro bookkeeping with a long break every
//!   fourth work block
//! - **Ledger**: session history, grouping by cycle, deletion
//! - **Storage**: key-value [`Store`] (SQLite or memory) and TOML
//!   [`Config`]
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`SharedEngine`]: Mutex-guarded engine wired to its clock
//! - [`SessionLedger`]: Session history persistence and grouping
//! - [`Notifier`]: Completion notification seam

pub mod error;
pub mod events;
pub mod ledger;
pub mod notify;
pub mod service;
pub mod session;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, StorageError};
pub use events::{next_phase_message, Event, EventBus};
pub use ledger::SessionLedger;
pub use notify::{Notifier, NotifyError, NullNotifier};
pub use service::SharedEngine;
pub use session::{
    format_clock, format_duration, ActivityLabel, Group, Session, SessionKind, SessionStatus,
};
pub use storage::{BackgroundStore, Config, MemoryStore, SqliteStore, Store};
pub use timer::{
    DurationConfig, DurationField, ManualScheduler, Phase, Snapshot, TimerEngine, TimerMode,
    TokioScheduler,
};
