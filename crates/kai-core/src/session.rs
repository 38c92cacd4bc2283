//! Session records and the groups derived from them.
//!
//! A [`Session`] is written once when a phase ends and never changes
//! afterwards. A [`Group`] is recomputed from the session list on every
//! read: all phases of one pomodoro cycle share a `group_id`, while each
//! simple-timer run stands alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which timer produced a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Pomodoro,
    Simple,
}

/// Activity category attached to every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLabel {
    #[default]
    Study,
    Work,
    Health,
    Leisure,
    Reading,
}

impl ActivityLabel {
    pub const ALL: [ActivityLabel; 5] = [
        ActivityLabel::Study,
        ActivityLabel::Work,
        ActivityLabel::Health,
        ActivityLabel::Leisure,
        ActivityLabel::Reading,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ActivityLabel::Study => "Study",
            ActivityLabel::Work => "Work",
            ActivityLabel::Health => "Health",
            ActivityLabel::Leisure => "Leisure",
            ActivityLabel::Reading => "Reading",
        }
    }
}

impl std::fmt::Display for ActivityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.display_name())
    }
}

impl std::str::FromStr for ActivityLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityLabel::ALL
            .into_iter()
            .find(|l| l.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown activity label: {s}"))
    }
}

/// Outcome of a session, derived from `completed` and `duration_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Ran to natural zero.
    Completed,
    /// Stopped after some time had elapsed.
    Interrupted,
    /// Stopped before any time elapsed.
    Aborted,
}

/// One timed phase, recorded when it ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Elapsed seconds.
    pub duration_secs: u64,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub label: ActivityLabel,
    pub completed: bool,
    /// Links sibling phases of one pomodoro cycle.
    #[serde(default)]
    pub group_id: Option<Uuid>,
    /// 1..=8; odd positions are work blocks, 8 is the long break.
    #[serde(default)]
    pub cycle_position: Option<u8>,
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        if self.completed {
            SessionStatus::Completed
        } else if self.duration_secs > 0 {
            SessionStatus::Interrupted
        } else {
            SessionStatus::Aborted
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.status() == SessionStatus::Interrupted
    }
}

/// Read-only aggregation of sessions sharing a cycle (or a lone simple run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: Uuid,
    pub label: ActivityLabel,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Members in insertion order.
    pub sessions: Vec<Session>,
}

impl Group {
    pub(crate) fn from_first(id: Uuid, session: Session) -> Self {
        Self {
            id,
            label: session.label,
            start_time: session.start_time,
            end_time: session.end_time,
            sessions: vec![session],
        }
    }

    pub(crate) fn push(&mut self, session: Session) {
        self.end_time = session.end_time;
        self.sessions.push(session);
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.sessions.iter().map(|s| s.duration_secs).sum()
    }

    pub fn completed_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.completed).count()
    }

    pub fn interrupted_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_interrupted()).count()
    }

    pub fn is_fully_completed(&self) -> bool {
        !self.sessions.is_empty() && self.sessions.iter().all(|s| s.completed)
    }

    pub fn kind(&self) -> SessionKind {
        self.sessions
            .first()
            .map(|s| s.kind)
            .unwrap_or(SessionKind::Simple)
    }
}

/// `MM:SS`, minutes unbounded.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Human readable duration: `1h 5min 3s`, `1h 3s`, `5min 3s` or `3s`.
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let rest = secs % 60;

    match (hours, minutes) {
        (0, 0) => format!("{rest}s"),
        (0, m) => format!("{m}min {rest}s"),
        (h, 0) => format!("{h}h {rest}s"),
        (h, m) => format!("{h}h {m}min {rest}s"),
    }
}
