//! Configured phase lengths.
//!
//! Persisted as six independent scalars so a single unreadable value only
//! loses that field.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StorageError;
use crate::storage::{keys, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationConfig {
    pub pomodoro_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub simple_hours: u32,
    pub simple_minutes: u32,
    pub simple_seconds: u32,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            pomodoro_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            simple_hours: 0,
            simple_minutes: 25,
            simple_seconds: 0,
        }
    }
}

/// One settable field of [`DurationConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationField {
    PomodoroMinutes,
    ShortBreakMinutes,
    LongBreakMinutes,
    SimpleHours,
    SimpleMinutes,
    SimpleSeconds,
}

impl DurationField {
    pub const ALL: [DurationField; 6] = [
        DurationField::PomodoroMinutes,
        DurationField::ShortBreakMinutes,
        DurationField::LongBreakMinutes,
        DurationField::SimpleHours,
        DurationField::SimpleMinutes,
        DurationField::SimpleSeconds,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            DurationField::PomodoroMinutes => keys::POMODORO_MINUTES,
            DurationField::ShortBreakMinutes => keys::SHORT_BREAK_MINUTES,
            DurationField::LongBreakMinutes => keys::LONG_BREAK_MINUTES,
            DurationField::SimpleHours => keys::SIMPLE_HOURS,
            DurationField::SimpleMinutes => keys::SIMPLE_MINUTES,
            DurationField::SimpleSeconds => keys::SIMPLE_SECONDS,
        }
    }

    /// Short name used on the command line.
    pub fn name(&self) -> &'static str {
        self.key().trim_start_matches("durations.")
    }
}

impl std::str::FromStr for DurationField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.replace('-', "_");
        DurationField::ALL
            .into_iter()
            .find(|f| f.name() == wanted || f.key() == wanted)
            .ok_or_else(|| format!("unknown duration field: {s}"))
    }
}

impl DurationConfig {
    pub fn get(&self, field: DurationField) -> u32 {
        match field {
            DurationField::PomodoroMinutes => self.pomodoro_minutes,
            DurationField::ShortBreakMinutes => self.short_break_minutes,
            DurationField::LongBreakMinutes => self.long_break_minutes,
            DurationField::SimpleHours => self.simple_hours,
            DurationField::SimpleMinutes => self.simple_minutes,
            DurationField::SimpleSeconds => self.simple_seconds,
        }
    }

    pub fn set(&mut self, field: DurationField, value: u32) {
        let slot = match field {
            DurationField::PomodoroMinutes => &mut self.pomodoro_minutes,
            DurationField::ShortBreakMinutes => &mut self.short_break_minutes,
            DurationField::LongBreakMinutes => &mut self.long_break_minutes,
            DurationField::SimpleHours => &mut self.simple_hours,
            DurationField::SimpleMinutes => &mut self.simple_minutes,
            DurationField::SimpleSeconds => &mut self.simple_seconds,
        };
        *slot = value;
    }

    pub fn pomodoro_secs(&self) -> u64 {
        u64::from(self.pomodoro_minutes) * 60
    }

    pub fn short_break_secs(&self) -> u64 {
        u64::from(self.short_break_minutes) * 60
    }

    pub fn long_break_secs(&self) -> u64 {
        u64::from(self.long_break_minutes) * 60
    }

    pub fn simple_secs(&self) -> u64 {
        u64::from(self.simple_hours) * 3600
            + u64::from(self.simple_minutes) * 60
            + u64::from(self.simple_seconds)
    }

    /// Read every field from `store`. Absent or unreadable fields keep
    /// their defaults.
    pub fn load(store: &dyn Store) -> Self {
        let mut config = Self::default();
        for field in DurationField::ALL {
            match store.load(field.key()) {
                Ok(Some(bytes)) => match parse_scalar(&bytes) {
                    Some(value) => config.set(field, value),
                    None => warn!(key = field.key(), "unreadable duration value, keeping default"),
                },
                Ok(None) => {}
                Err(e) => warn!(key = field.key(), error = %e, "failed to load duration"),
            }
        }
        config
    }

    pub fn save(&self, store: &dyn Store) -> Result<(), StorageError> {
        for field in DurationField::ALL {
            store.save(field.key(), self.get(field).to_string().as_bytes())?;
        }
        Ok(())
    }
}

fn parse_scalar(bytes: &[u8]) -> Option<u32> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}
