//! Pomodoro cycle bookkeeping.
//!
//! A cycle is eight phases: odd positions are work blocks, even positions
//! are breaks and position 8 is the long break that closes the cycle.
//!
//! ```text
//! 1 work -> 2 short -> 3 work -> 4 short -> 5 work -> 6 short -> 7 work -> 8 long
//!                                                                          |
//!                                             (0, awaiting next start) <---+
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::durations::DurationConfig;

/// Last position of a cycle; always the long break.
pub const LONG_BREAK_POSITION: u8 = 8;

/// Work blocks between long breaks.
pub const POMODOROS_PER_LONG_BREAK: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    #[default]
    Pomodoro,
    Simple,
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerMode::Pomodoro => f.write_str("Pomodoro"),
            TimerMode::Simple => f.write_str("Simple timer"),
        }
    }
}

impl std::str::FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pomodoro" => Ok(TimerMode::Pomodoro),
            "simple" => Ok(TimerMode::Simple),
            _ => Err(format!("unknown timer mode: {s}")),
        }
    }
}

/// What the active (or next) countdown represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
    Simple,
}

impl Phase {
    pub fn duration_secs(&self, durations: &DurationConfig) -> u64 {
        match self {
            Phase::Work => durations.pomodoro_secs(),
            Phase::ShortBreak => durations.short_break_secs(),
            Phase::LongBreak => durations.long_break_secs(),
            Phase::Simple => durations.simple_secs(),
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Phase::ShortBreak | Phase::LongBreak)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Work => "Pomodoro",
            Phase::ShortBreak => "Short break",
            Phase::LongBreak => "Long break",
            Phase::Simple => "Timer",
        }
    }
}

/// Progress through the current cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleState {
    /// 1..=8 while a cycle runs, 0 after the long break completes.
    position: u8,
    /// Work blocks finished in this cycle.
    completed_pomodoros: u32,
    /// Set while a cycle is in progress.
    group_id: Option<Uuid>,
}

impl Default for CycleState {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleState {
    pub fn new() -> Self {
        Self {
            position: 1,
            completed_pomodoros: 0,
            group_id: None,
        }
    }

    pub fn position(&self) -> u8 {
        self.position
    }

    pub fn completed_pomodoros(&self) -> u32 {
        self.completed_pomodoros
    }

    pub fn group_id(&self) -> Option<Uuid> {
        self.group_id
    }

    pub fn in_progress(&self) -> bool {
        self.group_id.is_some()
    }

    /// Open a new cycle if none is in progress. Returns the minted id.
    pub fn begin(&mut self) -> Option<Uuid> {
        if self.group_id.is_some() {
            return None;
        }
        let id = Uuid::new_v4();
        self.group_id = Some(id);
        self.position = 1;
        Some(id)
    }

    /// Forget all cycle progress.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn clear_group(&mut self) {
        self.group_id = None;
    }

    /// Move past the phase that just ran to zero and return the phase
    /// that comes next.
    pub fn advance(&mut self) -> Phase {
        if self.position >= LONG_BREAK_POSITION {
            self.group_id = None;
            self.position = 0;
            self.completed_pomodoros = 0;
            return Phase::Work;
        }

        self.position += 1;
        if self.position % 2 == 0 {
            self.completed_pomodoros += 1;
        }
        select_phase(self.position, self.completed_pomodoros)
    }

    /// Phase the current position stands for while idle.
    ///
    /// Position 0 means the long break has finished and the next start
    /// opens a new cycle.
    pub fn pending_phase(&self) -> Phase {
        if self.position == 0 || self.position > LONG_BREAK_POSITION {
            Phase::Work
        } else {
            select_phase(self.position, self.completed_pomodoros)
        }
    }

    /// Phase whose length an idle duration change reloads. Position 8
    /// counts as a pending reset, so it loads the work length even though
    /// [`CycleState::pending_phase`] still reports the long break.
    pub fn idle_reload_phase(&self) -> Phase {
        if self.position == 0 || self.position >= LONG_BREAK_POSITION {
            Phase::Work
        } else {
            select_phase(self.position, self.completed_pomodoros)
        }
    }
}

/// Long break wins over short break whenever both apply.
fn select_phase(position: u8, completed_pomodoros: u32) -> Phase {
    let long_due =
        completed_pomodoros > 0 && completed_pomodoros % POMODOROS_PER_LONG_BREAK == 0;
    if long_due || position == LONG_BREAK_POSITION {
        Phase::LongBreak
    } else if position % 2 == 0 {
        Phase::ShortBreak
    } else {
        Phase::Work
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Simple".parse::<TimerMode>(), Ok(TimerMode::Simple));
        assert_eq!("pomodoro".parse::<TimerMode>(), Ok(TimerMode::Pomodoro));
        assert!("stopwatch".parse::<TimerMode>().is_err());
    }

    #[test]
    fn full_cycle_sequence() {
        let mut cycle = CycleState::new();
        cycle.begin();

        let expected = [
            (2, 1, Phase::ShortBreak),
            (3, 1, Phase::Work),
            (4, 2, Phase::ShortBreak),
            (5, 2, Phase::Work),
            (6, 3, Phase::ShortBreak),
            (7, 3, Phase::Work),
            (8, 4, Phase::LongBreak),
        ];
        for (position, completed, phase) in expected {
            assert_eq!(cycle.advance(), phase);
            assert_eq!(cycle.position(), position);
            assert_eq!(cycle.completed_pomodoros(), completed);
            assert!(cycle.in_progress());
        }

        assert_eq!(cycle.advance(), Phase::Work);
        assert_eq!(cycle.position(), 0);
        assert_eq!(cycle.completed_pomodoros(), 0);
        assert!(!cycle.in_progress());
    }

    #[test]
    fn begin_only_mints_once() {
        let mut cycle = CycleState::new();
        let id = cycle.begin().unwrap();
        assert!(cycle.begin().is_none());
        assert_eq!(cycle.group_id(), Some(id));
    }

    #[test]
    fn begin_after_long_break_restarts_at_one() {
        let mut cycle = CycleState::new();
        cycle.begin();
        for _ in 0..8 {
            cycle.advance();
        }
        assert_eq!(cycle.position(), 0);
        cycle.begin();
        assert_eq!(cycle.position(), 1);
    }

    #[test]
    fn pending_phase_by_position() {
        let mut cycle = CycleState::new();
        assert_eq!(cycle.pending_phase(), Phase::Work);
        cycle.begin();
        cycle.advance();
        assert_eq!(cycle.pending_phase(), Phase::ShortBreak);
        for _ in 0..6 {
            cycle.advance();
        }
        assert_eq!(cycle.position(), 8);
        assert_eq!(cycle.pending_phase(), Phase::LongBreak);
        assert_eq!(cycle.idle_reload_phase(), Phase::Work);
        cycle.advance();
        assert_eq!(cycle.pending_phase(), Phase::Work);
        assert_eq!(cycle.idle_reload_phase(), Phase::Work);
    }

    #[test]
    fn idle_reload_matches_pending_phase_before_position_eight() {
        let mut cycle = CycleState::new();
        cycle.begin();
        for _ in 0..7 {
            assert_eq!(cycle.idle_reload_phase(), cycle.pending_phase());
            cycle.advance();
        }
    }

    #[test]
    fn long_break_wins_tie() {
        assert_eq!(select_phase(4, 4), Phase::LongBreak);
        assert_eq!(select_phase(8, 3), Phase::LongBreak);
        assert_eq!(select_phase(4, 2), Phase::ShortBreak);
        assert_eq!(select_phase(3, 0), Phase::Work);
    }

    proptest! {
        #[test]
        fn position_cycles_and_count_moves_on_even_positions(steps in 1usize..64) {
            let mut cycle = CycleState::new();
            cycle.begin();
            for _ in 0..steps {
                let before = cycle.clone();
                let next = cycle.advance();

                if before.position() >= LONG_BREAK_POSITION {
                    prop_assert_eq!(cycle.position(), 0);
                    prop_assert_eq!(cycle.completed_pomodoros(), 0);
                    prop_assert_eq!(next, Phase::Work);
                    cycle.begin();
                    prop_assert_eq!(cycle.position(), 1);
                    continue;
                }

                prop_assert_eq!(cycle.position(), before.position() + 1);
                let bumped = cycle.completed_pomodoros() == before.completed_pomodoros() + 1;
                prop_assert_eq!(bumped, cycle.position() % 2 == 0);

                let long_due = cycle.completed_pomodoros() > 0
                    && cycle.completed_pomodoros() % POMODOROS_PER_LONG_BREAK == 0;
                prop_assert_eq!(next == Phase::LongBreak, long_due);
                prop_assert_eq!(next == Phase::LongBreak, cycle.position() == LONG_BREAK_POSITION);
                prop_assert_eq!(next.is_break(), cycle.position() % 2 == 0);
            }
        }
    }
}
