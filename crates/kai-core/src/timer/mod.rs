mod clock;
mod cycle;
mod durations;
mod engine;

pub use clock::{
    ClockDriver, ManualScheduler, Scheduler, TickFn, TickHandle, TickSink, TokioScheduler,
    TICK_PERIOD,
};
pub use cycle::{CycleState, Phase, TimerMode, LONG_BREAK_POSITION, POMODOROS_PER_LONG_BREAK};
pub use durations::{DurationConfig, DurationField};
pub use engine::{Snapshot, TimerEngine};
