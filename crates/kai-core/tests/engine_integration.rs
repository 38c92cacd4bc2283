//! Integration tests for the timer engine.
//!
//! Drives a shared engine with the manual clock across whole phases and
//! cycles, then checks what the ledger and the store hold afterwards.

use std::sync::Arc;

use kai_core::{
    next_phase_message, ActivityLabel, DurationField, Event, ManualScheduler, MemoryStore, Phase,
    SessionKind, SessionStatus, SharedEngine, SqliteStore, Store, TimerEngine, TimerMode,
};

fn shared_with(store: Arc<dyn Store>) -> (SharedEngine, ManualScheduler) {
    let clock = ManualScheduler::new();
    let engine = TimerEngine::new(store, Box::new(clock.clone()));
    (SharedEngine::new(engine), clock)
}

/// Run the active phase to natural completion.
fn run_out(engine: &SharedEngine, clock: &ManualScheduler) {
    let remaining = engine.snapshot().remaining_secs;
    assert_eq!(clock.advance(remaining + 1), remaining + 1);
    assert!(!engine.snapshot().is_running);
}

#[test]
fn test_standard_cycle_scenario() {
    let (engine, clock) = shared_with(Arc::new(MemoryStore::new()));
    engine.set_duration(DurationField::PomodoroMinutes, 25);
    engine.set_duration(DurationField::ShortBreakMinutes, 5);
    engine.set_duration(DurationField::LongBreakMinutes, 15);

    engine.start();
    run_out(&engine, &clock);

    let snap = engine.snapshot();
    assert_eq!(snap.cycle_position, 2);
    assert_eq!(snap.completed_pomodoros, 1);
    assert_eq!(snap.remaining_secs, 5 * 60);
    assert_eq!(snap.phase, Phase::ShortBreak);
    assert!(snap.is_cycle_completed);

    let groups = engine.grouped_sessions();
    let first = &groups[0].sessions[0];
    assert_eq!(first.kind, SessionKind::Pomodoro);
    assert!(first.completed);
    assert_eq!(first.cycle_position, Some(1));
}

#[test]
fn test_positions_and_counts_over_two_cycles() {
    let (engine, clock) = shared_with(Arc::new(MemoryStore::new()));
    engine.set_duration(DurationField::PomodoroMinutes, 1);
    engine.set_duration(DurationField::ShortBreakMinutes, 1);
    engine.set_duration(DurationField::LongBreakMinutes, 2);

    let mut observed = Vec::new();
    for _ in 0..16 {
        engine.start();
        let started = engine.snapshot();
        run_out(&engine, &clock);
        let after = engine.snapshot();
        observed.push((started.cycle_position, after.cycle_position, after.completed_pomodoros));
    }

    let expected_cycle = [
        (1, 2, 1),
        (2, 3, 1),
        (3, 4, 2),
        (4, 5, 2),
        (5, 6, 3),
        (6, 7, 3),
        (7, 8, 4),
        (8, 0, 0),
    ];
    assert_eq!(&observed[..8], &expected_cycle);
    assert_eq!(&observed[8..], &expected_cycle);

    let groups = engine.grouped_sessions();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.sessions.len() == 8));
    assert_ne!(groups[0].id, groups[1].id);
}

#[test]
fn test_long_break_only_at_position_eight() {
    let (engine, clock) = shared_with(Arc::new(MemoryStore::new()));
    engine.set_duration(DurationField::PomodoroMinutes, 1);
    engine.set_duration(DurationField::ShortBreakMinutes, 2);
    engine.set_duration(DurationField::LongBreakMinutes, 3);

    for _ in 0..8 {
        engine.start();
        run_out(&engine, &clock);
        let snap = engine.snapshot();
        match snap.cycle_position {
            8 => assert_eq!(snap.remaining_secs, 180),
            p if p > 0 && p % 2 == 0 => assert_eq!(snap.remaining_secs, 120),
            _ => assert_eq!(snap.remaining_secs, 60),
        }
    }
}

#[test]
fn test_stop_then_resume_records_two_partial_sessions() {
    let (engine, clock) = shared_with(Arc::new(MemoryStore::new()));
    engine.set_label(ActivityLabel::Reading);
    engine.start();
    clock.advance(100);
    engine.stop();

    // Resuming continues the same phase and the same cycle.
    engine.start();
    let group = engine.snapshot().group_id;
    clock.advance(50);
    engine.stop();

    let groups = engine.grouped_sessions();
    assert_eq!(groups.len(), 1);
    assert_eq!(Some(groups[0].id), group);
    assert_eq!(groups[0].label, ActivityLabel::Reading);

    let durations: Vec<_> = groups[0].sessions.iter().map(|s| s.duration_secs).collect();
    assert_eq!(durations, vec![100, 50]);
    assert!(groups[0]
        .sessions
        .iter()
        .all(|s| s.status() == SessionStatus::Interrupted));
    assert_eq!(groups[0].interrupted_count(), 2);
    assert_eq!(engine.snapshot().remaining_secs, 25 * 60 - 150);
}

#[test]
fn test_stop_without_elapsed_time_is_aborted() {
    let (engine, _clock) = shared_with(Arc::new(MemoryStore::new()));
    engine.start();
    engine.stop();
    let groups = engine.grouped_sessions();
    assert_eq!(groups[0].sessions[0].status(), SessionStatus::Aborted);
    assert_eq!(groups[0].interrupted_count(), 0);
}

#[test]
fn test_stop_racing_completion_records_once() {
    let (engine, clock) = shared_with(Arc::new(MemoryStore::new()));
    engine.set_duration(DurationField::PomodoroMinutes, 0);
    engine.start();
    clock.advance(1);
    // Completion already recorded; a late stop must not add another.
    assert!(engine.stop().is_none());
    assert_eq!(engine.with(|e| e.sessions().len()), 1);
    assert!(engine.with(|e| e.sessions()[0].completed));
}

#[test]
fn test_simple_timer_never_advances() {
    let (engine, clock) = shared_with(Arc::new(MemoryStore::new()));
    engine.set_mode(TimerMode::Simple);
    engine.set_duration(DurationField::SimpleMinutes, 0);
    engine.set_duration(DurationField::SimpleSeconds, 10);

    engine.start();
    run_out(&engine, &clock);
    engine.start();
    run_out(&engine, &clock);

    let snap = engine.snapshot();
    assert_eq!(snap.remaining_secs, 0);
    assert!(snap.group_id.is_none());

    let groups = engine.grouped_sessions();
    assert_eq!(groups.len(), 2);
    for group in &groups {
        assert_eq!(group.sessions.len(), 1);
        let session = &group.sessions[0];
        assert_eq!(session.kind, SessionKind::Simple);
        assert!(session.group_id.is_none());
        assert!(session.cycle_position.is_none());
        assert_eq!(group.id, session.id);
    }
}

#[test]
fn test_events_published_through_shared_engine() {
    let (engine, clock) = shared_with(Arc::new(MemoryStore::new()));
    engine.set_duration(DurationField::PomodoroMinutes, 0);
    let mut rx = engine.subscribe();

    engine.start();
    clock.advance(1);

    let mut completed = None;
    while let Ok(event) = rx.try_recv() {
        if let Event::PhaseCompleted { finished, next, .. } = event {
            completed = Some((finished, next));
        }
    }
    assert_eq!(completed, Some((Phase::Work, Phase::ShortBreak)));
}

#[test]
fn test_completion_message_ignores_deferred_mode_switch() {
    let (engine, clock) = shared_with(Arc::new(MemoryStore::new()));
    engine.set_duration(DurationField::PomodoroMinutes, 0);
    let mut rx = engine.subscribe();

    engine.start();
    engine.set_mode(TimerMode::Simple);
    clock.advance(1);

    // The switch lands once the work block completes.
    assert_eq!(engine.snapshot().mode, TimerMode::Simple);

    let mut message = None;
    while let Ok(event) = rx.try_recv() {
        if let Some(text) = next_phase_message(&event) {
            message = Some(text);
        }
    }
    assert_eq!(
        message.as_deref(),
        Some("Pomodoro finished! Next: 5-minute break")
    );
}

#[test]
fn test_delete_and_clear_history() {
    let (engine, clock) = shared_with(Arc::new(MemoryStore::new()));
    engine.set_duration(DurationField::PomodoroMinutes, 0);
    engine.start();
    clock.advance(1);
    engine.reset();

    engine.set_mode(TimerMode::Simple);
    engine.start();
    engine.stop();

    let groups = engine.grouped_sessions();
    assert_eq!(groups.len(), 2);
    let simple_id = groups
        .iter()
        .find(|g| g.kind() == SessionKind::Simple)
        .map(|g| g.id)
        .unwrap();

    assert_eq!(engine.delete_group(uuid::Uuid::new_v4()), 0);
    assert_eq!(engine.delete_group(simple_id), 1);
    assert_eq!(engine.grouped_sessions().len(), 1);

    engine.clear_all();
    assert!(engine.grouped_sessions().is_empty());
}

#[test]
fn test_history_and_durations_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kai.db");

    let before = {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open_at(&path).unwrap());
        let (engine, clock) = shared_with(store);
        engine.set_duration(DurationField::PomodoroMinutes, 1);
        engine.set_duration(DurationField::LongBreakMinutes, 20);
        engine.set_duration(DurationField::SimpleHours, 2);
        engine.start();
        run_out(&engine, &clock);
        engine.start();
        clock.advance(7);
        engine.stop();
        engine.set_mode(TimerMode::Simple);
        engine.start();
        clock.advance(3);
        engine.stop();
        (
            engine.with(|e| e.sessions().to_vec()),
            engine.durations(),
        )
    };

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open_at(&path).unwrap());
    let (engine, _clock) = shared_with(store);
    assert_eq!(engine.with(|e| e.sessions().to_vec()), before.0);
    assert_eq!(engine.durations(), before.1);
    assert_eq!(engine.durations().long_break_minutes, 20);
    assert_eq!(engine.snapshot().remaining_secs, 60);
}

#[test]
fn test_corrupt_store_fails_open() {
    let store = Arc::new(MemoryStore::new());
    store.save("sessions", b"\x00\x01garbage").unwrap();
    store.save("durations.pomodoro_minutes", b"-3").unwrap();

    let (engine, _clock) = shared_with(store);
    assert!(engine.grouped_sessions().is_empty());
    assert_eq!(engine.durations().pomodoro_minutes, 25);
}
