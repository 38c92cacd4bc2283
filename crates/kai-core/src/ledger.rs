//! Session ledger: the persisted history of finished phases.
//!
//! History is kept most-recent-first and written back in full after every
//! change. Groups are never stored; [`SessionLedger::grouped_sessions`]
//! rebuilds them from the flat list on each call.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::session::{Group, Session, SessionKind};
use crate::storage::{keys, Store};

pub struct SessionLedger {
    sessions: Vec<Session>,
    store: Arc<dyn Store>,
}

impl SessionLedger {
    /// Load history from `store`. Missing or undecodable history starts
    /// empty.
    pub fn load(store: Arc<dyn Store>) -> Self {
        let sessions = match store.load(keys::SESSIONS) {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<Session>>(&bytes) {
                Ok(sessions) => sessions,
                Err(e) => {
                    warn!(error = %e, "session history unreadable, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to load session history, starting empty");
                Vec::new()
            }
        };
        debug!(count = sessions.len(), "session history loaded");
        Self { sessions, store }
    }

    /// Most recent first.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn record(&mut self, session: Session) {
        debug!(
            id = %session.id,
            kind = ?session.kind,
            completed = session.completed,
            duration_secs = session.duration_secs,
            "recording session"
        );
        self.sessions.insert(0, session);
        self.persist();
    }

    /// Pomodoro sessions bucketed by cycle, every other session on its
    /// own, newest group first. Members are in chronological order.
    pub fn grouped_sessions(&self) -> Vec<Group> {
        let mut groups: Vec<Group> = Vec::new();
        let mut index: HashMap<Uuid, usize> = HashMap::new();

        for session in self.sessions.iter().rev() {
            match (session.kind, session.group_id) {
                (SessionKind::Pomodoro, Some(group_id)) => match index.get(&group_id) {
                    Some(&i) => groups[i].push(session.clone()),
                    None => {
                        index.insert(group_id, groups.len());
                        groups.push(Group::from_first(group_id, session.clone()));
                    }
                },
                _ => groups.push(Group::from_first(session.id, session.clone())),
            }
        }

        groups.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        groups
    }

    pub fn group(&self, id: Uuid) -> Option<Group> {
        self.grouped_sessions().into_iter().find(|g| g.id == id)
    }

    /// Remove a cycle's sessions, or a lone session by its own id.
    /// Returns how many sessions were removed.
    pub fn delete_group(&mut self, id: Uuid) -> usize {
        let before = self.sessions.len();
        if self.sessions.iter().any(|s| s.group_id == Some(id)) {
            self.sessions.retain(|s| s.group_id != Some(id));
        } else {
            self.sessions.retain(|s| s.id != id);
        }

        let removed = before - self.sessions.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    pub fn clear_all(&mut self) {
        self.sessions.clear();
        self.persist();
    }

    fn persist(&self) {
        let bytes = match serde_json::to_vec(&self.sessions) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to serialize session history");
                return;
            }
        };
        if let Err(e) = self.store.save(keys::SESSIONS, &bytes) {
            warn!(error = %e, "failed to persist session history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ActivityLabel;
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn at(minute: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn pomodoro(group: Uuid, position: u8, minute: i64) -> Session {
        Session {
            id: Uuid::new_v4(),
            start_time: at(minute),
            end_time: Some(at(minute + 1)),
            duration_secs: 60,
            kind: SessionKind::Pomodoro,
            label: ActivityLabel::Study,
            completed: true,
            group_id: Some(group),
            cycle_position: Some(position),
        }
    }

    fn simple(minute: i64) -> Session {
        Session {
            id: Uuid::new_v4(),
            start_time: at(minute),
            end_time: Some(at(minute + 1)),
            duration_secs: 30,
            kind: SessionKind::Simple,
            label: ActivityLabel::Leisure,
            completed: false,
            group_id: None,
            cycle_position: None,
        }
    }

    fn ledger() -> (SessionLedger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SessionLedger::load(store.clone()), store)
    }

    #[test]
    fn records_most_recent_first_and_persists() {
        let (mut ledger, store) = ledger();
        let first = simple(0);
        let second = simple(5);
        ledger.record(first.clone());
        ledger.record(second.clone());

        assert_eq!(ledger.sessions()[0], second);
        let reloaded = SessionLedger::load(store);
        assert_eq!(reloaded.sessions(), &[second, first]);
    }

    #[test]
    fn corrupt_history_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.save(keys::SESSIONS, b"{not json").unwrap();
        assert!(SessionLedger::load(store).is_empty());
    }

    #[test]
    fn groups_cycles_and_isolates_simple_runs() {
        let (mut ledger, _) = ledger();
        let cycle = Uuid::new_v4();
        ledger.record(pomodoro(cycle, 1, 0));
        ledger.record(pomodoro(cycle, 2, 25));
        ledger.record(simple(40));
        ledger.record(pomodoro(cycle, 3, 50));

        let groups = ledger.grouped_sessions();
        assert_eq!(groups.len(), 2);

        // The cycle started earliest, so the simple run sorts first.
        assert_eq!(groups[0].kind(), SessionKind::Simple);
        assert_eq!(groups[0].sessions.len(), 1);
        assert_eq!(groups[0].id, groups[0].sessions[0].id);

        let cycle_group = &groups[1];
        assert_eq!(cycle_group.id, cycle);
        let positions: Vec<_> = cycle_group
            .sessions
            .iter()
            .map(|s| s.cycle_position.unwrap())
            .collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(cycle_group.start_time, at(0));
        assert_eq!(cycle_group.end_time, Some(at(51)));
        assert_eq!(cycle_group.total_duration_secs(), 180);
        assert!(cycle_group.is_fully_completed());
    }

    #[test]
    fn delete_group_by_cycle_id() {
        let (mut ledger, store) = ledger();
        let cycle = Uuid::new_v4();
        let other = Uuid::new_v4();
        ledger.record(pomodoro(cycle, 1, 0));
        ledger.record(pomodoro(other, 1, 10));
        ledger.record(pomodoro(cycle, 2, 25));

        assert_eq!(ledger.delete_group(cycle), 2);
        assert_eq!(ledger.len(), 1);
        assert_eq!(SessionLedger::load(store).len(), 1);
    }

    #[test]
    fn delete_group_by_session_id_for_simple_runs() {
        let (mut ledger, _) = ledger();
        let run = simple(0);
        ledger.record(run.clone());
        ledger.record(simple(10));

        assert_eq!(ledger.delete_group(run.id), 1);
        assert!(ledger.sessions().iter().all(|s| s.id != run.id));
    }

    #[test]
    fn delete_unknown_group_is_noop() {
        let (mut ledger, _) = ledger();
        ledger.record(simple(0));
        assert_eq!(ledger.delete_group(Uuid::new_v4()), 0);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn clear_all_empties_storage() {
        let (mut ledger, store) = ledger();
        ledger.record(simple(0));
        ledger.clear_all();
        assert!(ledger.is_empty());
        assert!(SessionLedger::load(store).is_empty());
    }

    #[test]
    fn ungrouped_pomodoro_session_stands_alone() {
        let (mut ledger, _) = ledger();
        let mut legacy = pomodoro(Uuid::new_v4(), 1, 0);
        legacy.group_id = None;
        ledger.record(legacy.clone());

        let groups = ledger.grouped_sessions();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, legacy.id);
    }

    proptest! {
        #[test]
        fn grouping_partitions_history(layout in proptest::collection::vec((0u8..4, any::<bool>()), 0..40)) {
            let (mut ledger, _) = ledger();
            let cycles: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
            for (minute, (cycle, is_simple)) in layout.iter().enumerate() {
                let session = if *is_simple {
                    simple(minute as i64)
                } else {
                    pomodoro(cycles[*cycle as usize], 1, minute as i64)
                };
                ledger.record(session);
            }

            let groups = ledger.grouped_sessions();
            let total: usize = groups.iter().map(|g| g.sessions.len()).sum();
            prop_assert_eq!(total, ledger.len());

            let mut seen = std::collections::HashSet::new();
            for group in &groups {
                for session in &group.sessions {
                    prop_assert!(seen.insert(session.id));
                    match session.kind {
                        SessionKind::Simple => prop_assert_eq!(group.sessions.len(), 1),
                        SessionKind::Pomodoro => prop_assert_eq!(session.group_id, Some(group.id)),
                    }
                }
            }

            for pair in groups.windows(2) {
                prop_assert!(pair[0].start_time >= pair[1].start_time);
            }
        }
    }
}
