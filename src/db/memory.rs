//! In-memory store, directory and audit trail.
//!
//! Same contract as the SQLite implementations, including the
//! one-pending-lab-log constraint, checked under the store lock.

use crate::core::machine;
use crate::core::ports::{AuditTrail, MemberDirectory, SessionStore};
use crate::errors::{StoreError, StoreResult};
use crate::models::hour_log::{
    HourLog, LogFamily, LogFilter, LogId, LogKind, LogState, LogUpdate, NewHourLog, UpdateGuard,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    logs: BTreeMap<LogId, HourLog>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

impl SessionStore for MemoryStore {
    fn find_pending_log(&self, member_id: &str, family: LogFamily) -> StoreResult<Option<HourLog>> {
        let kind = family.kind();
        Ok(self
            .lock()?
            .logs
            .values()
            .find(|l| l.member_id == member_id && l.kind == kind && l.is_pending())
            .cloned())
    }

    fn create_log(&self, new: &NewHourLog) -> StoreResult<HourLog> {
        let mut state = self.lock()?;

        if new.kind == LogKind::Lab
            && state
                .logs
                .values()
                .any(|l| l.member_id == new.member_id && l.kind == LogKind::Lab && l.is_pending())
        {
            return Err(StoreError::Conflict);
        }

        state.next_id += 1;
        let log = HourLog {
            id: LogId(state.next_id),
            member_id: new.member_id.clone(),
            kind: new.kind.clone(),
            state: LogState::Pending,
            time_in: new.time_in,
            time_out: None,
            duration: new.duration,
            message: new.message.clone(),
            external_ref: None,
        };
        state.logs.insert(log.id, log.clone());
        Ok(log)
    }

    fn update_log(&self, id: LogId, update: &LogUpdate) -> StoreResult<HourLog> {
        let mut state = self.lock()?;
        let current = state.logs.get(&id).ok_or(StoreError::NotFound(id))?;

        if update.guard == UpdateGuard::Pending && !current.is_pending() {
            return Err(StoreError::Conflict);
        }

        let next = machine::apply(current, update);
        state.logs.insert(id, next.clone());
        Ok(next)
    }

    fn get_log(&self, id: LogId) -> StoreResult<Option<HourLog>> {
        Ok(self.lock()?.logs.get(&id).cloned())
    }

    fn list_logs(&self, filter: &LogFilter) -> StoreResult<Vec<HourLog>> {
        Ok(self
            .lock()?
            .logs
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    members: HashSet<String>,
}

impl MemoryDirectory {
    pub fn with_members<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

impl MemberDirectory for MemoryDirectory {
    fn exists(&self, member_id: &str) -> StoreResult<bool> {
        Ok(self.members.contains(member_id))
    }
}

/// One audit entry: `(operation, target, message)`.
pub type AuditRecord = (String, String, String);

#[derive(Debug, Default)]
pub struct MemoryAudit {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAudit {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.records()
            .iter()
            .filter(|(op, _, _)| op == operation)
            .count()
    }
}

impl AuditTrail for MemoryAudit {
    fn record(&self, operation: &str, target: &str, message: &str) -> StoreResult<()> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("audit lock poisoned".into()))?
            .push((operation.into(), target.into(), message.into()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_lab(member: &str) -> NewHourLog {
        NewHourLog {
            member_id: member.into(),
            kind: LogKind::Lab,
            time_in: Utc::now(),
            duration: None,
            message: None,
        }
    }

    #[test]
    fn second_pending_lab_log_conflicts() {
        let store = MemoryStore::default();
        store.create_log(&new_lab("a@x.org")).unwrap();

        assert!(matches!(
            store.create_log(&new_lab("a@x.org")),
            Err(StoreError::Conflict)
        ));
        assert!(store.create_log(&new_lab("b@x.org")).is_ok());
    }

    #[test]
    fn pending_guard_rejects_closed_logs() {
        let store = MemoryStore::default();
        let log = store.create_log(&new_lab("a@x.org")).unwrap();

        let close = LogUpdate {
            state: Some(LogState::Complete),
            time_out: Some(Utc::now()),
            guard: UpdateGuard::Pending,
            ..Default::default()
        };
        store.update_log(log.id, &close).unwrap();

        assert!(matches!(
            store.update_log(log.id, &close),
            Err(StoreError::Conflict)
        ));
        assert!(matches!(
            store.update_log(LogId(42), &close),
            Err(StoreError::NotFound(LogId(42)))
        ));
    }
}
