//! SQLite-backed session store, member directory and audit trail.
//!
//! A `SqliteStore` only holds the database path and opens a connection per
//! operation, so one store can be shared by any number of threads. The
//! one-pending-lab-log rule is enforced by a partial unique index; a
//! violation is reported as `StoreError::Conflict`.

use crate::core::gateway::ClockGateway;
use crate::core::ports::{AuditTrail, MemberDirectory, SessionStore};
use crate::db::outbox::OutboxSink;
use crate::db::{log, members, migrate, pool, queries};
use crate::errors::{StoreError, StoreResult};
use crate::models::hour_log::{HourLog, LogFamily, LogFilter, LogId, LogUpdate, NewHourLog};
use rusqlite::{Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Gateway wired to a single SQLite database.
pub type SqliteGateway = ClockGateway<SqliteStore, SqliteStore, OutboxSink>;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open the store at `path`, running pending migrations.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        store.with_connection(|conn| Ok(migrate::run_pending_migrations(conn)?))?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gateway using this database for logs, members, audit and outbox.
    pub fn gateway(&self) -> SqliteGateway {
        ClockGateway::new(self.clone(), self.clone(), OutboxSink::new(self.clone()))
            .with_audit(Arc::new(self.clone()))
    }

    pub(crate) fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let conn = pool::open_connection(&self.path)?;
        op(&conn).map_err(|e| match e {
            StoreError::Sqlite(err) => classify(err),
            other => other,
        })
    }
}

/// Map unique-constraint violations to `Conflict` and undecodable rows to `Corrupt`.
fn classify(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::Conflict
        }
        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..) => {
            StoreError::Corrupt(err.to_string())
        }
        _ => StoreError::Sqlite(err),
    }
}

impl SessionStore for SqliteStore {
    fn find_pending_log(&self, member_id: &str, family: LogFamily) -> StoreResult<Option<HourLog>> {
        self.with_connection(|conn| Ok(queries::find_pending_log(conn, member_id, family)?))
    }

    fn create_log(&self, new: &NewHourLog) -> StoreResult<HourLog> {
        self.with_connection(|conn| Ok(queries::insert_log(conn, new)?))
    }

    fn update_log(&self, id: LogId, update: &LogUpdate) -> StoreResult<HourLog> {
        self.with_connection(|conn| match queries::update_log(conn, id, update)? {
            Some(log) => Ok(log),
            None if queries::get_log(conn, id)?.is_some() => Err(StoreError::Conflict),
            None => Err(StoreError::NotFound(id)),
        })
    }

    fn get_log(&self, id: LogId) -> StoreResult<Option<HourLog>> {
        self.with_connection(|conn| Ok(queries::get_log(conn, id)?))
    }

    fn list_logs(&self, filter: &LogFilter) -> StoreResult<Vec<HourLog>> {
        self.with_connection(|conn| Ok(queries::list_logs(conn, filter)?))
    }
}

impl MemberDirectory for SqliteStore {
    fn exists(&self, member_id: &str) -> StoreResult<bool> {
        self.with_connection(|conn| Ok(members::member_exists(conn, member_id)?))
    }
}

impl AuditTrail for SqliteStore {
    fn record(&self, operation: &str, target: &str, message: &str) -> StoreResult<()> {
        self.with_connection(|conn| Ok(log::write_log(conn, operation, target, message)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClockError;
    use crate::models::action::{LabAction, RespondOutcome};
    use crate::models::hour_log::{LogKind, LogState};
    use crate::models::member::Member;
    use chrono::Utc;

    fn store_with_member(dir: &tempfile::TempDir) -> SqliteStore {
        let store = SqliteStore::open(dir.path().join("cluck.sqlite")).unwrap();
        store
            .with_connection(|conn| {
                members::upsert_member(conn, &Member::new("a@x.org", "Ada Lovelace"))?;
                Ok(())
            })
            .unwrap();
        store
    }

    #[test]
    fn duplicate_pending_lab_insert_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_member(&dir);
        let new = NewHourLog {
            member_id: "a@x.org".into(),
            kind: LogKind::Lab,
            time_in: Utc::now(),
            duration: None,
            message: None,
        };

        store.create_log(&new).unwrap();
        assert!(matches!(store.create_log(&new), Err(StoreError::Conflict)));
    }

    #[test]
    fn guarded_update_distinguishes_conflict_from_missing() {
        let dir = tempfile::tempdir().unwrap();
        let gw = store_with_member(&dir).gateway();

        let log = gw.lab("a@x.org", LabAction::In).unwrap();
        gw.lab("a@x.org", LabAction::Out).unwrap();

        let close = LogUpdate {
            state: Some(LogState::Cancelled),
            time_out: Some(Utc::now()),
            guard: crate::models::hour_log::UpdateGuard::Pending,
            ..Default::default()
        };
        assert!(matches!(
            gw.store().update_log(log.id, &close),
            Err(StoreError::Conflict)
        ));
        assert!(matches!(
            gw.store().update_log(LogId(999), &close),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn timestamps_survive_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let gw = store_with_member(&dir).gateway();

        let opened = gw.lab("a@x.org", LabAction::In).unwrap();
        let loaded = gw.get(opened.id).unwrap();
        assert_eq!(loaded.time_in, opened.time_in);
        assert!(loaded.time_out.is_none());
    }

    #[test]
    fn lab_in_queues_one_notification_and_audits() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_member(&dir);
        let gw = store.gateway();

        gw.lab("a@x.org", LabAction::In).unwrap();
        gw.lab("a@x.org", LabAction::Out).unwrap();

        let queued = OutboxSink::new(store.clone()).queued().unwrap();
        assert_eq!(queued.len(), 1);
        assert!(queued[0].change.logging_in);

        let opens = store
            .with_connection(|conn| Ok(log::count_operation(conn, "open")?))
            .unwrap();
        assert_eq!(opens, 1);
    }

    #[test]
    fn reclose_is_logged_distinctly_each_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_member(&dir);
        let gw = store.gateway();

        let log = gw.external_submit("a@x.org", 3.0, "helped setup").unwrap();
        gw.external_respond(log.id, &RespondOutcome::Approve, Some("volunteer"))
            .unwrap();
        gw.external_respond(log.id, &RespondOutcome::Approve, Some("volunteer"))
            .unwrap();
        let last = gw
            .external_respond(log.id, &RespondOutcome::parse("deny"), None)
            .unwrap();

        assert_eq!(last.state, LogState::Cancelled);
        // Category from the earlier approval stays: cancelling never retypes.
        assert_eq!(last.kind, LogKind::Category("volunteer".into()));
        let recloses = store
            .with_connection(|conn| Ok(log::count_operation(conn, "reclose")?))
            .unwrap();
        assert_eq!(recloses, 2);
    }

    #[test]
    fn concurrent_logins_across_threads_yield_one_pending_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_member(&dir);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gw = store.gateway();
                std::thread::spawn(move || gw.lab("a@x.org", LabAction::In))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let ok: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(ok.len(), 1);
        assert!(results.iter().all(|r| match r {
            Ok(_) => true,
            Err(ClockError::DuplicateSession { log_id }) => *log_id == ok[0].id,
            Err(_) => false,
        }));

        let pending = store
            .list_logs(&LogFilter::pending(LogFamily::Lab))
            .unwrap();
        assert_eq!(pending.len(), 1);
    }
}
