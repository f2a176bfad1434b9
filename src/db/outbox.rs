//! Durable notification outbox (`notifications` table).
//!
//! `notify` only appends a row; delivery happens later through
//! `core::outbox::OutboxDispatcher`, outside the request path.

use crate::core::ports::NotificationSink;
use crate::db::queries::{ts_from_db, ts_to_db};
use crate::db::store::SqliteStore;
use crate::errors::{NotifyError, StoreError, StoreResult};
use crate::models::change::{ClockChange, OutboxEntry, OutboxStatus};
use crate::models::hour_log::LogId;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};

const COLUMNS: &str = "id, member_id, logging_in, log_id, status, created_at, attempts, \
                       next_attempt_at, delivered_at, last_error";

#[derive(Debug, Clone)]
pub struct OutboxSink {
    store: SqliteStore,
}

fn map_entry(row: &Row) -> rusqlite::Result<OutboxEntry> {
    let status: String = row.get("status")?;
    let status = OutboxStatus::from_db_str(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("Invalid outbox status: {status}").into(),
        )
    })?;
    let created_at: String = row.get("created_at")?;
    let next_attempt_at: String = row.get("next_attempt_at")?;
    let delivered_at: Option<String> = row.get("delivered_at")?;

    Ok(OutboxEntry {
        id: row.get("id")?,
        change: ClockChange {
            member: row.get("member_id")?,
            logging_in: row.get::<_, i32>("logging_in")? == 1,
            log_id: LogId(row.get("log_id")?),
        },
        status,
        created_at: ts_from_db(5, &created_at)?,
        attempts: row.get("attempts")?,
        next_attempt_at: ts_from_db(7, &next_attempt_at)?,
        delivered_at: delivered_at.as_deref().map(|s| ts_from_db(8, s)).transpose()?,
        last_error: row.get("last_error")?,
    })
}

fn select(
    conn: &Connection,
    where_sql: &str,
    args: &[&dyn rusqlite::ToSql],
) -> rusqlite::Result<Vec<OutboxEntry>> {
    let sql = format!("SELECT {COLUMNS} FROM notifications {where_sql}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(args, map_entry)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

impl OutboxSink {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    pub fn enqueue(&self, change: &ClockChange, now: DateTime<Utc>) -> StoreResult<i64> {
        self.store.with_connection(|conn| {
            let id = conn.query_row(
                "INSERT INTO notifications
                     (member_id, logging_in, log_id, created_at, next_attempt_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 RETURNING id",
                params![
                    change.member,
                    if change.logging_in { 1 } else { 0 },
                    change.log_id.0,
                    ts_to_db(&now),
                ],
                |row| row.get(0),
            )?;
            Ok(id)
        })
    }

    /// Entries still waiting for delivery, oldest first.
    pub fn queued(&self) -> StoreResult<Vec<OutboxEntry>> {
        self.store.with_connection(|conn| {
            Ok(select(conn, "WHERE status = 'queued' ORDER BY id ASC", &[])?)
        })
    }

    /// Most recent entries, any status.
    pub fn recent(&self, limit: u32) -> StoreResult<Vec<OutboxEntry>> {
        self.store.with_connection(|conn| {
            let mut rows = select(conn, "ORDER BY id DESC LIMIT ?1", &[&limit])?;
            rows.reverse();
            Ok(rows)
        })
    }

    pub fn mark_delivered(&self, id: i64, now: DateTime<Utc>) -> StoreResult<()> {
        self.update(
            "UPDATE notifications
             SET status = 'delivered', attempts = attempts + 1, delivered_at = ?2, last_error = ?3
             WHERE id = ?1 AND status = 'queued'",
            id,
            &ts_to_db(&now),
            None,
        )
    }

    /// Record a failed attempt and the time of the next one.
    pub fn mark_retry(
        &self,
        id: i64,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> StoreResult<()> {
        self.update(
            "UPDATE notifications
             SET attempts = attempts + 1, next_attempt_at = ?2, last_error = ?3
             WHERE id = ?1 AND status = 'queued'",
            id,
            &ts_to_db(&next_attempt_at),
            Some(error),
        )
    }

    pub fn mark_abandoned(&self, id: i64, now: DateTime<Utc>, error: &str) -> StoreResult<()> {
        self.update(
            "UPDATE notifications
             SET status = 'abandoned', attempts = attempts + 1,
                 next_attempt_at = ?2, last_error = ?3
             WHERE id = ?1 AND status = 'queued'",
            id,
            &ts_to_db(&now),
            Some(error),
        )
    }

    fn update(&self, sql: &str, id: i64, ts: &str, error: Option<&str>) -> StoreResult<()> {
        self.store.with_connection(|conn| {
            let changed = conn.execute(sql, params![id, ts, error])?;
            if changed == 0 {
                return Err(StoreError::Conflict);
            }
            Ok(())
        })
    }
}

impl NotificationSink for OutboxSink {
    fn notify(&self, change: &ClockChange) -> Result<(), NotifyError> {
        self.enqueue(change, Utc::now())?;
        Ok(())
    }
}
