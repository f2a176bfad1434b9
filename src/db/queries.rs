//! SQL for the `hour_logs` table.

use crate::errors::AppError;
use crate::models::hour_log::{
    HourLog, LogFamily, LogFilter, LogId, LogKind, LogState, LogUpdate, NewHourLog, UpdateGuard,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Result, Row, ToSql, params};

const COLUMNS: &str =
    "id, member_id, type, state, time_in, time_out, duration, message, external_ref";

/// Timestamps are stored as RFC 3339 UTC with fixed precision so that they
/// sort lexicographically.
pub fn ts_to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn ts_from_db(idx: usize, s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub fn map_row(row: &Row) -> Result<HourLog> {
    let state_str: String = row.get("state")?;
    let state = LogState::from_db_str(&state_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            Box::new(AppError::Other(format!("Invalid state: {}", state_str))),
        )
    })?;

    let time_in: String = row.get("time_in")?;
    let time_out: Option<String> = row.get("time_out")?;
    let kind: String = row.get("type")?;

    Ok(HourLog {
        id: LogId(row.get("id")?),
        member_id: row.get("member_id")?,
        kind: LogKind::from_db_str(&kind),
        state,
        time_in: ts_from_db(4, &time_in)?,
        time_out: time_out.as_deref().map(|s| ts_from_db(5, s)).transpose()?,
        duration: row.get("duration")?,
        message: row.get("message")?,
        external_ref: row.get("external_ref")?,
    })
}

pub fn insert_log(conn: &Connection, new: &NewHourLog) -> Result<HourLog> {
    let sql = format!(
        "INSERT INTO hour_logs (member_id, type, state, time_in, duration, message)
         VALUES (?1, ?2, 'pending', ?3, ?4, ?5)
         RETURNING {COLUMNS}"
    );
    conn.query_row(
        &sql,
        params![
            new.member_id,
            new.kind.to_db_str(),
            ts_to_db(&new.time_in),
            new.duration,
            new.message,
        ],
        map_row,
    )
}

/// Apply `update` in one statement. `None` when no row matched the id and guard.
pub fn update_log(conn: &Connection, id: LogId, update: &LogUpdate) -> Result<Option<HourLog>> {
    let guard = match update.guard {
        UpdateGuard::Any => "",
        UpdateGuard::Pending => " AND state = 'pending'",
    };
    let sql = format!(
        "UPDATE hour_logs
         SET state        = COALESCE(?1, state),
             time_out     = COALESCE(?2, time_out),
             type         = COALESCE(?3, type),
             external_ref = COALESCE(?4, external_ref)
         WHERE id = ?5{guard}
         RETURNING {COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            update.state.map(|s| s.to_db_str()),
            update.time_out.as_ref().map(ts_to_db),
            update.kind.as_ref().map(|k| k.to_db_str().to_string()),
            update.external_ref,
            id.0,
        ],
        map_row,
    )
    .optional()
}

pub fn get_log(conn: &Connection, id: LogId) -> Result<Option<HourLog>> {
    let sql = format!("SELECT {COLUMNS} FROM hour_logs WHERE id = ?1");
    conn.query_row(&sql, [id.0], map_row).optional()
}

pub fn find_pending_log(
    conn: &Connection,
    member_id: &str,
    family: LogFamily,
) -> Result<Option<HourLog>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM hour_logs
         WHERE state = 'pending' AND type = ?1 AND member_id = ?2
         ORDER BY time_in ASC, id ASC
         LIMIT 1"
    );
    conn.query_row(&sql, params![family.as_str(), member_id], map_row)
        .optional()
}

pub fn list_logs(conn: &Connection, filter: &LogFilter) -> Result<Vec<HourLog>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    if let Some(kind) = &filter.kind {
        clauses.push("type = ?");
        values.push(kind.to_db_str().to_string());
    }
    if let Some(state) = filter.state {
        clauses.push("state = ?");
        values.push(state.to_db_str().to_string());
    }
    if let Some(member) = &filter.member_id {
        clauses.push("member_id = ?");
        values.push(member.clone());
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!("SELECT {COLUMNS} FROM hour_logs{where_sql} ORDER BY time_in ASC, id ASC");

    let params: Vec<&dyn ToSql> = values.iter().map(|s| s as &dyn ToSql).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params), map_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// `(state, type, count)` for every combination present.
pub fn count_by_state(conn: &Connection) -> Result<Vec<(String, String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT state, type, COUNT(*) FROM hour_logs
         GROUP BY state, type
         ORDER BY state, type",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
