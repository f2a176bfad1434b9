use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Result, params};
use tracing::info;

/// One schema step. Applied steps are recorded in the `log` table as
/// `migration_applied` rows, keyed by `version`.
struct Migration {
    version: &'static str,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20250301_0001_create_members",
        description: "Created members table",
        sql: r#"
        CREATE TABLE IF NOT EXISTS members (
            email       TEXT PRIMARY KEY,
            full_name   TEXT NOT NULL,
            first_name  TEXT NOT NULL,
            active      INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL
        );
        "#,
    },
    Migration {
        version: "20250301_0002_create_hour_logs",
        description: "Created hour_logs table",
        sql: r#"
        CREATE TABLE IF NOT EXISTS hour_logs (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            member_id     TEXT NOT NULL,
            type          TEXT NOT NULL,
            state         TEXT NOT NULL CHECK(state IN ('pending','complete','cancelled')),
            time_in       TEXT NOT NULL,
            time_out      TEXT,
            duration      REAL,
            message       TEXT,
            external_ref  TEXT,
            CHECK ((state = 'pending') = (time_out IS NULL))
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_hour_logs_one_pending_lab
            ON hour_logs(member_id) WHERE state = 'pending' AND type = 'lab';
        CREATE INDEX IF NOT EXISTS idx_hour_logs_state_type ON hour_logs(state, type);
        CREATE INDEX IF NOT EXISTS idx_hour_logs_member ON hour_logs(member_id);
        "#,
    },
    Migration {
        version: "20250301_0003_hour_log_guards",
        description: "Added write-once and monotone state triggers",
        sql: r#"
        CREATE TRIGGER IF NOT EXISTS trg_hour_logs_write_once
        BEFORE UPDATE ON hour_logs
        WHEN NEW.member_id IS NOT OLD.member_id
          OR NEW.time_in IS NOT OLD.time_in
          OR NEW.duration IS NOT OLD.duration
          OR NEW.message IS NOT OLD.message
        BEGIN
            SELECT RAISE(ABORT, 'hour log field is write-once');
        END;

        CREATE TRIGGER IF NOT EXISTS trg_hour_logs_no_reopen
        BEFORE UPDATE OF state ON hour_logs
        WHEN OLD.state != 'pending' AND NEW.state = 'pending'
        BEGIN
            SELECT RAISE(ABORT, 'closed hour log cannot be reopened');
        END;

        CREATE TRIGGER IF NOT EXISTS trg_hour_logs_lab_type
        BEFORE UPDATE OF type ON hour_logs
        WHEN OLD.type = 'lab' AND NEW.type != 'lab'
        BEGIN
            SELECT RAISE(ABORT, 'lab log type cannot change');
        END;
        "#,
    },
    Migration {
        version: "20250301_0004_create_notifications",
        description: "Created notifications outbox",
        sql: r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            member_id        TEXT NOT NULL,
            logging_in       INTEGER NOT NULL,
            log_id           INTEGER NOT NULL,
            status           TEXT NOT NULL DEFAULT 'queued'
                             CHECK(status IN ('queued','delivered','abandoned')),
            created_at       TEXT NOT NULL,
            attempts         INTEGER NOT NULL DEFAULT 0,
            next_attempt_at  TEXT NOT NULL,
            delivered_at     TEXT,
            last_error       TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_due
            ON notifications(status, next_attempt_at);
        "#,
    },
];

/// Ensure that the `log` table exists with the modern schema.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn is_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn apply(conn: &Connection, m: &Migration) -> Result<()> {
    conn.execute_batch("BEGIN IMMEDIATE;")?;

    let outcome = (|| -> Result<bool> {
        // Re-check under the write lock: another process may have migrated.
        if is_applied(conn, m.version)? {
            return Ok(false);
        }
        conn.execute_batch(m.sql)?;
        conn.execute(
            "INSERT INTO log (date, operation, target, message)
             VALUES (?1, 'migration_applied', ?2, ?3)",
            params![Utc::now().to_rfc3339(), m.version, m.description],
        )?;
        Ok(true)
    })();

    match outcome {
        Ok(applied) => {
            conn.execute_batch("COMMIT;")?;
            if applied {
                info!(version = m.version, "migration applied");
            }
            Ok(())
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK;");
            Err(e)
        }
    }
}

/// Versions already applied, oldest first.
pub fn applied_versions(conn: &Connection) -> Result<Vec<String>> {
    ensure_log_table(conn)?;
    let mut stmt = conn.prepare(
        "SELECT target FROM log WHERE operation = 'migration_applied' ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Run all pending migrations.
pub fn run_pending_migrations(conn: &Connection) -> Result<()> {
    ensure_log_table(conn)?;

    for m in MIGRATIONS {
        if !is_applied(conn, m.version)? {
            apply(conn, m)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_pending_migrations(&conn).unwrap();
        run_pending_migrations(&conn).unwrap();

        let versions = applied_versions(&conn).unwrap();
        assert_eq!(versions.len(), MIGRATIONS.len());
    }

    #[test]
    fn schema_rejects_second_pending_lab_log() {
        let conn = Connection::open_in_memory().unwrap();
        run_pending_migrations(&conn).unwrap();

        let insert = "INSERT INTO hour_logs (member_id, type, state, time_in)
                      VALUES ('a@x.org', 'lab', 'pending', '2025-01-01T09:00:00Z')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());

        // Pending external claims are not constrained.
        let external = "INSERT INTO hour_logs (member_id, type, state, time_in, duration, message)
                        VALUES ('a@x.org', 'external', 'pending', '2025-01-01T09:00:00Z', 2, 'x')";
        conn.execute(external, []).unwrap();
        conn.execute(external, []).unwrap();
    }

    #[test]
    fn schema_ties_time_out_to_state() {
        let conn = Connection::open_in_memory().unwrap();
        run_pending_migrations(&conn).unwrap();

        let closed_without_time_out = conn.execute(
            "INSERT INTO hour_logs (member_id, type, state, time_in)
             VALUES ('a@x.org', 'lab', 'complete', '2025-01-01T09:00:00Z')",
            [],
        );
        assert!(closed_without_time_out.is_err());
    }

    #[test]
    fn triggers_protect_write_once_fields_and_terminal_states() {
        let conn = Connection::open_in_memory().unwrap();
        run_pending_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO hour_logs (member_id, type, state, time_in, time_out, duration, message)
             VALUES ('a@x.org', 'external', 'complete', '2025-01-01T09:00:00Z',
                     '2025-01-01T10:00:00Z', 2, 'x')",
            [],
        )
        .unwrap();

        assert!(
            conn.execute("UPDATE hour_logs SET duration = 5 WHERE id = 1", [])
                .is_err()
        );
        assert!(
            conn.execute(
                "UPDATE hour_logs SET state = 'pending', time_out = NULL WHERE id = 1",
                []
            )
            .is_err()
        );
        conn.execute("UPDATE hour_logs SET external_ref = 'ts' WHERE id = 1", [])
            .unwrap();
    }
}
