//! SQLite connection helpers (lightweight for CLI usage).
//!
//! Every connection gets the same pragmas so that several processes, or
//! several threads each holding their own connection, can write to the same
//! database file.

use rusqlite::{Connection, OpenFlags, Result};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

pub struct DbPool {
    pub conn: Connection,
}

impl DbPool {
    pub fn new(path: &str) -> Result<Self> {
        let conn = open_connection(Path::new(path))?;
        Ok(Self { conn })
    }
}

/// Open a read-write connection, creating the file if missing.
pub fn open_connection(path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let conn = Connection::open_with_flags(path, flags)?;

    // busy_timeout first: switching to WAL needs a lock another writer may hold.
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if !is_memory_path(path) {
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    }
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    Ok(conn)
}

fn is_memory_path(path: &Path) -> bool {
    path.as_os_str() == ":memory:"
}
