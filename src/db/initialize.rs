use crate::db::migrate::{applied_versions, run_pending_migrations};
use crate::errors::AppResult;
use rusqlite::Connection;

/// Initialize the database.
/// Delegates all schema creation / upgrades to the migration engine and
/// returns the versions applied by this call.
pub fn init_db(conn: &Connection) -> AppResult<Vec<String>> {
    let before = applied_versions(conn)?;
    run_pending_migrations(conn)?;
    let applied = applied_versions(conn)?
        .into_iter()
        .filter(|v| !before.contains(v))
        .collect();
    Ok(applied)
}
