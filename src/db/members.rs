//! SQL for the `members` table (the member directory).

use crate::models::member::Member;
use chrono::Utc;
use rusqlite::{Connection, Result, Row, params};

fn map_member(row: &Row) -> Result<Member> {
    Ok(Member {
        email: row.get("email")?,
        full_name: row.get("full_name")?,
        first_name: row.get("first_name")?,
        active: row.get::<_, i32>("active")? == 1,
    })
}

/// Insert a member, or refresh the names and reactivate an existing one.
pub fn upsert_member(conn: &Connection, m: &Member) -> Result<()> {
    conn.execute(
        "INSERT INTO members (email, full_name, first_name, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(email) DO UPDATE SET
            full_name  = excluded.full_name,
            first_name = excluded.first_name,
            active     = excluded.active",
        params![
            m.email,
            m.full_name,
            m.first_name,
            if m.active { 1 } else { 0 },
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Returns `false` when no member has that e-mail.
pub fn set_active(conn: &Connection, email: &str, active: bool) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE members SET active = ?1 WHERE email = ?2",
        params![if active { 1 } else { 0 }, email],
    )?;
    Ok(changed > 0)
}

/// Any member row, active or not.
pub fn member_exists(conn: &Connection, email: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM members WHERE email = ?1 LIMIT 1")?;
    stmt.exists([email])
}

/// Active members ordered by full name.
pub fn list_active_members(conn: &Connection) -> Result<Vec<Member>> {
    let mut stmt = conn.prepare(
        "SELECT email, full_name, first_name, active FROM members
         WHERE active = 1
         ORDER BY full_name ASC",
    )?;
    let rows = stmt.query_map([], map_member)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
