use crate::db::queries::count_by_state;
use crate::utils::colors::{CYAN, GREEN, GREY, RESET, YELLOW};
use rusqlite::{Connection, OptionalExtension};
use std::fs;

pub fn print_db_info(conn: &Connection, db_path: &str) -> rusqlite::Result<()> {
    println!();

    //
    // 1) FILE SIZE
    //
    let file_size = fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let file_mb = (file_size as f64) / (1024.0 * 1024.0);

    println!("{}• File:{} {}{}{}", CYAN, RESET, YELLOW, db_path, RESET);
    println!("{}• Size:{} {:.2} MB", CYAN, RESET, file_mb);

    //
    // 2) MEMBERS
    //
    let (members, active): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(active), 0) FROM members",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    println!(
        "{}• Members:{} {}{}{} ({} active)",
        CYAN, RESET, GREEN, members, RESET, active
    );

    //
    // 3) HOUR LOGS BY STATE / TYPE
    //
    let counts = count_by_state(conn)?;
    let total: i64 = counts.iter().map(|(_, _, n)| n).sum();
    println!(
        "{}• Hour logs:{} {}{}{}",
        CYAN, RESET, GREEN, total, RESET
    );
    for (state, kind, n) in &counts {
        println!("    {:<10} {:<14} {}", state, kind, n);
    }

    //
    // 4) TIME RANGE
    //
    let range: Option<(Option<String>, Option<String>)> = conn
        .query_row(
            "SELECT MIN(time_in), MAX(time_in) FROM hour_logs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (first, last) = range.unwrap_or((None, None));

    println!("{}• Time range:{}", CYAN, RESET);
    println!(
        "    from: {}",
        first.unwrap_or_else(|| format!("{GREY}--{RESET}"))
    );
    println!(
        "    to:   {}",
        last.unwrap_or_else(|| format!("{GREY}--{RESET}"))
    );

    //
    // 5) OUTBOX
    //
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM notifications GROUP BY status ORDER BY status",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

    println!("{}• Outbox:{}", CYAN, RESET);
    let mut any = false;
    for r in rows {
        let (status, n) = r?;
        println!("    {:<10} {}", status, n);
        any = true;
    }
    if !any {
        println!("    {GREY}empty{RESET}");
    }

    println!();
    Ok(())
}
