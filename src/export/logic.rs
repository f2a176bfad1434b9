// src/export/logic.rs

use crate::db::queries::list_logs;
use crate::errors::{AppError, AppResult};
use crate::export::json_csv::{export_csv, export_json};
use crate::export::{ExportFormat, HourLogExport};
use crate::models::hour_log::{LogFilter, LogState};
use crate::ui::messages::warning;
use crate::utils::path::{ensure_writable, expand_tilde};
use rusqlite::Connection;

/// High level export entry point.
pub struct ExportLogic;

impl ExportLogic {
    /// Export hour logs, oldest first.
    ///
    /// - `format`: csv | json
    /// - `file`: absolute output path (`~/` is expanded)
    /// - `state`: `None` for every log, or `pending` | `complete` | `cancelled`
    pub fn export(
        conn: &Connection,
        format: ExportFormat,
        file: &str,
        state: Option<&str>,
        force: bool,
    ) -> AppResult<usize> {
        let path = expand_tilde(file);

        if !path.is_absolute() {
            return Err(AppError::Export(format!(
                "Output file path must be absolute: {file}"
            )));
        }

        let filter = LogFilter {
            state: state.map(parse_state).transpose()?,
            ..Default::default()
        };

        let rows: Vec<HourLogExport> = list_logs(conn, &filter)?
            .iter()
            .map(HourLogExport::from)
            .collect();

        if rows.is_empty() {
            warning("No hour logs found for the selected filter. Nothing to export.");
            return Ok(0);
        }

        ensure_writable(&path, force)?;

        match format {
            ExportFormat::Csv => export_csv(&rows, &path)?,
            ExportFormat::Json => export_json(&rows, &path)?,
        }

        Ok(rows.len())
    }
}

fn parse_state(s: &str) -> AppResult<LogState> {
    LogState::from_db_str(&s.trim().to_ascii_lowercase()).ok_or_else(|| {
        AppError::Export(format!(
            "Unknown state '{s}'. Use one of: pending, complete, cancelled"
        ))
    })
}
