pub mod backup;
pub mod config;
pub mod db;
pub mod export;
pub mod external;
pub mod init;
pub mod lab;
pub mod log;
pub mod member;
pub mod outbox;
pub mod pending;
pub mod show;

use crate::core::gateway::ClockResult;
use crate::errors::{AppError, AppResult};
use crate::models::hour_log::HourLog;
use crate::models::response::ClockResponse;

/// Print the `ClockResponse` payload of a clock action on stdout.
/// A rejected action still prints its payload, then fails the command.
pub(crate) fn emit_response(result: ClockResult<HourLog>) -> AppResult<()> {
    let response = ClockResponse::from_result(&result);
    let json = serde_json::to_string(&response).map_err(|e| AppError::Other(e.to_string()))?;
    println!("{json}");

    result?;
    Ok(())
}
