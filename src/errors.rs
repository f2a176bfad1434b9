//! Unified application error type.
//! All modules (db, core, cli, utils) return AppError to keep the error
//! handling consistent and easy to manage. Clock actions have their own
//! typed taxonomy (`ClockError`) because callers branch on it.

use crate::models::hour_log::LogId;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // ---------------------------
    // Clock actions
    // ---------------------------
    #[error("{0}")]
    Clock(#[from] ClockError),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration")]
    ConfigLoad,

    // ---------------------------
    // Export errors
    // ---------------------------
    #[error("Export error: {0}")]
    Export(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// Outcome of a rejected clock action.
///
/// Every variant maps to a stable machine code and to the human readable
/// reason sent back in the response payload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClockError {
    #[error("member unknown")]
    UnknownMember(String),

    #[error("request unknown")]
    UnknownSession(LogId),

    #[error("member already logged in")]
    DuplicateSession { log_id: LogId },

    #[error("member not signed in")]
    NoActiveSession(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown")]
    InternalError,
}

impl ClockError {
    pub fn code(&self) -> &'static str {
        match self {
            ClockError::UnknownMember(_) => "unknown_member",
            ClockError::UnknownSession(_) => "unknown_session",
            ClockError::DuplicateSession { .. } => "duplicate_session",
            ClockError::NoActiveSession(_) => "no_active_session",
            ClockError::InvalidRequest(_) => "invalid_request",
            ClockError::InternalError => "internal_error",
        }
    }

    /// HTTP-style status hint for callers that expose the gateway over a wire.
    pub fn status_hint(&self) -> u16 {
        match self {
            ClockError::InternalError => 500,
            _ => 400,
        }
    }

    /// Log id the caller can use to self-correct, if any.
    pub fn log_id(&self) -> Option<LogId> {
        match self {
            ClockError::DuplicateSession { log_id } => Some(*log_id),
            _ => None,
        }
    }
}

/// Stable code of the non-fatal warning raised when a terminal log is closed again.
pub const ALREADY_CLOSED: &str = "already_closed";

/// Failures reported by a `SessionStore`, `MemberDirectory` or outbox.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint or an update guard rejected the write.
    #[error("write conflict")]
    Conflict,

    #[error("record {0} not found")]
    NotFound(LogId),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a notification sink or deliverer. Never fails a clock action.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification store: {0}")]
    Store(#[from] StoreError),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
