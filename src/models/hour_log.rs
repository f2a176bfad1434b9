//! Hour-log records: one row per work session attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier of an hour log (SQLite rowid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(pub i64);

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LogId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(LogId)
    }
}

/// Category of a log (`hour_logs.type`).
///
/// `Lab` and `External` are the two families that can be opened. Any other
/// value is a category chosen by an approver for an external session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum LogKind {
    Lab,
    External,
    Category(String),
}

impl LogKind {
    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &str {
        match self {
            LogKind::Lab => "lab",
            LogKind::External => "external",
            LogKind::Category(c) => c.as_str(),
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "lab" => LogKind::Lab,
            "external" => LogKind::External,
            other => LogKind::Category(other.to_string()),
        }
    }

    pub fn is_lab(&self) -> bool {
        matches!(self, LogKind::Lab)
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl From<LogKind> for String {
    fn from(kind: LogKind) -> Self {
        kind.to_db_str().to_string()
    }
}

impl From<String> for LogKind {
    fn from(s: String) -> Self {
        LogKind::from_db_str(&s)
    }
}

/// The two families that can be opened and listed as pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogFamily {
    Lab,
    External,
}

impl LogFamily {
    pub fn kind(&self) -> LogKind {
        match self {
            LogFamily::Lab => LogKind::Lab,
            LogFamily::External => LogKind::External,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFamily::Lab => "lab",
            LogFamily::External => "external",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogState {
    Pending,
    Complete,
    Cancelled,
}

impl LogState {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LogState::Pending => "pending",
            LogState::Complete => "complete",
            LogState::Cancelled => "cancelled",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LogState::Pending),
            "complete" => Some(LogState::Complete),
            "cancelled" => Some(LogState::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LogState::Pending)
    }
}

impl fmt::Display for LogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourLog {
    pub id: LogId,
    pub member_id: String,              // ⇔ hour_logs.member_id (member e-mail)
    #[serde(rename = "type")]
    pub kind: LogKind,                  // ⇔ hour_logs.type
    pub state: LogState,                // ⇔ hour_logs.state
    pub time_in: DateTime<Utc>,         // ⇔ hour_logs.time_in (RFC 3339)
    pub time_out: Option<DateTime<Utc>>, // set iff state != pending
    pub duration: Option<f64>,          // external only, write-once
    pub message: Option<String>,        // external only, write-once
    pub external_ref: Option<String>,   // outbound message handle
}

impl HourLog {
    pub fn is_pending(&self) -> bool {
        self.state == LogState::Pending
    }

    /// Worked time: declared hours for external logs, elapsed time for closed lab logs.
    pub fn hours(&self) -> Option<f64> {
        if let Some(d) = self.duration {
            return Some(d);
        }
        self.time_out
            .map(|out| (out - self.time_in).num_seconds() as f64 / 3600.0)
    }
}

/// Fields of a log about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHourLog {
    pub member_id: String,
    pub kind: LogKind,
    pub time_in: DateTime<Utc>,
    pub duration: Option<f64>,
    pub message: Option<String>,
}

/// Precondition checked by the store in the same write as the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateGuard {
    #[default]
    Any,
    /// Only apply while the log is still pending.
    Pending,
}

/// Mutable fields of a log. `duration` and `message` are absent on purpose:
/// they are written once at creation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogUpdate {
    pub state: Option<LogState>,
    pub time_out: Option<DateTime<Utc>>,
    pub kind: Option<LogKind>,
    pub external_ref: Option<String>,
    pub guard: UpdateGuard,
}

/// Selection used by `SessionStore::list_logs`.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub kind: Option<LogKind>,
    pub state: Option<LogState>,
    pub member_id: Option<String>,
}

impl LogFilter {
    pub fn pending(family: LogFamily) -> Self {
        Self {
            kind: Some(family.kind()),
            state: Some(LogState::Pending),
            member_id: None,
        }
    }

    pub fn matches(&self, log: &HourLog) -> bool {
        self.kind.as_ref().is_none_or(|k| *k == log.kind)
            && self.state.is_none_or(|s| s == log.state)
            && self
                .member_id
                .as_deref()
                .is_none_or(|m| m == log.member_id)
    }
}
