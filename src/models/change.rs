//! Session-change events and their durable outbox rows.

use super::hour_log::LogId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event raised for the UI / chat channel when a lab session changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockChange {
    #[serde(rename = "email")]
    pub member: String,
    pub logging_in: bool,
    pub log_id: LogId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Queued,
    Delivered,
    Abandoned,
}

impl OutboxStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OutboxStatus::Queued => "queued",
            OutboxStatus::Delivered => "delivered",
            OutboxStatus::Abandoned => "abandoned",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(OutboxStatus::Queued),
            "delivered" => Some(OutboxStatus::Delivered),
            "abandoned" => Some(OutboxStatus::Abandoned),
            _ => None,
        }
    }
}

/// Row of the `notifications` outbox.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboxEntry {
    pub id: i64,
    pub change: ClockChange,
    pub status: OutboxStatus,
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
    pub next_attempt_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
