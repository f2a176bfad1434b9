//! Payloads returned to callers of the clock gateway.

use super::hour_log::{HourLog, LogId};
use crate::errors::ClockError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// `{success, log_id?, error?, code?}` returned for every clock action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_id: Option<LogId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl ClockResponse {
    pub fn ok(log_id: LogId) -> Self {
        Self {
            success: true,
            log_id: Some(log_id),
            error: None,
            code: None,
        }
    }

    pub fn failed(err: &ClockError) -> Self {
        Self {
            success: false,
            log_id: err.log_id(),
            error: Some(err.to_string()),
            code: Some(err.code()),
        }
    }

    pub fn from_result(result: &Result<HourLog, ClockError>) -> Self {
        match result {
            Ok(log) => Self::ok(log.id),
            Err(e) => Self::failed(e),
        }
    }

    /// HTTP-style status hint: 200 on success, otherwise the error's hint.
    pub fn status_hint(result: &Result<HourLog, ClockError>) -> u16 {
        match result {
            Ok(_) => 200,
            Err(e) => e.status_hint(),
        }
    }
}

/// Read-only projection of a pending log.
///
/// Lab entries only carry `{id, email, time_in}`; the external fields are
/// skipped when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingEntry {
    pub id: LogId,
    #[serde(rename = "email")]
    pub member: String,
    pub time_in: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PendingEntry {
    pub fn lab(log: &HourLog) -> Self {
        Self {
            id: log.id,
            member: log.member_id.clone(),
            time_in: log.time_in,
            duration: None,
            external_ref: None,
            message: None,
        }
    }

    pub fn external(log: &HourLog) -> Self {
        Self {
            duration: log.duration,
            external_ref: log.external_ref.clone(),
            message: log.message.clone(),
            ..Self::lab(log)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_response_echoes_existing_id() {
        let resp = ClockResponse::failed(&ClockError::DuplicateSession { log_id: LogId(7) });
        let json = serde_json::to_string(&resp).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "success": false,
                "log_id": 7,
                "error": "member already logged in",
                "code": "duplicate_session",
            })
        );
    }

    #[test]
    fn success_response_omits_error_fields() {
        let json = serde_json::to_string(&ClockResponse::ok(LogId(1))).unwrap();
        assert_eq!(json, r#"{"success":true,"log_id":1}"#);
    }
}
