// src/export/model.rs

use crate::models::hour_log::HourLog;
use serde::Serialize;

/// Flat row for CSV / JSON export of hour logs.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HourLogExport {
    pub id: i64,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub state: String,
    pub time_in: String,
    pub time_out: String,
    pub hours: Option<f64>,
    pub message: String,
    pub external_ref: String,
}

impl From<&HourLog> for HourLogExport {
    fn from(log: &HourLog) -> Self {
        Self {
            id: log.id.0,
            email: log.member_id.clone(),
            kind: log.kind.to_string(),
            state: log.state.to_string(),
            time_in: log.time_in.to_rfc3339(),
            time_out: log.time_out.map(|t| t.to_rfc3339()).unwrap_or_default(),
            hours: log.hours().map(|h| (h * 100.0).round() / 100.0),
            message: log.message.clone().unwrap_or_default(),
            external_ref: log.external_ref.clone().unwrap_or_default(),
        }
    }
}
