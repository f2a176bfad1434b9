use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action sent by a lab sign-in station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LabAction {
    In,
    Out,
    Void,
}

impl LabAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabAction::In => "in",
            LabAction::Out => "out",
            LabAction::Void => "void",
        }
    }
}

impl fmt::Display for LabAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approver reply to an external hours claim.
///
/// Only `approve` completes the claim; any other reply cancels it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespondOutcome {
    Approve,
    Other(String),
}

impl RespondOutcome {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("approve") {
            RespondOutcome::Approve
        } else {
            RespondOutcome::Other(s.trim().to_string())
        }
    }
}

impl fmt::Display for RespondOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespondOutcome::Approve => f.write_str("approve"),
            RespondOutcome::Other(s) => f.write_str(s),
        }
    }
}
