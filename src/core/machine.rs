//! Hour-log state machine.
//!
//! Pure decision logic: every function here takes the current records and
//! the incoming action and returns what should be written. Nothing in this
//! module touches a store, so the gateway can wrap each decision in a single
//! atomic write.
//!
//! ```text
//! pending ──out / approve──▶ complete
//!    │
//!    └────void / other─────▶ cancelled
//! ```

use crate::errors::ClockError;
use crate::models::action::{LabAction, RespondOutcome};
use crate::models::hour_log::{
    HourLog, LogFamily, LogId, LogKind, LogState, LogUpdate, NewHourLog, UpdateGuard,
};
use chrono::{DateTime, Utc};

/// How a pending log is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `out` on a lab log, `approve` on an external one.
    Complete { category: Option<String> },
    /// `void` on a lab log, any other reply on an external one.
    Cancel,
}

impl Outcome {
    pub fn from_respond(outcome: &RespondOutcome, category: Option<&str>) -> Self {
        match outcome {
            RespondOutcome::Approve => Outcome::Complete {
                category: category
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            },
            RespondOutcome::Other(_) => Outcome::Cancel,
        }
    }

    pub fn target_state(&self) -> LogState {
        match self {
            Outcome::Complete { .. } => LogState::Complete,
            Outcome::Cancel => LogState::Cancelled,
        }
    }
}

/// Family names cannot be used as approver categories.
const RESERVED_CATEGORIES: [&str; 2] = ["lab", "external"];

/// Reject an approval whose category would retype a log into a family.
pub fn check_category(outcome: &Outcome) -> Result<(), ClockError> {
    if let Outcome::Complete {
        category: Some(category),
    } = outcome
        && RESERVED_CATEGORIES
            .iter()
            .any(|r| r.eq_ignore_ascii_case(category))
    {
        return Err(ClockError::InvalidRequest(format!(
            "'{category}' is reserved and cannot be used as a category"
        )));
    }
    Ok(())
}

/// Metadata supplied when a log is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpenRequest<'a> {
    Lab,
    External { duration: f64, message: &'a str },
}

impl OpenRequest<'_> {
    pub fn family(&self) -> LogFamily {
        match self {
            OpenRequest::Lab => LogFamily::Lab,
            OpenRequest::External { .. } => LogFamily::External,
        }
    }
}

/// What a lab action resolves to, given the member's pending lab log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabDecision {
    Open,
    Duplicate(LogId),
    Close(LogId, Outcome),
    NoActiveSession,
}

/// Decide the transition for a lab action.
pub fn decide_lab(pending: Option<&HourLog>, action: LabAction) -> LabDecision {
    match (pending, action) {
        (Some(log), LabAction::In) => LabDecision::Duplicate(log.id),
        (Some(log), LabAction::Out) => {
            LabDecision::Close(log.id, Outcome::Complete { category: None })
        }
        (Some(log), LabAction::Void) => LabDecision::Close(log.id, Outcome::Cancel),
        (None, LabAction::In) => LabDecision::Open,
        (None, LabAction::Out | LabAction::Void) => LabDecision::NoActiveSession,
    }
}

/// Build the record for a new pending log.
pub fn open(
    member_id: &str,
    request: OpenRequest<'_>,
    now: DateTime<Utc>,
) -> Result<NewHourLog, ClockError> {
    match request {
        OpenRequest::Lab => Ok(NewHourLog {
            member_id: member_id.to_string(),
            kind: LogKind::Lab,
            time_in: now,
            duration: None,
            message: None,
        }),
        OpenRequest::External { duration, message } => {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(ClockError::InvalidRequest(format!(
                    "duration must be a positive number of hours, got {duration}"
                )));
            }

            Ok(NewHourLog {
                member_id: member_id.to_string(),
                kind: LogKind::External,
                time_in: now,
                duration: Some(duration),
                message: Some(message.to_string()),
            })
        }
    }
}

/// Result of closing a log.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub update: LogUpdate,
    /// Prior state when the log was already terminal. The update is applied
    /// anyway: the last response wins.
    pub already_closed: Option<LogState>,
}

/// Build the update that closes `log` with `outcome`.
///
/// A lab log keeps its type. Any other log takes the approver's category
/// when one is given.
pub fn close(log: &HourLog, outcome: &Outcome, now: DateTime<Utc>, guard: UpdateGuard) -> Closure {
    let kind = match outcome {
        Outcome::Complete {
            category: Some(category),
        } if !log.kind.is_lab() => Some(LogKind::from_db_str(category)),
        _ => None,
    };

    Closure {
        update: LogUpdate {
            state: Some(outcome.target_state()),
            time_out: Some(now),
            kind,
            external_ref: None,
            guard,
        },
        already_closed: log.state.is_terminal().then_some(log.state),
    }
}

/// Snapshot of `log` after `update`. Guards are the store's concern.
pub fn apply(log: &HourLog, update: &LogUpdate) -> HourLog {
    let mut next = log.clone();
    if let Some(state) = update.state {
        next.state = state;
    }
    if let Some(out) = update.time_out {
        next.time_out = Some(out);
    }
    if let Some(kind) = &update.kind {
        next.kind = kind.clone();
    }
    if let Some(reference) = &update.external_ref {
        next.external_ref = Some(reference.clone());
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending_lab(id: i64) -> HourLog {
        HourLog {
            id: LogId(id),
            member_id: "a@x.org".into(),
            kind: LogKind::Lab,
            state: LogState::Pending,
            time_in: Utc::now() - Duration::hours(2),
            time_out: None,
            duration: None,
            message: None,
            external_ref: None,
        }
    }

    fn pending_external(id: i64) -> HourLog {
        HourLog {
            kind: LogKind::External,
            duration: Some(3.0),
            message: Some("helped setup".into()),
            ..pending_lab(id)
        }
    }

    #[test]
    fn lab_decisions_cover_every_action() {
        let log = pending_lab(1);

        assert_eq!(
            decide_lab(Some(&log), LabAction::In),
            LabDecision::Duplicate(LogId(1))
        );
        assert_eq!(
            decide_lab(Some(&log), LabAction::Out),
            LabDecision::Close(LogId(1), Outcome::Complete { category: None })
        );
        assert_eq!(
            decide_lab(Some(&log), LabAction::Void),
            LabDecision::Close(LogId(1), Outcome::Cancel)
        );
        assert_eq!(decide_lab(None, LabAction::In), LabDecision::Open);
        assert_eq!(
            decide_lab(None, LabAction::Out),
            LabDecision::NoActiveSession
        );
        assert_eq!(
            decide_lab(None, LabAction::Void),
            LabDecision::NoActiveSession
        );
    }

    #[test]
    fn open_external_requires_positive_duration() {
        let now = Utc::now();
        let req = |duration| OpenRequest::External {
            duration,
            message: "x",
        };

        assert!(open("a@x.org", req(0.0), now).is_err());
        assert!(open("a@x.org", req(-1.5), now).is_err());
        assert!(open("a@x.org", req(f64::NAN), now).is_err());

        let new = open("a@x.org", req(2.5), now).unwrap();
        assert_eq!(new.kind, LogKind::External);
        assert_eq!(new.duration, Some(2.5));
        assert_eq!(new.message.as_deref(), Some("x"));
        assert_eq!(new.time_in, now);
    }

    #[test]
    fn open_lab_has_no_external_metadata() {
        let new = open("a@x.org", OpenRequest::Lab, Utc::now()).unwrap();
        assert_eq!(new.kind, LogKind::Lab);
        assert!(new.duration.is_none());
        assert!(new.message.is_none());
    }

    #[test]
    fn closing_lab_never_reclassifies() {
        let log = pending_lab(1);
        let outcome = Outcome::Complete {
            category: Some("volunteer".into()),
        };
        let closure = close(&log, &outcome, Utc::now(), UpdateGuard::Pending);

        assert_eq!(closure.update.kind, None);
        assert_eq!(closure.update.state, Some(LogState::Complete));
        assert_eq!(closure.update.guard, UpdateGuard::Pending);
        assert!(closure.already_closed.is_none());
    }

    #[test]
    fn approving_external_sets_category_and_time_out() {
        let log = pending_external(2);
        let now = Utc::now();
        let outcome = Outcome::from_respond(&RespondOutcome::Approve, Some("volunteer"));
        let closure = close(&log, &outcome, now, UpdateGuard::Any);
        let next = apply(&log, &closure.update);

        assert_eq!(next.state, LogState::Complete);
        assert_eq!(next.kind, LogKind::Category("volunteer".into()));
        assert_eq!(next.time_out, Some(now));
        assert_eq!(next.duration, Some(3.0));
    }

    #[test]
    fn approve_without_category_keeps_type() {
        let log = pending_external(2);
        let outcome = Outcome::from_respond(&RespondOutcome::Approve, Some("  "));
        let closure = close(&log, &outcome, Utc::now(), UpdateGuard::Any);

        assert_eq!(closure.update.kind, None);
        assert_eq!(apply(&log, &closure.update).kind, LogKind::External);
    }

    #[test]
    fn family_names_are_not_categories() {
        for name in ["lab", "LAB", "external"] {
            let outcome = Outcome::from_respond(&RespondOutcome::Approve, Some(name));
            assert!(matches!(
                check_category(&outcome),
                Err(ClockError::InvalidRequest(_))
            ));
        }

        let volunteer = Outcome::from_respond(&RespondOutcome::Approve, Some("volunteer"));
        assert!(check_category(&volunteer).is_ok());
        // Cancelling ignores the category, so there is nothing to reject.
        let deny = Outcome::from_respond(&RespondOutcome::parse("deny"), Some("lab"));
        assert!(check_category(&deny).is_ok());
    }

    #[test]
    fn other_reply_cancels() {
        let log = pending_external(2);
        let outcome = Outcome::from_respond(&RespondOutcome::parse("deny"), Some("volunteer"));
        let next = apply(&log, &close(&log, &outcome, Utc::now(), UpdateGuard::Any).update);

        assert_eq!(next.state, LogState::Cancelled);
        assert_eq!(next.kind, LogKind::External);
    }

    #[test]
    fn reclosing_reports_prior_state_but_still_updates() {
        let mut log = pending_external(2);
        log.state = LogState::Cancelled;
        log.time_out = Some(Utc::now() - Duration::minutes(5));

        let now = Utc::now();
        let outcome = Outcome::from_respond(&RespondOutcome::Approve, Some("volunteer"));
        let closure = close(&log, &outcome, now, UpdateGuard::Any);

        assert_eq!(closure.already_closed, Some(LogState::Cancelled));
        let next = apply(&log, &closure.update);
        assert_eq!(next.state, LogState::Complete);
        assert_eq!(next.time_out, Some(now));
    }
}
