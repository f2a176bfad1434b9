//! Clock gateway: turns inbound actions into state-machine transitions.
//!
//! Every method validates its input, asks `core::machine` what to do,
//! performs at most one write against the session store and reports the
//! result as a typed `ClockError` instead of failing the caller.

use crate::core::machine::{self, LabDecision, OpenRequest, Outcome};
use crate::core::ports::{AuditTrail, MemberDirectory, NotificationSink, SessionStore};
use crate::errors::{ALREADY_CLOSED, ClockError, StoreError};
use crate::models::action::{LabAction, RespondOutcome};
use crate::models::change::ClockChange;
use crate::models::hour_log::{HourLog, LogFamily, LogFilter, LogId, LogUpdate, UpdateGuard};
use crate::models::response::PendingEntry;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

pub type ClockResult<T> = Result<T, ClockError>;

/// Inserts tried by one `in` when concurrent sessions keep closing under it.
const LAB_OPEN_ATTEMPTS: u32 = 2;

pub struct ClockGateway<S, D, N> {
    store: S,
    directory: D,
    sink: N,
    audit: Option<Arc<dyn AuditTrail + Send + Sync>>,
}

impl<S, D, N> ClockGateway<S, D, N>
where
    S: SessionStore,
    D: MemberDirectory,
    N: NotificationSink,
{
    pub fn new(store: S, directory: D, sink: N) -> Self {
        Self {
            store,
            directory,
            sink,
            audit: None,
        }
    }

    /// Record every applied transition in `audit`.
    pub fn with_audit(mut self, audit: Arc<dyn AuditTrail + Send + Sync>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Lab sign-in station action: `in`, `out` or `void`.
    pub fn lab(&self, member_id: &str, action: LabAction) -> ClockResult<HourLog> {
        if !self.member_exists(member_id)? {
            warn!(member = member_id, %action, "ignoring lab action for unknown member");
            return Err(ClockError::UnknownMember(member_id.to_string()));
        }

        let pending = self
            .store
            .find_pending_log(member_id, LogFamily::Lab)
            .map_err(|e| internal("find pending lab log", e))?;

        match machine::decide_lab(pending.as_ref(), action) {
            LabDecision::Duplicate(log_id) => {
                warn!(member = member_id, %log_id, "ignoring duplicate login");
                Err(ClockError::DuplicateSession { log_id })
            }
            LabDecision::NoActiveSession => {
                warn!(member = member_id, %action, "member not signed in");
                Err(ClockError::NoActiveSession(member_id.to_string()))
            }
            LabDecision::Open => self.open_lab(member_id),
            LabDecision::Close(log_id, outcome) => {
                let Some(log) = pending else {
                    return Err(ClockError::NoActiveSession(member_id.to_string()));
                };
                self.close_lab(&log, log_id, &outcome, action)
            }
        }
    }

    fn open_lab(&self, member_id: &str) -> ClockResult<HourLog> {
        let new = machine::open(member_id, OpenRequest::Lab, Utc::now())?;

        let mut attempt = 1;
        let log = loop {
            match self.store.create_log(&new) {
                Ok(log) => break log,
                Err(StoreError::Conflict) => {
                    // Lost the race against a concurrent `in` for this member.
                    let winner = self
                        .store
                        .find_pending_log(member_id, LogFamily::Lab)
                        .map_err(|e| internal("reload pending lab log", e))?;
                    match winner {
                        Some(log) => {
                            warn!(member = member_id, log_id = %log.id, "ignoring duplicate login");
                            return Err(ClockError::DuplicateSession { log_id: log.id });
                        }
                        // The winner was closed in between: the slot is free again.
                        None if attempt < LAB_OPEN_ATTEMPTS => attempt += 1,
                        None => {
                            warn!(member = member_id, attempt, "lab session churned during login");
                            return Err(ClockError::NoActiveSession(member_id.to_string()));
                        }
                    }
                }
                Err(e) => return Err(internal("create lab log", e)),
            }
        };

        info!(member = member_id, log_id = %log.id, "lab session opened");
        self.audit("open", &log.id.to_string(), &format!("{member_id} logged in"));

        let change = ClockChange {
            member: member_id.to_string(),
            logging_in: true,
            log_id: log.id,
        };
        if let Err(e) = self.sink.notify(&change) {
            warn!(member = member_id, log_id = %log.id, error = %e, "failed to emit clock change");
        }

        Ok(log)
    }

    fn close_lab(
        &self,
        log: &HourLog,
        log_id: LogId,
        outcome: &Outcome,
        action: LabAction,
    ) -> ClockResult<HourLog> {
        let closure = machine::close(log, outcome, Utc::now(), UpdateGuard::Pending);

        let closed = match self.store.update_log(log_id, &closure.update) {
            Ok(closed) => closed,
            // A concurrent `out`/`void` closed it first.
            Err(StoreError::Conflict) | Err(StoreError::NotFound(_)) => {
                warn!(member = %log.member_id, %log_id, %action, "session closed concurrently");
                return Err(ClockError::NoActiveSession(log.member_id.clone()));
            }
            Err(e) => return Err(internal("close lab log", e)),
        };

        let op = match action {
            LabAction::Void => "void",
            _ => "close",
        };
        info!(member = %closed.member_id, %log_id, state = %closed.state, "lab session closed");
        self.audit(
            op,
            &log_id.to_string(),
            &format!("{} {}", closed.member_id, closed.state),
        );

        Ok(closed)
    }

    /// Externally-reported hours. Never checks for existing pending claims.
    pub fn external_submit(
        &self,
        member_id: &str,
        duration: f64,
        message: &str,
    ) -> ClockResult<HourLog> {
        if !self.member_exists(member_id)? {
            warn!(member = member_id, "ignoring external submission for unknown member");
            return Err(ClockError::UnknownMember(member_id.to_string()));
        }

        let new = machine::open(
            member_id,
            OpenRequest::External { duration, message },
            Utc::now(),
        )?;
        let log = self
            .store
            .create_log(&new)
            .map_err(|e| internal("create external log", e))?;

        info!(member = member_id, log_id = %log.id, duration, "external hours submitted");
        self.audit(
            "submit",
            &log.id.to_string(),
            &format!("{member_id} reported {duration}h"),
        );

        Ok(log)
    }

    /// Approver reply to an external claim.
    ///
    /// A claim that is already closed is closed again: the reply overwrites
    /// the previous outcome and a `reclose` entry is written to the audit.
    pub fn external_respond(
        &self,
        log_id: LogId,
        outcome: &RespondOutcome,
        category: Option<&str>,
    ) -> ClockResult<HourLog> {
        let log = self.existing_log(log_id)?;

        let outcome = Outcome::from_respond(outcome, category);
        if !log.kind.is_lab() {
            machine::check_category(&outcome).inspect_err(|e| {
                warn!(%log_id, error = %e, "rejecting approval category");
            })?;
        }
        let closure = machine::close(&log, &outcome, Utc::now(), UpdateGuard::Any);

        let closed = match self.store.update_log(log_id, &closure.update) {
            Ok(closed) => closed,
            Err(StoreError::NotFound(_)) => return Err(ClockError::UnknownSession(log_id)),
            Err(e) => return Err(internal("close external log", e)),
        };

        if let Some(prior) = closure.already_closed {
            warn!(
                %log_id,
                prior = %prior,
                code = ALREADY_CLOSED,
                "received confirmation for completed hour request, updated anyway"
            );
            self.audit(
                "reclose",
                &log_id.to_string(),
                &format!("was {prior}, now {}", closed.state),
            );
        }

        info!(%log_id, state = %closed.state, kind = %closed.kind, "external hours reviewed");
        self.audit(
            "respond",
            &log_id.to_string(),
            &format!("{} {} as {}", closed.member_id, closed.state, closed.kind),
        );

        Ok(closed)
    }

    /// Store the handle of the outbound message tied to a log.
    pub fn attach_external_ref(&self, log_id: LogId, reference: &str) -> ClockResult<HourLog> {
        self.existing_log(log_id)?;

        let update = LogUpdate {
            external_ref: Some(reference.to_string()),
            ..Default::default()
        };
        let log = match self.store.update_log(log_id, &update) {
            Ok(log) => log,
            Err(StoreError::NotFound(_)) => return Err(ClockError::UnknownSession(log_id)),
            Err(e) => return Err(internal("attach external ref", e)),
        };

        self.audit("ref", &log_id.to_string(), reference);
        Ok(log)
    }

    pub fn get(&self, log_id: LogId) -> ClockResult<HourLog> {
        self.existing_log(log_id)
    }

    /// Pending logs of one family, oldest first.
    pub fn list_pending(&self, family: LogFamily) -> ClockResult<Vec<PendingEntry>> {
        let mut logs = self
            .store
            .list_logs(&LogFilter::pending(family))
            .map_err(|e| internal("list pending logs", e))?;
        logs.sort_by_key(|l| (l.time_in, l.id));

        Ok(logs
            .iter()
            .map(|log| match family {
                LogFamily::Lab => PendingEntry::lab(log),
                LogFamily::External => PendingEntry::external(log),
            })
            .collect())
    }

    fn existing_log(&self, log_id: LogId) -> ClockResult<HourLog> {
        match self.store.get_log(log_id) {
            Ok(Some(log)) => Ok(log),
            Ok(None) => {
                warn!(%log_id, "ignoring request for unknown hour log");
                Err(ClockError::UnknownSession(log_id))
            }
            Err(e) => Err(internal("load hour log", e)),
        }
    }

    fn member_exists(&self, member_id: &str) -> ClockResult<bool> {
        self.directory
            .exists(member_id)
            .map_err(|e| internal("member lookup", e))
    }

    fn audit(&self, operation: &str, target: &str, message: &str) {
        if let Some(audit) = &self.audit
            && let Err(e) = audit.record(operation, target, message)
        {
            warn!(operation, target, error = %e, "failed to write audit log");
        }
    }
}

fn internal(context: &str, err: StoreError) -> ClockError {
    error!(context, error = %err, "session store failure");
    ClockError::InternalError
}
