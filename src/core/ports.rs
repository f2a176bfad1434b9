//! Collaborator contracts the gateway depends on.

use crate::errors::{NotifyError, StoreResult};
use crate::models::change::ClockChange;
use crate::models::hour_log::{HourLog, LogFamily, LogFilter, LogId, LogUpdate, NewHourLog};

/// Durable record of hour logs. Pure data access, no policy.
///
/// Implementations must reject a second pending lab log for the same member
/// with `StoreError::Conflict`, and must apply `LogUpdate::guard` in the same
/// write as the update.
pub trait SessionStore {
    fn find_pending_log(&self, member_id: &str, family: LogFamily) -> StoreResult<Option<HourLog>>;
    fn create_log(&self, new: &NewHourLog) -> StoreResult<HourLog>;
    fn update_log(&self, id: LogId, update: &LogUpdate) -> StoreResult<HourLog>;
    fn get_log(&self, id: LogId) -> StoreResult<Option<HourLog>>;
    fn list_logs(&self, filter: &LogFilter) -> StoreResult<Vec<HourLog>>;
}

/// Member lookup used for the `UnknownMember` check. No side effects.
pub trait MemberDirectory {
    fn exists(&self, member_id: &str) -> StoreResult<bool>;
}

/// Receives session-change events. Fire-and-forget.
pub trait NotificationSink {
    fn notify(&self, change: &ClockChange) -> Result<(), NotifyError>;
}

/// Append-only audit trail of applied transitions (`log` table).
pub trait AuditTrail {
    fn record(&self, operation: &str, target: &str, message: &str) -> StoreResult<()>;
}

impl<T: SessionStore + ?Sized> SessionStore for &T {
    fn find_pending_log(&self, member_id: &str, family: LogFamily) -> StoreResult<Option<HourLog>> {
        (**self).find_pending_log(member_id, family)
    }
    fn create_log(&self, new: &NewHourLog) -> StoreResult<HourLog> {
        (**self).create_log(new)
    }
    fn update_log(&self, id: LogId, update: &LogUpdate) -> StoreResult<HourLog> {
        (**self).update_log(id, update)
    }
    fn get_log(&self, id: LogId) -> StoreResult<Option<HourLog>> {
        (**self).get_log(id)
    }
    fn list_logs(&self, filter: &LogFilter) -> StoreResult<Vec<HourLog>> {
        (**self).list_logs(filter)
    }
}

impl<T: MemberDirectory + ?Sized> MemberDirectory for &T {
    fn exists(&self, member_id: &str) -> StoreResult<bool> {
        (**self).exists(member_id)
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn notify(&self, change: &ClockChange) -> Result<(), NotifyError> {
        (**self).notify(change)
    }
}
