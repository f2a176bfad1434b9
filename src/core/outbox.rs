//! Delivery of queued session-change notifications.
//!
//! Every queued outbox row gets its own task in a `TaskScheduler`, keyed by
//! the row id and due at its `next_attempt_at`. A failed delivery only
//! reschedules that row, with exponential backoff, until the attempt limit
//! is reached and the row is abandoned.

use crate::core::scheduler::{TaskScheduler, retry_delay};
use crate::db::outbox::OutboxSink;
use crate::errors::{NotifyError, StoreResult};
use crate::models::change::OutboxEntry;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Target of outbox notifications (chat feed, UI stream, ...).
pub trait Deliverer {
    fn deliver(&self, entry: &OutboxEntry) -> Result<(), NotifyError>;
}

impl<T: Deliverer + ?Sized> Deliverer for &T {
    fn deliver(&self, entry: &OutboxEntry) -> Result<(), NotifyError> {
        (**self).deliver(entry)
    }
}

/// Appends one JSON line per change to a feed file.
#[derive(Debug, Clone)]
pub struct JsonlDeliverer {
    path: PathBuf,
}

impl JsonlDeliverer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Deliverer for JsonlDeliverer {
    fn deliver(&self, entry: &OutboxEntry) -> Result<(), NotifyError> {
        let line = serde_json::to_string(&entry.change)
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// Prints one JSON line per change on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutDeliverer;

impl Deliverer for StdoutDeliverer {
    fn deliver(&self, entry: &OutboxEntry) -> Result<(), NotifyError> {
        let line = serde_json::to_string(&entry.change)
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        println!("{line}");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_secs: u64) -> Self {
        let base = Duration::seconds(base_delay_secs.min(86_400) as i64);
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: base,
            max_delay: base * 64,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, 30)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub retried: usize,
    pub abandoned: usize,
    /// Rows still queued but not yet due.
    pub waiting: usize,
}

pub struct OutboxDispatcher<'a, D> {
    outbox: &'a OutboxSink,
    deliverer: D,
    policy: RetryPolicy,
    scheduler: TaskScheduler<i64>,
}

impl<'a, D: Deliverer> OutboxDispatcher<'a, D> {
    pub fn new(outbox: &'a OutboxSink, deliverer: D, policy: RetryPolicy) -> Self {
        Self {
            outbox,
            deliverer,
            policy,
            scheduler: TaskScheduler::new(),
        }
    }

    /// Earliest pending attempt known after the last `run_once`.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.scheduler.next_due()
    }

    /// Deliver every queued row due at `now`.
    pub fn run_once(&mut self, now: DateTime<Utc>) -> StoreResult<DeliveryReport> {
        let mut entries: HashMap<i64, OutboxEntry> = HashMap::new();
        for entry in self.outbox.queued()? {
            self.scheduler.schedule(entry.id, entry.next_attempt_at);
            entries.insert(entry.id, entry);
        }

        let mut report = DeliveryReport::default();
        for id in self.scheduler.take_due(now) {
            // Delivered or abandoned by someone else since the last pass.
            let Some(entry) = entries.remove(&id) else {
                continue;
            };

            match self.deliverer.deliver(&entry) {
                Ok(()) => {
                    self.outbox.mark_delivered(id, now)?;
                    debug!(id, log_id = %entry.change.log_id, "notification delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    let attempt = entry.attempts + 1;
                    let reason = e.to_string();
                    if attempt >= self.policy.max_attempts {
                        self.outbox.mark_abandoned(id, now, &reason)?;
                        warn!(id, attempt, error = %reason, "notification abandoned");
                        report.abandoned += 1;
                    } else {
                        let delay =
                            retry_delay(self.policy.base_delay, attempt, self.policy.max_delay);
                        let next = now + delay;
                        self.outbox.mark_retry(id, next, &reason)?;
                        self.scheduler.schedule(id, next);
                        info!(
                            id,
                            attempt,
                            error = %reason,
                            next = %next,
                            "notification retry scheduled"
                        );
                        report.retried += 1;
                    }
                }
            }
        }

        report.waiting = self.scheduler.len();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::SqliteStore;
    use crate::models::change::{ClockChange, OutboxStatus};
    use crate::models::hour_log::LogId;
    use std::cell::Cell;

    struct Flaky {
        failures_left: Cell<u32>,
    }

    impl Deliverer for Flaky {
        fn deliver(&self, _entry: &OutboxEntry) -> Result<(), NotifyError> {
            let left = self.failures_left.get();
            if left > 0 {
                self.failures_left.set(left - 1);
                return Err(NotifyError::Delivery("feed offline".into()));
            }
            Ok(())
        }
    }

    fn outbox(dir: &tempfile::TempDir) -> OutboxSink {
        OutboxSink::new(SqliteStore::open(dir.path().join("dispatch.sqlite")).unwrap())
    }

    fn change(n: i64) -> ClockChange {
        ClockChange {
            member: "a@x.org".into(),
            logging_in: true,
            log_id: LogId(n),
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn jsonl_feed_receives_each_change_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = outbox(&dir);
        let feed = dir.path().join("feed.jsonl");
        sink.enqueue(&change(1), t0()).unwrap();
        sink.enqueue(&change(2), t0()).unwrap();

        let mut d =
            OutboxDispatcher::new(&sink, JsonlDeliverer::new(&feed), RetryPolicy::default());
        let report = d.run_once(t0()).unwrap();
        assert_eq!(report.delivered, 2);

        let again = d.run_once(t0() + Duration::minutes(5)).unwrap();
        assert_eq!(again, DeliveryReport::default());

        let text = std::fs::read_to_string(&feed).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"email":"a@x.org","logging_in":true,"log_id":1}"#);
    }

    #[test]
    fn failures_back_off_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let sink = outbox(&dir);
        sink.enqueue(&change(1), t0()).unwrap();

        let flaky = Flaky {
            failures_left: Cell::new(1),
        };
        let mut d = OutboxDispatcher::new(&sink, &flaky, RetryPolicy::new(5, 30));

        let first = d.run_once(t0()).unwrap();
        assert_eq!(first.retried, 1);
        assert_eq!(first.waiting, 1);
        assert_eq!(d.next_due(), Some(t0() + Duration::seconds(30)));

        // Not due yet.
        let early = d.run_once(t0() + Duration::seconds(10)).unwrap();
        assert_eq!(early.delivered, 0);
        assert_eq!(early.waiting, 1);

        let later = d.run_once(t0() + Duration::seconds(30)).unwrap();
        assert_eq!(later.delivered, 1);
        assert!(sink.queued().unwrap().is_empty());
        assert_eq!(sink.recent(1).unwrap()[0].attempts, 2);
    }

    #[test]
    fn entry_is_abandoned_after_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let sink = outbox(&dir);
        sink.enqueue(&change(1), t0()).unwrap();

        let flaky = Flaky {
            failures_left: Cell::new(u32::MAX),
        };
        let mut d = OutboxDispatcher::new(&sink, &flaky, RetryPolicy::new(2, 1));

        assert_eq!(d.run_once(t0()).unwrap().retried, 1);
        let report = d.run_once(t0() + Duration::seconds(1)).unwrap();
        assert_eq!(report.abandoned, 1);
        assert_eq!(report.waiting, 0);

        let recent = sink.recent(1).unwrap();
        let entry = &recent[0];
        assert_eq!(entry.status, OutboxStatus::Abandoned);
        assert_eq!(entry.last_error.as_deref(), Some("delivery failed: feed offline"));
    }
}
