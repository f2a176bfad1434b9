//! Per-resource task scheduling.
//!
//! Each resource (an outbox entry, a directory record, ...) owns at most one
//! scheduled task, addressed by its key. Scheduling a key that is already
//! pending pushes its due time out (debounce); `reschedule` and `cancel`
//! operate on one key without touching the others. The scheduler is polled
//! with `take_due(now)` and holds no timers, so it is deterministic in tests.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct TaskScheduler<K> {
    tasks: HashMap<K, DateTime<Utc>>,
}

impl<K> Default for TaskScheduler<K> {
    fn default() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Ord + Clone> TaskScheduler<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `key` at `due`, replacing any pending due time.
    /// Returns `true` when the key was not scheduled before.
    pub fn schedule(&mut self, key: K, due: DateTime<Utc>) -> bool {
        self.tasks.insert(key, due).is_none()
    }

    /// Schedule `key` to run `delay` after `now` (refreshing it if pending).
    pub fn schedule_after(&mut self, key: K, now: DateTime<Utc>, delay: Duration) -> bool {
        self.schedule(key, now + delay)
    }

    /// Move an existing task. Returns `false` if `key` is not scheduled.
    pub fn reschedule(&mut self, key: &K, due: DateTime<Utc>) -> bool {
        match self.tasks.get_mut(key) {
            Some(slot) => {
                *slot = due;
                true
            }
            None => false,
        }
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        self.tasks.remove(key).is_some()
    }

    pub fn due_at(&self, key: &K) -> Option<DateTime<Utc>> {
        self.tasks.get(key).copied()
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.tasks.values().min().copied()
    }

    /// Remove and return every task due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<K> {
        let mut due: Vec<(DateTime<Utc>, K)> = self
            .tasks
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(k, at)| (*at, k.clone()))
            .collect();
        due.sort();

        for (_, k) in &due {
            self.tasks.remove(k);
        }
        due.into_iter().map(|(_, k)| k).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Exponential backoff: `base * 2^(attempt-1)`, capped at `max`.
pub fn retry_delay(base: Duration, attempt: u32, max: Duration) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let delay = base * (1i32 << exp);
    delay.min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn scheduling_twice_refreshes_instead_of_duplicating() {
        let mut s = TaskScheduler::new();
        assert!(s.schedule_after("dept-1", t0(), Duration::seconds(30)));
        assert!(!s.schedule_after("dept-1", t0() + Duration::seconds(20), Duration::seconds(30)));

        assert_eq!(s.len(), 1);
        assert!(s.take_due(t0() + Duration::seconds(30)).is_empty());
        assert_eq!(s.take_due(t0() + Duration::seconds(50)), vec!["dept-1"]);
        assert!(s.is_empty());
    }

    #[test]
    fn keys_are_independent() {
        let mut s = TaskScheduler::new();
        s.schedule(1, t0());
        s.schedule(2, t0() + Duration::seconds(10));
        s.schedule(3, t0() + Duration::seconds(5));

        assert!(s.cancel(&3));
        assert!(!s.cancel(&3));
        assert!(s.reschedule(&1, t0() + Duration::seconds(60)));
        assert!(!s.reschedule(&9, t0()));

        assert_eq!(s.next_due(), Some(t0() + Duration::seconds(10)));
        assert_eq!(s.take_due(t0() + Duration::seconds(10)), vec![2]);
        assert_eq!(s.due_at(&1), Some(t0() + Duration::seconds(60)));
    }

    #[test]
    fn due_tasks_come_out_earliest_first() {
        let mut s = TaskScheduler::new();
        s.schedule(5, t0() + Duration::seconds(2));
        s.schedule(7, t0());
        s.schedule(6, t0() + Duration::seconds(1));

        assert_eq!(s.take_due(t0() + Duration::seconds(2)), vec![7, 6, 5]);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::seconds(30);
        let max = Duration::seconds(300);
        assert_eq!(retry_delay(base, 1, max), Duration::seconds(30));
        assert_eq!(retry_delay(base, 2, max), Duration::seconds(60));
        assert_eq!(retry_delay(base, 3, max), Duration::seconds(120));
        assert_eq!(retry_delay(base, 10, max), max);
    }
}
