//! In-process notification sink.

use crate::core::ports::NotificationSink;
use crate::errors::NotifyError;
use crate::models::change::ClockChange;
use std::sync::Mutex;

/// Keeps emitted changes in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ClockChange>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<ClockChange> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, change: &ClockChange) -> Result<(), NotifyError> {
        self.events
            .lock()
            .map_err(|_| NotifyError::Delivery("sink lock poisoned".into()))?
            .push(change.clone());
        Ok(())
    }
}
