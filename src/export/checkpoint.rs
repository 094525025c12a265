//! Record of the last successfully exported interval.

use crate::core::TimeInterval;
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Process start plus the end of the last fully exported window.
///
/// Lives in memory only; a restart begins again from the new process start.
#[derive(Debug)]
pub struct ExportCheckpoint {
    process_start: DateTime<Utc>,
    last_successful_end: ArcSwapOption<DateTime<Utc>>,
}

impl ExportCheckpoint {
    pub fn new(process_start: DateTime<Utc>) -> Self {
        Self {
            process_start,
            last_successful_end: ArcSwapOption::empty(),
        }
    }

    pub fn process_start(&self) -> DateTime<Utc> {
        self.process_start
    }

    pub fn last_successful_end(&self) -> Option<DateTime<Utc>> {
        self.last_successful_end.load().as_deref().copied()
    }

    /// Start of the next window to export
    pub fn interval_start(&self) -> DateTime<Utc> {
        self.last_successful_end().unwrap_or(self.process_start)
    }

    /// Window from the pending start up to `now`
    pub fn window(&self, now: DateTime<Utc>) -> TimeInterval {
        TimeInterval::new(self.interval_start(), now)
    }

    /// Mark everything up to `end` as exported. Never moves backwards.
    pub fn advance(&self, end: DateTime<Utc>) {
        self.last_successful_end.rcu(|current| match current {
            Some(last) if **last >= end => Some(Arc::clone(last)),
            _ => Some(Arc::new(end)),
        });
    }
}
