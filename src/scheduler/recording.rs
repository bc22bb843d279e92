//! Synchronous fake scheduler for tests: records what *would* have been
//! scheduled, without time passing.

use super::{Scheduler, WorkItem};
use anyhow::Result;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct RecordingScheduler {
    entries: Mutex<Vec<(WorkItem, Duration)>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(WorkItem, Duration)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(item, _)| item.kind())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl Scheduler for RecordingScheduler {
    fn enqueue(&self, item: WorkItem, delay: Duration) -> Result<()> {
        self.entries.lock().unwrap().push((item, delay));
        Ok(())
    }
}
