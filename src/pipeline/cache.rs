// src/pipeline/cache.rs

//! Previous-snapshot cache owned by the scheduler.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::Snapshot;

/// Most recent snapshot per group id.
///
/// Entries appear on a group's first poll and are overwritten on every
/// later one, even with an empty snapshot. Nothing evicts them.
#[derive(Debug, Default)]
pub struct PollingCache {
    entries: HashMap<String, Arc<Snapshot>>,
}

impl PollingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, group_id: &str) -> Option<&Arc<Snapshot>> {
        self.entries.get(group_id)
    }

    /// Store `snapshot` for a group, returning the entry it displaced.
    pub fn replace(&mut self, group_id: &str, snapshot: Arc<Snapshot>) -> Option<Arc<Snapshot>> {
        self.entries.insert(group_id.to_string(), snapshot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
