// src/services/assembler.rs

//! Snapshot assembly for one group.
//!
//! Fetches every feed of a group, merges the results, and buckets them into
//! a fresh [`Snapshot`]. Each feed keeps its last successfully parsed event
//! list so a transient upstream failure replays known data instead of
//! looking like every event was removed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::stream::{self, StreamExt};

use crate::models::{Event, Snapshot};
use crate::services::FeedSource;

/// Builds group snapshots from feed sources, with per-feed fallback.
pub struct SnapshotAssembler {
    source: Arc<dyn FeedSource>,
    last_good: Mutex<HashMap<String, Vec<Event>>>,
    max_concurrent: usize,
}

impl SnapshotAssembler {
    /// Create an assembler fetching at most `max_concurrent` feeds at once.
    pub fn new(source: Arc<dyn FeedSource>, max_concurrent: usize) -> Self {
        Self {
            source,
            last_good: Mutex::new(HashMap::new()),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Fetch all feeds of a group and assemble its current snapshot.
    pub async fn assemble(&self, group_id: &str, feed_ids: &[String]) -> Snapshot {
        // `buffered` keeps feed order, so equal start times sort the same way every poll.
        let results: Vec<_> = stream::iter(feed_ids)
            .map(|feed_id| async move { (feed_id, self.source.fetch(feed_id).await) })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut merged = Vec::new();
        let mut failures = 0usize;

        for (feed_id, result) in results {
            match result {
                Ok(events) => {
                    self.remember(feed_id, &events);
                    merged.extend(events);
                }
                Err(error) => {
                    failures += 1;
                    match self.last_good(feed_id) {
                        Some(events) => {
                            log::warn!(
                                "Feed {} of group {} failed, reusing {} cached event(s): {}",
                                feed_id,
                                group_id,
                                events.len(),
                                error
                            );
                            merged.extend(events);
                        }
                        None => log::warn!(
                            "Feed {} of group {} failed with no cached data: {}",
                            feed_id,
                            group_id,
                            error
                        ),
                    }
                }
            }
        }

        let snapshot = Snapshot::from_events(merged);
        log::debug!(
            "Group {}: {} event(s) from {} feed(s), {} failed",
            group_id,
            snapshot.event_count(),
            feed_ids.len(),
            failures
        );
        snapshot
    }

    fn remember(&self, feed_id: &str, events: &[Event]) {
        let mut cache = self.last_good.lock().unwrap_or_else(PoisonError::into_inner);
        cache.insert(feed_id.to_string(), events.to_vec());
    }

    fn last_good(&self, feed_id: &str) -> Option<Vec<Event>> {
        let cache = self.last_good.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(feed_id).cloned()
    }
}
