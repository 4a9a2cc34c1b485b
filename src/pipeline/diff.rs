//! Diff calculation between two snapshots of a group.
//!
//! Events are matched by `uid` only. Both snapshots are first restricted to
//! a forward window starting at today's midnight, so changes further out
//! never produce notifications. Output order is fixed: additions (current
//! order), then removals (previous order), then modifications (previous
//! order), with at most one modification per event.

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime};

use crate::models::{Change, Event, ModifiedField, Snapshot};

/// Half-open time range `[start, end)` that events must start in to be diffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl DiffWindow {
    /// Window covering `days` whole days from the midnight preceding `now`.
    pub fn starting_today(now: DateTime<FixedOffset>, days: u32) -> Self {
        let midnight = now
            .with_time(NaiveTime::MIN)
            .single()
            .unwrap_or(now);
        Self {
            start: midnight,
            end: midnight + Duration::days(i64::from(days)),
        }
    }

    pub fn contains(&self, event: &Event) -> bool {
        event.start >= self.start && event.start < self.end
    }
}

/// Calculator for computing changes between snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotDiffer;

impl SnapshotDiffer {
    pub fn new() -> Self {
        Self
    }

    /// Calculate the changes from `previous` to `current` inside `window`.
    pub fn diff(&self, previous: &Snapshot, current: &Snapshot, window: &DiffWindow) -> Vec<Change> {
        let prev: Vec<&Event> = previous.events().filter(|e| window.contains(e)).collect();
        let curr: Vec<&Event> = current.events().filter(|e| window.contains(e)).collect();

        let prev_map = Self::index(&prev);
        let curr_map = Self::index(&curr);

        let mut changes = Vec::new();

        // Added: in current but not in previous
        changes.extend(
            curr.iter()
                .filter(|e| !prev_map.contains_key(e.uid.as_str()))
                .map(|e| Change::Added { to: (*e).clone() }),
        );

        // Removed: in previous but not in current
        changes.extend(
            prev.iter()
                .filter(|e| !curr_map.contains_key(e.uid.as_str()))
                .map(|e| Change::Removed { from: (*e).clone() }),
        );

        // Modified: in both, reported under the first differing field
        for from in &prev {
            let Some(to) = curr_map.get(from.uid.as_str()) else {
                continue;
            };
            if let Some(field) = ModifiedField::PRIORITY
                .into_iter()
                .find(|field| field.differs(from, to))
            {
                changes.push(Change::Modified {
                    field,
                    from: (*from).clone(),
                    to: (*to).clone(),
                });
            }
        }

        changes
    }

    /// Map uids to events, keeping the first occurrence of a repeated uid.
    fn index<'a>(events: &[&'a Event]) -> HashMap<&'a str, &'a Event> {
        let mut map = HashMap::with_capacity(events.len());
        for event in events {
            map.entry(event.uid.as_str()).or_insert(*event);
        }
        map
    }
}

/// Convenience function to calculate a diff.
pub fn diff_snapshots(previous: &Snapshot, current: &Snapshot, window: &DiffWindow) -> Vec<Change> {
    SnapshotDiffer::new().diff(previous, current, window)
}
