//! Date-bucketed view of a group's schedule.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Event;

/// The complete set of events for a group at one point in time.
///
/// Every event sits under the day of its `start`, and each day is sorted by
/// `start`. A snapshot is never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Snapshot {
    days: BTreeMap<NaiveDate, Vec<Event>>,
}

impl Snapshot {
    /// Build a snapshot from an unordered list of events.
    pub fn from_events(mut events: Vec<Event>) -> Self {
        // Stable sort keeps feed order for sessions starting together.
        events.sort_by_key(|event| event.start);

        let mut days: BTreeMap<NaiveDate, Vec<Event>> = BTreeMap::new();
        for event in events {
            days.entry(event.date()).or_default().push(event);
        }

        Self { days }
    }

    /// Events scheduled on a given day, in start order.
    pub fn day(&self, date: NaiveDate) -> &[Event] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Days that have at least one event, ascending.
    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.days.keys()
    }

    /// All events, day by day in start order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.days.values().flatten()
    }

    /// Total number of events.
    pub fn event_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
