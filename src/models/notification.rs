//! Push payloads and persisted notification records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Change, ChangeKind};

/// One batched delivery request handed to a push transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushMessage {
    pub destinations: Vec<String>,
    pub title: String,
    pub body: String,
}

/// Durable trace of a dispatched change.
///
/// Written once per dispatch attempt, whether or not the transport accepted
/// the batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRecord {
    pub group_id: String,
    pub kind: ChangeKind,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub action: String,
    pub destinations: Vec<String>,

    /// Stable hash of the change, for de-duplicating repeated deliveries
    pub fingerprint: String,

    /// Whether the transport call returned without error
    pub delivered: bool,

    pub created_at: DateTime<Utc>,
}

/// Hash identifying a change independently of when it was observed.
pub fn change_fingerprint(group_id: &str, change: &Change) -> String {
    let mut hasher = Sha256::new();
    hasher.update(group_id.as_bytes());
    hasher.update(b"|");
    hasher.update(change.kind().as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(change.uid().as_bytes());
    for side in [change.from(), change.to()] {
        hasher.update(b"|");
        if let Some(event) = side {
            hasher.update(event.start.to_rfc3339().as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, EventKind, ModifiedField, UNKNOWN_TEACHER};
    use chrono::{FixedOffset, TimeZone};

    fn make_event(uid: &str, hour: u32) -> Event {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let start = offset.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap();
        Event {
            uid: uid.to_string(),
            start,
            end: start,
            summary: "Math".into(),
            location: "A101".into(),
            teacher: UNKNOWN_TEACHER.into(),
            kind: EventKind::Class,
        }
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let change = Change::Added { to: make_event("A", 9) };
        let first = change_fingerprint("g1", &change);
        let second = change_fingerprint("g1", &change.clone());
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_fingerprint_distinguishes_groups_and_kinds() {
        let added = Change::Added { to: make_event("A", 9) };
        let removed = Change::Removed { from: make_event("A", 9) };
        let moved = Change::Modified {
            field: ModifiedField::Date,
            from: make_event("A", 9),
            to: make_event("A", 10),
        };

        let base = change_fingerprint("g1", &added);
        assert_ne!(base, change_fingerprint("g2", &added));
        assert_ne!(base, change_fingerprint("g1", &removed));
        assert_ne!(base, change_fingerprint("g1", &moved));
    }
}
