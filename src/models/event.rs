//! Calendar event data structure.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Placeholder instructor name used when none can be extracted from a feed.
pub const UNKNOWN_TEACHER: &str = "Unknown teacher";

/// Pedagogical kind of an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[default]
    Class,
    Evaluation,
    Project,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Class => "class",
            EventKind::Evaluation => "evaluation",
            EventKind::Project => "project",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single session parsed from a calendar feed.
///
/// Identity is the `uid`; two events with the same `uid` are the same session
/// across polls, whatever else changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// Stable identifier from the source feed
    pub uid: String,

    /// Start time, in the fixed parsing offset
    pub start: DateTime<FixedOffset>,

    /// End time, in the fixed parsing offset
    pub end: DateTime<FixedOffset>,

    /// Course or session title
    pub summary: String,

    /// Room or building
    pub location: String,

    /// Instructor name, or [`UNKNOWN_TEACHER`]
    pub teacher: String,

    /// Kind derived from the summary
    pub kind: EventKind,
}

impl Event {
    /// Calendar day the event belongs to.
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Whether an instructor was found in the feed.
    pub fn has_known_teacher(&self) -> bool {
        self.teacher != UNKNOWN_TEACHER
    }
}
