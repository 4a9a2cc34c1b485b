//! Typed differences between two snapshots.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::Event;

/// Field reported by a modification, in comparison priority order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModifiedField {
    Date,
    Title,
    Location,
    Teacher,
}

impl ModifiedField {
    /// Every field in the order it is compared.
    pub const PRIORITY: [ModifiedField; 4] = [
        ModifiedField::Date,
        ModifiedField::Title,
        ModifiedField::Location,
        ModifiedField::Teacher,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModifiedField::Date => "date",
            ModifiedField::Title => "title",
            ModifiedField::Location => "location",
            ModifiedField::Teacher => "teacher",
        }
    }

    /// Whether this field differs between two versions of an event.
    pub fn differs(&self, from: &Event, to: &Event) -> bool {
        match self {
            ModifiedField::Date => from.start != to.start,
            ModifiedField::Title => from.summary != to.summary,
            ModifiedField::Location => from.location != to.location,
            ModifiedField::Teacher => from.teacher != to.teacher,
        }
    }
}

/// Flat change type, as stored and logged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    ModifiedDate,
    ModifiedTitle,
    ModifiedLocation,
    ModifiedTeacher,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::ModifiedDate => "modified_date",
            ChangeKind::ModifiedTitle => "modified_title",
            ChangeKind::ModifiedLocation => "modified_location",
            ChangeKind::ModifiedTeacher => "modified_teacher",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ModifiedField> for ChangeKind {
    fn from(field: ModifiedField) -> Self {
        match field {
            ModifiedField::Date => ChangeKind::ModifiedDate,
            ModifiedField::Title => ChangeKind::ModifiedTitle,
            ModifiedField::Location => ChangeKind::ModifiedLocation,
            ModifiedField::Teacher => ChangeKind::ModifiedTeacher,
        }
    }
}

/// One difference between a previous and a current snapshot.
///
/// The variants carry exactly the sides that exist: an addition has no
/// previous event, a removal no current one, and a modification both
/// versions of the same `uid`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    Added {
        to: Event,
    },
    Removed {
        from: Event,
    },
    Modified {
        field: ModifiedField,
        from: Event,
        to: Event,
    },
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Added { .. } => ChangeKind::Added,
            Change::Removed { .. } => ChangeKind::Removed,
            Change::Modified { field, .. } => ChangeKind::from(*field),
        }
    }

    /// Previous version of the event, if any.
    pub fn from(&self) -> Option<&Event> {
        match self {
            Change::Added { .. } => None,
            Change::Removed { from } | Change::Modified { from, .. } => Some(from),
        }
    }

    /// Current version of the event, if any.
    pub fn to(&self) -> Option<&Event> {
        match self {
            Change::Removed { .. } => None,
            Change::Added { to } | Change::Modified { to, .. } => Some(to),
        }
    }

    /// Identifier of the affected event.
    pub fn uid(&self) -> &str {
        match self {
            Change::Added { to } => &to.uid,
            Change::Removed { from } | Change::Modified { from, .. } => &from.uid,
        }
    }

    /// Start time used to locate the change: the new start when there is
    /// one, the old one otherwise.
    pub fn reference_start(&self) -> DateTime<FixedOffset> {
        match self {
            Change::Removed { from } => from.start,
            Change::Added { to } | Change::Modified { to, .. } => to.start,
        }
    }
}
