// src/services/formatter.rs

//! Human-readable rendering of schedule changes.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::models::{Change, ChangeKind, NotifyConfig};

const DATE_TIME_FORMAT: &str = "%d/%m/%Y at %H:%M";
const ACTION_DATE_FORMAT: &str = "%Y-%m-%d";

/// A change rendered for delivery.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FormattedChange {
    /// Notification body
    pub text: String,
    /// Deep link to the affected day
    pub action: String,
    /// Icon tag for the change type
    pub icon: String,
}

/// Renders changes into notification text and deep links.
#[derive(Debug, Clone)]
pub struct ChangeFormatter {
    action_base: String,
}

impl ChangeFormatter {
    pub fn new(action_base: impl Into<String>) -> Self {
        Self {
            action_base: action_base.into(),
        }
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        Self::new(config.action_base.clone())
    }

    /// Render a change.
    pub fn format(&self, change: &Change) -> FormattedChange {
        let text = match change {
            Change::Added { to } => format!(
                "Addition of '{}' on {}",
                to.summary,
                Self::date_time(&to.start)
            ),
            Change::Removed { from } => format!(
                "Removal of '{}' on {}",
                from.summary,
                Self::date_time(&from.start)
            ),
            Change::Modified { field, from, to } => format!(
                "Modification of the {} of '{}' on {}",
                field.as_str(),
                from.summary,
                Self::date_time(&to.start)
            ),
        };

        let action = format!(
            "{}{}",
            self.action_base,
            change.reference_start().format(ACTION_DATE_FORMAT)
        );

        FormattedChange {
            text,
            action,
            icon: Self::icon(change.kind()).to_string(),
        }
    }

    /// Icon tag shown next to a notification.
    pub fn icon(kind: ChangeKind) -> &'static str {
        match kind {
            ChangeKind::Added => "event_available",
            ChangeKind::Removed => "event_busy",
            ChangeKind::ModifiedDate
            | ChangeKind::ModifiedTitle
            | ChangeKind::ModifiedLocation
            | ChangeKind::ModifiedTeacher => "edit_calendar",
        }
    }

    fn date_time(at: &DateTime<FixedOffset>) -> String {
        at.format(DATE_TIME_FORMAT).to_string()
    }
}

impl Default for ChangeFormatter {
    fn default() -> Self {
        Self::from_config(&NotifyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, EventKind, ModifiedField, UNKNOWN_TEACHER};
    use chrono::TimeZone;

    fn make_event(uid: &str, summary: &str, day: u32, hour: u32) -> Event {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let start = offset.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap();
        Event {
            uid: uid.to_string(),
            start,
            end: start,
            summary: summary.to_string(),
            location: "A101".into(),
            teacher: UNKNOWN_TEACHER.into(),
            kind: EventKind::Class,
        }
    }

    fn formatter() -> ChangeFormatter {
        ChangeFormatter::new("/planning?date=")
    }

    #[test]
    fn test_addition() {
        let change = Change::Added {
            to: make_event("B", "Physics", 4, 9),
        };
        let formatted = formatter().format(&change);
        assert_eq!(formatted.text, "Addition of 'Physics' on 04/03/2024 at 09:00");
        assert_eq!(formatted.action, "/planning?date=2024-03-04");
        assert_eq!(formatted.icon, "event_available");
    }

    #[test]
    fn test_removal_uses_previous_date() {
        let change = Change::Removed {
            from: make_event("A", "Math", 4, 9),
        };
        let formatted = formatter().format(&change);
        assert_eq!(formatted.text, "Removal of 'Math' on 04/03/2024 at 09:00");
        assert_eq!(formatted.action, "/planning?date=2024-03-04");
        assert_eq!(formatted.icon, "event_busy");
    }

    #[test]
    fn test_modification_uses_old_title_and_new_date() {
        let change = Change::Modified {
            field: ModifiedField::Date,
            from: make_event("A", "Math", 4, 9),
            to: make_event("A", "Math II", 6, 14),
        };
        let formatted = formatter().format(&change);
        assert_eq!(
            formatted.text,
            "Modification of the date of 'Math' on 06/03/2024 at 14:00"
        );
        assert_eq!(formatted.action, "/planning?date=2024-03-06");
        assert_eq!(formatted.icon, "edit_calendar");
    }

    #[test]
    fn test_modification_names_each_field() {
        for (field, word) in [
            (ModifiedField::Title, "title"),
            (ModifiedField::Location, "location"),
            (ModifiedField::Teacher, "teacher"),
        ] {
            let change = Change::Modified {
                field,
                from: make_event("A", "Math", 4, 9),
                to: make_event("A", "Math", 4, 9),
            };
            let text = formatter().format(&change).text;
            assert!(text.starts_with(&format!("Modification of the {} of", word)));
        }
    }
}
