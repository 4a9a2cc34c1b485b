// src/models/group.rs

//! Group and group-set registry structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A partition of groups polled together in one cycle (e.g., a sector).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSet {
    /// Display name of the set
    pub name: String,

    /// Groups belonging to this set
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl GroupSet {
    /// Load group-set definitions from a JSON file.
    pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Count total feeds in this set.
    pub fn feed_count(&self) -> usize {
        self.groups.iter().map(|g| g.feeds.len()).sum()
    }

    /// Check a list of sets for empty registries and duplicate group ids.
    pub fn validate_all(sets: &[Self]) -> Result<()> {
        if sets.is_empty() {
            return Err(AppError::validation("No group sets defined"));
        }

        let mut seen = HashSet::new();
        for set in sets {
            for group in &set.groups {
                if group.id.trim().is_empty() {
                    return Err(AppError::validation(format!(
                        "Group with empty id in set '{}'",
                        set.name
                    )));
                }
                if !seen.insert(group.id.as_str()) {
                    return Err(AppError::validation(format!(
                        "Duplicate group id '{}'",
                        group.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The notification unit: one class section with its feeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    /// Unique identifier, also the subscriber registry key
    pub id: String,

    /// Display name used in notification titles
    pub name: String,

    /// Upstream feed ids covering this group's schedule
    #[serde(default)]
    pub feeds: Vec<String>,
}
