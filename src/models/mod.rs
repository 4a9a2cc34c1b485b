// src/models/mod.rs

//! Domain models for the planning notifier.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod change;
mod config;
mod event;
mod group;
mod notification;
mod snapshot;

// Re-export all public types
pub use change::{Change, ChangeKind, ModifiedField};
pub use config::{
    ClassificationConfig, ClassificationRule, Config, FeedConfig, NotifyConfig, PollingConfig,
};
pub use event::{Event, EventKind, UNKNOWN_TEACHER};
pub use group::{Group, GroupSet};
pub use notification::{NotificationRecord, PushMessage, change_fingerprint};
pub use snapshot::Snapshot;
