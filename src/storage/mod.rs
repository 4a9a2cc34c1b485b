//! External collaborators of the notifier.
//!
//! The core only depends on three contracts:
//! - [`SubscriberRegistry`]: which push destinations follow a group
//! - [`PushTransport`]: one batched delivery call per dispatch
//! - [`NotificationStore`]: one durable record per dispatched change
//!
//! ## Local Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Notifier configuration
//! ├── groups.json           # Group-set registry
//! ├── subscribers.json      # Group id -> push destinations
//! └── notifications/        # Dispatched change records
//!     └── 2024/
//!         └── 03.json
//! ```

pub mod local;
pub mod push;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NotificationRecord, PushMessage};

// Re-export for convenience
pub use local::LocalStorage;
pub use push::{HttpPushTransport, LogTransport};

/// Source of push destinations subscribed to a group's schedule changes.
#[async_trait]
pub trait SubscriberRegistry: Send + Sync {
    /// Current destinations for a group; an empty list is a normal answer.
    async fn destinations(&self, group_id: &str) -> Result<Vec<String>>;
}

/// Batched push delivery.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<()>;
}

/// Durable history of dispatched notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn save(&self, record: &NotificationRecord) -> Result<()>;
}
