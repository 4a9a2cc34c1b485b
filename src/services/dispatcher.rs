// src/services/dispatcher.rs

//! Notification dispatch.
//!
//! One dispatch is one batched transport call followed by one persisted
//! record. The record is written whether or not the transport call
//! succeeded: it traces that delivery was attempted, not that it arrived.
//! Errors never escape; they come back as a [`DispatchOutcome`].

use std::sync::Arc;

use chrono::Utc;

use crate::models::{ChangeKind, NotificationRecord, PushMessage};
use crate::storage::{NotificationStore, PushTransport};

/// Everything needed to notify subscribers of one change.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub group_id: String,
    pub kind: ChangeKind,
    pub fingerprint: String,
    pub destinations: Vec<String>,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub action: String,
}

/// What happened to one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No destinations: nothing was sent or stored
    Skipped,
    /// The transport accepted the batch
    Delivered { stored: bool },
    /// The transport call failed
    Failed { stored: bool, error: String },
}

impl DispatchOutcome {
    /// Whether a record write was attempted and failed.
    pub fn store_failed(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::Delivered { stored: false } | DispatchOutcome::Failed { stored: false, .. }
        )
    }
}

/// Sends batches through a transport and records them in a store.
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn PushTransport>,
    store: Arc<dyn NotificationStore>,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn PushTransport>, store: Arc<dyn NotificationStore>) -> Self {
        Self { transport, store }
    }

    /// Deliver one notification and persist its record.
    pub async fn dispatch(&self, request: DispatchRequest) -> DispatchOutcome {
        if request.destinations.is_empty() {
            return DispatchOutcome::Skipped;
        }

        let message = PushMessage {
            destinations: request.destinations,
            title: request.title,
            body: request.body,
        };

        let delivery = self.transport.send(&message).await;
        if let Err(error) = &delivery {
            log::error!(
                "Delivery failed for group {} ({} destination(s)): {}",
                request.group_id,
                message.destinations.len(),
                error
            );
        }

        let record = NotificationRecord {
            group_id: request.group_id,
            kind: request.kind,
            title: message.title,
            body: message.body,
            icon: request.icon,
            action: request.action,
            destinations: message.destinations,
            fingerprint: request.fingerprint,
            delivered: delivery.is_ok(),
            created_at: Utc::now(),
        };

        let stored = match self.store.save(&record).await {
            Ok(()) => true,
            Err(error) => {
                log::error!(
                    "Failed to store notification {} for group {}: {}",
                    record.fingerprint,
                    record.group_id,
                    error
                );
                false
            }
        };

        match delivery {
            Ok(()) => DispatchOutcome::Delivered { stored },
            Err(error) => DispatchOutcome::Failed {
                stored,
                error: error.to_string(),
            },
        }
    }
}
