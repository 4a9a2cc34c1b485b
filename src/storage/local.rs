//! Local JSON storage backend.
//!
//! Serves the subscriber registry from `subscribers.json` and appends
//! dispatched notification records to monthly files under
//! `notifications/YYYY/MM.json`.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Datelike;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::NotificationRecord;
use crate::storage::{NotificationStore, SubscriberRegistry};

const SUBSCRIBERS_KEY: &str = "subscribers.json";

/// JSON files under one storage directory.
pub struct LocalStorage {
    root_dir: PathBuf,
    // Serializes read-modify-write cycles on the monthly record files.
    write_lock: Mutex<()>,
}

impl LocalStorage {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Replace `key` with the JSON encoding of `value` through a staging file,
    /// so readers never observe a half-written document.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path(key);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let staging = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&staging).await?;
        file.write_all(&serde_json::to_vec_pretty(value)?).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }

    /// Decode `key`, or `None` when the file does not exist yet.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Record file key for a given year/month.
    fn notifications_key(year: i32, month: u32) -> String {
        format!("notifications/{}/{:02}.json", year, month)
    }

    /// Replace the whole subscriber registry.
    pub async fn save_subscribers(&self, subscribers: &HashMap<String, Vec<String>>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_json(SUBSCRIBERS_KEY, subscribers).await
    }

    /// Load the records written during a given month.
    pub async fn load_notifications(&self, year: i32, month: u32) -> Result<Vec<NotificationRecord>> {
        let key = Self::notifications_key(year, month);
        Ok(self.read_json(&key).await?.unwrap_or_default())
    }
}

#[async_trait]
impl SubscriberRegistry for LocalStorage {
    async fn destinations(&self, group_id: &str) -> Result<Vec<String>> {
        let registry: HashMap<String, Vec<String>> =
            self.read_json(SUBSCRIBERS_KEY).await?.unwrap_or_default();
        Ok(registry.get(group_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl NotificationStore for LocalStorage {
    async fn save(&self, record: &NotificationRecord) -> Result<()> {
        let key = Self::notifications_key(record.created_at.year(), record.created_at.month());

        let _guard = self.write_lock.lock().await;
        let mut existing: Vec<NotificationRecord> = self.read_json(&key).await?.unwrap_or_default();
        existing.push(record.clone());
        self.write_json(&key, &existing).await?;

        log::debug!("Stored notification {} in {}", record.fingerprint, key);
        Ok(())
    }
}
