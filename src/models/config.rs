//! Application configuration structures.

use std::fs;
use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::EventKind;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Calendar feed endpoint and fetch behavior
    #[serde(default)]
    pub feed: FeedConfig,

    /// Scheduler cadence and diff window
    #[serde(default)]
    pub polling: PollingConfig,

    /// Notification rendering and delivery
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Event kind keyword rules
    #[serde(default)]
    pub classification: ClassificationConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.feed.base_url.trim().is_empty() {
            return Err(AppError::validation("feed.base_url is empty"));
        }
        url::Url::parse(&self.feed.base_url)?;
        if self.feed.feed_param.trim().is_empty() {
            return Err(AppError::validation("feed.feed_param is empty"));
        }
        if self.feed.user_agent.trim().is_empty() {
            return Err(AppError::validation("feed.user_agent is empty"));
        }
        if self.feed.timeout_secs == 0 {
            return Err(AppError::validation("feed.timeout_secs must be > 0"));
        }
        if self.feed.max_concurrent == 0 {
            return Err(AppError::validation("feed.max_concurrent must be > 0"));
        }
        if self.feed.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(AppError::validation(
                "feed.utc_offset_minutes must be within one day",
            ));
        }
        if self.polling.interval_secs == 0 {
            return Err(AppError::validation("polling.interval_secs must be > 0"));
        }
        if self.polling.max_concurrent_groups == 0 {
            return Err(AppError::validation(
                "polling.max_concurrent_groups must be > 0",
            ));
        }
        if self.notify.max_concurrent == 0 {
            return Err(AppError::validation("notify.max_concurrent must be > 0"));
        }
        if self.classification.rules.is_empty() {
            return Err(AppError::validation("No classification rules defined"));
        }
        if let Some(rule) = self
            .classification
            .rules
            .iter()
            .find(|r| r.keywords.is_empty())
        {
            return Err(AppError::validation(format!(
                "Classification rule for '{}' has no keywords",
                rule.kind
            )));
        }
        Ok(())
    }
}

/// Calendar feed fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed endpoint, queried once per feed id
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Query parameter carrying the feed id
    #[serde(default = "defaults::feed_param")]
    pub feed_param: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-fetch timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent feed fetches per group
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Fixed offset applied to every parsed timestamp
    #[serde(default = "defaults::utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl FeedConfig {
    /// The fixed offset timestamps are normalized to.
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            AppError::config(format!(
                "Invalid UTC offset: {} minutes",
                self.utc_offset_minutes
            ))
        })
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            feed_param: defaults::feed_param(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            utc_offset_minutes: defaults::utc_offset_minutes(),
        }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between cycle starts in seconds
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// Number of days ahead, starting today, that are diffed
    #[serde(default = "defaults::forward_days")]
    pub forward_days: u32,

    /// Maximum groups assembled at once within a cycle
    #[serde(default = "defaults::max_concurrent_groups")]
    pub max_concurrent_groups: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
            forward_days: defaults::forward_days(),
            max_concurrent_groups: defaults::max_concurrent_groups(),
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Title template; supports `{group}` and `{group_id}`
    #[serde(default = "defaults::title_template")]
    pub title_template: String,

    /// Deep-link prefix; the `YYYY-MM-DD` date is appended
    #[serde(default = "defaults::action_base")]
    pub action_base: String,

    /// Maximum dispatches in flight within a cycle
    #[serde(default = "defaults::max_concurrent_dispatch")]
    pub max_concurrent: usize,

    /// Push gateway endpoint; messages are only logged when unset
    #[serde(default)]
    pub push_endpoint: Option<String>,
}

impl NotifyConfig {
    /// Render the notification title for a group.
    pub fn title_for(&self, group_id: &str, group_name: &str) -> String {
        self.title_template
            .replace("{group_id}", group_id)
            .replace("{group}", group_name)
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            title_template: defaults::title_template(),
            action_base: defaults::action_base(),
            max_concurrent: defaults::max_concurrent_dispatch(),
            push_endpoint: None,
        }
    }
}

/// Ordered keyword table used to derive an event's kind from its summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Rules evaluated in order; the first matching rule wins
    #[serde(default = "defaults::classification_rules")]
    pub rules: Vec<ClassificationRule>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            rules: defaults::classification_rules(),
        }
    }
}

/// Keywords that mark a summary as a given kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub kind: EventKind,
    pub keywords: Vec<String>,
}

mod defaults {
    use super::ClassificationRule;
    use crate::models::EventKind;

    // Feed defaults
    pub fn base_url() -> String {
        "https://planning.example.edu/jsp/custom/modules/plannings/anonymous_cal.jsp".into()
    }
    pub fn feed_param() -> String {
        "resources".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; planwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn utc_offset_minutes() -> i32 {
        60
    }

    // Polling defaults
    pub fn interval() -> u64 {
        60
    }
    pub fn forward_days() -> u32 {
        7
    }
    pub fn max_concurrent_groups() -> usize {
        8
    }

    // Notify defaults
    pub fn title_template() -> String {
        "Schedule update - {group}".into()
    }
    pub fn action_base() -> String {
        "/planning?date=".into()
    }
    pub fn max_concurrent_dispatch() -> usize {
        8
    }

    // Classification defaults
    pub fn classification_rules() -> Vec<ClassificationRule> {
        vec![
            ClassificationRule {
                kind: EventKind::Evaluation,
                keywords: [
                    "examen",
                    "exam",
                    "partiel",
                    "controle",
                    "ds",
                    "evaluation",
                    "interrogation",
                    "qcm",
                    "soutenance",
                    "rattrapage",
                ]
                .map(String::from)
                .to_vec(),
            },
            ClassificationRule {
                kind: EventKind::Project,
                keywords: ["projet", "project", "sae", "hackathon"]
                    .map(String::from)
                    .to_vec(),
            },
        ]
    }
}
