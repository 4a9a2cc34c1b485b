// src/error.rs

//! Error type shared by the notifier.
//!
//! Nothing here is fatal to the polling loop: the scheduler folds feed,
//! transport and store errors into its cycle report. Only startup paths
//! (config, registry, CLI) let an `AppError` escape.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// A feed could not be fetched or answered with an error status
    #[error("feed {feed_id}: {message}")]
    Feed { feed_id: String, message: String },

    /// The push gateway refused or failed a batch
    #[error("push transport: {0}")]
    Transport(String),

    /// A notification record or registry file could not be used
    #[error("notification store: {0}")]
    Store(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// A classification keyword produced an invalid pattern
    #[error("keyword pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url: {0}")]
    Url(#[from] url::ParseError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AppError {
    pub fn feed(feed_id: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Feed {
            feed_id: feed_id.into(),
            message: message.to_string(),
        }
    }

    pub fn transport(message: impl fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
