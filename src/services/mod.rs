//! Service layer for the planning notifier.
//!
//! This module contains the business logic for:
//! - Feed parsing and classification (`FeedParser`, `Classifier`)
//! - Feed fetching (`FeedSource`, `HttpFeedSource`)
//! - Group snapshot assembly (`SnapshotAssembler`)
//! - Change rendering (`ChangeFormatter`)
//! - Notification delivery (`NotificationDispatcher`)

mod assembler;
mod classifier;
mod dispatcher;
mod feed;
mod formatter;
mod source;

pub use assembler::SnapshotAssembler;
pub use classifier::Classifier;
pub use dispatcher::{DispatchOutcome, DispatchRequest, NotificationDispatcher};
pub use feed::FeedParser;
pub use formatter::{ChangeFormatter, FormattedChange};
pub use source::{FeedSource, HttpFeedSource};
