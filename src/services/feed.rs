// src/services/feed.rs

//! Calendar feed parser.
//!
//! Turns one raw feed body into typed events. Blocks that are truncated or
//! miss a required field are dropped silently; everything else in the feed
//! still parses.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::error::Result;
use crate::models::{Config, Event, UNKNOWN_TEACHER};
use crate::services::Classifier;
use crate::utils::{strip_diacritics, strip_numeric_tag, unescape_text};

const BLOCK_BEGIN: &str = "BEGIN:VEVENT";
const BLOCK_END: &str = "END:VEVENT";

/// Escaped line break inside a DESCRIPTION value.
const LINE_ESCAPE: &str = "\\n";

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// One or more lines of capitalized words, each line bounded by `\n`.
///
/// A name line needs at least two words: lone capitalized tokens in the
/// description are group or room codes (`TD`, `INFO1`, `Amphi`), not people.
const TEACHER_PATTERN: &str = r"\\n([A-Z][A-Za-z'-]+(?: [A-Z][A-Za-z'-]+)+(?:\\n[A-Z][A-Za-z'-]+(?: [A-Z][A-Za-z'-]+)+)*)\\n";

/// Parser for the calendar feed format.
#[derive(Debug, Clone)]
pub struct FeedParser {
    classifier: Classifier,
    offset: FixedOffset,
    teacher_pattern: Regex,
}

impl FeedParser {
    /// Create a parser from application configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let offset = config.feed.offset()?;
        let classifier = Classifier::new(&config.classification.rules)?;
        Self::with_classifier(classifier, offset)
    }

    /// Create a parser with an explicit classifier and offset.
    pub fn with_classifier(classifier: Classifier, offset: FixedOffset) -> Result<Self> {
        Ok(Self {
            classifier,
            offset,
            teacher_pattern: Regex::new(TEACHER_PATTERN)?,
        })
    }

    /// Offset every parsed timestamp is expressed in.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Parse every well-formed event block in a feed body.
    ///
    /// The result keeps feed order; it is neither sorted nor bucketed.
    pub fn parse(&self, raw: &str) -> Vec<Event> {
        let mut events = Vec::new();
        let mut skipped = 0usize;

        for candidate in raw.split(BLOCK_BEGIN).skip(1) {
            let Some(end) = candidate.find(BLOCK_END) else {
                skipped += 1;
                continue;
            };
            match self.parse_block(&candidate[..end]) {
                Some(event) => events.push(event),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::debug!("Skipped {} malformed feed block(s)", skipped);
        }
        events
    }

    fn parse_block(&self, block: &str) -> Option<Event> {
        let fields = Self::collect_fields(block);

        let uid = fields.get("UID")?.trim();
        if uid.is_empty() {
            return None;
        }
        let start = self.parse_timestamp(fields.get("DTSTART")?)?;
        let end = self.parse_timestamp(fields.get("DTEND")?)?;
        let summary = unescape_text(fields.get("SUMMARY")?).trim().to_string();
        let location = strip_numeric_tag(&unescape_text(fields.get("LOCATION")?));
        let teacher = self.extract_teacher(fields.get("DESCRIPTION")?);
        let kind = self.classifier.classify(&summary);

        Some(Event {
            uid: uid.to_string(),
            start,
            end,
            summary,
            location,
            teacher,
            kind,
        })
    }

    /// Unfold continuation lines and map property names to raw values.
    ///
    /// Property parameters are dropped (`DTSTART;TZID=X:...` is `DTSTART`),
    /// and the first occurrence of a property wins.
    fn collect_fields(block: &str) -> HashMap<String, String> {
        let mut lines: Vec<String> = Vec::new();
        for line in block.lines() {
            let line = line.trim_end_matches('\r');
            if let Some(continuation) = line.strip_prefix([' ', '\t']) {
                if let Some(last) = lines.last_mut() {
                    last.push_str(continuation);
                }
                continue;
            }
            lines.push(line.to_string());
        }

        let mut fields = HashMap::new();
        for line in lines {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let name = key.split(';').next().unwrap_or(key).trim().to_ascii_uppercase();
            fields.entry(name).or_insert_with(|| value.to_string());
        }
        fields
    }

    fn parse_timestamp(&self, value: &str) -> Option<DateTime<FixedOffset>> {
        let value = value.trim();
        match value.strip_suffix('Z') {
            Some(utc) => {
                let naive = NaiveDateTime::parse_from_str(utc, TIMESTAMP_FORMAT).ok()?;
                Some(Utc.from_utc_datetime(&naive).with_timezone(&self.offset))
            }
            None => {
                let naive = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()?;
                self.offset.from_local_datetime(&naive).single()
            }
        }
    }

    /// Find the instructor line(s) in a description, or the sentinel.
    fn extract_teacher(&self, description: &str) -> String {
        let normalized = strip_diacritics(description);
        self.teacher_pattern
            .captures(&normalized)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().split(LINE_ESCAPE).collect::<Vec<_>>().join(", "))
            .unwrap_or_else(|| UNKNOWN_TEACHER.to_string())
    }
}
