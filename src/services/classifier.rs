// src/services/classifier.rs

//! Event kind classification.
//!
//! Summaries are matched against an ordered rule table; the first rule with
//! a matching keyword decides the kind, and unmatched summaries are classes.
//! Keywords match whole words only, ignoring case and accents.

use regex::Regex;

use crate::error::Result;
use crate::models::{ClassificationRule, EventKind};
use crate::utils::strip_diacritics;

/// Compiled form of the classification rule table.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<(Regex, EventKind)>,
}

impl Classifier {
    /// Compile a rule table, keeping its order.
    pub fn new(rules: &[ClassificationRule]) -> Result<Self> {
        let compiled = rules
            .iter()
            .filter(|rule| !rule.keywords.is_empty())
            .map(|rule| Ok((Self::compile(&rule.keywords)?, rule.kind)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules: compiled })
    }

    /// Derive the kind of an event from its summary.
    pub fn classify(&self, summary: &str) -> EventKind {
        let normalized = strip_diacritics(summary);
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.is_match(&normalized))
            .map(|(_, kind)| *kind)
            .unwrap_or_default()
    }

    fn compile(keywords: &[String]) -> Result<Regex> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| regex::escape(&strip_diacritics(k.trim())))
            .collect();
        let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
        Ok(Regex::new(&pattern)?)
    }
}
