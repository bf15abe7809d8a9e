//! Narrowing the merged event collection down to the unique event set.
//!
//! Applied in order: window, skip list, dedup. The order matters for dedup
//! stability, since the first surviving event for a key wins.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::event::NormalizedEvent;
use crate::plan::CANCEL_PREFIX;
use crate::window::SyncWindow;

pub struct EventFilter {
    window: SyncWindow,
    skip_phrases: Vec<String>,
}

impl EventFilter {
    /// `skip_phrases` match case-insensitively anywhere in the summary.
    /// Blank phrases are ignored.
    pub fn new(window: SyncWindow, skip_phrases: &[String]) -> Self {
        EventFilter {
            window,
            skip_phrases: skip_phrases
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn in_window(&self, event: &NormalizedEvent) -> bool {
        self.window.contains(event.start.instant)
    }

    /// The skip phrase that excludes `summary`, if any.
    pub fn skip_phrase_for(&self, summary: &str) -> Option<&str> {
        let summary = summary.to_lowercase();
        self.skip_phrases
            .iter()
            .find(|phrase| summary.contains(phrase.as_str()))
            .map(String::as_str)
    }

    /// Produce the unique event set, preserving input order.
    pub fn apply(&self, events: Vec<NormalizedEvent>) -> Vec<NormalizedEvent> {
        let total = events.len();
        let mut seen: HashSet<(String, DateTime<Utc>)> = HashSet::new();
        let mut unique = Vec::new();

        for event in events {
            if !self.in_window(&event) {
                tracing::debug!("Outside window: '{}' at {}", event.summary, event.start.instant);
                continue;
            }

            if let Some(phrase) = self.skip_phrase_for(&event.summary) {
                tracing::debug!("Skipping '{}' (matches '{}')", event.summary, phrase);
                continue;
            }

            if event.summary.starts_with(CANCEL_PREFIX) {
                tracing::debug!("Skipping cancellation marker '{}'", event.summary);
                continue;
            }

            let (summary, start) = event.identity_key();
            if !seen.insert((summary.to_string(), start)) {
                tracing::debug!("Duplicate: '{}' at {}", event.summary, event.start.instant);
                continue;
            }

            unique.push(event);
        }

        tracing::info!("{} of {} events left after filtering", unique.len(), total);
        unique
    }
}
