//! Event records produced by the extractors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate future event found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventRef {
    pub url: String,
}

impl EventRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A normalized event as read from a single event page.
///
/// Only `source_url` is guaranteed. A record without `title` or
/// `start_timestamp` is still returned by extraction but cannot be stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: Option<String>,
    pub description: Option<String>,
    pub organiser: Option<String>,
    pub street_address: Option<String>,
    pub post_address: Option<String>,
    pub country: Option<String>,
    /// Unix epoch seconds.
    pub start_timestamp: Option<i64>,
    /// Unix epoch seconds.
    pub end_timestamp: Option<i64>,
    pub source_url: String,
}

impl EventRecord {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    /// Title if present and not blank.
    pub fn usable_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start_timestamp
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end_timestamp.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    /// Short label for log lines: the title, or the source URL when untitled.
    pub fn label(&self) -> &str {
        self.usable_title().unwrap_or(&self.source_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_title_rejects_blank() {
        let mut record = EventRecord::new("https://example.com/events/1");
        assert_eq!(record.usable_title(), None);
        record.title = Some("   ".into());
        assert_eq!(record.usable_title(), None);
        record.title = Some(" Quiz ".into());
        assert_eq!(record.usable_title(), Some("Quiz"));
    }

    #[test]
    fn test_label_falls_back_to_url() {
        let record = EventRecord::new("https://example.com/events/1");
        assert_eq!(record.label(), "https://example.com/events/1");
    }

    #[test]
    fn test_start_converts_epoch() {
        let record = EventRecord {
            start_timestamp: Some(1_748_736_000),
            ..EventRecord::new("u")
        };
        assert_eq!(
            record.start().unwrap().format("%Y-%m-%d").to_string(),
            "2025-06-01"
        );
    }
}
