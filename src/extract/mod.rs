//! Extraction of event references and event details from rendered pages.
//!
//! Everything the platform could rename lives in [`ExtractionConfig`]: the
//! text markers that pick out the embedded payload scripts and the dotted
//! paths walked inside them.

pub mod detail;
pub mod listing;
pub mod path;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{HarvestError, Result};
use crate::render::RenderedPage;

pub use detail::extract_event;
pub use listing::{extract_event_urls, listing_url};
pub use path::{extract, JsonPath, JsonPathError, Step};

/// Markers and payload paths for the platform's event pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Seconds to wait for the listing payload to appear.
    pub marker_timeout_secs: u64,

    /// Meta property holding the event title.
    pub title_property: String,

    /// Text marker of the listing payload script.
    pub listing_marker: String,
    /// From the listing payload root to the array of edges.
    pub edges_path: JsonPath,
    /// From one edge to its start timestamp.
    pub edge_start_path: JsonPath,
    /// From one edge to the event URL.
    pub edge_url_path: JsonPath,

    /// Text marker of the description payload script.
    pub description_marker: String,
    /// From the description payload root to the candidate array.
    pub candidates_path: JsonPath,
    /// From one candidate to the event object.
    pub candidate_event_path: JsonPath,
    pub description_path: JsonPath,
    pub organiser_path: JsonPath,
    /// One-line address, split on commas into street, postal and country.
    pub address_path: JsonPath,

    /// Text marker of the timestamp payload script.
    pub timestamp_marker: String,
    /// From the timestamp payload root to the object holding both timestamps.
    pub timestamps_path: JsonPath,
    pub start_path: JsonPath,
    pub end_path: JsonPath,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            marker_timeout_secs: 30,
            title_property: "og:title".to_string(),
            listing_marker: "actions_renderer".to_string(),
            edges_path: path(
                "require.0.3.0.__bbox.require.9.3.1.__bbox.result.data.node.all_collections.nodes.0.style_renderer.collection.pageItems.edges",
            ),
            edge_start_path: path("node.actions_renderer.event.start_timestamp"),
            edge_url_path: path("node.node.url"),
            description_marker: "event_description".to_string(),
            candidates_path: path("require.0.3.0.__bbox.require"),
            candidate_event_path: path("3.1.__bbox.result.data.event"),
            description_path: path("event_description.text"),
            organiser_path: path("event_creator.name"),
            address_path: path("one_line_address"),
            timestamp_marker: "end_timestamp".to_string(),
            timestamps_path: path("require.0.3.0.__bbox.require.1.3.1.__bbox.result.data"),
            start_path: path("start_timestamp"),
            end_path: path("end_timestamp"),
        }
    }
}

impl ExtractionConfig {
    pub fn marker_timeout(&self) -> Duration {
        Duration::from_secs(self.marker_timeout_secs)
    }
}

/// Parse a built-in path. Only used with literals that contain no empty segment.
fn path(dotted: &str) -> JsonPath {
    JsonPath::new(
        dotted
            .split('.')
            .map(|segment| match segment.parse::<usize>() {
                Ok(idx) => Step::Index(idx),
                Err(_) => Step::Key(segment.to_string()),
            })
            .collect(),
    )
}

/// Parse every script on `page` that contains `marker`.
///
/// Scripts that are not valid JSON are skipped one by one; they never fail
/// the page.
pub(crate) async fn marked_payloads(page: &dyn RenderedPage, marker: &str) -> Result<Vec<Value>> {
    let scripts = page.query_by_text_marker(marker).await?;

    let mut payloads = Vec::with_capacity(scripts.len());
    for text in scripts {
        match parse_payload(page.url(), marker, &text) {
            Ok(value) => payloads.push(value),
            Err(e) => debug!("Skipping script: {}", e),
        }
    }
    Ok(payloads)
}

fn parse_payload(url: &str, marker: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text.trim()).map_err(|source| HarvestError::ParseFailure {
        context: format!("\"{}\" script on {}", marker, url),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_match_dotted_form() {
        let cfg = ExtractionConfig::default();
        assert_eq!(
            cfg.timestamps_path.to_string(),
            "require.0.3.0.__bbox.require.1.3.1.__bbox.result.data"
        );
        assert_eq!(
            cfg.timestamps_path,
            "require.0.3.0.__bbox.require.1.3.1.__bbox.result.data"
                .parse::<JsonPath>()
                .unwrap()
        );
        assert_eq!(cfg.candidate_event_path.steps()[0], Step::Index(3));
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let cfg: ExtractionConfig =
            toml::from_str("listing_marker = \"collection_renderer\"\nmarker_timeout_secs = 5")
                .unwrap();
        assert_eq!(cfg.listing_marker, "collection_renderer");
        assert_eq!(cfg.marker_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.edge_url_path.to_string(), "node.node.url");
    }

    #[test]
    fn test_bad_path_in_config_is_rejected() {
        let result: std::result::Result<ExtractionConfig, _> =
            toml::from_str("edge_url_path = \"node..url\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_failure_names_the_page() {
        let err = parse_payload("https://example.com/e/1", "end_timestamp", "{nope").unwrap_err();
        assert!(matches!(err, HarvestError::ParseFailure { .. }));
        assert!(err.to_string().contains("https://example.com/e/1"));
    }
}
