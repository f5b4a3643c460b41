//! Listing page extraction: future event URLs of one source.

use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::{marked_payloads, ExtractionConfig};
use crate::error::{HarvestError, Result};
use crate::models::EventRef;
use crate::render::{RenderedPage, Renderer};

/// Listing URL for a source line: `{source}/events/`.
pub fn listing_url(source: &str) -> Result<String> {
    let source = source.trim();
    let parsed = Url::parse(source).map_err(|e| HarvestError::InvalidSource {
        source_line: source.to_string(),
        message: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(HarvestError::InvalidSource {
            source_line: source.to_string(),
            message: format!("unsupported scheme \"{}\"", parsed.scheme()),
        });
    }

    Ok(format!("{}/events/", source.trim_end_matches('/')))
}

/// Render a listing page and collect the URLs of events starting after `now`.
///
/// An empty vector means the page loaded and listed nothing upcoming; any
/// render problem is an `Err`, never an empty list.
pub async fn extract_event_urls(
    renderer: &mut dyn Renderer,
    listing_url: &str,
    cfg: &ExtractionConfig,
    now: i64,
) -> Result<Vec<EventRef>> {
    let page = renderer.render(listing_url).await?;
    let result = read_listing(page.as_ref(), cfg, now).await;
    page.close().await;
    result
}

async fn read_listing(
    page: &dyn RenderedPage,
    cfg: &ExtractionConfig,
    now: i64,
) -> Result<Vec<EventRef>> {
    page.wait_for(&cfg.listing_marker, cfg.marker_timeout()).await?;

    let mut events = Vec::new();
    for payload in marked_payloads(page, &cfg.listing_marker).await? {
        events.extend(upcoming_events(&payload, cfg, now));
    }

    info!("Found {} upcoming events on {}", events.len(), page.url());
    Ok(events)
}

/// Edges of one listing payload whose start is after `now` and that carry a URL.
pub fn upcoming_events(payload: &Value, cfg: &ExtractionConfig, now: i64) -> Vec<EventRef> {
    let Some(edges) = cfg.edges_path.resolve_array(payload) else {
        debug!("No edges at {}", cfg.edges_path);
        return Vec::new();
    };

    edges
        .iter()
        .filter_map(|edge| {
            let start = cfg.edge_start_path.resolve_i64(edge)?;
            let url = cfg.edge_url_path.resolve_str(edge)?;
            (start > now && !url.is_empty()).then(|| EventRef::new(url))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemoryRenderer;
    use serde_json::json;

    const NOW: i64 = 1_748_736_000;
    const LISTING: &str = "https://example.com/venue/events/";

    fn edge(start: Option<i64>, url: Option<&str>) -> Value {
        json!({
            "node": {
                "actions_renderer": {"event": {"start_timestamp": start}},
                "node": {"url": url}
            }
        })
    }

    fn payload(edges: Vec<Value>) -> Value {
        let cfg = ExtractionConfig::default();
        let mut root = cfg.edges_path.wrap(Value::Array(edges));
        root["marker"] = json!("actions_renderer");
        root
    }

    fn page(payloads: &[Value]) -> String {
        let scripts: String = payloads
            .iter()
            .map(|p| format!("<script type=\"application/json\">{}</script>", p))
            .collect();
        format!("<html><head></head><body>{}</body></html>", scripts)
    }

    #[test]
    fn test_listing_url() {
        assert_eq!(
            listing_url("https://example.com/venue").unwrap(),
            "https://example.com/venue/events/"
        );
        assert_eq!(
            listing_url("  https://example.com/venue/ ").unwrap(),
            "https://example.com/venue/events/"
        );
    }

    #[test]
    fn test_listing_url_rejects_non_urls() {
        assert!(matches!(
            listing_url("venue").unwrap_err(),
            HarvestError::InvalidSource { .. }
        ));
        assert!(matches!(
            listing_url("ftp://example.com/venue").unwrap_err(),
            HarvestError::InvalidSource { .. }
        ));
    }

    #[test]
    fn test_past_and_url_less_edges_are_dropped() {
        let cfg = ExtractionConfig::default();
        let payload = payload(vec![
            edge(Some(NOW + 60), Some("https://example.com/events/1/")),
            edge(Some(NOW), Some("https://example.com/events/2/")),
            edge(Some(NOW - 60), Some("https://example.com/events/3/")),
            edge(Some(NOW + 60), None),
            edge(None, Some("https://example.com/events/4/")),
        ]);

        let urls: Vec<String> = upcoming_events(&payload, &cfg, NOW)
            .into_iter()
            .map(|e| e.url)
            .collect();
        assert_eq!(urls, vec!["https://example.com/events/1/"]);
    }

    #[test]
    fn test_payload_without_edges_is_empty() {
        let cfg = ExtractionConfig::default();
        assert!(upcoming_events(&json!({"require": []}), &cfg, NOW).is_empty());
    }

    #[tokio::test]
    async fn test_extract_across_scripts_skipping_bad_json() {
        let cfg = ExtractionConfig::default();
        let html = format!(
            "{}<script>actions_renderer {{not json</script>",
            page(&[
                payload(vec![edge(Some(NOW + 1), Some("https://example.com/events/1/"))]),
                payload(vec![edge(Some(NOW + 2), Some("https://example.com/events/2/"))]),
            ])
        );
        let mut renderer = MemoryRenderer::new();
        renderer.insert(LISTING, html);

        let events = extract_event_urls(&mut renderer, LISTING, &cfg, NOW)
            .await
            .unwrap();
        assert_eq!(
            events,
            vec![
                EventRef::new("https://example.com/events/1/"),
                EventRef::new("https://example.com/events/2/"),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_listing_is_ok() {
        let cfg = ExtractionConfig::default();
        let mut renderer = MemoryRenderer::new();
        renderer.insert(LISTING, page(&[payload(Vec::new())]));

        let events = extract_event_urls(&mut renderer, LISTING, &cfg, NOW)
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_is_an_error() {
        let cfg = ExtractionConfig::default();
        let mut renderer = MemoryRenderer::new();
        renderer.fail(LISTING);

        let err = extract_event_urls(&mut renderer, LISTING, &cfg, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::RenderFailure { .. }));
    }

    #[tokio::test]
    async fn test_missing_marker_times_out() {
        let cfg = ExtractionConfig::default();
        let mut renderer = MemoryRenderer::new();
        renderer.insert(LISTING, "<html><body><script>var x = 1;</script></body></html>");

        let err = extract_event_urls(&mut renderer, LISTING, &cfg, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::RenderTimeout { .. }));
    }
}
