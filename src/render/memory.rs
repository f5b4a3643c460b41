//! In-memory renderer over fixed HTML snapshots.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::snapshot::{meta_content, scripts_containing};
use super::{RenderedPage, Renderer};
use crate::error::{HarvestError, Result};

/// Serves pre-recorded HTML by URL.
///
/// Used for offline replay of saved pages and as the test double for the
/// browser. Unknown URLs fail like a navigation error would.
#[derive(Debug, Default, Clone)]
pub struct MemoryRenderer {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    rendered: Vec<String>,
}

impl MemoryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`, replacing any previous snapshot.
    pub fn insert(&mut self, url: impl Into<String>, html: impl Into<String>) -> &mut Self {
        let url = url.into();
        self.failing.remove(&url);
        self.pages.insert(url, html.into());
        self
    }

    /// Make rendering `url` fail with a `RenderFailure`.
    pub fn fail(&mut self, url: impl Into<String>) -> &mut Self {
        self.failing.insert(url.into());
        self
    }

    /// Load a snapshot for `url` from a saved HTML file.
    pub fn insert_file(&mut self, url: impl Into<String>, path: &Path) -> Result<&mut Self> {
        let html = std::fs::read_to_string(path).map_err(|e| {
            HarvestError::render(path.display().to_string(), format!("unreadable snapshot: {}", e))
        })?;
        Ok(self.insert(url, html))
    }

    /// URLs rendered so far, in order.
    pub fn rendered(&self) -> &[String] {
        &self.rendered
    }
}

#[async_trait]
impl Renderer for MemoryRenderer {
    async fn render(&mut self, url: &str) -> Result<Box<dyn RenderedPage>> {
        self.rendered.push(url.to_string());

        if self.failing.contains(url) {
            return Err(HarvestError::render(url, "navigation failed"));
        }

        let html = self
            .pages
            .get(url)
            .ok_or_else(|| HarvestError::render(url, "no snapshot for this URL"))?;

        debug!("Serving snapshot for {}", url);
        Ok(Box::new(MemoryPage {
            url: url.to_string(),
            html: html.clone(),
        }))
    }
}

struct MemoryPage {
    url: String,
    html: String,
}

#[async_trait]
impl RenderedPage for MemoryPage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn query_by_text_marker(&self, marker: &str) -> Result<Vec<String>> {
        Ok(scripts_containing(&self.html, marker))
    }

    async fn meta_attribute(&self, property: &str) -> Result<Option<String>> {
        Ok(meta_content(&self.html, property))
    }

    /// A snapshot never changes, so there is nothing to wait for.
    async fn wait_for(&self, marker: &str, timeout: Duration) -> Result<()> {
        if scripts_containing(&self.html, marker).is_empty() {
            Err(HarvestError::RenderTimeout {
                url: self.url.clone(),
                marker: marker.to_string(),
                timeout_secs: timeout.as_secs(),
            })
        } else {
            Ok(())
        }
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_snapshot() {
        let mut renderer = MemoryRenderer::new();
        renderer.insert(
            "https://example.com/a",
            "<html><head><meta property=\"og:title\" content=\"A\"></head></html>",
        );

        let page = renderer.render("https://example.com/a").await.unwrap();
        assert_eq!(page.meta_attribute("og:title").await.unwrap().as_deref(), Some("A"));
        page.close().await;
        assert_eq!(renderer.rendered(), &["https://example.com/a".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_and_failing_urls() {
        let mut renderer = MemoryRenderer::new();
        renderer.insert("https://example.com/b", "<html></html>");
        renderer.fail("https://example.com/b");

        assert!(matches!(
            renderer.render("https://example.com/b").await,
            Err(HarvestError::RenderFailure { .. })
        ));
        assert!(matches!(
            renderer.render("https://example.com/missing").await,
            Err(HarvestError::RenderFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_replays_saved_file() {
        let dir = tempfile::tempdir().unwrap();
        let saved = dir.path().join("listing.html");
        std::fs::write(&saved, "<script>{\"actions_renderer\": 1}</script>").unwrap();

        let mut renderer = MemoryRenderer::new();
        renderer
            .insert_file("https://example.com/venue/events/", &saved)
            .unwrap();
        let page = renderer
            .render("https://example.com/venue/events/")
            .await
            .unwrap();
        assert_eq!(
            page.query_by_text_marker("actions_renderer").await.unwrap().len(),
            1
        );

        assert!(renderer
            .insert_file("https://example.com/x", &dir.path().join("missing.html"))
            .is_err());
    }

    #[tokio::test]
    async fn test_wait_for_missing_marker_times_out() {
        let mut renderer = MemoryRenderer::new();
        renderer.insert("https://example.com/c", "<script>{}</script>");
        let page = renderer.render("https://example.com/c").await.unwrap();

        let err = page
            .wait_for("actions_renderer", Duration::from_secs(3))
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::RenderTimeout { timeout_secs: 3, .. }));
    }
}
