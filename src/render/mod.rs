//! Render capability: load a page in a real browser and query what it rendered.
//!
//! Extractors only ever see the [`Renderer`] and [`RenderedPage`] traits, so
//! the Chrome-backed implementation can be swapped for [`MemoryRenderer`] in
//! tests or for offline replay of saved pages.

mod chrome;
pub mod config;
mod memory;
pub mod snapshot;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{HarvestError, Result};

pub use chrome::ChromeRenderer;
pub use config::BrowserConfig;
pub use memory::MemoryRenderer;

/// Interval between marker polls while waiting for a page to hydrate.
pub const MARKER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A page that has finished navigating.
///
/// Callers must call [`RenderedPage::close`] when done, on success and on
/// error alike.
#[async_trait]
pub trait RenderedPage: Send + Sync {
    /// URL the page was rendered from.
    fn url(&self) -> &str;

    /// Text of every script element whose text contains `marker`.
    async fn query_by_text_marker(&self, marker: &str) -> Result<Vec<String>>;

    /// `content` of the first meta element whose `property` contains `property`.
    async fn meta_attribute(&self, property: &str) -> Result<Option<String>>;

    /// Wait until at least one script contains `marker`.
    async fn wait_for(&self, marker: &str, timeout: Duration) -> Result<()> {
        let poll = async {
            loop {
                if !self.query_by_text_marker(marker).await?.is_empty() {
                    return Ok::<(), HarvestError>(());
                }
                tokio::time::sleep(MARKER_POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(HarvestError::RenderTimeout {
                url: self.url().to_string(),
                marker: marker.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    /// Release the page.
    async fn close(&self);
}

/// Opens pages.
#[async_trait]
pub trait Renderer: Send {
    /// Navigate to `url` and wait for the document to load.
    async fn render(&mut self, url: &str) -> Result<Box<dyn RenderedPage>>;

    /// Tear down any browser process. Called once at the end of a run.
    async fn shutdown(&mut self) {}
}
