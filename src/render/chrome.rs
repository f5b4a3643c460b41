//! Chrome-backed renderer (chromiumoxide over CDP).
//!
//! One browser per run, one tab per rendered page. Every tab is closed by the
//! caller through [`RenderedPage::close`], and a tab whose navigation fails is
//! closed here before the error is returned.

#![cfg_attr(not(feature = "browser"), allow(dead_code))]

#[cfg(feature = "browser")]
use std::path::PathBuf;
#[cfg(feature = "browser")]
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig as ChromeLaunchConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;

#[cfg(feature = "browser")]
use super::snapshot::{meta_content, scripts_containing};
use super::{BrowserConfig, RenderedPage, Renderer};
#[cfg(feature = "browser")]
use crate::error::HarvestError;
use crate::error::Result;

/// JavaScript to wait for page ready state.
#[cfg(feature = "browser")]
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete') {
            resolve(document.readyState);
        } else {
            window.addEventListener('load', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// Common Chrome executable paths to check.
#[cfg(feature = "browser")]
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

#[cfg(feature = "browser")]
const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome-headless-shell",
];

/// Renders pages in a headless Chrome.
#[cfg(feature = "browser")]
pub struct ChromeRenderer {
    config: BrowserConfig,
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
}

#[cfg(feature = "browser")]
impl ChromeRenderer {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            browser: None,
            handler: None,
        }
    }

    /// Find a Chrome executable: configured path, then well-known paths, then `PATH`.
    fn find_chrome(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.config.chrome_path {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(HarvestError::render(
                "about:blank",
                format!("configured Chrome not found at {}", path.display()),
            ));
        }

        for path in CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in CHROME_COMMANDS {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(HarvestError::render(
            "about:blank",
            "Chrome/Chromium not found. Install it or set browser.chrome_path",
        ))
    }

    /// Launch or connect to the browser if not already running.
    async fn ensure_browser(&mut self) -> Result<&Browser> {
        if self.browser.is_none() {
            let (browser, mut handler) = match self.config.remote_url.clone() {
                Some(remote_url) => self.connect_remote(&remote_url).await?,
                None => self.launch().await?,
            };

            self.handler = Some(tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            }));
            self.browser = Some(browser);
        }

        self.browser
            .as_ref()
            .ok_or_else(|| HarvestError::render("about:blank", "browser not initialized"))
    }

    async fn launch(&self) -> Result<(Browser, chromiumoxide::Handler)> {
        info!("Launching browser (headless={})", self.config.headless);

        let chrome_path = self.find_chrome()?;
        let mut builder = ChromeLaunchConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg.as_str());
        }

        let launch_config = builder
            .build()
            .map_err(|e| HarvestError::render("about:blank", format!("bad browser config: {}", e)))?;

        Browser::launch(launch_config)
            .await
            .map_err(|e| HarvestError::render("about:blank", format!("failed to launch browser: {}", e)))
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(&self, url: &str) -> Result<(Browser, chromiumoxide::Handler)> {
        info!("Connecting to remote browser at {}", url);

        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::get(&version_url)
            .await
            .map_err(|e| HarvestError::render(url, format!("remote browser unreachable: {}", e)))?
            .json()
            .await
            .map_err(|e| HarvestError::render(url, format!("bad version info: {}", e)))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HarvestError::render(url, "no webSocketDebuggerUrl in response"))?;

        info!("Connecting to WebSocket: {}", ws_url);
        Browser::connect(ws_url)
            .await
            .map_err(|e| HarvestError::render(url, format!("failed to connect: {}", e)))
    }

    /// Set the user agent, navigate and wait for the load event.
    async fn load(&self, page: &Page, url: &str) -> Result<()> {
        page.execute(SetUserAgentOverrideParams::new(self.config.user_agent.clone()))
            .await
            .map_err(|e| HarvestError::render(url, e))?;

        info!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| HarvestError::render(url, format!("invalid URL: {}", e)))?;

        let nav_timeout = Duration::from_secs(self.config.timeout);
        tokio::time::timeout(nav_timeout, page.execute(nav_params))
            .await
            .map_err(|_| {
                HarvestError::render(
                    url,
                    format!("navigation timed out after {}s", self.config.timeout),
                )
            })?
            .map_err(|e| HarvestError::render(url, format!("navigation failed: {}", e)))?;

        match tokio::time::timeout(nav_timeout, page.evaluate(WAIT_FOR_READY_SCRIPT.to_string()))
            .await
        {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state on {}", url),
        }

        Ok(())
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&mut self, url: &str) -> Result<Box<dyn RenderedPage>> {
        let page = self
            .ensure_browser()
            .await?
            .new_page("about:blank")
            .await
            .map_err(|e| HarvestError::render(url, format!("failed to open tab: {}", e)))?;

        if let Err(e) = self.load(&page, url).await {
            let _ = page.close().await;
            return Err(e);
        }

        Ok(Box::new(ChromePage {
            url: url.to_string(),
            page,
        }))
    }

    async fn shutdown(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                debug!("Browser close failed: {}", e);
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

#[cfg(feature = "browser")]
struct ChromePage {
    url: String,
    page: Page,
}

#[cfg(feature = "browser")]
impl ChromePage {
    async fn html(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| HarvestError::render(&self.url, format!("failed to read DOM: {}", e)))
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl RenderedPage for ChromePage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn query_by_text_marker(&self, marker: &str) -> Result<Vec<String>> {
        let html = self.html().await?;
        Ok(scripts_containing(&html, marker))
    }

    async fn meta_attribute(&self, property: &str) -> Result<Option<String>> {
        let html = self.html().await?;
        Ok(meta_content(&html, property))
    }

    async fn close(&self) {
        if let Err(e) = self.page.clone().close().await {
            debug!("Failed to close tab for {}: {}", self.url, e);
        }
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct ChromeRenderer {
    config: BrowserConfig,
}

#[cfg(not(feature = "browser"))]
impl ChromeRenderer {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&mut self, url: &str) -> Result<Box<dyn RenderedPage>> {
        Err(crate::error::HarvestError::render(
            url,
            "Browser support not compiled. Rebuild with: cargo build --features browser",
        ))
    }
}
