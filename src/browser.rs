//! Headless Chromium fallback for pages that refuse plain HTTP clients.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{Config, DESCRIPTION_MARKER};
use crate::fetch::{FetchError, FetchPath, FetchedPage, PageFetcher};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
    pub launch_timeout: Duration,
    pub navigate_timeout: Duration,
    pub wait_timeout: Duration,
    /// CSS selector that must be present before the page is captured.
    pub ready_selector: String,
}

impl BrowserSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            chrome_path: config.chrome_path.clone(),
            launch_timeout: config.browser_launch_timeout,
            navigate_timeout: config.request_timeout,
            wait_timeout: config.browser_wait_timeout,
            ready_selector: DESCRIPTION_MARKER.to_string(),
        }
    }
}

fn browser_err(context: &str, e: impl std::fmt::Display) -> FetchError {
    FetchError::Browser(format!("{}: {}", context, e))
}

fn timeout_err(stage: &'static str, limit: Duration) -> FetchError {
    FetchError::Timeout {
        stage,
        secs: limit.as_secs(),
    }
}

/// A running browser process plus the task draining its CDP events.
///
/// Call [`BrowserSession::close`] on every path; dropping without it still
/// stops the event task and lets chromiumoxide kill the child process.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(settings: &BrowserSettings) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder()
            .new_headless_mode()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", settings.user_agent));
        if let Some(path) = &settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| browser_err("invalid browser config", e))?;

        let (browser, mut handler) =
            tokio::time::timeout(settings.launch_timeout, Browser::launch(config))
                .await
                .map_err(|_| timeout_err("launching the browser", settings.launch_timeout))?
                .map_err(|e| browser_err("failed to launch Chromium", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self { browser, handler })
    }

    async fn render(&self, url: &str, settings: &BrowserSettings) -> Result<String, FetchError> {
        let page = tokio::time::timeout(settings.navigate_timeout, self.browser.new_page(url))
            .await
            .map_err(|_| timeout_err("loading the page", settings.navigate_timeout))?
            .map_err(|e| browser_err("navigation failed", e))?;

        wait_for_selector(&page, &settings.ready_selector, settings.wait_timeout).await?;

        page.content()
            .await
            .map_err(|e| browser_err("failed to read rendered HTML", e))
    }

    /// Ask Chromium to exit, killing it if it refuses, and reap the process.
    /// Each step is bounded by [`REAP_TIMEOUT`].
    async fn close(mut self) {
        let closed = tokio::time::timeout(REAP_TIMEOUT, self.browser.close()).await;
        match closed {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                warn!("Failed to close browser: {}; killing it", e);
                self.kill().await;
            }
            Err(_) => {
                warn!("Browser ignored close for {}s; killing it", REAP_TIMEOUT.as_secs());
                self.kill().await;
            }
        }

        let reaped = tokio::time::timeout(REAP_TIMEOUT, self.browser.wait()).await;
        match reaped {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Failed to reap browser process: {}", e),
            Err(_) => {
                warn!("Browser still running after {}s; killing it", REAP_TIMEOUT.as_secs());
                self.kill().await;
            }
        }
    }

    async fn kill(&mut self) {
        if let Some(Err(e)) = self.browser.kill().await {
            warn!("Failed to kill browser process: {}", e);
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

async fn wait_for_selector(page: &Page, selector: &str, limit: Duration) -> Result<(), FetchError> {
    let poll = async {
        while page.find_element(selector).await.is_err() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };
    tokio::time::timeout(limit, poll)
        .await
        .map_err(|_| timeout_err("waiting for the description block", limit))
}

/// Renders the page in a fresh headless Chromium, one browser per URL.
pub struct BrowserFetcher {
    settings: BrowserSettings,
}

impl BrowserFetcher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let start = Instant::now();
        let session = BrowserSession::launch(&self.settings).await?;
        let rendered = session.render(url, &self.settings).await;
        session.close().await;

        let html = rendered?;
        info!(
            "Rendered {} in browser ({} bytes, {}ms)",
            url,
            html.len(),
            start.elapsed().as_millis()
        );
        Ok(FetchedPage {
            url: url.to_string(),
            html,
            via: FetchPath::Browser,
        })
    }
}
