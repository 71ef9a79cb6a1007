use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, BROWSER_HEADERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPath {
    Http,
    Browser,
}

impl fmt::Display for FetchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchPath::Http => f.write_str("http"),
            FetchPath::Browser => f.write_str("browser"),
        }
    }
}

/// Raw markup for one listing URL.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
    pub via: FetchPath,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("blocked by remote (HTTP 403)")]
    Blocked,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("browser: {0}")]
    Browser(String),
    #[error("timed out after {secs}s while {stage}")]
    Timeout { stage: &'static str, secs: u64 },
    #[error("all fetch paths failed (primary: {primary}; secondary: {secondary})")]
    Exhausted {
        primary: Box<FetchError>,
        secondary: Box<FetchError>,
    },
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

// ── Primary: plain HTTP ──

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for &(name, value) in BROWSER_HEADERS {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN {
            return Err(FetchError::Blocked);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        info!(
            "Fetched {} over HTTP ({} bytes, {}ms)",
            url,
            html.len(),
            start.elapsed().as_millis()
        );
        Ok(FetchedPage {
            url: url.to_string(),
            html,
            via: FetchPath::Http,
        })
    }
}

// ── Fallback chain ──

enum FetchState {
    Primary,
    Secondary(FetchError),
    Succeeded(FetchedPage),
    Failed(FetchError),
}

/// Try `primary`; on any error try `secondary` once. No third attempt.
pub struct TwoTierFetcher<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> TwoTierFetcher<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P: PageFetcher, S: PageFetcher> PageFetcher for TwoTierFetcher<P, S> {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut state = FetchState::Primary;
        loop {
            state = match state {
                FetchState::Primary => match self.primary.fetch(url).await {
                    Ok(page) => FetchState::Succeeded(page),
                    Err(e) => {
                        warn!("Primary fetch failed for {}: {}; falling back", url, e);
                        FetchState::Secondary(e)
                    }
                },
                FetchState::Secondary(primary) => match self.secondary.fetch(url).await {
                    Ok(page) => FetchState::Succeeded(page),
                    Err(secondary) => FetchState::Failed(FetchError::Exhausted {
                        primary: Box::new(primary),
                        secondary: Box::new(secondary),
                    }),
                },
                FetchState::Succeeded(page) => return Ok(page),
                FetchState::Failed(e) => return Err(e),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Stub {
        result: Result<&'static str, u16>,
        via: FetchPath,
        calls: AtomicUsize,
    }

    impl Stub {
        fn ok(html: &'static str, via: FetchPath) -> Self {
            Self { result: Ok(html), via, calls: AtomicUsize::new(0) }
        }
        fn status(code: u16) -> Self {
            Self { result: Err(code), via: FetchPath::Http, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl PageFetcher for Stub {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.result {
                Ok(html) => Ok(FetchedPage { url: url.into(), html: html.into(), via: self.via }),
                Err(403) => Err(FetchError::Blocked),
                Err(code) => Err(FetchError::Status(code)),
            }
        }
    }

    #[tokio::test]
    async fn primary_success_skips_secondary() {
        let f = TwoTierFetcher::new(
            Stub::ok("<p>http</p>", FetchPath::Http),
            Stub::ok("<p>browser</p>", FetchPath::Browser),
        );
        let page = f.fetch("https://example.test/ad/1").await.unwrap();
        assert_eq!(page.via, FetchPath::Http);
        assert_eq!(f.secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blocked_primary_falls_back() {
        let f = TwoTierFetcher::new(Stub::status(403), Stub::ok("<p>browser</p>", FetchPath::Browser));
        let page = f.fetch("https://example.test/ad/1").await.unwrap();
        assert_eq!(page.via, FetchPath::Browser);
        assert_eq!(page.html, "<p>browser</p>");
        assert_eq!(f.primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_failing_reports_both() {
        let f = TwoTierFetcher::new(Stub::status(403), Stub::status(500));
        let err = f.fetch("https://example.test/ad/1").await.unwrap_err();
        match err {
            FetchError::Exhausted { primary, secondary } => {
                assert!(matches!(*primary, FetchError::Blocked));
                assert!(matches!(*secondary, FetchError::Status(500)));
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn http_returns_body_and_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ad/sport_plein_air/1"))
            .and(header("sec-fetch-mode", "navigate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&Config::default()).unwrap();
        let page = fetcher
            .fetch(&format!("{}/ad/sport_plein_air/1", server.uri()))
            .await
            .unwrap();
        assert_eq!(page.html, "<html>ok</html>");
        assert_eq!(page.via, FetchPath::Http);
    }

    #[tokio::test]
    async fn http_403_is_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&Config::default()).unwrap();
        let err = fetcher.fetch(&format!("{}/ad/1", server.uri())).await.unwrap_err();
        assert!(matches!(err, FetchError::Blocked));
    }

    #[tokio::test]
    async fn http_other_errors_are_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&Config::default()).unwrap();
        let err = fetcher.fetch(&format!("{}/ad/1", server.uri())).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }
}
