use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Headers sent with every plain HTTP request, besides the user agent.
/// Accept-Encoding is left to reqwest so it can decode what it advertises.
pub const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    ("accept-language", "fr-FR,fr;q=0.9,en;q=0.8"),
    ("connection", "keep-alive"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
];

/// Marker the browser waits for before capturing the rendered page.
pub const DESCRIPTION_MARKER: &str = r#"[data-qa-id="adview_description_container"]"#;

const DEFAULT_CATALOG: &str = "catalog.csv";
const DEFAULT_QUEUE: &str = "urls.csv";

/// Runtime settings, resolved once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_path: PathBuf,
    pub queue_path: PathBuf,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub browser_launch_timeout: Duration,
    pub browser_wait_timeout: Duration,
    pub pace_delay: Duration,
    pub chrome_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG),
            queue_path: PathBuf::from(DEFAULT_QUEUE),
            user_agent: USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(15),
            browser_launch_timeout: Duration::from_secs(30),
            browser_wait_timeout: Duration::from_secs(10),
            pace_delay: Duration::from_secs(3),
            chrome_path: None,
        }
    }
}

impl Config {
    /// Defaults overridden by `LBC_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("LBC_CATALOG") {
            config.catalog_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("LBC_QUEUE") {
            config.queue_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("LBC_CHROME_PATH") {
            config.chrome_path = Some(PathBuf::from(path));
        }

        let secs = |key: &str, current: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a whole number of seconds, got {:?}", key, raw)),
                None => Ok(current),
            }
        };

        config.request_timeout = secs("LBC_REQUEST_TIMEOUT_SECS", config.request_timeout)?;
        config.browser_wait_timeout = secs("LBC_BROWSER_WAIT_SECS", config.browser_wait_timeout)?;
        config.browser_launch_timeout =
            secs("LBC_BROWSER_LAUNCH_SECS", config.browser_launch_timeout)?;
        config.pace_delay = secs("LBC_PACE_SECS", config.pace_delay)?;

        Ok(config)
    }
}
