//! Configuration management for the sync client.

use crate::error::ClientError;
use std::env;
use std::time::Duration;
use tradewire_engine::{BackoffSchedule, DEFAULT_DEDUP_CAP};

/// Default page size for collection fetches.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Default HTTP request timeout.
///
/// The original behavior left hung requests pending forever; the timeout
/// is an explicit contract here so `loading` always resolves.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client configuration, loaded from environment variables or built
/// directly for tests.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the feed collection, e.g. `https://api.example.com/feed`.
    pub base_url: String,
    /// Streaming endpoint; `http(s)` URLs use SSE, `ws(s)` URLs use
    /// WebSocket directly.
    pub stream_url: String,
    /// WebSocket fallback used when the SSE endpoint cannot be opened.
    pub ws_fallback_url: Option<String>,
    pub page_size: usize,
    pub request_timeout: Duration,
    /// Run entirely against the offline fixture dataset.
    pub offline: bool,
    pub backoff: BackoffSchedule,
    /// Size of the delivery dedup window.
    pub dedup_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/feed".to_string(),
            stream_url: "http://localhost:3000/feed/stream".to_string(),
            ws_fallback_url: None,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            offline: false,
            backoff: BackoffSchedule::default(),
            dedup_cap: DEFAULT_DEDUP_CAP,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// `TRADEWIRE_BASE_URL` and `TRADEWIRE_STREAM_URL` override the
    /// defaults; `TRADEWIRE_OFFLINE=1` switches to the fixture backend.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(url) = env::var("TRADEWIRE_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(url) = env::var("TRADEWIRE_STREAM_URL") {
            config.stream_url = url;
        }
        if let Ok(url) = env::var("TRADEWIRE_WS_URL") {
            config.ws_fallback_url = Some(url);
        }
        if let Ok(raw) = env::var("TRADEWIRE_PAGE_SIZE") {
            config.page_size = raw
                .parse()
                .map_err(|_| ClientError::Config("invalid TRADEWIRE_PAGE_SIZE".into()))?;
        }
        if let Ok(raw) = env::var("TRADEWIRE_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                ClientError::Config("invalid TRADEWIRE_REQUEST_TIMEOUT_SECS".into())
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Ok(raw) = env::var("TRADEWIRE_DEDUP_CAP") {
            config.dedup_cap = raw
                .parse()
                .map_err(|_| ClientError::Config("invalid TRADEWIRE_DEDUP_CAP".into()))?;
        }
        if let Ok(raw) = env::var("TRADEWIRE_OFFLINE") {
            config.offline = matches!(raw.as_str(), "1" | "true" | "yes");
        }

        if config.page_size == 0 {
            return Err(ClientError::Config("page size must be positive".into()));
        }

        Ok(config)
    }

    /// An offline configuration for tests and demos.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }
}
