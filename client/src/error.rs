//! Unified error handling for the sync client.

use thiserror::Error;

/// Application error type for the client side.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("engine error: {0}")]
    Engine(#[from] tradewire_engine::Error),

    #[error("request failed ({status}): {message}")]
    Request { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("offline fixture unavailable: {0}")]
    FixtureMissing(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Build a request error from a response status and raw body,
    /// extracting the message from a structured `{"error": ...}` body
    /// when present.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "request failed".to_string());
        ClientError::Request { status, message }
    }

    /// Whether a direct-lookup failure should transparently retry against
    /// the offline provider: network unreachable, or 401/403/404.
    pub fn is_fallback_eligible(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_connect() || e.is_timeout(),
            ClientError::Request { status, .. } => matches!(status, 401 | 403 | 404),
            _ => false,
        }
    }

    /// Message suitable for the store's `error` field.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Request { message, .. } => message.clone(),
            ClientError::Http(_) => "network request failed".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
