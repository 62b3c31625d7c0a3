//! Streaming transports for push delivery.
//!
//! SSE is the preferred transport; WebSocket is the fallback when the SSE
//! endpoint cannot be opened, and the direct choice for `ws(s)` stream
//! URLs. Both surface the same [`RawEvent`] shape, so everything above
//! this module is transport-agnostic.

mod sse;
mod ws;

pub use sse::{SseParser, SseStream};
pub use ws::WsStream;

use crate::config::EngineConfig;
use crate::error::Result;

/// A transport-level event before envelope parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvent {
    /// Transport-level delivery id (the SSE `id:` field).
    pub id: Option<String>,
    /// Event name (the SSE `event:` field).
    pub event: Option<String>,
    /// Raw payload, expected to be an envelope JSON document.
    pub data: String,
}

/// An open streaming connection.
#[derive(Debug)]
pub enum FeedTransport {
    Sse(SseStream),
    Ws(WsStream),
}

impl FeedTransport {
    /// Open the configured stream.
    ///
    /// `ws(s)` stream URLs connect over WebSocket directly. `http(s)`
    /// URLs try SSE first and fall back to `ws_fallback_url` when the
    /// SSE endpoint cannot be opened.
    pub async fn connect(config: &EngineConfig) -> Result<Self> {
        if config.stream_url.starts_with("ws") {
            return Ok(FeedTransport::Ws(WsStream::connect(&config.stream_url).await?));
        }

        match SseStream::connect(config).await {
            Ok(stream) => Ok(FeedTransport::Sse(stream)),
            Err(sse_err) => match &config.ws_fallback_url {
                Some(url) => {
                    tracing::warn!(error = %sse_err, "sse connect failed, trying websocket");
                    Ok(FeedTransport::Ws(WsStream::connect(url).await?))
                }
                None => Err(sse_err),
            },
        }
    }

    /// Next event, or `Ok(None)` when the peer closed the stream.
    pub async fn next_event(&mut self) -> Result<Option<RawEvent>> {
        match self {
            FeedTransport::Sse(stream) => stream.next_event().await,
            FeedTransport::Ws(stream) => stream.next_event().await,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FeedTransport::Sse(_) => "sse",
            FeedTransport::Ws(_) => "ws",
        }
    }
}
