//! Server-sent events transport.
//!
//! The parser is incremental: chunks arrive at arbitrary boundaries, so
//! partial lines are buffered until the terminating newline shows up.
//! Events dispatch on the blank line per the SSE framing rules.

use super::RawEvent;
use crate::config::EngineConfig;
use crate::error::{ClientError, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;

/// Incremental parser for an SSE byte stream.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    id: Option<String>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every event it completes.
    pub fn push(&mut self, chunk: &str) -> Vec<RawEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.take_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Process one complete line; a blank line dispatches the pending event.
    fn take_line(&mut self, line: &str) -> Option<RawEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Lines starting with a colon are comments (heartbeats).
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "id" => self.id = Some(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // "retry" and unknown fields are ignored.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<RawEvent> {
        if self.data.is_empty() {
            // A lone id/event without data resets nothing but emits nothing.
            self.event = None;
            return None;
        }
        let event = RawEvent {
            id: self.id.take(),
            event: self.event.take(),
            data: self.data.join("\n"),
        };
        self.data.clear();
        Some(event)
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// An open SSE connection.
pub struct SseStream {
    bytes: ByteStream,
    parser: SseParser,
    pending: VecDeque<RawEvent>,
}

impl std::fmt::Debug for SseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseStream")
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl SseStream {
    /// Open the stream endpoint.
    ///
    /// The client gets a connect timeout only; a total request timeout
    /// would kill the long-lived stream.
    pub async fn connect(config: &EngineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;
        let response = http
            .get(&config.stream_url)
            .header("Accept", "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_response(status.as_u16(), &body));
        }

        Ok(Self {
            bytes: Box::pin(response.bytes_stream()),
            parser: SseParser::new(),
            pending: VecDeque::new(),
        })
    }

    /// Next event, or `Ok(None)` when the server closed the stream.
    pub async fn next_event(&mut self) -> Result<Option<RawEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            match self.bytes.next().await {
                Some(Ok(chunk)) => {
                    let text = String::from_utf8_lossy(&chunk);
                    self.pending.extend(self.parser.push(&text));
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(None),
            }
        }
    }
}
