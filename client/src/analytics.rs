//! Best-effort analytics side channel.
//!
//! Fired after successful state-changing operations. Sinks must never
//! fail the caller; emission is fire-and-forget.

use serde_json::Value;
use std::sync::Mutex;

/// A sink for analytics events.
pub trait AnalyticsSink: Send + Sync {
    /// Record an event. Implementations swallow their own errors.
    fn emit(&self, event: &str, payload: Value);
}

/// Default sink that drops everything.
#[derive(Debug, Default)]
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn emit(&self, _event: &str, _payload: Value) {}
}

/// Sink that logs events through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn emit(&self, event: &str, payload: Value) {
        tracing::debug!(event, %payload, "analytics event");
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far, in emission order.
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of events with the given name.
    pub fn count(&self, event: &str) -> usize {
        self.events()
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }
}

impl AnalyticsSink for RecordingSink {
    fn emit(&self, event: &str, payload: Value) {
        if let Ok(mut events) = self.events.lock() {
            events.push((event.to_string(), payload));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recording_sink_collects_events() {
        let sink = RecordingSink::new();
        sink.emit("feed_page_loaded", json!({"count": 3}));
        sink.emit("feed_page_loaded", json!({"count": 2}));
        sink.emit("feed_publish_confirmed", json!({}));

        assert_eq!(sink.count("feed_page_loaded"), 2);
        assert_eq!(sink.count("feed_publish_confirmed"), 1);
        assert_eq!(sink.events()[0].1, json!({"count": 3}));
    }
}
