//! Stream connection lifecycle.
//!
//! One background task owns the transport. It reconnects with the backoff
//! schedule, deduplicates deliveries across reconnects, and reports
//! exactly one `Lost` per outage with a matching `Restored` on recovery.

use crate::config::EngineConfig;
use crate::transport::{FeedTransport, RawEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tradewire_engine::{ConnectionStatus, DeliveryWindow, FeedAction, FeedEnvelope};

/// What the connection task reports upstream.
#[derive(Debug)]
pub enum StreamEvent {
    /// A deduplicated push envelope.
    Envelope(FeedEnvelope),
    /// The stream went down; sent once per outage.
    Lost,
    /// The stream came back after a `Lost`.
    Restored,
}

/// Handle to the background connection task.
#[derive(Debug)]
pub struct ConnectionManager {
    status: watch::Receiver<ConnectionStatus>,
    refresh: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl ConnectionManager {
    /// Spawn the connection task. Events flow into `events` until the
    /// receiver is dropped or [`ConnectionManager::shutdown`] is called.
    pub fn spawn(config: EngineConfig, events: mpsc::UnboundedSender<StreamEvent>) -> Self {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let refresh = Arc::new(Notify::new());
        let handle = tokio::spawn(run(config, events, status_tx, Arc::clone(&refresh)));
        Self {
            status: status_rx,
            refresh,
            handle,
        }
    }

    /// Watch the connection status.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Force an immediate reconnect, skipping any backoff sleep. Used
    /// when the host signals regained network access.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(
    config: EngineConfig,
    events: mpsc::UnboundedSender<StreamEvent>,
    status: watch::Sender<ConnectionStatus>,
    refresh: Arc<Notify>,
) {
    if config.offline {
        // Terminal: the offline provider has no stream.
        let _ = status.send(ConnectionStatus::Offline);
        return;
    }

    let mut failures: u32 = 0;
    let mut lost_reported = false;
    // The window survives reconnects; replayed events are dropped here.
    let mut window = DeliveryWindow::new(config.dedup_cap);

    loop {
        if events.is_closed() {
            return;
        }
        let _ = status.send(if failures == 0 {
            ConnectionStatus::Connecting
        } else {
            ConnectionStatus::Reconnecting
        });

        match FeedTransport::connect(&config).await {
            Ok(mut transport) => {
                tracing::info!(transport = transport.kind(), "stream connected");
                let _ = status.send(ConnectionStatus::Connected);
                failures = 0;
                if lost_reported {
                    lost_reported = false;
                    if events.send(StreamEvent::Restored).is_err() {
                        return;
                    }
                }

                let reconnect_requested =
                    read_stream(&mut transport, &events, &refresh, &mut window).await;
                if reconnect_requested {
                    // Deliberate reconnect, not an outage.
                    continue;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "stream connect failed");
            }
        }

        failures += 1;
        if !lost_reported {
            lost_reported = true;
            if events.send(StreamEvent::Lost).is_err() {
                return;
            }
        }

        let delay = config.backoff.delay_for(failures);
        tracing::debug!(failures, ?delay, "reconnecting after backoff");
        tokio::select! {
            _ = sleep(delay) => {}
            _ = refresh.notified() => {}
        }
    }
}

/// Pump the transport until it drops. Returns `true` when the exit was a
/// refresh request rather than a stream failure.
async fn read_stream(
    transport: &mut FeedTransport,
    events: &mpsc::UnboundedSender<StreamEvent>,
    refresh: &Notify,
    window: &mut DeliveryWindow,
) -> bool {
    loop {
        tokio::select! {
            _ = refresh.notified() => return true,
            next = transport.next_event() => match next {
                Ok(Some(raw)) => {
                    if let Some(envelope) = decode(raw, window) {
                        if events.send(StreamEvent::Envelope(envelope)).is_err() {
                            // Receiver gone; the outer loop exits.
                            return true;
                        }
                    }
                }
                Ok(None) => {
                    tracing::warn!("stream closed by peer");
                    return false;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stream read error");
                    return false;
                }
            }
        }
    }
}

/// Parse a raw transport event into an envelope, dropping malformed
/// payloads and duplicate deliveries.
fn decode(raw: RawEvent, window: &mut DeliveryWindow) -> Option<FeedEnvelope> {
    let envelope: FeedEnvelope = match serde_json::from_str(&raw.data) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "dropping malformed push payload");
            return None;
        }
    };
    if let Some(delivery_id) = FeedAction::delivery_id(&envelope, raw.id.as_deref()) {
        if !window.observe(&delivery_id) {
            tracing::debug!(%delivery_id, "dropping duplicate delivery");
            return None;
        }
    }
    Some(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use futures::SinkExt;
    use serde_json::json;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message;
    use tradewire_engine::{BackoffSchedule, EnvelopeKind};

    fn raw(id: Option<&str>, event_id: Option<&str>) -> RawEvent {
        let mut body = json!({
            "type": "item.created",
            "payload": {"id": "a", "createdAt": "2026-01-15T09:00:00Z", "type": "OFFER"},
        });
        if let Some(event_id) = event_id {
            body["eventId"] = json!(event_id);
        }
        RawEvent {
            id: id.map(str::to_string),
            event: None,
            data: body.to_string(),
        }
    }

    #[test]
    fn duplicate_deliveries_are_dropped() {
        let mut window = DeliveryWindow::new(8);
        assert!(decode(raw(None, Some("ev-1")), &mut window).is_some());
        assert!(decode(raw(None, Some("ev-1")), &mut window).is_none());
        assert!(decode(raw(None, Some("ev-2")), &mut window).is_some());
    }

    #[test]
    fn transport_id_is_the_fallback_delivery_id() {
        let mut window = DeliveryWindow::new(8);
        assert!(decode(raw(Some("sse-1"), None), &mut window).is_some());
        assert!(decode(raw(Some("sse-1"), None), &mut window).is_none());
    }

    #[test]
    fn events_without_any_id_always_pass() {
        let mut window = DeliveryWindow::new(8);
        assert!(decode(raw(None, None), &mut window).is_some());
        assert!(decode(raw(None, None), &mut window).is_some());
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        let mut window = DeliveryWindow::new(8);
        let bad = RawEvent {
            id: None,
            event: None,
            data: "not json".into(),
        };
        assert!(decode(bad, &mut window).is_none());
    }

    fn envelope_text(event_id: &str, item_id: &str) -> String {
        json!({
            "eventId": event_id,
            "type": "item.created",
            "payload": {
                "id": item_id,
                "createdAt": "2026-01-15T09:00:00Z",
                "type": "OFFER",
            },
        })
        .to_string()
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<StreamEvent>) -> StreamEvent {
        timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for stream event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn one_lost_per_outage_then_restored() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            // First connection delivers one event, then closes.
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(envelope_text("ev-1", "a")))
                .await
                .unwrap();
            ws.close(None).await.unwrap();

            // The next two attempts die before the handshake completes.
            for _ in 0..2 {
                let (stream, _) = listener.accept().await.unwrap();
                drop(stream);
            }

            // Recovery: a working stream again.
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(envelope_text("ev-2", "b")))
                .await
                .unwrap();
            // Hold the connection open until the test ends.
            std::future::pending::<()>().await;
        });

        let config = EngineConfig {
            stream_url: format!("ws://{addr}"),
            backoff: BackoffSchedule::new(
                vec![Duration::from_millis(10)],
                Duration::from_millis(10),
            ),
            ..EngineConfig::default()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let manager = ConnectionManager::spawn(config, tx);

        assert!(matches!(
            recv(&mut rx).await,
            StreamEvent::Envelope(e) if e.event_id.as_deref() == Some("ev-1")
        ));
        // One outage spanning several failed attempts: exactly one Lost,
        // and the next notification is the Restored that pairs with it.
        assert!(matches!(recv(&mut rx).await, StreamEvent::Lost));
        assert!(matches!(recv(&mut rx).await, StreamEvent::Restored));
        assert!(matches!(
            recv(&mut rx).await,
            StreamEvent::Envelope(e) if e.event_id.as_deref() == Some("ev-2")
        ));

        // The failure counter reset on the reopen: status is Connected,
        // not Reconnecting.
        let mut status = manager.status();
        status
            .wait_for(|s| *s == ConnectionStatus::Connected)
            .await
            .unwrap();

        manager.shutdown();
        server.abort();
    }

    #[tokio::test]
    async fn offline_config_parks_at_offline() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let manager = ConnectionManager::spawn(crate::config::EngineConfig::offline(), tx);

        let mut status = manager.status();
        status
            .wait_for(|s| *s == ConnectionStatus::Offline)
            .await
            .unwrap();
        // No stream events are ever produced.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn envelope_kind_roundtrip() {
        let envelope: FeedEnvelope = serde_json::from_value(json!({
            "eventId": "ev-9",
            "type": "item.deleted",
            "payload": {"id": "gone"},
        }))
        .unwrap();
        assert_eq!(envelope.kind, EnvelopeKind::Deleted);
        assert_eq!(envelope.event_id.as_deref(), Some("ev-9"));
    }
}
