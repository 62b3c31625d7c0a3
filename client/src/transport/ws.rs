//! WebSocket fallback transport.
//!
//! Frames carry the same envelope JSON the SSE `data:` field does, one
//! envelope per text frame; delivery ids live inside the envelope.

use super::RawEvent;
use crate::error::Result;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// An open WebSocket connection.
#[derive(Debug)]
pub struct WsStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsStream {
    pub async fn connect(url: &str) -> Result<Self> {
        let (socket, _) = connect_async(url).await?;
        Ok(Self { socket })
    }

    /// Next event, or `Ok(None)` when the peer closed the socket.
    pub async fn next_event(&mut self) -> Result<Option<RawEvent>> {
        while let Some(message) = self.socket.next().await {
            match message? {
                Message::Text(text) => {
                    return Ok(Some(RawEvent {
                        id: None,
                        event: None,
                        data: text,
                    }))
                }
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => return Ok(None),
                Message::Binary(_) => {
                    tracing::warn!("ignoring binary frame");
                }
                Message::Frame(_) => {}
            }
        }
        Ok(None)
    }
}
