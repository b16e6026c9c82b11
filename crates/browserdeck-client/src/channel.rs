//! Persistent status channel to one running task.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, warn};

use browserdeck_core::TaskId;

use crate::config::ClientConfig;
use crate::error::ClientError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// What the channel produced next.
#[derive(Debug)]
pub enum ChannelEvent {
    /// An inbound text frame, undecoded.
    Frame(String),
    /// The peer closed the connection or the stream ended.
    Closed,
    /// The transport failed. Handled identically to [`ChannelEvent::Closed`]
    /// by the reconnection policy.
    Errored,
}

/// One WebSocket connection to one task's status endpoint.
///
/// At most one underlying connection is live per instance; opening a new one
/// unconditionally tears down the old one first, so a superseded connection
/// can never deliver late frames.
pub struct Channel {
    config: ClientConfig,
    conn: Option<(WsSink, WsStream)>,
}

impl Channel {
    /// Create a closed channel for the configured backend.
    pub fn new(config: ClientConfig) -> Self {
        Self { config, conn: None }
    }

    /// Whether a connection is currently held.
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Open the channel to the given task's endpoint.
    ///
    /// Any prior connection is closed first. Resolves once the WebSocket
    /// handshake completes; errors if the open attempt fails before then.
    pub async fn open(&mut self, task_id: &TaskId) -> Result<(), ClientError> {
        self.close().await;

        let url = self.config.ws_url(task_id);
        debug!(url = %url, "Opening status channel");

        let (ws, _) = connect_async(&url).await?;
        self.conn = Some(ws.split());
        Ok(())
    }

    /// Close the channel. Safe to call in any state, any number of times.
    pub async fn close(&mut self) {
        if let Some((mut sink, _)) = self.conn.take() {
            debug!("Closing status channel");
            let _ = sink.close().await;
        }
    }

    /// Send a JSON frame. Returns `false` (with a logged warning) when the
    /// channel is not open or transmission fails; never faults.
    pub async fn send(&mut self, frame: &Value) -> bool {
        let Some((sink, _)) = self.conn.as_mut() else {
            warn!("Channel is not open, dropping outbound frame");
            return false;
        };

        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Could not serialize outbound frame");
                return false;
            }
        };

        match sink.send(Message::Text(text)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to send frame");
                false
            }
        }
    }

    /// Wait for the next channel event.
    ///
    /// Ping/pong and binary frames are skipped. After `Closed` or `Errored`
    /// the connection is discarded; a closed channel reports `Closed`
    /// immediately.
    pub async fn next(&mut self) -> ChannelEvent {
        loop {
            let Some((_, stream)) = self.conn.as_mut() else {
                return ChannelEvent::Closed;
            };

            match stream.next().await {
                Some(Ok(Message::Text(text))) => return ChannelEvent::Frame(text),
                Some(Ok(Message::Close(_))) | None => {
                    self.conn = None;
                    return ChannelEvent::Closed;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    error!(error = %e, "Channel transport error");
                    self.conn = None;
                    return ChannelEvent::Errored;
                }
            }
        }
    }
}
