//! WebSocket push channel from the print server.
//!
//! [`PushClient`] holds the connection settings; [`run_push_loop`] keeps
//! a connection open, reconnecting on a [`Backoff`] schedule, and forwards parsed
//! `print_queue` messages to the event loop as [`PushEvent`]s.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::messages::{parse_frame, PrintQueueMessage};
use crate::reconnect::Backoff;

/// Raw WebSocket stream to the host.
pub type PushStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// What the push loop reports to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// A connection was (re)established. Pushes may have been missed.
    Connected,
    /// The connection dropped.
    Disconnected,
    /// A `print_queue` plugin message arrived.
    Message(PrintQueueMessage),
}

/// Connection settings for the host push channel.
pub struct PushClient {
    ws_url: String,
    auth: Option<String>,
}

impl PushClient {
    /// * `ws_url` - raw WebSocket endpoint, e.g. `ws://host/sockjs/websocket`.
    /// * `auth`   - optional `user:session` token sent right after connecting.
    pub fn new(ws_url: String, auth: Option<String>) -> Self {
        Self { ws_url, auth }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Open the WebSocket and authenticate if a token is configured.
    pub async fn connect(&self) -> Result<PushStream, PushClientError> {
        let (mut ws_stream, _response) = connect_async(self.ws_url.as_str())
            .await
            .map_err(|e| {
                PushClientError::Connection(format!(
                    "Failed to connect to push channel at {}: {e}",
                    self.ws_url
                ))
            })?;

        if let Some(auth) = &self.auth {
            let frame = serde_json::json!({ "auth": auth }).to_string();
            ws_stream
                .send(Message::Text(frame))
                .await
                .map_err(|e| PushClientError::Protocol(format!("Failed to send auth: {e}")))?;
        }

        tracing::info!(ws_url = %self.ws_url, "Connected to push channel");
        Ok(ws_stream)
    }
}

/// Errors that can occur on the push channel.
#[derive(Debug, thiserror::Error)]
pub enum PushClientError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A protocol-level error on an established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Keep the push channel connected until `cancel` fires.
///
/// Every attempt after the first waits on a [`Backoff`] delay. Returns
/// early if the receiving side of `tx` is dropped.
pub async fn run_push_loop(
    client: &PushClient,
    tx: mpsc::Sender<PushEvent>,
    cancel: CancellationToken,
) {
    let mut backoff = Backoff::default();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let connected = tokio::select! {
            _ = cancel.cancelled() => return,
            result = client.connect() => result,
        };

        match connected {
            Ok(mut ws_stream) => {
                attempt = 0;
                if tx.send(PushEvent::Connected).await.is_err() {
                    return;
                }

                let opened = Instant::now();
                let cancelled = tokio::select! {
                    _ = cancel.cancelled() => true,
                    _ = forward_messages(&mut ws_stream, &tx) => false,
                };
                if cancelled {
                    let _ = ws_stream.close(None).await;
                    return;
                }

                let lasted = opened.elapsed();
                backoff.session_ended(lasted);
                tracing::info!(lasted_ms = lasted.as_millis() as u64, "Push channel lost");
                if tx.send(PushEvent::Disconnected).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "Push connection failed");
            }
        }

        let delay = backoff.next_delay();
        tracing::info!(
            ws_url = %client.ws_url(),
            delay_ms = delay.as_millis() as u64,
            "Reconnecting to push channel",
        );
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Push reconnect cancelled");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Read frames until the connection closes, forwarding queue messages.
async fn forward_messages(ws_stream: &mut PushStream, tx: &mpsc::Sender<PushEvent>) {
    while let Some(msg_result) = ws_stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                if let Some(message) = decode_text(&text) {
                    if tx.send(PushEvent::Message(message)).await.is_err() {
                        return;
                    }
                }
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "Push channel closed by host");
                break;
            }
            Ok(Message::Binary(_) | Message::Frame(_)) => {}
            Err(e) => {
                tracing::error!(error = %e, "Push channel receive error");
                break;
            }
        }
    }
}

/// Parse one text frame, logging and dropping anything malformed.
fn decode_text(text: &str) -> Option<PrintQueueMessage> {
    match parse_frame(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, raw_message = %text, "Ignoring malformed push message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_text_forwards_queue_messages() {
        let json = r#"{"plugin":{"plugin":"print_queue","data":{"type":"set_queue","print_queue":[]}}}"#;
        assert_eq!(
            decode_text(json),
            Some(PrintQueueMessage::SetQueue {
                print_queue: vec![]
            })
        );
    }

    #[test]
    fn decode_text_drops_malformed_frames() {
        let json = r#"{"plugin":{"plugin":"print_queue","data":{"type":"file_selected"}}}"#;
        assert_eq!(decode_text(json), None);
        assert_eq!(decode_text("[1, 2"), None);
    }

    #[tokio::test]
    async fn push_loop_stops_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let client = PushClient::new("ws://localhost:9999/sockjs/websocket".into(), None);
        let (tx, _rx) = mpsc::channel(4);

        run_push_loop(&client, tx, cancel).await;
    }

    #[tokio::test]
    async fn push_loop_stops_while_waiting_to_reconnect() {
        let cancel = CancellationToken::new();
        // Nothing listens on port 1, so every attempt fails and the loop
        // parks in its backoff sleep.
        let client = PushClient::new("ws://127.0.0.1:1/sockjs/websocket".into(), None);
        let (tx, mut rx) = mpsc::channel(4);

        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move { run_push_loop(&client, tx, cancel).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        cancel.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(2), task)
            .await
            .expect("push loop should stop on cancel")
            .unwrap();
        assert!(rx.try_recv().is_err());
    }
}
