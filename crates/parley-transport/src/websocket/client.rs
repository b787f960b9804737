//! WebSocket client channel.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use parley_core::{
    ChannelKind, ChannelState, ChannelStateCell, Delivery, InboundEvent, InboundSender,
    TransportChannel, TransportError, TransportResult,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// How long `close` waits for the server to acknowledge the close frame.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A persistent WebSocket connection to the bot runtime.
///
/// Inbound frames are decoded as JSON and pushed as [`InboundEvent`]s.
/// There is no reconnection: once the connection ends, the channel stays
/// closed.
pub struct WsChannel {
    url: String,
    state: ChannelStateCell,
    close_timeout: Duration,
    message_tx: Option<mpsc::Sender<String>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl WsChannel {
    /// Creates an unopened channel for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: ChannelStateCell::new(),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            message_tx: None,
            shutdown_tx: None,
            task: None,
        }
    }

    /// Sets how long `close` waits for the close handshake.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

#[async_trait]
impl TransportChannel for WsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WebSocket
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    fn state(&self) -> ChannelState {
        self.state.get()
    }

    async fn open(&mut self, inbound: InboundSender) -> TransportResult<()> {
        let current = self.state.get();
        if current != ChannelState::Unopened {
            return Err(TransportError::ConnectionFailed {
                url: self.url.clone(),
                reason: format!("channel is {current} and cannot be reopened"),
            });
        }

        self.state.set(ChannelState::Opening);
        info!(url = %self.url, "Connecting to WebSocket server");

        let (ws_stream, _response) = match connect_async(self.url.as_str()).await {
            Ok(pair) => pair,
            Err(e) => {
                self.state.set(ChannelState::Failed);
                return Err(TransportError::ConnectionFailed {
                    url: self.url.clone(),
                    reason: format!("WebSocket connection failed: {e}"),
                });
            }
        };
        let (ws_tx, ws_rx) = ws_stream.split();

        let (message_tx, message_rx) = mpsc::channel::<String>(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        self.state.set(ChannelState::Open);
        info!(url = %self.url, "WebSocket client connected");

        self.message_tx = Some(message_tx);
        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(tokio::spawn(run_client_loop(
            ws_tx,
            ws_rx,
            message_rx,
            shutdown_rx,
            inbound,
            self.state.clone(),
            self.url.clone(),
            self.close_timeout,
        )));

        Ok(())
    }

    async fn send(&self, payload: Value) -> TransportResult<Delivery> {
        let state = self.state.get();
        let Some(message_tx) = self.message_tx.as_ref().filter(|_| state.is_open()) else {
            return Err(TransportError::NotConnected { state });
        };

        let frame = serde_json::to_string(&payload)
            .map_err(|e| TransportError::SendFailed(format!("JSON serialization failed: {e}")))?;
        message_tx
            .send(frame)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        Ok(Delivery::Queued)
    }

    async fn close(&mut self) -> TransportResult<()> {
        let state = self.state.get();
        match state {
            ChannelState::Unopened | ChannelState::Opening => {
                // No live connection: either never opened, or the open was cancelled.
                debug!(url = %self.url, %state, "Closing WebSocket channel without connection");
                self.state.set(ChannelState::Closed);
            }
            ChannelState::Open | ChannelState::Closing => {
                // The loop may have seen the server close first; keep its verdict.
                self.state.compare_and_set(ChannelState::Open, ChannelState::Closing);
                self.message_tx = None;
                if let Some(shutdown_tx) = self.shutdown_tx.take() {
                    let _ = shutdown_tx.send(true);
                }
                self.state
                    .wait_for(|s| matches!(s, ChannelState::Closed | ChannelState::Failed))
                    .await;
                info!(url = %self.url, "WebSocket channel closed");
            }
            ChannelState::Closed | ChannelState::Failed => {}
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(())
    }
}

/// Decodes one inbound text frame.
pub fn decode_frame(raw: &str) -> InboundEvent {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => InboundEvent::Payload(value),
        Err(e) => InboundEvent::Malformed {
            reason: format!("frame is not valid JSON: {e}"),
            raw: raw.to_string(),
        },
    }
}

fn forward(inbound: &InboundSender, event: InboundEvent) {
    if inbound.send(event).is_err() {
        trace!("Inbound receiver dropped, discarding event");
    }
}

/// Runs the connection until shutdown or until the server goes away.
#[allow(clippy::too_many_arguments)]
async fn run_client_loop(
    mut ws_tx: WsSink,
    mut ws_rx: WsSource,
    mut message_rx: mpsc::Receiver<String>,
    mut shutdown_rx: watch::Receiver<bool>,
    inbound: InboundSender,
    state: ChannelStateCell,
    url: String,
    close_timeout: Duration,
) {
    loop {
        tokio::select! {
            // Also fires when the channel is dropped without closing.
            _ = shutdown_rx.changed() => {
                debug!(url = %url, "Sending close frame");
                let _ = ws_tx.close().await;
                await_close_handshake(&mut ws_rx, close_timeout, &url).await;
                state.set(ChannelState::Closed);
                break;
            }

            Some(frame) = message_rx.recv() => {
                trace!(url = %url, len = frame.len(), "Sending frame");
                if let Err(e) = ws_tx.send(Message::Text(frame.into())).await {
                    warn!(url = %url, error = %e, "Failed to send frame");
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        trace!(url = %url, len = text.len(), "Received text");
                        forward(&inbound, decode_frame(text.as_str()));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        trace!(url = %url, len = data.len(), "Received binary");
                        let event = match std::str::from_utf8(&data) {
                            Ok(text) => decode_frame(text),
                            Err(e) => InboundEvent::Malformed {
                                reason: format!("binary frame is not UTF-8: {e}"),
                                raw: String::from_utf8_lossy(&data).into_owned(),
                            },
                        };
                        forward(&inbound, event);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        trace!(url = %url, "Received ping, sending pong");
                        let _ = ws_tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.as_str().to_owned())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "server closed connection".to_string());
                        info!(url = %url, reason = %reason, "Server closed connection");
                        let _ = ws_tx.close().await;
                        state.set(ChannelState::Closed);
                        forward(&inbound, InboundEvent::Disconnected { reason });
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(url = %url, error = %e, "WebSocket error");
                        state.set(ChannelState::Failed);
                        forward(&inbound, InboundEvent::Disconnected { reason: e.to_string() });
                        break;
                    }
                    None => {
                        info!(url = %url, "WebSocket stream ended");
                        state.set(ChannelState::Closed);
                        forward(
                            &inbound,
                            InboundEvent::Disconnected { reason: "stream ended".to_string() },
                        );
                        break;
                    }
                }
            }
        }
    }
}

/// Reads until the server answers our close frame.
async fn await_close_handshake(ws_rx: &mut WsSource, close_timeout: Duration, url: &str) {
    let drained = tokio::time::timeout(close_timeout, async {
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => trace!(url = %url, "Discarding frame received while closing"),
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!(url = %url, timeout = ?close_timeout, "Close handshake timed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::inbound_channel;
    use serde_json::json;
    use tokio::net::TcpListener;

    const WAIT: Duration = Duration::from_secs(5);

    /// Accepts one WebSocket connection and hands it to `handler`.
    async fn spawn_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            handler(ws).await;
        });
        format!("ws://{addr}")
    }

    #[test]
    fn test_decode_frame() {
        assert_eq!(
            decode_frame(r#"{"type":"message","text":"hi"}"#),
            InboundEvent::Payload(json!({"type": "message", "text": "hi"}))
        );
        assert!(matches!(
            decode_frame("not json"),
            InboundEvent::Malformed { raw, .. } if raw == "not json"
        ));
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let url = spawn_server(|mut ws| async move {
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(text) = msg {
                    let incoming: Value = serde_json::from_str(text.as_str()).unwrap();
                    let reply = json!({
                        "type": "message",
                        "text": format!("echo: {}", incoming["text"].as_str().unwrap()),
                    });
                    ws.send(Message::Text(reply.to_string().into())).await.unwrap();
                    ws.send(Message::Text("not json".into())).await.unwrap();
                }
            }
        })
        .await;

        let mut channel = WsChannel::new(url);
        let (tx, mut rx) = inbound_channel();
        channel.open(tx).await.unwrap();
        assert_eq!(channel.state(), ChannelState::Open);

        let delivery = channel
            .send(json!({"type": "message", "text": "hi"}))
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Queued);

        let first = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(
            first,
            InboundEvent::Payload(json!({"type": "message", "text": "echo: hi"}))
        );
        let second = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert!(matches!(second, InboundEvent::Malformed { .. }));

        channel.close().await.unwrap();
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_server_close_is_reported() {
        let url = spawn_server(|mut ws| async move {
            ws.close(None).await.unwrap();
            while ws.next().await.is_some() {}
        })
        .await;

        let mut channel = WsChannel::new(url);
        let (tx, mut rx) = inbound_channel();
        channel.open(tx).await.unwrap();

        let event = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert!(matches!(event, InboundEvent::Disconnected { .. }));
        assert_eq!(channel.state(), ChannelState::Closed);

        let err = channel.send(json!({"text": "late"})).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::NotConnected {
                state: ChannelState::Closed
            }
        ));

        channel.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_ping_is_answered() {
        let (pong_tx, pong_rx) = tokio::sync::oneshot::channel();
        let url = spawn_server(|mut ws| async move {
            ws.send(Message::Ping(b"hi".to_vec().into())).await.unwrap();
            let mut pong_tx = Some(pong_tx);
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Pong(data) = msg
                    && let Some(tx) = pong_tx.take()
                {
                    let _ = tx.send(data.to_vec());
                }
            }
        })
        .await;

        let mut channel = WsChannel::new(url);
        let (tx, _rx) = inbound_channel();
        channel.open(tx).await.unwrap();

        let pong = tokio::time::timeout(WAIT, pong_rx).await.unwrap().unwrap();
        assert_eq!(pong, b"hi");

        channel.close().await.unwrap();
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_close_gives_up_on_silent_server() {
        let url = spawn_server(|ws| async move {
            let _held = ws;
            std::future::pending::<()>().await;
        })
        .await;

        let close_timeout = Duration::from_millis(200);
        let mut channel = WsChannel::new(url).with_close_timeout(close_timeout);
        let (tx, _rx) = inbound_channel();
        channel.open(tx).await.unwrap();

        let started = tokio::time::Instant::now();
        tokio::time::timeout(WAIT, channel.close())
            .await
            .unwrap()
            .unwrap();
        assert!(started.elapsed() >= close_timeout);
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_open_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut channel = WsChannel::new(format!("ws://{addr}"));
        let (tx, _rx) = inbound_channel();
        let err = channel.open(tx).await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed { .. }));
        assert_eq!(channel.state(), ChannelState::Failed);
    }

    #[tokio::test]
    async fn test_send_before_open() {
        let channel = WsChannel::new("ws://127.0.0.1:1");
        let err = channel.send(json!({"text": "hi"})).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::NotConnected {
                state: ChannelState::Unopened
            }
        ));
    }

    #[tokio::test]
    async fn test_close_unopened_is_noop() {
        let mut channel = WsChannel::new("ws://127.0.0.1:1");
        channel.close().await.unwrap();
        channel.close().await.unwrap();
        assert_eq!(channel.state(), ChannelState::Closed);
    }
}
