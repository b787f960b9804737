//! Webhook channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::{debug, trace};

use parley_core::{
    ChannelKind, ChannelState, ChannelStateCell, Delivery, InboundSender, TransportChannel,
    TransportError, TransportResult,
};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One HTTP POST per outbound message.
///
/// There is no connection to manage: `open` and `close` only flip the logical
/// state, and replies come back in the response body of each `send`.
pub struct WebhookChannel {
    client: Client,
    receive_url: String,
    state: ChannelStateCell,
}

impl WebhookChannel {
    /// Creates a channel posting to `{base_url}{receive_path}`.
    pub fn new(base_url: &str, receive_path: &str) -> TransportResult<Self> {
        Self::with_timeout(base_url, receive_path, DEFAULT_TIMEOUT)
    }

    /// Creates a channel with a custom request timeout.
    pub fn with_timeout(
        base_url: &str,
        receive_path: &str,
        timeout: Duration,
    ) -> TransportResult<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            receive_url: join_url(base_url, receive_path),
            state: ChannelStateCell::new(),
        })
    }
}

#[async_trait]
impl TransportChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    fn endpoint(&self) -> &str {
        &self.receive_url
    }

    fn state(&self) -> ChannelState {
        self.state.get()
    }

    async fn open(&mut self, _inbound: InboundSender) -> TransportResult<()> {
        debug!(url = %self.receive_url, "Webhook channel ready");
        self.state.set(ChannelState::Open);
        Ok(())
    }

    async fn send(&self, payload: Value) -> TransportResult<Delivery> {
        let state = self.state.get();
        if !state.is_open() {
            return Err(TransportError::NotConnected { state });
        }

        trace!(url = %self.receive_url, body = %payload, "Posting to webhook");
        let resp = self
            .client
            .post(&self.receive_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() >= 400 {
            let message = status.canonical_reason().unwrap_or("Unknown").to_string();
            debug!(status = status.as_u16(), message = %message, "Got error response");
            return Err(TransportError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let replies = decode_body(&body)?;
        debug!(status = status.as_u16(), replies = replies.len(), "Got response");

        Ok(Delivery::Replied(replies))
    }

    async fn close(&mut self) -> TransportResult<()> {
        debug!(url = %self.receive_url, "Webhook channel closed");
        self.state.set(ChannelState::Closed);
        Ok(())
    }
}

/// Joins a base URL and a path with exactly one slash between them.
pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Decodes a webhook response body into replies.
///
/// An empty body, `null` or `{}` means no reply. An array yields one reply
/// per non-empty element, in order.
pub fn decode_body(body: &str) -> TransportResult<Vec<Value>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|e| {
        TransportError::malformed(format!("response body is not valid JSON: {e}"), body)
    })?;

    Ok(match value {
        Value::Array(items) => items.into_iter().filter(|v| !is_empty_reply(v)).collect(),
        other if is_empty_reply(&other) => Vec::new(),
        other => vec![other],
    })
}

fn is_empty_reply(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
