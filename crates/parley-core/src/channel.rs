//! Transport channel abstraction.
//!
//! A connector owns exactly one [`TransportChannel`]. Outbound payloads go
//! through [`TransportChannel::send`]; anything the remote pushes on its own
//! arrives as an [`InboundEvent`] on the sender handed to
//! [`TransportChannel::open`].

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportResult;
use crate::state::ChannelState;

/// The kind of transport behind a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Persistent full-duplex WebSocket.
    WebSocket,
    /// One HTTP request/response per message.
    Webhook,
}

impl ChannelKind {
    /// Wire name of the transport.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WebSocket => "websocket",
            Self::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Inbound Events
// =============================================================================

/// Something the remote pushed without being asked.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A parsed JSON payload.
    Payload(Value),
    /// A frame that is not valid JSON.
    Malformed {
        /// Parser error.
        reason: String,
        /// The frame, verbatim.
        raw: String,
    },
    /// The connection ended.
    Disconnected {
        /// Why it ended.
        reason: String,
    },
}

/// Sending half of the inbound event channel.
pub type InboundSender = mpsc::UnboundedSender<InboundEvent>;

/// Receiving half of the inbound event channel.
pub type InboundReceiver = mpsc::UnboundedReceiver<InboundEvent>;

/// Creates an inbound event channel.
pub fn inbound_channel() -> (InboundSender, InboundReceiver) {
    mpsc::unbounded_channel()
}

// =============================================================================
// Transport Channel
// =============================================================================

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Handed to the connection; replies, if any, arrive as inbound events.
    Queued,
    /// The exchange completed and produced these replies, in order.
    Replied(Vec<Value>),
}

/// A single transport connection to the bot runtime.
#[async_trait]
pub trait TransportChannel: Send + Sync {
    /// The transport kind.
    fn kind(&self) -> ChannelKind;

    /// The endpoint this channel talks to.
    fn endpoint(&self) -> &str;

    /// Current channel state.
    fn state(&self) -> ChannelState;

    /// Opens the channel. Pushed payloads go to `inbound`.
    ///
    /// The caller may cancel this future; the state then stays wherever the
    /// attempt got to and `close` must still be called.
    async fn open(&mut self, inbound: InboundSender) -> TransportResult<()>;

    /// Sends one wire payload.
    async fn send(&self, payload: Value) -> TransportResult<Delivery>;

    /// Closes the channel and waits for the close to complete.
    ///
    /// Closing a channel that was never opened is a no-op.
    async fn close(&mut self) -> TransportResult<()>;
}

/// Boxed transport channel.
pub type BoxedChannel = Box<dyn TransportChannel>;
