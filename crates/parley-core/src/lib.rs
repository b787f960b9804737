//! # Parley Core
//!
//! Shared building blocks for Parley connectors.
//!
//! A connector sits between a conversational test harness and a remote bot
//! runtime. This crate defines the pieces every connector and transport
//! agree on:
//!
//! - **Canonical messages**: [`OutboundMessage`], [`InboundMessage`]
//! - **Channels**: the [`TransportChannel`] trait, [`ChannelState`] and the
//!   [`InboundEvent`] stream a channel pushes unsolicited payloads into
//! - **Harness boundary**: [`BotSink`], the only thing a connector calls on
//!   the harness
//! - **Errors**: [`TransportError`] from channels, [`ConnectorError`] for the
//!   harness
//!
//! ```text
//! ┌─────────┐  user_says   ┌───────────┐  send   ┌──────────────────┐
//! │ Harness │─────────────▶│ Connector │────────▶│ TransportChannel │──▶ bot
//! │         │◀─────────────│           │◀────────│                  │◀── bot
//! └─────────┘   BotSink    └───────────┘ Inbound └──────────────────┘
//!                                        Event
//! ```

pub mod channel;
pub mod error;
pub mod message;
pub mod sink;
pub mod state;

pub use channel::{
    BoxedChannel, ChannelKind, Delivery, InboundEvent, InboundReceiver, InboundSender,
    TransportChannel, inbound_channel,
};
pub use error::{ConnectorError, ConnectorResult, TransportError, TransportResult};
pub use message::{Button, InboundMessage, Media, OutboundMessage};
pub use sink::{BotReply, BotSink, BoxedSink, QueueSink};
pub use state::{ChannelState, ChannelStateCell, LifecycleState};
