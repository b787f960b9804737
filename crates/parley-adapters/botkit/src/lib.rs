//! # Parley Connector for Botkit
//!
//! This crate connects a conversational test harness to a bot built on the
//! Botkit framework.
//!
//! ## Overview
//!
//! The connector plays the part of a user talking to the bot:
//!
//! - Messages from the harness are translated into Botkit activities
//! - Bot replies are translated back and pushed to a [`BotSink`](parley_core::BotSink)
//! - Either a WebSocket or the Botkit webhook carries the traffic
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parley_adapter_botkit::{BotkitConnector, ConnectorConfig};
//! use parley_core::QueueSink;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (sink, mut replies) = QueueSink::new();
//!     let config = ConnectorConfig::new("ws://localhost:3000").socket(true);
//!     let mut connector = BotkitConnector::new(config, sink)?;
//!
//!     connector.validate().await?;
//!     connector.start().await?;
//!     connector.user_says("hello").await?;
//!
//!     if let Some(Ok(reply)) = replies.recv().await {
//!         println!("bot: {}", reply.text_or_empty());
//!     }
//!
//!     connector.stop().await?;
//!     connector.clean().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire Format
//!
//! Outbound activities always carry `type`, `text`, `user` and `channel`,
//! with any structured payload merged on top:
//!
//! ```text
//! {"type": "message", "text": "hello", "user": "<session id>", "channel": "websocket"}
//! ```
//!
//! Inbound activities map `text`, `quick_replies` and `files` onto the
//! canonical message; see [`model`].

mod config;
pub mod connector;
pub mod model;

pub use config::{ConnectorConfig, ENV_ALIASES, ENV_PREFIX};
pub use connector::BotkitConnector;
pub use model::{BotkitActivity, BotkitFile, QuickReply, from_wire, is_message_frame, to_wire};
