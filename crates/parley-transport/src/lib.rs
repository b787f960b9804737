//! # Parley Transport
//!
//! Concrete [`TransportChannel`](parley_core::TransportChannel)
//! implementations for Parley connectors, selected through feature flags.
//!
//! ## Features
//!
//! - `ws-client` (default): [`WsChannel`], a persistent WebSocket connection
//! - `http-client` (default): [`WebhookChannel`], one HTTP POST per message
//! - `full`: both
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Connector          │  (Botkit, ...)
//! ├─────────────────────┤
//! │  parley-core        │  (TransportChannel trait)
//! ├─────────────────────┤
//! │  parley-transport   │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network (TCP/HTTP) │
//! └─────────────────────┘
//! ```
//!
//! | Channel | Delivery of replies | Open | Close |
//! |---------|---------------------|------|-------|
//! | `WsChannel` | pushed as `InboundEvent`s | WebSocket handshake | close handshake |
//! | `WebhookChannel` | returned from `send` | no I/O | no I/O |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parley_core::{TransportChannel, inbound_channel};
//! use parley_transport::WsChannel;
//!
//! let mut channel = WsChannel::new("ws://127.0.0.1:3000");
//! let (tx, mut rx) = inbound_channel();
//! channel.open(tx).await?;
//! channel.send(serde_json::json!({"type": "message", "text": "hi"})).await?;
//! while let Some(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! ```

// Transport implementations (feature-gated)
#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "ws-client")]
pub mod websocket;

#[cfg(feature = "ws-client")]
pub use websocket::WsChannel;

#[cfg(feature = "http-client")]
pub use http::WebhookChannel;
