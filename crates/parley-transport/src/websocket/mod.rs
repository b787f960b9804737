//! WebSocket transport.
//!
//! This module provides the persistent WebSocket client channel.

mod client;
pub use client::{DEFAULT_CLOSE_TIMEOUT, WsChannel, decode_frame};
