//! HTTP transport.
//!
//! This module provides the webhook channel.

mod client;
pub use client::{WebhookChannel, decode_body, join_url};
