//! Canonical message types exchanged with the test harness.
//!
//! These shapes are transport-agnostic. Adapters translate them to and from
//! their own wire payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Outbound
// =============================================================================

/// A message the simulated user sends to the bot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Message text.
    pub text: String,
    /// Extra wire fields, merged over the adapter's base payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_payload: Option<Map<String, Value>>,
}

impl OutboundMessage {
    /// Creates a plain text message.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured_payload: None,
        }
    }

    /// Replaces the structured payload.
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.structured_payload = Some(payload);
        self
    }

    /// Adds a single structured payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.structured_payload
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

impl From<&str> for OutboundMessage {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for OutboundMessage {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

// =============================================================================
// Inbound
// =============================================================================

/// A quick-reply button offered by the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    /// Label shown to the user.
    pub text: String,
    /// Value sent back when the button is pressed.
    pub payload: Value,
}

impl Button {
    /// Creates a button.
    pub fn new(text: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self {
            text: text.into(),
            payload: payload.into(),
        }
    }
}

/// A media attachment sent by the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    /// Location of the attachment.
    pub media_uri: String,
}

impl Media {
    /// Creates a media entry.
    pub fn new(media_uri: impl Into<String>) -> Self {
        Self {
            media_uri: media_uri.into(),
        }
    }
}

/// A message the bot sent, in canonical form.
///
/// Absent wire fields stay `None`; they are never defaulted to empty lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Quick-reply buttons, in wire order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<Button>>,
    /// Attachments, in wire order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<Media>>,
    /// The untranslated wire payload.
    pub raw_source_data: Value,
}

impl InboundMessage {
    /// Creates a message carrying only its raw source.
    pub fn from_raw(raw_source_data: Value) -> Self {
        Self {
            text: None,
            buttons: None,
            media: None,
            raw_source_data,
        }
    }

    /// Returns the text, or an empty string.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_field_builds_payload() {
        let msg = OutboundMessage::new("hi")
            .with_field("channel", "custom")
            .with_field("priority", 2);
        let payload = msg.structured_payload.unwrap();
        assert_eq!(payload["channel"], json!("custom"));
        assert_eq!(payload["priority"], json!(2));
    }

    #[test]
    fn test_inbound_serializes_camel_case_and_skips_absent() {
        let msg = InboundMessage {
            text: None,
            buttons: None,
            media: Some(vec![Media::new("http://x/1.png")]),
            raw_source_data: json!({"files": [{"url": "http://x/1.png"}]}),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "media": [{"mediaUri": "http://x/1.png"}],
                "rawSourceData": {"files": [{"url": "http://x/1.png"}]}
            })
        );
    }
}
