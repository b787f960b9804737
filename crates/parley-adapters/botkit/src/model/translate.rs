//! Translation between canonical messages and Botkit wire payloads.

use serde::Deserialize;
use serde_json::{Map, Value};

use parley_core::{ChannelKind, ConnectorError, InboundMessage, OutboundMessage};

use super::wire::{BotkitActivity, MESSAGE_TYPE};

/// Builds the wire payload for a user message.
///
/// The base fields are `type`, `text`, `user` and `channel`. Keys of the
/// structured payload are merged on top and win on collision.
pub fn to_wire(message: &OutboundMessage, user: &str, channel: ChannelKind) -> Value {
    let mut wire = Map::new();
    wire.insert("type".into(), Value::from(MESSAGE_TYPE));
    wire.insert("text".into(), Value::from(message.text.as_str()));
    wire.insert("user".into(), Value::from(user));
    wire.insert("channel".into(), Value::from(channel.as_str()));

    if let Some(payload) = &message.structured_payload {
        wire.extend(payload.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    Value::Object(wire)
}

/// Whether a pushed payload is a chat message.
pub fn is_message_frame(payload: &Value) -> bool {
    payload.get("type").and_then(Value::as_str) == Some(MESSAGE_TYPE)
}

/// Translates a bot payload into a canonical message.
///
/// Fails with [`ConnectorError::MalformedPayload`] if the payload is not an
/// object or a known field has the wrong shape.
pub fn from_wire(payload: Value) -> Result<InboundMessage, ConnectorError> {
    let activity =
        BotkitActivity::deserialize(&payload).map_err(|e| ConnectorError::MalformedPayload {
            reason: format!("unexpected Botkit payload: {e}"),
            raw: payload.to_string(),
        })?;

    Ok(InboundMessage {
        text: activity.text,
        buttons: activity
            .quick_replies
            .map(|replies| replies.into_iter().map(Into::into).collect()),
        media: activity
            .files
            .map(|files| files.into_iter().map(Into::into).collect()),
        raw_source_data: payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{Button, Media};
    use serde_json::json;

    #[test]
    fn test_to_wire_base_fields() {
        let wire = to_wire(&OutboundMessage::new("hi"), "u-1", ChannelKind::WebSocket);
        assert_eq!(
            wire,
            json!({"type": "message", "text": "hi", "user": "u-1", "channel": "websocket"})
        );

        let wire = to_wire(&OutboundMessage::new("hi"), "u-1", ChannelKind::Webhook);
        assert_eq!(wire["channel"], "webhook");
    }

    #[test]
    fn test_structured_payload_overrides_base() {
        let message = OutboundMessage::new("hi")
            .with_field("channel", "slack")
            .with_field("user", "override")
            .with_field("postback", json!({"id": 7}));
        let wire = to_wire(&message, "u-1", ChannelKind::WebSocket);

        let payload = message.structured_payload.as_ref().unwrap();
        for (key, value) in payload {
            assert_eq!(&wire[key], value, "key {key} must carry the payload value");
        }
        assert_eq!(wire["type"], "message");
        assert_eq!(wire["text"], "hi");
    }

    #[test]
    fn test_is_message_frame() {
        assert!(is_message_frame(&json!({"type": "message", "text": "x"})));
        assert!(!is_message_frame(&json!({"type": "typing"})));
        assert!(!is_message_frame(&json!({"text": "no type"})));
        assert!(!is_message_frame(&json!("message")));
    }

    #[test]
    fn test_quick_replies_become_buttons_in_order() {
        let msg = from_wire(json!({
            "type": "message",
            "quick_replies": [
                {"title": "Yes", "payload": "y"},
                {"title": "No", "payload": "n"}
            ]
        }))
        .unwrap();
        assert_eq!(
            msg.buttons,
            Some(vec![Button::new("Yes", "y"), Button::new("No", "n")])
        );
        assert_eq!(msg.text, None);
        assert_eq!(msg.media, None);
    }

    #[test]
    fn test_files_become_media() {
        let raw = json!({"files": [{"url": "http://x/1.png"}]});
        let msg = from_wire(raw.clone()).unwrap();
        assert_eq!(msg.media, Some(vec![Media::new("http://x/1.png")]));
        assert_eq!(msg.raw_source_data, raw);
    }

    #[test]
    fn test_text_and_raw_source() {
        let msg = from_wire(json!({"text": "ok"})).unwrap();
        assert_eq!(msg.text.as_deref(), Some("ok"));
        assert_eq!(msg.buttons, None);
        assert_eq!(msg.raw_source_data, json!({"text": "ok"}));
    }

    #[test]
    fn test_malformed_shapes() {
        assert!(matches!(
            from_wire(json!("just a string")),
            Err(ConnectorError::MalformedPayload { .. })
        ));
        assert!(matches!(
            from_wire(json!({"quick_replies": "not a list"})),
            Err(ConnectorError::MalformedPayload { raw, .. }) if raw.contains("not a list")
        ));
        assert!(matches!(
            from_wire(json!({"files": [{"name": "no url"}]})),
            Err(ConnectorError::MalformedPayload { .. })
        ));
    }
}
