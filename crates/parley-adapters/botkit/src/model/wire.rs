//! Botkit wire payloads.
//!
//! Only the fields the connector reads are modelled; the full payload is
//! always kept alongside as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use parley_core::{Button, Media};

/// The `type` of a chat message activity.
pub const MESSAGE_TYPE: &str = "message";

/// An activity sent by the Botkit server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotkitActivity {
    /// Activity type; chat replies use [`MESSAGE_TYPE`].
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Reply text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Suggested replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_replies: Option<Vec<QuickReply>>,

    /// Attached files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<BotkitFile>>,
}

/// A Botkit quick reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickReply {
    /// Button label.
    #[serde(default)]
    pub title: String,
    /// Value posted back when chosen.
    #[serde(default)]
    pub payload: Value,
}

impl From<QuickReply> for Button {
    fn from(reply: QuickReply) -> Self {
        Button::new(reply.title, reply.payload)
    }
}

/// A Botkit file attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotkitFile {
    /// Where the file can be fetched.
    pub url: String,
}

impl From<BotkitFile> for Media {
    fn from(file: BotkitFile) -> Self {
        Media::new(file.url)
    }
}
