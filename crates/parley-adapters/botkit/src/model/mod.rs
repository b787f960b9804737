//! Botkit data model and translation.

pub mod translate;
pub mod wire;

pub use translate::{from_wire, is_message_frame, to_wire};
pub use wire::{BotkitActivity, BotkitFile, MESSAGE_TYPE, QuickReply};
