//! The harness boundary.
//!
//! A connector calls [`BotSink::bot_says`] once per bot reply, and once per
//! inbound failure that would otherwise look like a missing reply.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::ConnectorError;
use crate::message::InboundMessage;

/// A translated reply, or the reason an inbound payload could not be read.
pub type BotReply = Result<InboundMessage, ConnectorError>;

/// Receives everything the bot says.
pub trait BotSink: Send + Sync {
    /// Delivers one reply.
    fn bot_says(&self, reply: BotReply);
}

impl<F> BotSink for F
where
    F: Fn(BotReply) + Send + Sync,
{
    fn bot_says(&self, reply: BotReply) {
        self(reply)
    }
}

/// Boxed sink.
pub type BoxedSink = Arc<dyn BotSink>;

/// A sink that queues replies for the harness to pull.
#[derive(Debug, Clone)]
pub struct QueueSink {
    tx: mpsc::UnboundedSender<BotReply>,
}

impl QueueSink {
    /// Creates a sink and the receiver that drains it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BotReply>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl BotSink for QueueSink {
    fn bot_says(&self, reply: BotReply) {
        // A dropped receiver means the harness stopped listening.
        let _ = self.tx.send(reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_queue_sink_preserves_order() {
        let (sink, mut rx) = QueueSink::new();
        let sink: BoxedSink = Arc::new(sink);

        sink.bot_says(Ok(InboundMessage::from_raw(json!({"text": "one"}))));
        sink.bot_says(Err(ConnectorError::Transport("gone".into())));

        assert!(matches!(rx.recv().await, Some(Ok(m)) if m.raw_source_data["text"] == "one"));
        assert!(matches!(rx.recv().await, Some(Err(ConnectorError::Transport(_)))));
    }

    #[test]
    fn test_closure_sink() {
        let count = std::sync::atomic::AtomicUsize::new(0);
        let sink = |_reply: BotReply| {
            count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        };
        sink.bot_says(Ok(InboundMessage::from_raw(json!({}))));
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
