//! Channel and connector lifecycle states.

use std::fmt;

use tokio::sync::watch;

/// State of a transport channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// Never opened.
    #[default]
    Unopened,
    /// Open requested, handshake in progress.
    Opening,
    /// Ready to carry traffic.
    Open,
    /// Close requested, waiting for the handshake to finish.
    Closing,
    /// Closed cleanly.
    Closed,
    /// Opening or the live connection failed.
    Failed,
}

impl ChannelState {
    /// Returns the state name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unopened => "unopened",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }

    /// Whether the channel can carry traffic.
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    /// Whether the channel holds something that `close` has to release.
    pub fn needs_close(self) -> bool {
        matches!(self, Self::Opening | Self::Open | Self::Closing)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Constructed, nothing checked yet.
    #[default]
    Created,
    /// Configuration checked and channel opened.
    Validated,
    /// Session identity assigned, messages flow.
    Started,
    /// Session identity cleared, channel kept.
    Stopped,
    /// Channel released. Terminal.
    Cleaned,
}

impl LifecycleState {
    /// Returns the state name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Validated => "validated",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Cleaned => "cleaned",
        }
    }

    /// A session identity exists exactly in this state.
    pub fn has_session(self) -> bool {
        self == Self::Started
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, observable channel state.
///
/// Cloning yields another handle to the same cell, so a connection task can
/// publish transitions that the owning channel reads and awaits.
#[derive(Debug, Clone)]
pub struct ChannelStateCell {
    tx: std::sync::Arc<watch::Sender<ChannelState>>,
}

impl ChannelStateCell {
    /// Creates a cell in the `Unopened` state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ChannelState::Unopened);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    /// Current state.
    pub fn get(&self) -> ChannelState {
        *self.tx.borrow()
    }

    /// Publishes a new state and returns the previous one.
    pub fn set(&self, state: ChannelState) -> ChannelState {
        self.tx.send_replace(state)
    }

    /// Moves to `new` only if the current state is `expected`.
    pub fn compare_and_set(&self, expected: ChannelState, new: ChannelState) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == expected {
                *state = new;
                true
            } else {
                false
            }
        })
    }

    /// Waits until `pred` holds for the current state.
    pub async fn wait_for(&self, pred: impl FnMut(&ChannelState) -> bool) -> ChannelState {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail.
        match rx.wait_for(pred).await {
            Ok(state) => *state,
            Err(_) => self.get(),
        }
    }
}

impl Default for ChannelStateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_session_invariant() {
        assert!(LifecycleState::Started.has_session());
        for state in [
            LifecycleState::Created,
            LifecycleState::Validated,
            LifecycleState::Stopped,
            LifecycleState::Cleaned,
        ] {
            assert!(!state.has_session(), "{state} must not hold a session");
        }
    }

    #[test]
    fn test_needs_close() {
        assert!(ChannelState::Open.needs_close());
        assert!(ChannelState::Opening.needs_close());
        assert!(!ChannelState::Unopened.needs_close());
        assert!(!ChannelState::Closed.needs_close());
        assert!(!ChannelState::Failed.needs_close());
    }

    #[test]
    fn test_compare_and_set() {
        let cell = ChannelStateCell::new();
        assert!(!cell.compare_and_set(ChannelState::Open, ChannelState::Closing));
        assert_eq!(cell.get(), ChannelState::Unopened);

        cell.set(ChannelState::Open);
        assert!(cell.compare_and_set(ChannelState::Open, ChannelState::Closing));
        assert_eq!(cell.get(), ChannelState::Closing);
    }

    #[tokio::test]
    async fn test_state_cell_wait_for() {
        let cell = ChannelStateCell::new();
        let publisher = cell.clone();

        tokio::spawn(async move {
            publisher.set(ChannelState::Closing);
            tokio::task::yield_now().await;
            publisher.set(ChannelState::Closed);
        });

        let state = cell.wait_for(|s| *s == ChannelState::Closed).await;
        assert_eq!(state, ChannelState::Closed);
        assert_eq!(cell.get(), ChannelState::Closed);
    }
}
