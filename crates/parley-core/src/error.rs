//! Unified error types for Parley.
//!
//! [`TransportError`] is raised by channel implementations. [`ConnectorError`]
//! is what the harness sees: every transport failure converts into exactly
//! one connector error kind, so callers can tell a protocol mismatch from a
//! missing reply or a dead network.

use thiserror::Error;

use crate::state::{ChannelState, LifecycleState};

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// A send was attempted on a channel that is not open.
    #[error("channel is not open (state: {state})")]
    NotConnected {
        /// State the channel was in.
        state: ChannelState,
    },

    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The remote endpoint answered with an error status.
    #[error("got error response: {status}/{message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Status reason or response body.
        message: String,
    },

    /// Network-level request failure (DNS, refused, timeout).
    #[error("request failed: {0}")]
    Request(String),

    /// The remote sent something that is not a valid wire payload.
    #[error("malformed payload: {reason}")]
    MalformedPayload {
        /// Parser error.
        reason: String,
        /// The offending payload, verbatim.
        raw: String,
    },

    /// Invalid configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Creates a malformed payload error.
    pub fn malformed(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}

// =============================================================================
// Connector Errors
// =============================================================================

/// Errors surfaced to the harness by connector operations.
///
/// None of these are retried internally.
#[derive(Debug, Clone, Error)]
pub enum ConnectorError {
    /// A required option is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The channel could not be opened in time.
    #[error("connection to {url} failed: {reason}")]
    Connection {
        /// Endpoint that was being opened.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// A send was attempted on a channel that is not open.
    #[error("channel not connected (state: {state})")]
    ChannelNotConnected {
        /// State the channel was in.
        state: ChannelState,
    },

    /// An inbound payload could not be parsed.
    #[error("malformed payload from bot: {reason}")]
    MalformedPayload {
        /// Parser error.
        reason: String,
        /// The offending payload, verbatim.
        raw: String,
    },

    /// The bot runtime answered with an error status.
    #[error("got error response: {status}/{message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Status reason or response body.
        message: String,
    },

    /// Network-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The operation is not legal in the current lifecycle state.
    #[error("cannot {operation} while connector is {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// Lifecycle state at the time of the call.
        state: LifecycleState,
    },
}

impl ConnectorError {
    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an invalid state error.
    pub fn invalid_state(operation: &'static str, state: LifecycleState) -> Self {
        Self::InvalidState { operation, state }
    }
}

impl From<TransportError> for ConnectorError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionFailed { url, reason } => Self::Connection { url, reason },
            TransportError::NotConnected { state } => Self::ChannelNotConnected { state },
            TransportError::Remote { status, message } => Self::Remote { status, message },
            TransportError::MalformedPayload { reason, raw } => {
                Self::MalformedPayload { reason, raw }
            }
            TransportError::InvalidConfig(msg) => Self::Configuration(msg),
            TransportError::SendFailed(msg) | TransportError::Request(msg) => {
                Self::Transport(msg)
            }
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
