//! Botkit connector.
//!
//! [`BotkitConnector`] drives one test session against a Botkit server:
//!
//! ```text
//! Created ──validate──▶ Validated ──start──▶ Started ──stop──▶ Stopped
//!                                               ▲                 │
//!                                               └──────start──────┘
//!         (any state) ──clean──▶ Cleaned
//! ```
//!
//! The transport is picked once, at construction. Replies pushed over a
//! WebSocket reach the sink through an inbound pump task; webhook replies are
//! delivered before `user_says` returns.
//!
//! # Usage
//!
//! ```rust,ignore
//! use parley_adapter_botkit::{BotkitConnector, ConnectorConfig};
//! use parley_core::QueueSink;
//!
//! let (sink, mut replies) = QueueSink::new();
//! let mut connector = BotkitConnector::new(ConnectorConfig::new("http://localhost:3000"), sink)?;
//!
//! connector.validate().await?;
//! connector.start().await?;
//! connector.user_says("hello").await?;
//! let reply = replies.recv().await;
//! connector.stop().await?;
//! connector.clean().await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, error, info, info_span, trace, warn};
use uuid::Uuid;

use parley_core::{
    BotSink, BoxedChannel, BoxedSink, ChannelKind, ChannelState, ConnectorError, ConnectorResult,
    Delivery, InboundEvent, InboundReceiver, LifecycleState, OutboundMessage, inbound_channel,
};
use parley_transport::{WebhookChannel, WsChannel};

use crate::config::ConnectorConfig;
use crate::model::{from_wire, is_message_frame, to_wire};

/// How long `clean` waits for queued inbound events to reach the sink.
const PUMP_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// A Botkit connector bound to a single transport channel.
pub struct BotkitConnector {
    config: ConnectorConfig,
    channel: BoxedChannel,
    sink: BoxedSink,
    span: Span,
    lifecycle: LifecycleState,
    user_id: Option<String>,
    pump: Option<JoinHandle<()>>,
}

impl BotkitConnector {
    /// Creates a connector using the transport selected by `config`.
    pub fn new(config: ConnectorConfig, sink: impl BotSink + 'static) -> ConnectorResult<Self> {
        let server_url = config.server_url().unwrap_or_default().to_string();
        let channel: BoxedChannel = if config.use_socket_transport {
            Box::new(WsChannel::new(server_url))
        } else {
            Box::new(WebhookChannel::with_timeout(
                &server_url,
                &config.receive_path,
                config.request_timeout(),
            )?)
        };

        Ok(Self::with_channel(config, channel, Arc::new(sink)))
    }

    /// Creates a connector over an existing channel.
    pub fn with_channel(config: ConnectorConfig, channel: BoxedChannel, sink: BoxedSink) -> Self {
        let span = info_span!("botkit_connector", transport = %channel.kind());
        Self {
            config,
            channel,
            sink,
            span,
            lifecycle: LifecycleState::Created,
            user_id: None,
            pump: None,
        }
    }

    /// Replaces the span all connector logging is recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Returns the session user id while a session is active.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns the lifecycle state.
    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    /// Returns the channel state.
    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Returns the transport kind.
    pub fn transport(&self) -> ChannelKind {
        self.channel.kind()
    }

    /// Checks the configuration and opens the channel.
    ///
    /// Fails with [`ConnectorError::Configuration`] before any network
    /// activity when the server URL is missing, and with
    /// [`ConnectorError::Connection`] when the channel does not open within
    /// the configured timeout. A timed-out channel still has to be released
    /// with [`clean`](Self::clean).
    #[tracing::instrument(name = "validate", skip_all, parent = &self.span)]
    pub async fn validate(&mut self) -> ConnectorResult<()> {
        debug!("Validate called");

        match self.lifecycle {
            LifecycleState::Created | LifecycleState::Validated => {}
            state => return Err(ConnectorError::invalid_state("validate", state)),
        }

        if self.config.server_url().is_none() {
            return Err(ConnectorError::configuration("server_url is required"));
        }

        if self.channel.state().is_open() {
            self.lifecycle = LifecycleState::Validated;
            return Ok(());
        }

        let (inbound_tx, inbound_rx) = inbound_channel();
        let timeout = self.config.open_timeout_duration();
        match tokio::time::timeout(timeout, self.channel.open(inbound_tx)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(url = %self.channel.endpoint(), error = %e, "Channel failed to open");
                return Err(e.into());
            }
            Err(_) => {
                warn!(
                    url = %self.channel.endpoint(),
                    timeout = ?timeout,
                    state = %self.channel.state(),
                    "Channel did not open in time"
                );
                return Err(ConnectorError::Connection {
                    url: self.channel.endpoint().to_string(),
                    reason: format!("channel did not open within {timeout:?}"),
                });
            }
        }

        self.pump = Some(tokio::spawn(
            pump_inbound(inbound_rx, Arc::clone(&self.sink)).instrument(self.span.clone()),
        ));
        self.lifecycle = LifecycleState::Validated;

        info!(url = %self.channel.endpoint(), "Connector validated");
        Ok(())
    }

    /// Assigns the session identity.
    ///
    /// Uses the configured fixed user id, or a fresh UUID.
    #[tracing::instrument(name = "start", skip_all, parent = &self.span)]
    pub async fn start(&mut self) -> ConnectorResult<()> {
        debug!("Start called");

        match self.lifecycle {
            LifecycleState::Validated | LifecycleState::Stopped => {}
            state => return Err(ConnectorError::invalid_state("start", state)),
        }

        let user_id = self
            .config
            .user_id()
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        info!(user = %user_id, "Session started");
        self.user_id = Some(user_id);
        self.lifecycle = LifecycleState::Started;
        Ok(())
    }

    /// Sends a user message to the bot.
    ///
    /// Over a WebSocket this returns once the frame is queued; replies arrive
    /// at the sink later. Over the webhook it waits for the response and hands
    /// any replies to the sink before returning.
    #[tracing::instrument(name = "user_says", skip_all, parent = &self.span)]
    pub async fn user_says(&self, message: impl Into<OutboundMessage>) -> ConnectorResult<()> {
        let message = message.into();

        let user = match self.user_id.as_deref() {
            Some(user) if self.lifecycle.has_session() => user,
            _ => {
                return Err(ConnectorError::invalid_state(
                    "send a message",
                    self.lifecycle,
                ));
            }
        };
        debug!(user = %user, text = %message.text, "UserSays called");

        let payload = to_wire(&message, user, self.channel.kind());
        match self.channel.send(payload).await? {
            Delivery::Queued => trace!("Message queued on channel"),
            Delivery::Replied(replies) => {
                for reply in replies {
                    debug!(body = %reply, "Got response body");
                    let reply = from_wire(reply).inspect_err(|e| {
                        error!(error = %e, "Cannot translate webhook reply");
                    })?;
                    self.sink.bot_says(Ok(reply));
                }
            }
        }

        Ok(())
    }

    /// Clears the session identity. The channel stays open.
    #[tracing::instrument(name = "stop", skip_all, parent = &self.span)]
    pub async fn stop(&mut self) -> ConnectorResult<()> {
        debug!("Stop called");

        match self.lifecycle {
            LifecycleState::Started => {
                info!(user = ?self.user_id, "Session stopped");
                self.user_id = None;
                self.lifecycle = LifecycleState::Stopped;
                Ok(())
            }
            LifecycleState::Stopped => Ok(()),
            state => Err(ConnectorError::invalid_state("stop", state)),
        }
    }

    /// Closes the channel and releases everything.
    ///
    /// Safe to call in any state, and more than once.
    #[tracing::instrument(name = "clean", skip_all, parent = &self.span)]
    pub async fn clean(&mut self) -> ConnectorResult<()> {
        debug!("Clean called");

        if self.lifecycle == LifecycleState::Cleaned {
            return Ok(());
        }

        let closed = if self.channel.state().needs_close() {
            self.channel.close().await
        } else {
            Ok(())
        };

        if let Some(mut pump) = self.pump.take()
            && tokio::time::timeout(PUMP_DRAIN_TIMEOUT, &mut pump)
                .await
                .is_err()
        {
            warn!("Inbound pump did not finish, aborting");
            pump.abort();
        }

        self.user_id = None;
        self.lifecycle = LifecycleState::Cleaned;
        info!(state = %self.channel.state(), "Connector cleaned");

        closed.map_err(Into::into)
    }
}

/// Forwards pushed payloads to the sink until the channel drops its sender.
async fn pump_inbound(mut inbound: InboundReceiver, sink: BoxedSink) {
    while let Some(event) = inbound.recv().await {
        match event {
            InboundEvent::Payload(payload) => {
                if !is_message_frame(&payload) {
                    trace!(kind = ?payload.get("type"), "Ignoring non-message payload");
                    continue;
                }
                let reply = from_wire(payload);
                if let Err(e) = &reply {
                    error!(error = %e, "Cannot translate bot message");
                }
                sink.bot_says(reply);
            }
            InboundEvent::Malformed { reason, raw } => {
                error!(reason = %reason, "Error parsing incoming message, message must be JSON");
                sink.bot_says(Err(ConnectorError::MalformedPayload { reason, raw }));
            }
            InboundEvent::Disconnected { reason } => {
                warn!(reason = %reason, "Bot connection ended");
            }
        }
    }
    trace!("Inbound pump finished");
}
