//! Console Example
//!
//! Talk to a Botkit bot from the terminal. Each stdin line is sent as a user
//! message and bot replies are printed as they arrive. A line holding a JSON
//! object is sent as a structured message: its `text` field becomes the text
//! and the other fields are merged into the payload.
//!
//! Settings come from `BOTKIT_*` and `PARLEY_LOG_*` environment variables;
//! command line flags win over both.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package parley-console -- --server-url ws://localhost:3000 --socket
//! BOTKIT_SERVER_URL=http://localhost:3000 cargo run --package parley-console
//! ```

use anyhow::Result;
use clap::Parser;
use parley_adapter_botkit::{BotkitConnector, ConnectorConfig, ENV_ALIASES, ENV_PREFIX};
use parley_core::{InboundMessage, LifecycleState, OutboundMessage, QueueSink};
use parley_runtime::config::{ConfigLoader, LogLevel, load_logging_config};
use parley_runtime::logging;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "parley-console", version, about)]
struct Args {
    /// Base URL of the Botkit server
    #[arg(long)]
    server_url: Option<String>,

    /// Use the WebSocket transport instead of the webhook
    #[arg(long)]
    socket: bool,

    /// Fixed session user id
    #[arg(long)]
    user_id: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut log_config = load_logging_config()?;
    if let Some(level) = args.log_level {
        log_config.level = level;
    }
    logging::init_from_config(&log_config);

    let mut loader = ConfigLoader::<ConnectorConfig>::new()
        .env_prefix(ENV_PREFIX)
        .env_aliases(ENV_ALIASES);
    if let Some(url) = &args.server_url {
        loader = loader.set("server_url", url);
    }
    if args.socket {
        loader = loader.set("use_socket_transport", true);
    }
    if let Some(user_id) = &args.user_id {
        loader = loader.set("fixed_user_id", user_id);
    }
    let config = loader.load()?;

    let (sink, mut replies) = QueueSink::new();
    let mut connector = BotkitConnector::new(config, sink)?;

    let printer = tokio::spawn(async move {
        while let Some(reply) = replies.recv().await {
            match reply {
                Ok(message) => print_reply(&message),
                Err(e) => error!(error = %e, "Unreadable bot reply"),
            }
        }
    });

    let session = run_session(&mut connector).await;

    if connector.lifecycle() == LifecycleState::Started {
        connector.stop().await?;
    }
    connector.clean().await?;
    drop(connector);
    let _ = printer.await;

    session
}

async fn run_session(connector: &mut BotkitConnector) -> Result<()> {
    connector.validate().await?;
    connector.start().await?;
    info!(
        user = connector.user_id().unwrap_or_default(),
        transport = %connector.transport(),
        "Session ready, type a message"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Err(e) = connector.user_says(parse_line(line)).await {
                    error!(error = %e, "Message not delivered");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    Ok(())
}

fn parse_line(line: &str) -> OutboundMessage {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(mut fields)) => {
            let text = match fields.remove("text") {
                Some(Value::String(text)) => text,
                _ => String::new(),
            };
            OutboundMessage::new(text).with_payload(fields)
        }
        _ => OutboundMessage::new(line),
    }
}

fn print_reply(reply: &InboundMessage) {
    println!("bot> {}", reply.text_or_empty());
    for button in reply.buttons.iter().flatten() {
        println!("     [{}] {}", button.text, button.payload);
    }
    for media in reply.media.iter().flatten() {
        println!("     media: {}", media.media_uri);
    }
}
