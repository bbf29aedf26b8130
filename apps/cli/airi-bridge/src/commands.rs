//! Subcommand implementations.
//!
//! Each command builds a fresh [`Connector`], does its work and disconnects.
//! Replies from the companion are printed to stdout; diagnostics go to the log.

use crate::cli::{Command, join_words};
use crate::error::CliError;

use bridge_core::config::BridgeConfig;
use bridge_core::event::notifications;
use bridge_core::{ChatOptions, Connector, SendOutcome, SpeakOptions, handler};

use std::time::Duration;

use log::{info, warn};
use serde_json::Value;

pub async fn run(command: Command, config: BridgeConfig) -> Result<(), CliError> {
    let connector = Connector::new(config)?;

    match command {
        Command::Connect => connect(&connector).await,
        Command::Status => status(&connector).await,
        Command::Say { words, wait_secs } => {
            let text = join_words(&words);
            send_and_wait(&connector, wait_secs, |c| async move {
                c.send_message(text, ChatOptions::default()).await
            })
            .await
        }
        Command::Speak {
            words,
            emotion,
            speed,
            wait_secs,
        } => {
            let text = join_words(&words);
            let options = SpeakOptions { emotion, speed };
            send_and_wait(&connector, wait_secs, |c| async move {
                c.speak(text, options).await
            })
            .await
        }
        Command::Disconnect => {
            connector.disconnect().await;
            println!("Disconnected");
            Ok(())
        }
    }
}

async fn connect(connector: &Connector) -> Result<(), CliError> {
    print_replies(connector);
    if let Err(e) = connector.connect().await {
        // Auto-reconnect keeps trying in the background
        warn!("Initial connect failed: {e}");
    }

    info!("Bridge running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    connector.disconnect().await;
    Ok(())
}

async fn status(connector: &Connector) -> Result<(), CliError> {
    let status = connector.status().await?;
    let rendered = serde_json::to_string_pretty(&status).map_err(|e| CliError::Bridge {
        message: format!("Failed to render status: {e}"),
        location: common::ErrorLocation::caller(),
    })?;
    println!("{rendered}");
    Ok(())
}

async fn send_and_wait<F, Fut>(connector: &Connector, wait_secs: u64, send: F) -> Result<(), CliError>
where
    F: FnOnce(Connector) -> Fut,
    Fut: Future<Output = Result<SendOutcome, bridge_core::error::ConnectionError>>,
{
    print_replies(connector);
    connector.connect().await?;

    match send(connector.clone()).await? {
        SendOutcome::Queued { queue_length } => {
            info!("Queued until authenticated ({queue_length} pending)")
        }
        SendOutcome::Sent { message_id } => info!("Sent {message_id}"),
    }

    tokio::time::sleep(Duration::from_secs(wait_secs)).await;

    let remaining = connector.status().await?.queue_length;
    if remaining > 0 {
        warn!("{remaining} requests were never delivered");
    }
    connector.disconnect().await;
    Ok(())
}

/// Notifications reported to the user while a command runs.
const REPORTED: [&str; 7] = [
    notifications::AUTHENTICATED,
    notifications::AUTH_FAILED,
    notifications::MESSAGE,
    notifications::ERROR,
    notifications::DISCONNECTED,
    notifications::RECONNECTING,
    notifications::RECONNECT_EXHAUSTED,
];

/// Print the companion's replies and connection changes as they arrive.
fn print_replies(connector: &Connector) {
    for event in REPORTED {
        connector.on(
            event,
            handler(move |payload| {
                match render_notification(event, payload) {
                    Some(line) if is_problem(event) => eprintln!("{line}"),
                    Some(line) => println!("{line}"),
                    None => {}
                }
                Ok(())
            }),
        );
    }
}

fn is_problem(event: &str) -> bool {
    matches!(
        event,
        notifications::AUTH_FAILED | notifications::ERROR | notifications::RECONNECT_EXHAUSTED
    )
}

/// User-facing line for a notification, or `None` when there is nothing to say.
pub fn render_notification(event: &str, payload: &Value) -> Option<String> {
    let text = |key: &str, fallback: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string()
    };

    match event {
        notifications::MESSAGE => payload
            .pointer("/message/content")
            .and_then(Value::as_str)
            .map(|content| format!("AIRI: {content}")),
        notifications::AUTHENTICATED => Some("Authenticated with AIRI".to_string()),
        notifications::AUTH_FAILED => Some(format!(
            "Authentication rejected: {}",
            text("message", "no reason given")
        )),
        notifications::ERROR => Some(format!("Error: {}", text("message", "unknown error"))),
        notifications::DISCONNECTED => Some("Disconnected from AIRI".to_string()),
        notifications::RECONNECTING => Some(format!(
            "Reconnecting in {}ms (attempt {})",
            payload["delayMs"], payload["attempt"]
        )),
        notifications::RECONNECT_EXHAUSTED => Some(format!(
            "Gave up reconnecting after {} attempts",
            payload["attempts"]
        )),
        _ => None,
    }
}
