//! Long-lived connection to the companion app.
//!
//! [`Connector`] is the caller-facing handle. It is cheap to clone; all clones
//! talk to the same state machine task, which owns the socket and serializes
//! every request and socket event. The task is spawned on first use, so a
//! connector can be built outside a Tokio runtime as long as it is used
//! inside one.
//!
//! # Protocol
//!
//! 1. Open the socket, start the heartbeat, send `module:authenticate`
//! 2. On `module:authenticated {authenticated: true}`: send `module:announce`,
//!    emit `authenticated`, replay queued requests
//! 3. Exchange `gen-ai:chat` / `speak:text` and the peer's output events
//! 4. On socket loss: emit `disconnected`, reconnect with backoff if enabled

mod command;
mod heartbeat;
mod machine;
pub mod reconnect;
mod session;
pub(crate) mod state;

pub use reconnect::ReconnectPolicy;
pub use state::Phase;

use command::Command;
use machine::StateMachine;

use crate::config::BridgeConfig;
use crate::dispatcher::{EventDispatcher, Handler};
use crate::error::{ConfigError, ConnectionError};
use crate::event::{ChatOptions, SpeakOptions};
use crate::identity::Identity;
use crate::queue::PendingRequest;

use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tokio::sync::{mpsc, oneshot};

/// Result of [`Connector::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new socket opened. Authentication is still in flight.
    Opened,
    AlreadyConnecting,
    AlreadyConnected,
}

/// Result of a send request.
///
/// Serializes as `{"queued": true, "queueLength": n}` or
/// `{"sent": true, "messageId": id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Not yet authenticated; held until the peer accepts us.
    Queued { queue_length: usize },
    Sent { message_id: String },
}

impl SendOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, SendOutcome::Queued { .. })
    }

    pub fn message_id(&self) -> Option<&str> {
        match self {
            SendOutcome::Sent { message_id } => Some(message_id),
            SendOutcome::Queued { .. } => None,
        }
    }
}

impl Serialize for SendOutcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            SendOutcome::Queued { queue_length } => {
                map.serialize_entry("queued", &true)?;
                map.serialize_entry("queueLength", queue_length)?;
            }
            SendOutcome::Sent { message_id } => {
                map.serialize_entry("sent", &true)?;
                map.serialize_entry("messageId", message_id)?;
            }
        }
        map.end()
    }
}

/// Point-in-time view of the connector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorStatus {
    pub connected: bool,
    pub authenticated: bool,
    pub phase: Phase,
    pub url: String,
    pub identity: Identity,
    pub queue_length: usize,
    pub reconnect_attempts: u32,
}

struct ConnectorInner {
    commands: mpsc::UnboundedSender<Command>,
    /// Taken and spawned on first use.
    machine: Mutex<Option<(StateMachine, mpsc::UnboundedReceiver<Command>)>>,
    dispatcher: Arc<EventDispatcher>,
    identity: Identity,
    url: String,
}

impl Drop for ConnectorInner {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

/// Handle to one bridge connection.
#[derive(Clone)]
pub struct Connector {
    inner: Arc<ConnectorInner>,
}

impl Connector {
    /// Build a connector from a resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if `config` does not validate.
    pub fn new(config: BridgeConfig) -> Result<Self, ConfigError> {
        let policy = ReconnectPolicy::from_config(&config);
        Self::with_policy(config, policy)
    }

    /// Like [`Connector::new`] with an explicit reconnect policy.
    pub fn with_policy(config: BridgeConfig, policy: ReconnectPolicy) -> Result<Self, ConfigError> {
        config.validate()?;

        let identity = Identity::from_config(&config.identity);
        let dispatcher = Arc::new(EventDispatcher::new());
        let url = config.url().to_string();
        let (commands, inbox) = mpsc::unbounded_channel();

        let machine = StateMachine::new(
            config,
            identity.clone(),
            policy,
            Arc::clone(&dispatcher),
            commands.clone(),
        );

        Ok(Self {
            inner: Arc::new(ConnectorInner {
                commands,
                machine: Mutex::new(Some((machine, inbox))),
                dispatcher,
                identity,
                url,
            }),
        })
    }

    /// Open the socket and start authenticating.
    ///
    /// Resolves once the socket is open (or failed to open), not when
    /// authentication completes; watch for the `authenticated` notification.
    /// A call while already connecting or connected does nothing.
    pub async fn connect(&self) -> Result<ConnectOutcome, ConnectionError> {
        self.request(|reply| Command::Connect { reply }).await?
    }

    /// Close the socket, cancel all timers, drop queued requests and disable
    /// auto-reconnect. Safe to call in any state. Once this returns, no
    /// notification from the closed socket is delivered.
    pub async fn disconnect(&self) {
        if let Err(e) = self.request(|reply| Command::Disconnect { reply }).await {
            debug!("Disconnect on stopped connector: {e}");
        }
    }

    /// Send a chat message, or queue it if not yet authenticated.
    pub async fn send_message(
        &self,
        text: impl Into<String>,
        options: ChatOptions,
    ) -> Result<SendOutcome, ConnectionError> {
        let request = PendingRequest::Chat {
            text: text.into(),
            options,
        };
        self.request(|reply| Command::Send { request, reply }).await?
    }

    /// Ask the companion app to say `text` out loud (`speak:text`).
    pub async fn speak(
        &self,
        text: impl Into<String>,
        options: SpeakOptions,
    ) -> Result<SendOutcome, ConnectionError> {
        let request = PendingRequest::Speak {
            text: text.into(),
            options,
        };
        self.request(|reply| Command::Send { request, reply }).await?
    }

    pub async fn status(&self) -> Result<ConnectorStatus, ConnectionError> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Register a notification handler. Returns false if already registered.
    pub fn on(&self, event: &str, handler: Handler) -> bool {
        self.inner.dispatcher.on(event, handler)
    }

    /// Remove a notification handler. Returns false if it was not registered.
    pub fn off(&self, event: &str, handler: &Handler) -> bool {
        self.inner.dispatcher.off(event, handler)
    }

    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ConnectionError> {
        self.ensure_started();

        let (reply, response) = oneshot::channel();
        self.inner
            .commands
            .send(build(reply))
            .map_err(|_| ConnectionError::stopped())?;
        response.await.map_err(|_| ConnectionError::stopped())
    }

    fn ensure_started(&self) {
        let pending = self
            .inner
            .machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some((machine, inbox)) = pending {
            tokio::spawn(machine.run(inbox));
        }
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("url", &self.inner.url)
            .field("identity", &self.inner.identity.id)
            .finish()
    }
}
