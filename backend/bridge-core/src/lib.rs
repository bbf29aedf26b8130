//! Client-side bridge to an AIRI companion app over WebSocket.
//!
//! [`Connector`] owns one connection: it authenticates, announces itself as a
//! plugin, queues requests until the peer accepts it, keeps the link alive
//! with heartbeats and reconnects with exponential backoff.

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod identity;
pub mod queue;

#[cfg(test)]
mod tests;

pub use config::BridgeConfig;
pub use connection::{
    ConnectOutcome, Connector, ConnectorStatus, Phase, ReconnectPolicy, SendOutcome,
};
pub use dispatcher::{EventDispatcher, Handler, HandlerResult, handler};
pub use event::{ChatOptions, Envelope, SpeakOptions, WireFormat};
pub use identity::Identity;

pub const AIRI_DEFAULT_HOST: &str = "localhost";
pub const AIRI_DEFAULT_PORT: u16 = 6121;
pub const AIRI_DEFAULT_URL: &str =
    const_format::concatcp!("ws://", AIRI_DEFAULT_HOST, ":", AIRI_DEFAULT_PORT, "/ws");
