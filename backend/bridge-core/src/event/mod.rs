//! Event envelope and the payloads carried inside it.
//!
//! Every frame on the socket is one [`Envelope`]: a namespaced `type`
//! (`domain:action`), a per-event `id`, an RFC 3339 `timestamp`, the sender's
//! [`Identity`] and a `data` payload whose shape depends on `type`.

pub mod codec;
pub mod payload;

pub use codec::{EventCodec, Frame};
pub use payload::{ChatOptions, HeartbeatKind, SpeakOptions};

use crate::identity::Identity;

use std::time::SystemTime;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Event types on the wire.
pub mod types {
    pub const AUTHENTICATE: &str = "module:authenticate";
    pub const AUTHENTICATED: &str = "module:authenticated";
    pub const ANNOUNCE: &str = "module:announce";
    pub const CHAT: &str = "gen-ai:chat";
    pub const CHAT_MESSAGE: &str = "output:gen-ai:chat:message";
    pub const CHAT_COMPLETE: &str = "output:gen-ai:chat:complete";
    pub const HEARTBEAT: &str = "transport:connection:heartbeat";
    pub const SPEAK: &str = "speak:text";
    pub const ERROR: &str = "error";
}

/// Names the connector emits through the [`EventDispatcher`](crate::EventDispatcher).
///
/// Inbound types without a mapping here are emitted under their own type name.
pub mod notifications {
    pub const CONNECTED: &str = "connected";
    pub const AUTHENTICATED: &str = "authenticated";
    pub const AUTH_FAILED: &str = "auth_failed";
    pub const MESSAGE: &str = "message";
    pub const COMPLETE: &str = "complete";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const ERROR: &str = "error";
    pub const DISCONNECTED: &str = "disconnected";
    pub const RECONNECTING: &str = "reconnecting";
    pub const RECONNECT_EXHAUSTED: &str = "reconnect_exhausted";
}

/// How envelopes are laid out inside a text frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// The envelope object itself.
    #[default]
    Json,
    /// The envelope under a top-level `json` key, as superjson emits it.
    SuperJson,
}

/// One event on the wire. Immutable once built.
///
/// Only `type` is required inbound. Peers disagree on how they stamp `id`,
/// `timestamp` and `source`, so those decode leniently and never reject a
/// frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default, deserialize_with = "lenient_text")]
    id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    timestamp: String,
    #[serde(
        default,
        deserialize_with = "lenient_source",
        skip_serializing_if = "Option::is_none"
    )]
    source: Option<Identity>,
    #[serde(default)]
    data: Value,
}

impl Envelope {
    /// New outbound envelope with a fresh id and the current time.
    pub fn new(event_type: impl Into<String>, source: &Identity, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            id: Uuid::new_v4().to_string(),
            timestamp: humantime::format_rfc3339_millis(SystemTime::now()).to_string(),
            source: Some(source.clone()),
            data,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn source(&self) -> Option<&Identity> {
        self.source.as_ref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }
}

/// Strings pass through, numbers are rendered, anything else is empty.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    })
}

/// A source that is not a recognizable identity is treated as absent.
fn lenient_source<'de, D>(deserializer: D) -> Result<Option<Identity>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
