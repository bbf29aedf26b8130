use crate::identity::Identity;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

const USER_ROLE: &str = "user";
const CONFIG_SCHEMA_VERSION: u32 = 1;

// ============================================
// CALLER OPTIONS
// ============================================

/// Extras for a chat message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    /// Passed through as the event's `contexts` object.
    pub contexts: Map<String, Value>,
    /// `input.source`; the plugin id when unset.
    pub input_source: Option<String>,
}

/// Voice hints for a `speak:text` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeakOptions {
    pub emotion: Option<String>,
    pub speed: Option<f64>,
}

// ============================================
// OUTBOUND PAYLOADS
// ============================================

#[derive(Debug, Serialize)]
pub(crate) struct AuthenticateData<'a> {
    pub token: Option<&'a str>,
    pub identity: &'a Identity,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConfigSchemaRef {
    pub id: String,
    pub version: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct Provider {
    pub id: String,
    #[serde(rename = "type")]
    pub provider_type: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct Contributions {
    pub capabilities: Vec<&'static str>,
    pub providers: Vec<Provider>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnnounceData<'a> {
    pub identity: &'a Identity,
    pub name: &'a str,
    pub dependencies: Vec<String>,
    pub config_schema: ConfigSchemaRef,
    pub contributions: Contributions,
    pub possible_events: Vec<&'static str>,
}

impl<'a> AnnounceData<'a> {
    pub fn for_identity(identity: &'a Identity) -> Self {
        let plugin_id = identity.plugin_id().unwrap_or(identity.id.as_str());
        let name = identity
            .plugin
            .as_ref()
            .map(|p| p.labels.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(plugin_id);

        Self {
            identity,
            name,
            dependencies: Vec::new(),
            config_schema: ConfigSchemaRef {
                id: format!("{plugin_id}.config"),
                version: CONFIG_SCHEMA_VERSION,
            },
            contributions: Contributions {
                capabilities: vec!["chat.send", "chat.receive", "speak.text"],
                providers: vec![Provider {
                    id: format!("{plugin_id}-chat"),
                    provider_type: "chat-source",
                }],
            },
            possible_events: vec![super::types::CHAT, super::types::SPEAK],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatInput {
    pub source: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatData {
    pub message: ChatMessage,
    pub contexts: Map<String, Value>,
    pub composed_message: Vec<ChatMessage>,
    pub input: ChatInput,
}

impl ChatData {
    pub(crate) fn user(text: &str, options: ChatOptions, default_source: &str) -> Self {
        let message = ChatMessage {
            role: USER_ROLE.to_string(),
            content: text.to_string(),
            id: format!("msg_{}", Uuid::new_v4().simple()),
        };

        Self {
            composed_message: vec![message.clone()],
            message,
            contexts: options.contexts,
            input: ChatInput {
                source: options
                    .input_source
                    .unwrap_or_else(|| default_source.to_string()),
                timestamp: epoch_millis(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakData {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl SpeakData {
    pub(crate) fn new(text: &str, options: SpeakOptions) -> Self {
        Self {
            text: text.to_string(),
            emotion: options.emotion,
            speed: options.speed,
        }
    }
}

// ============================================
// INBOUND / SHARED PAYLOADS
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthResult {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatKind {
    Ping,
    Pong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatData {
    pub kind: HeartbeatKind,
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
