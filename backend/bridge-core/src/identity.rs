//! Self-description presented to the peer.
//!
//! An [`Identity`] is built once per [`Connector`](crate::Connector) and never
//! changes afterwards. Its `id` combines the creation time with a random
//! suffix, so two bridges started in the same millisecond against the same
//! peer still tell themselves apart.

use crate::config::IdentityConfig;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const INSTANCE_SUFFIX_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Plugin,
    Client,
    /// Anything a peer reports that this bridge does not model.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginLabels {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub labels: PluginLabels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub kind: IdentityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginInfo>,
    #[serde(default)]
    pub id: String,
}

impl Identity {
    /// Plugin identity with a freshly generated instance id.
    pub fn plugin(plugin: PluginInfo) -> Self {
        let id = instance_id(&plugin.id);
        Self {
            kind: IdentityKind::Plugin,
            plugin: Some(plugin),
            id,
        }
    }

    /// Client identity (no plugin descriptor) with a generated instance id.
    pub fn client(prefix: &str) -> Self {
        Self {
            kind: IdentityKind::Client,
            plugin: None,
            id: instance_id(prefix),
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::plugin(PluginInfo {
            id: config.plugin_id.clone(),
            version: Some(config.version.clone()),
            labels: PluginLabels {
                name: config.name.clone(),
                description: config.description.clone(),
            },
        })
    }

    pub fn plugin_id(&self) -> Option<&str> {
        self.plugin.as_ref().map(|p| p.id.as_str())
    }
}

/// `<prefix>-<creation millis, hex>-<random>`.
pub(crate) fn instance_id(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let random = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{millis:x}-{}", &random[..INSTANCE_SUFFIX_LEN])
}
