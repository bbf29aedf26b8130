use crate::config::IdentityConfig;
use crate::event::payload::{AnnounceData, ChatData};
use crate::event::ChatOptions;
use crate::identity::{Identity, IdentityKind};

use serde_json::{Value, json};

/// **VALUE**: Verifies the configured plugin identity serializes the way the peer expects.
///
/// **WHY THIS MATTERS**: The peer keys modules by `plugin.id` and shows `labels.name` in
/// its UI. A field rename breaks registration.
///
/// **BUG THIS CATCHES**: Would catch casing changes on `kind` or a missing `labels` object.
#[test]
fn given_identity_config_when_building_identity_then_plugin_fields_serialize() {
    // GIVEN/WHEN: Identity from default config
    let identity = Identity::from_config(&IdentityConfig::default());
    let value = serde_json::to_value(&identity).expect("serializes");

    // THEN: Plugin shape
    assert_eq!(identity.kind, IdentityKind::Plugin);
    assert_eq!(value["kind"], "plugin");
    assert_eq!(value["plugin"]["id"], "openclaw-bridge");
    assert_eq!(value["plugin"]["version"], "1.0.0");
    assert_eq!(value["plugin"]["labels"]["name"], "OpenClaw Bridge");
    assert!(identity.id.starts_with("openclaw-bridge-"));
}

/// **VALUE**: Verifies instance ids are unique per identity.
///
/// **BUG THIS CATCHES**: Would catch the random suffix being dropped, which makes two
/// bridges started together indistinguishable.
#[test]
fn given_two_identities_when_created_together_then_ids_differ() {
    let a = Identity::client("bridge");
    let b = Identity::client("bridge");

    assert_ne!(a.id, b.id);
    assert_eq!(a.id.split('-').count(), 3, "prefix-time-random: {}", a.id);
    assert!(a.plugin.is_none());
    assert_eq!(a.plugin_id(), None);
}

/// **VALUE**: Verifies unknown peer identity kinds still deserialize.
///
/// **BUG THIS CATCHES**: Would catch a peer sending `"kind":"server"` failing the whole frame.
#[test]
fn given_unknown_kind_when_deserializing_then_other() {
    let identity: Identity =
        serde_json::from_value(json!({ "kind": "server", "id": "x" })).expect("deserializes");

    assert_eq!(identity.kind, IdentityKind::Other);
}

/// **VALUE**: Verifies the announce payload advertises chat and speak.
///
/// **WHY THIS MATTERS**: The peer only routes to modules whose announce lists the
/// matching capability and event.
///
/// **BUG THIS CATCHES**: Would catch a schema id or provider id losing the plugin prefix.
#[test]
fn given_plugin_identity_when_announcing_then_capabilities_listed() {
    let identity = Identity::from_config(&IdentityConfig::default());

    let value = serde_json::to_value(AnnounceData::for_identity(&identity)).expect("serializes");

    assert_eq!(value["name"], "OpenClaw Bridge");
    assert_eq!(value["configSchema"]["id"], "openclaw-bridge.config");
    assert_eq!(value["configSchema"]["version"], 1);
    assert_eq!(value["dependencies"], json!([]));
    assert_eq!(
        value["contributions"]["capabilities"],
        json!(["chat.send", "chat.receive", "speak.text"])
    );
    assert_eq!(value["contributions"]["providers"][0]["id"], "openclaw-bridge-chat");
    assert_eq!(value["contributions"]["providers"][0]["type"], "chat-source");
    assert_eq!(value["possibleEvents"], json!(["gen-ai:chat", "speak:text"]));
}

/// **VALUE**: Verifies the chat payload shape: message, composed history, contexts, input.
///
/// **BUG THIS CATCHES**: Would catch `composedMessage` losing camelCase or the input
/// source ignoring the caller's override.
#[test]
fn given_chat_options_when_building_chat_payload_then_fields_populated() {
    // GIVEN: Options with a context and an explicit source
    let mut contexts = serde_json::Map::new();
    contexts.insert("channel".into(), json!("discord"));
    let options = ChatOptions {
        contexts,
        input_source: Some("discord-bot".into()),
    };

    // WHEN: Building the payload
    let data = ChatData::user("hello", options, "openclaw-bridge");
    let value = serde_json::to_value(&data).expect("serializes");

    // THEN: Shape matches
    assert_eq!(value["message"]["role"], "user");
    assert_eq!(value["message"]["content"], "hello");
    assert!(data.message.id.starts_with("msg_"));
    assert_eq!(value["composedMessage"][0], value["message"]);
    assert_eq!(value["contexts"]["channel"], "discord");
    assert_eq!(value["input"]["source"], "discord-bot");
    assert!(value["input"]["timestamp"].as_u64().is_some_and(|t| t > 0));

    // AND: Without an override the default source is used
    let data = ChatData::user("x", ChatOptions::default(), "openclaw-bridge");
    assert_eq!(data.input.source, "openclaw-bridge");
    assert_eq!(serde_json::to_value(&data).unwrap()["contexts"], Value::Object(Default::default()));
}
