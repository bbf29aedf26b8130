use crate::event::{Envelope, EventCodec, Frame, WireFormat, types};
use crate::identity::{Identity, PluginInfo, PluginLabels};

use serde_json::{Value, json};

fn test_identity() -> Identity {
    Identity::client("codec-test")
}

/// **VALUE**: Verifies the plain JSON layout puts the envelope fields at the top level.
///
/// **WHY THIS MATTERS**: The companion app routes on `type` at the root of the frame.
/// If the envelope is nested or renamed, every event we send is ignored.
///
/// **BUG THIS CATCHES**: Would catch `event_type` serializing under its Rust name, or
/// the superjson wrapper being applied in JSON mode.
#[test]
fn given_json_format_when_encoding_then_envelope_is_top_level() {
    // GIVEN: A JSON codec and a chat envelope
    let codec = EventCodec::new(WireFormat::Json);
    let envelope = Envelope::new(types::CHAT, &test_identity(), json!({ "x": 1 }));

    // WHEN: Encoding
    let text = codec.encode(&envelope).expect("encode should succeed");

    // THEN: Root object carries type, id, timestamp, source and data
    let value: Value = serde_json::from_str(&text).expect("valid JSON");
    assert_eq!(value["type"], "gen-ai:chat");
    assert_eq!(value["id"], envelope.id());
    assert!(value["timestamp"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(value["source"]["kind"], "client");
    assert_eq!(value["data"]["x"], 1);
    assert!(value.get("json").is_none(), "JSON mode must not wrap");
}

/// **VALUE**: Verifies superjson mode wraps the envelope under a `json` key.
///
/// **WHY THIS MATTERS**: Some peer builds only parse superjson frames.
///
/// **BUG THIS CATCHES**: Would catch the format setting being ignored on encode.
#[test]
fn given_superjson_format_when_encoding_then_envelope_is_wrapped() {
    // GIVEN: A superjson codec
    let codec = EventCodec::new(WireFormat::SuperJson);
    let envelope = Envelope::new(types::SPEAK, &test_identity(), json!({ "text": "hi" }));

    // WHEN: Encoding
    let text = codec.encode(&envelope).expect("encode should succeed");

    // THEN: The envelope sits under "json"
    let value: Value = serde_json::from_str(&text).expect("valid JSON");
    assert_eq!(value["json"]["type"], "speak:text");
    assert_eq!(value["json"]["data"]["text"], "hi");
    assert!(value.get("type").is_none());
}

/// **VALUE**: Verifies inbound frames are accepted in either layout regardless of our format.
///
/// **WHY THIS MATTERS**: Peers answer in whatever layout they were built with. A bridge
/// that only understands its own outbound format silently drops auth replies.
///
/// **BUG THIS CATCHES**: Would catch decode being tied to the configured outbound format.
#[test]
fn given_either_layout_when_decoding_then_both_yield_same_event() {
    // GIVEN: A JSON codec and the same event in both layouts
    let codec = EventCodec::new(WireFormat::Json);
    let plain = r#"{"type":"module:authenticated","data":{"authenticated":true}}"#;
    let wrapped = r#"{"json":{"type":"module:authenticated","data":{"authenticated":true}}}"#;

    // WHEN: Decoding both
    let plain = codec.decode(plain).expect("plain decodes");
    let wrapped = codec.decode(wrapped).expect("wrapped decodes");

    // THEN: Both are the same event
    let (Frame::Event(a), Frame::Event(b)) = (plain, wrapped) else {
        panic!("Expected two events");
    };
    assert_eq!(a.event_type(), types::AUTHENTICATED);
    assert_eq!(a, b);
    assert_eq!(a.data()["authenticated"], true);
}

/// **VALUE**: Verifies blank frames and `{}` are treated as keep-alives.
///
/// **WHY THIS MATTERS**: The peer pings idle sockets with empty objects. Treating them as
/// malformed would fill the log with warnings every few seconds.
///
/// **BUG THIS CATCHES**: Would catch `{}` reaching envelope parsing and failing on `type`.
#[test]
fn given_empty_frames_when_decoding_then_keep_alive() {
    let codec = EventCodec::default();

    assert_eq!(codec.decode("").expect("blank"), Frame::KeepAlive);
    assert_eq!(codec.decode("   \n").expect("whitespace"), Frame::KeepAlive);
    assert_eq!(codec.decode("{}").expect("empty object"), Frame::KeepAlive);
    assert_eq!(codec.decode_bytes(b"{}").expect("binary"), Frame::KeepAlive);
}

/// **VALUE**: Verifies malformed input is a decode error rather than a panic or an event.
///
/// **WHY THIS MATTERS**: The state machine logs decode errors and keeps the socket open.
/// Anything else (panic, bogus event) would tear down or confuse the connection.
///
/// **BUG THIS CATCHES**: Would catch arrays, scalars or type-less objects slipping through.
#[test]
fn given_malformed_frames_when_decoding_then_decode_error() {
    let codec = EventCodec::default();

    for frame in ["not json", "[1,2]", "42", r#"{"data":{}}"#, r#"{"json":5}"#] {
        let error = codec.decode(frame).expect_err(frame);
        assert!(error.is_decode(), "{frame} should be a decode error");
    }

    let error = codec
        .decode_bytes(&[0xff, 0xfe, 0x00])
        .expect_err("invalid UTF-8");
    assert!(error.to_string().contains("UTF-8"));
}

/// **VALUE**: Verifies decoding tolerates a minimal envelope with only `type`.
///
/// **BUG THIS CATCHES**: Would catch `id`/`timestamp`/`data` losing their serde defaults.
#[test]
fn given_minimal_envelope_when_decoding_then_defaults_fill_in() {
    let codec = EventCodec::default();

    let frame = codec
        .decode(r#"{"type":"output:gen-ai:chat:complete"}"#)
        .expect("decodes");

    let Frame::Event(envelope) = frame else {
        panic!("Expected an event");
    };
    assert_eq!(envelope.event_type(), types::CHAT_COMPLETE);
    assert_eq!(envelope.id(), "");
    assert!(envelope.source().is_none());
    assert_eq!(envelope.data(), &Value::Null);
}

/// **VALUE**: Verifies new envelopes get unique ids and an RFC 3339 timestamp.
///
/// **BUG THIS CATCHES**: Would catch a constant id or a non-ISO timestamp format.
#[test]
fn given_two_envelopes_when_created_then_ids_differ_and_timestamp_is_rfc3339() {
    let identity = test_identity();

    let a = Envelope::new(types::HEARTBEAT, &identity, Value::Null);
    let b = Envelope::new(types::HEARTBEAT, &identity, Value::Null);

    assert_ne!(a.id(), b.id());
    assert!(
        humantime::parse_rfc3339(a.timestamp()).is_ok(),
        "timestamp {} should be RFC 3339",
        a.timestamp()
    );
    assert_eq!(a.source(), Some(&identity));
}

/// **VALUE**: Verifies an envelope survives encode then decode unchanged in both layouts.
///
/// **WHY THIS MATTERS**: Chat payloads nest contexts, arrays and nulls. Anything lost on
/// the way through the codec reaches the peer as a different message.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Nulls or empty arrays being dropped from `data`
/// - The plugin descriptor in `source` losing its labels or version
/// - The superjson wrapper not being removed on decode
#[test]
fn given_nested_envelope_when_round_tripping_then_identical() {
    // GIVEN: A plugin source and a deeply nested payload
    let source = Identity::plugin(PluginInfo {
        id: "round-trip".to_string(),
        version: Some("1.2.3".to_string()),
        labels: PluginLabels {
            name: "Round Trip".to_string(),
            description: Some("codec check".to_string()),
        },
    });
    let data = json!({
        "message": { "role": "user", "content": "hi", "tags": ["a", "b", []] },
        "contexts": { "nested": { "deeper": [1, 2.5, { "none": null }] } },
        "empty": {},
        "missing": null,
        "flag": false
    });
    let envelope = Envelope::new(types::CHAT, &source, data);

    for format in [WireFormat::Json, WireFormat::SuperJson] {
        let codec = EventCodec::new(format);

        // WHEN: Encoding and decoding again
        let text = codec.encode(&envelope).expect("encode should succeed");
        let decoded = codec.decode(&text).expect("decode should succeed");

        // THEN: The same envelope comes back
        assert_eq!(decoded, Frame::Event(envelope.clone()), "{format:?}");
    }
}

/// **VALUE**: Verifies peers that stamp envelopes differently are still understood.
///
/// **WHY THIS MATTERS**: Some peer builds send numeric ids and timestamps or a bare
/// string as `source`. Dropping those frames would lose the auth reply, so the bridge
/// would never authenticate and the queue would never drain.
///
/// **BUG THIS CATCHES**: Would catch `id`, `timestamp` or `source` being decoded
/// strictly and rejecting an otherwise valid event.
#[test]
fn given_loosely_stamped_frames_when_decoding_then_event_is_kept() {
    let codec = EventCodec::default();
    let frames = [
        (
            r#"{"type":"module:authenticated","id":1,"timestamp":1700000000000,"data":{"authenticated":true}}"#,
            "1",
            "1700000000000",
        ),
        (
            r#"{"type":"module:authenticated","id":null,"timestamp":null,"data":{"authenticated":true}}"#,
            "",
            "",
        ),
        (
            r#"{"type":"module:authenticated","id":"a","source":{"id":"server-runtime"},"data":{"authenticated":true}}"#,
            "a",
            "",
        ),
        (
            r#"{"type":"module:authenticated","id":"b","source":"server","data":{"authenticated":true}}"#,
            "b",
            "",
        ),
    ];

    for (frame, id, timestamp) in frames {
        // WHEN: Decoding
        let decoded = codec.decode(frame).expect(frame);

        // THEN: The event survives with its data intact
        let Frame::Event(envelope) = decoded else {
            panic!("Expected an event for {frame}");
        };
        assert_eq!(envelope.event_type(), types::AUTHENTICATED);
        assert_eq!(envelope.data()["authenticated"], true);
        assert_eq!(envelope.id(), id);
        assert_eq!(envelope.timestamp(), timestamp);
        assert!(envelope.source().is_none(), "{frame}");
    }
}
