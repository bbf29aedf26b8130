use crate::connector_tests::helpers::{
    MockPeer, Recorder, connect_and_authenticate, test_config, test_connector,
};

use bridge_core::{ChatOptions, SendOutcome, SpeakOptions, WireFormat, handler};

use serde_json::json;

/// **VALUE**: Verifies sends before authentication queue and replay in order afterwards.
///
/// **WHY THIS MATTERS**: Callers fire messages as soon as they create the connector.
/// Losing or reordering them scrambles the start of every conversation.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Queued requests sent before the announce
/// - Replay in LIFO order
/// - Queue length not reported to the caller
#[tokio::test]
async fn given_unauthenticated_when_sending_then_queued_and_replayed_in_order() {
    // GIVEN: A connected connector whose auth reply has not arrived
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let (outcome, mut conn) = tokio::join!(connector.connect(), peer.accept());
    outcome.expect("connect");
    conn.recv_type("module:authenticate").await;

    // WHEN: Sending two messages
    let first = connector
        .send_message("first", ChatOptions::default())
        .await
        .expect("send");
    let second = connector
        .send_message("second", ChatOptions::default())
        .await
        .expect("send");

    // THEN: Both queued with growing length
    assert_eq!(first, SendOutcome::Queued { queue_length: 1 });
    assert_eq!(second, SendOutcome::Queued { queue_length: 2 });
    assert_eq!(connector.status().await.expect("status").queue_length, 2);

    // WHEN: The peer accepts
    conn.send_event("module:authenticated", json!({ "authenticated": true }))
        .await;

    // THEN: Announce, then the queued chats in order
    assert_eq!(conn.recv_event().await["type"], "module:announce");
    let a = conn.recv_event().await;
    let b = conn.recv_event().await;
    assert_eq!(a["type"], "gen-ai:chat");
    assert_eq!(a["data"]["message"]["content"], "first");
    assert_eq!(b["data"]["message"]["content"], "second");

    recorder.wait_for("authenticated", 1).await;
    assert_eq!(connector.status().await.expect("status").queue_length, 0);
}

/// **VALUE**: Verifies an auth reply stamped with numeric id and timestamp still authenticates.
///
/// **WHY THIS MATTERS**: If the reply were discarded the bridge would sit unauthenticated
/// forever and every queued message would stay stuck.
///
/// **BUG THIS CATCHES**: Would catch envelope metadata being decoded strictly.
#[tokio::test]
async fn given_numeric_stamped_auth_reply_when_received_then_queue_drains() {
    // GIVEN: A connected connector with one queued message
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let (outcome, mut conn) = tokio::join!(connector.connect(), peer.accept());
    outcome.expect("connect");
    conn.recv_type("module:authenticate").await;
    let queued = connector
        .send_message("stuck?", ChatOptions::default())
        .await
        .expect("send");
    assert!(queued.is_queued());

    // WHEN: The peer accepts with a numeric id and timestamp and a bare source
    conn.send(json!({
        "type": "module:authenticated",
        "id": 7,
        "timestamp": 1_700_000_000_000u64,
        "source": "server",
        "data": { "authenticated": true },
    }))
    .await;

    // THEN: Authenticated, announced and the queued chat delivered
    assert_eq!(conn.recv_event().await["type"], "module:announce");
    let chat = conn.recv_event().await;
    assert_eq!(chat["data"]["message"]["content"], "stuck?");
    recorder.wait_for("authenticated", 1).await;
    assert_eq!(connector.status().await.expect("status").queue_length, 0);
}

/// **VALUE**: Verifies an authenticated send goes out immediately with the chat payload.
///
/// **BUG THIS CATCHES**: Would catch the returned message id not matching the one on
/// the wire, or contexts being dropped.
#[tokio::test]
async fn given_authenticated_when_sending_then_chat_payload_sent() {
    // GIVEN: An authenticated connector
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let mut conn = connect_and_authenticate(&connector, &peer, &recorder).await;
    assert_eq!(conn.recv_event().await["type"], "module:announce");

    // WHEN: Sending with a context
    let mut contexts = serde_json::Map::new();
    contexts.insert("channel".into(), json!("telegram"));
    let outcome = connector
        .send_message(
            "Hello AIRI",
            ChatOptions {
                contexts,
                input_source: None,
            },
        )
        .await
        .expect("send");

    // THEN: Sent, and the wire carries the same id
    let message_id = outcome.message_id().expect("sent, not queued").to_string();
    let chat = conn.recv_event().await;
    assert_eq!(chat["type"], "gen-ai:chat");
    assert_eq!(chat["data"]["message"]["id"], message_id);
    assert_eq!(chat["data"]["message"]["role"], "user");
    assert_eq!(chat["data"]["contexts"]["channel"], "telegram");
    assert_eq!(chat["data"]["input"]["source"], "openclaw-bridge");
}

/// **VALUE**: Verifies speak requests carry text and voice hints.
///
/// **BUG THIS CATCHES**: Would catch unset hints serializing as `null`.
#[tokio::test]
async fn given_authenticated_when_speaking_then_speak_event_sent() {
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let mut conn = connect_and_authenticate(&connector, &peer, &recorder).await;
    conn.recv_type("module:announce").await;

    let outcome = connector
        .speak(
            "Good morning",
            SpeakOptions {
                emotion: Some("happy".into()),
                speed: None,
            },
        )
        .await
        .expect("speak");

    let speak = conn.recv_event().await;
    assert_eq!(speak["type"], "speak:text");
    assert_eq!(speak["id"], outcome.message_id().expect("sent"));
    assert_eq!(speak["data"]["text"], "Good morning");
    assert_eq!(speak["data"]["emotion"], "happy");
    assert!(speak["data"].get("speed").is_none());
}

/// **VALUE**: Verifies peer output events reach `message` and `complete` handlers.
///
/// **WHY THIS MATTERS**: This is how callers see the companion's replies.
///
/// **BUG THIS CATCHES**: Would catch the output types being emitted under their raw names.
#[tokio::test]
async fn given_peer_reply_when_received_then_message_and_complete_emitted() {
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let mut conn = connect_and_authenticate(&connector, &peer, &recorder).await;

    conn.send_event(
        "output:gen-ai:chat:message",
        json!({ "message": { "role": "assistant", "content": "Hi there" } }),
    )
    .await;
    conn.send_event("output:gen-ai:chat:complete", json!({})).await;

    recorder.wait_for("complete", 1).await;
    assert_eq!(
        recorder.payloads("message")[0]["message"]["content"],
        "Hi there"
    );
}

/// **VALUE**: Verifies unknown inbound types are emitted under their own name and
/// malformed frames do not break the connection.
///
/// **BUG THIS CATCHES**: Would catch a decode failure closing the socket.
#[tokio::test]
async fn given_garbage_and_unknown_events_when_received_then_connection_survives() {
    // GIVEN: An authenticated connector with a handler for a custom event
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let custom = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = std::sync::Arc::clone(&custom);
    connector.on(
        "ui:configure",
        handler(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }),
    );
    let mut conn = connect_and_authenticate(&connector, &peer, &recorder).await;

    // WHEN: Garbage, a keep-alive, then a custom event
    conn.send(json!("not an envelope")).await;
    conn.send(json!({})).await;
    conn.send_event("ui:configure", json!({ "x": 1 })).await;
    conn.send_event("output:gen-ai:chat:complete", json!({})).await;

    // THEN: The custom handler ran and the socket is still up
    recorder.wait_for("complete", 1).await;
    assert_eq!(custom.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(connector.status().await.expect("status").authenticated);
    assert_eq!(recorder.count("disconnected"), 0);
}

/// **VALUE**: Verifies a panicking handler does not stop delivery or the connection.
///
/// **BUG THIS CATCHES**: Would catch a handler panic unwinding through the state
/// machine task and killing the connector.
#[tokio::test]
async fn given_panicking_handler_when_event_emitted_then_connector_keeps_running() {
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    connector.on("message", handler(|_| panic!("subscriber bug")));
    let recorder = Recorder::attach(&connector);
    let mut conn = connect_and_authenticate(&connector, &peer, &recorder).await;

    conn.send_event("output:gen-ai:chat:message", json!({ "message": {} }))
        .await;

    recorder.wait_for("message", 1).await;
    assert!(connector.status().await.expect("status").authenticated);
}

/// **VALUE**: Verifies superjson mode wraps outbound frames and still reads plain replies.
///
/// **BUG THIS CATCHES**: Would catch the wire format only applying to some events.
#[tokio::test]
async fn given_superjson_format_when_connecting_then_frames_wrapped() {
    // GIVEN: A connector in superjson mode
    let peer = MockPeer::start().await;
    let mut config = test_config(&peer.url);
    config.airi.connection.wire_format = WireFormat::SuperJson;
    let connector = test_connector(config);
    let recorder = Recorder::attach(&connector);

    // WHEN: Connecting
    let (outcome, mut conn) = tokio::join!(connector.connect(), peer.accept());
    outcome.expect("connect");

    // THEN: Authenticate is wrapped, a plain reply still authenticates
    let auth = conn.recv().await;
    assert_eq!(auth["json"]["type"], "module:authenticate");
    conn.send_event("module:authenticated", json!({ "authenticated": true }))
        .await;
    recorder.wait_for("authenticated", 1).await;
    assert_eq!(conn.recv().await["json"]["type"], "module:announce");
}
