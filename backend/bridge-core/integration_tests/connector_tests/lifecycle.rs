use crate::connector_tests::helpers::{
    MockPeer, Recorder, STEP_TIMEOUT, TEST_AUTH_TOKEN, connect_and_authenticate, test_config,
    test_connector,
};

use bridge_core::{ConnectOutcome, Phase};

use std::time::Duration;

/// **VALUE**: Verifies the opening handshake: authenticate first, announce after acceptance.
///
/// **WHY THIS MATTERS**: The companion app ignores a module that announces before it
/// authenticates. The token and identity in the first frame are how it decides to trust us.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Announce being sent before the auth reply
/// - The token missing from the authenticate payload
/// - `authenticated` firing before the announce went out
#[tokio::test]
async fn given_peer_when_connecting_then_authenticates_then_announces() {
    // GIVEN: A peer and a connector pointed at it
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);

    // WHEN: Connecting
    let (outcome, mut conn) = tokio::join!(connector.connect(), peer.accept());
    assert_eq!(outcome.expect("connect"), ConnectOutcome::Opened);

    // THEN: First frame is authenticate with token and identity
    let auth = conn.recv_event().await;
    assert_eq!(auth["type"], "module:authenticate");
    assert_eq!(auth["data"]["token"], TEST_AUTH_TOKEN);
    assert_eq!(auth["data"]["identity"]["kind"], "plugin");
    assert_eq!(auth["data"]["identity"]["plugin"]["id"], "openclaw-bridge");
    assert_eq!(auth["data"]["identity"]["id"], connector.identity().id);
    assert_eq!(auth["source"]["id"], connector.identity().id);

    // WHEN: The peer accepts
    conn.send_event("module:authenticated", serde_json::json!({ "authenticated": true }))
        .await;

    // THEN: Announce follows and authenticated fires once
    let announce = conn.recv_event().await;
    assert_eq!(announce["type"], "module:announce");
    assert_eq!(announce["data"]["name"], "OpenClaw Bridge");
    recorder.wait_for("authenticated", 1).await;
    assert_eq!(recorder.count("authenticated"), 1);
    assert_eq!(recorder.names()[0], "connected");

    let status = connector.status().await.expect("status");
    assert!(status.connected);
    assert!(status.authenticated);
    assert_eq!(status.phase, Phase::Authenticated);
    assert_eq!(status.url, peer.url);
}

/// **VALUE**: Verifies a second connect while connected does not open another socket.
///
/// **WHY THIS MATTERS**: Callers reconnect on every "start" click. Two sockets with the
/// same identity make the peer deliver every reply twice.
///
/// **BUG THIS CATCHES**: Would catch `connect` dialing again without checking the phase.
#[tokio::test]
async fn given_connected_when_connecting_again_then_no_second_socket() {
    // GIVEN: An authenticated connector
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let _conn = connect_and_authenticate(&connector, &peer, &recorder).await;

    // WHEN: Connecting again
    let outcome = connector.connect().await.expect("connect");

    // THEN: No-op, no new socket reaches the peer
    assert_eq!(outcome, ConnectOutcome::AlreadyConnected);
    assert!(
        !peer.accepts_within(Duration::from_millis(200)).await,
        "A second socket was opened"
    );
    assert_eq!(recorder.count("connected"), 1);
}

/// **VALUE**: Verifies two connects racing while the first is still dialing open one socket.
///
/// **BUG THIS CATCHES**: Would catch the phase only being set once the socket opens,
/// leaving a window where a second connect dials again.
#[tokio::test]
async fn given_connecting_when_connect_called_again_then_single_socket() {
    // GIVEN: A peer and a connector
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));

    // WHEN: Two connects race with the accept
    let (first, second, _conn) =
        tokio::join!(connector.connect(), connector.connect(), peer.accept());

    // THEN: One opened, the other saw it in flight, no second socket
    let mut outcomes = vec![first.expect("first"), second.expect("second")];
    outcomes.sort_by_key(|o| *o != ConnectOutcome::Opened);
    assert_eq!(outcomes[0], ConnectOutcome::Opened);
    assert_ne!(outcomes[1], ConnectOutcome::Opened);
    assert!(!peer.accepts_within(Duration::from_millis(200)).await);
    assert!(connector.status().await.expect("status").connected);
}

/// **VALUE**: Verifies a rejected credential is reported and sends keep queuing.
///
/// **WHY THIS MATTERS**: With a bad token nothing should reach the peer as chat; the
/// caller needs `auth_failed` to tell the user to fix the token.
///
/// **BUG THIS CATCHES**: Would catch treating any `module:authenticated` as success.
#[tokio::test]
async fn given_bad_token_when_peer_rejects_then_auth_failed_and_sends_queue() {
    // GIVEN: A connected but not yet authenticated connector
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let (outcome, mut conn) = tokio::join!(connector.connect(), peer.accept());
    outcome.expect("connect");
    conn.recv_type("module:authenticate").await;

    // WHEN: The peer rejects
    conn.send_event(
        "module:authenticated",
        serde_json::json!({ "authenticated": false, "message": "bad token" }),
    )
    .await;
    recorder.wait_for("auth_failed", 1).await;

    // THEN: Not authenticated, sends are queued
    assert_eq!(recorder.payloads("auth_failed")[0]["message"], "bad token");
    assert_eq!(recorder.count("authenticated"), 0);
    let status = connector.status().await.expect("status");
    assert!(status.connected);
    assert!(!status.authenticated);

    let outcome = connector
        .send_message("hello", Default::default())
        .await
        .expect("send");
    assert!(outcome.is_queued());
}

/// **VALUE**: Verifies disconnect is idempotent and silent afterwards.
///
/// **WHY THIS MATTERS**: Shutdown paths call disconnect from several places. A second
/// call must not panic, and a socket that finishes closing later must not emit.
///
/// **BUG THIS CATCHES**: Would catch:
/// - `disconnected` emitted twice
/// - The peer's close echo being reported as a new drop and triggering a reconnect
#[tokio::test]
async fn given_connected_when_disconnecting_twice_then_single_disconnected() {
    // GIVEN: An authenticated connector
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let mut conn = connect_and_authenticate(&connector, &peer, &recorder).await;

    // WHEN: Disconnecting twice
    connector.disconnect().await;
    connector.disconnect().await;

    // THEN: Socket closed, one disconnected, no reconnect
    assert!(conn.is_closed_within(STEP_TIMEOUT).await);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(recorder.count("disconnected"), 1);
    assert_eq!(recorder.count("reconnecting"), 0);
    assert!(!peer.accepts_within(Duration::from_millis(200)).await);

    let status = connector.status().await.expect("status");
    assert_eq!(status.phase, Phase::Disconnected);
    assert!(!status.connected);
}

/// **VALUE**: Verifies disconnect on a connector that never connected is a no-op.
#[tokio::test]
async fn given_never_connected_when_disconnecting_then_nothing_emitted() {
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);

    connector.disconnect().await;

    assert!(recorder.names().is_empty());
    assert_eq!(
        connector.status().await.expect("status").phase,
        Phase::Disconnected
    );
}

/// **VALUE**: Verifies the bridge answers a peer ping with a pong.
///
/// **WHY THIS MATTERS**: The peer drops modules that stop answering pings.
///
/// **BUG THIS CATCHES**: Would catch inbound pings being emitted but never answered.
#[tokio::test]
async fn given_peer_ping_when_received_then_pong_sent_and_heartbeat_emitted() {
    // GIVEN: An authenticated connector
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let mut conn = connect_and_authenticate(&connector, &peer, &recorder).await;

    // WHEN: The peer pings
    conn.send_event(
        "transport:connection:heartbeat",
        serde_json::json!({ "kind": "ping" }),
    )
    .await;

    // THEN: A pong comes back and the heartbeat is surfaced
    let pong = conn.recv_type("transport:connection:heartbeat").await;
    assert_eq!(pong["data"]["kind"], "pong");
    recorder.wait_for("heartbeat", 1).await;
}

/// **VALUE**: Verifies the bridge pings on its own at the configured interval.
///
/// **BUG THIS CATCHES**: Would catch the heartbeat timer never being started.
#[tokio::test]
async fn given_short_heartbeat_when_idle_then_ping_sent() {
    // GIVEN: A 50ms heartbeat
    let peer = MockPeer::start().await;
    let mut config = test_config(&peer.url);
    config.airi.connection.heartbeat_interval = 50;
    let connector = test_connector(config);
    let recorder = Recorder::attach(&connector);
    let mut conn = connect_and_authenticate(&connector, &peer, &recorder).await;

    // WHEN/THEN: A ping arrives without any traffic
    let ping = conn.recv_type("transport:connection:heartbeat").await;
    assert_eq!(ping["data"]["kind"], "ping");
}

/// **VALUE**: Verifies dropping the last handle closes the socket.
///
/// **BUG THIS CATCHES**: Would catch the state machine task outliving every handle and
/// keeping the socket open forever.
#[tokio::test]
async fn given_connected_when_last_handle_dropped_then_socket_closed() {
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let mut conn = connect_and_authenticate(&connector, &peer, &recorder).await;

    drop(connector);

    assert!(conn.is_closed_within(STEP_TIMEOUT).await);
}
