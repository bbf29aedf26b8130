use crate::connector_tests::helpers::{
    MockPeer, Recorder, connect_and_authenticate, test_config, test_connector, unreachable_url,
};

use bridge_core::{ChatOptions, Phase};

use std::time::Duration;

/// **VALUE**: Verifies a dropped socket is reported and re-established automatically.
///
/// **WHY THIS MATTERS**: The companion app restarts on updates. The bridge has to come
/// back on its own and re-authenticate without the caller doing anything.
///
/// **BUG THIS CATCHES**: Would catch:
/// - No reconnect after a peer-initiated close
/// - The new socket skipping authentication
/// - The attempt counter not resetting after success
#[tokio::test]
async fn given_authenticated_when_peer_closes_then_reconnects_and_reauthenticates() {
    // GIVEN: An authenticated connector
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let conn = connect_and_authenticate(&connector, &peer, &recorder).await;

    // WHEN: The peer closes the socket
    conn.close().await;

    // THEN: disconnected, reconnecting, then a fresh authenticated session
    let mut conn = peer.accept().await;
    let auth = conn.recv_type("module:authenticate").await;
    assert_eq!(auth["data"]["identity"]["id"], connector.identity().id);
    conn.send_event(
        "module:authenticated",
        serde_json::json!({ "authenticated": true }),
    )
    .await;
    recorder.wait_for("authenticated", 2).await;

    assert_eq!(recorder.count("disconnected"), 1);
    let names = recorder.names();
    let dropped = names.iter().position(|n| n == "disconnected").expect("disconnected");
    let retry = names.iter().position(|n| n == "reconnecting").expect("reconnecting");
    assert!(dropped < retry, "State resets before the retry is scheduled: {names:?}");
    let reconnecting = recorder.payloads("reconnecting");
    assert_eq!(reconnecting[0]["attempt"], 1);
    assert_eq!(reconnecting[0]["delayMs"], 20);

    let status = connector.status().await.expect("status");
    assert_eq!(status.phase, Phase::Authenticated);
    assert_eq!(status.reconnect_attempts, 0);
}

/// **VALUE**: Verifies requests queued while the socket is down replay after reconnecting.
///
/// **BUG THIS CATCHES**: Would catch the queue being cleared on an unplanned drop.
#[tokio::test]
async fn given_dropped_socket_when_sending_then_replayed_after_reconnect() {
    // GIVEN: A connector whose socket the peer just closed
    let peer = MockPeer::start().await;
    let connector = test_connector(test_config(&peer.url));
    let recorder = Recorder::attach(&connector);
    let conn = connect_and_authenticate(&connector, &peer, &recorder).await;
    conn.close().await;
    recorder.wait_for("disconnected", 1).await;

    // WHEN: Sending while down
    let outcome = connector
        .send_message("while down", ChatOptions::default())
        .await
        .expect("send");
    assert!(outcome.is_queued());

    // THEN: Delivered once the new socket authenticates
    let mut conn = peer.accept().await;
    conn.authenticate().await;
    assert_eq!(conn.recv_event().await["type"], "module:announce");
    let chat = conn.recv_event().await;
    assert_eq!(chat["data"]["message"]["content"], "while down");
}

/// **VALUE**: Verifies the retry ceiling stops reconnecting and says so.
///
/// **WHY THIS MATTERS**: With a ceiling configured, the caller expects a definitive
/// "gave up" signal instead of silence.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Retrying past the ceiling
/// - `reconnect_exhausted` never being emitted
/// - The initial connect failure not being returned to the caller
#[tokio::test]
async fn given_unreachable_peer_when_retries_run_out_then_reconnect_exhausted() {
    // GIVEN: Nothing listening and a ceiling of 2
    let mut config = test_config(&unreachable_url().await);
    config.airi.connection.max_reconnect_attempts = 2;
    let connector = test_connector(config);
    let recorder = Recorder::attach(&connector);

    // WHEN: Connecting
    let result = connector.connect().await;

    // THEN: The caller sees the failure, then two retries and a give-up
    assert!(result.is_err(), "Connect to nothing should fail");
    recorder.wait_for("reconnect_exhausted", 1).await;

    assert_eq!(recorder.count("reconnecting"), 2);
    assert_eq!(recorder.count("disconnected"), 3);
    assert_eq!(recorder.count("error"), 3);
    assert_eq!(recorder.payloads("reconnect_exhausted")[0]["attempts"], 2);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(recorder.count("reconnecting"), 2, "No retries after giving up");
    let status = connector.status().await.expect("status");
    assert_eq!(status.phase, Phase::Disconnected);
    assert_eq!(status.reconnect_attempts, 2);
}

/// **VALUE**: Verifies disconnect during a pending reconnect cancels it.
///
/// **BUG THIS CATCHES**: Would catch the reconnect timer firing after disconnect and
/// quietly opening a new socket.
#[tokio::test]
async fn given_pending_reconnect_when_disconnecting_then_no_new_socket() {
    // GIVEN: A long reconnect delay pending after a drop
    let peer = MockPeer::start().await;
    let connector = bridge_core::Connector::with_policy(
        test_config(&peer.url),
        bridge_core::ReconnectPolicy::default()
            .with_delays(Duration::from_millis(300), Duration::from_millis(300)),
    )
    .expect("valid config");
    let recorder = Recorder::attach(&connector);
    let conn = connect_and_authenticate(&connector, &peer, &recorder).await;
    conn.close().await;
    recorder.wait_for("reconnecting", 1).await;

    // WHEN: Disconnecting before the timer fires
    connector.disconnect().await;

    // THEN: No socket is opened and nothing more is emitted
    let seen = recorder.names().len();
    assert!(!peer.accepts_within(Duration::from_millis(600)).await);
    assert_eq!(recorder.names().len(), seen);
    assert_eq!(
        connector.status().await.expect("status").phase,
        Phase::Disconnected
    );
}

/// **VALUE**: Verifies auto-reconnect can be turned off.
#[tokio::test]
async fn given_auto_reconnect_off_when_peer_closes_then_stays_disconnected() {
    let peer = MockPeer::start().await;
    let mut config = test_config(&peer.url);
    config.airi.connection.auto_reconnect = false;
    let connector = test_connector(config);
    let recorder = Recorder::attach(&connector);
    let conn = connect_and_authenticate(&connector, &peer, &recorder).await;

    conn.close().await;
    recorder.wait_for("disconnected", 1).await;

    assert!(!peer.accepts_within(Duration::from_millis(200)).await);
    assert_eq!(recorder.count("reconnecting"), 0);
}
