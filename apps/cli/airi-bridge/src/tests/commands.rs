// Unit tests for what the CLI prints while connected

use crate::commands::render_notification;

use bridge_core::event::notifications;

use serde_json::{Value, json};

/// **VALUE**: Verifies connection changes are reported, not only chat replies.
///
/// **WHY THIS MATTERS**: With a peer that keeps dropping the socket, `connect` is the
/// only window the user has. If it stays silent they cannot tell a quiet companion
/// from a dead link.
///
/// **BUG THIS CATCHES**: Would catch `authenticated`, `error` or `disconnected` having
/// no user-facing line.
#[test]
fn given_connection_changes_when_rendering_then_each_has_a_line() {
    // GIVEN: The notifications a flapping peer produces
    let cases = [
        (notifications::AUTHENTICATED, json!({ "authenticated": true }), "Authenticated"),
        (notifications::ERROR, json!({ "message": "socket reset" }), "socket reset"),
        (notifications::DISCONNECTED, Value::Null, "Disconnected"),
        (
            notifications::RECONNECTING,
            json!({ "attempt": 2, "delayMs": 2000 }),
            "attempt 2",
        ),
    ];

    for (event, payload, expected) in cases {
        // WHEN: Rendering
        let line = render_notification(event, &payload);

        // THEN: A line mentioning the change
        let line = line.unwrap_or_else(|| panic!("{event} should be reported"));
        assert!(line.contains(expected), "{event}: {line}");
    }
}

/// **VALUE**: Verifies chat replies and failures render with their details.
///
/// **BUG THIS CATCHES**: Would catch the reply content or rejection reason being lost.
#[test]
fn given_reply_and_failures_when_rendering_then_details_shown() {
    let reply = render_notification(
        notifications::MESSAGE,
        &json!({ "message": { "content": "hello back" } }),
    );
    let rejected = render_notification(notifications::AUTH_FAILED, &json!({}));
    let exhausted = render_notification(notifications::RECONNECT_EXHAUSTED, &json!({ "attempts": 3 }));

    assert_eq!(reply.as_deref(), Some("AIRI: hello back"));
    assert_eq!(
        rejected.as_deref(),
        Some("Authentication rejected: no reason given")
    );
    assert!(exhausted.is_some_and(|line| line.contains('3')));
}

/// **VALUE**: Verifies events with nothing to show stay quiet.
#[test]
fn given_reply_without_content_or_unknown_event_when_rendering_then_nothing() {
    assert!(render_notification(notifications::MESSAGE, &json!({})).is_none());
    assert!(render_notification(notifications::HEARTBEAT, &json!({ "kind": "ping" })).is_none());
    assert!(render_notification("custom:event", &Value::Null).is_none());
}
