use crate::event::{ChatOptions, SpeakOptions};
use crate::queue::{OutboundQueue, PendingRequest};

fn chat(text: &str) -> PendingRequest {
    PendingRequest::Chat {
        text: text.to_string(),
        options: ChatOptions::default(),
    }
}

/// **VALUE**: Verifies queued requests drain oldest first and leave the queue empty.
///
/// **WHY THIS MATTERS**: Users see replies in the order the peer received the
/// messages. Reordering on replay scrambles the conversation.
///
/// **BUG THIS CATCHES**: Would catch a LIFO drain or entries left behind after a drain.
#[test]
fn given_queued_requests_when_draining_then_fifo_and_empty() {
    // GIVEN: Three queued requests of mixed kinds
    let mut queue = OutboundQueue::new();
    assert_eq!(queue.enqueue(chat("a")), 1);
    assert_eq!(
        queue.enqueue(PendingRequest::Speak {
            text: "b".into(),
            options: SpeakOptions::default(),
        }),
        2
    );
    assert_eq!(queue.enqueue(chat("c")), 3);

    // WHEN: Draining
    let mut seen = Vec::new();
    let drained = queue.drain_into(|request| seen.push(request.text().to_string()));

    // THEN: Oldest first, nothing left
    assert_eq!(drained, 3);
    assert_eq!(seen, vec!["a", "b", "c"]);
    assert!(queue.is_empty());
}

/// **VALUE**: Verifies a second drain sends nothing.
///
/// **BUG THIS CATCHES**: Would catch a drain that copies instead of removing, which
/// would resend every queued message on the next authentication.
#[test]
fn given_drained_queue_when_draining_again_then_nothing_sent() {
    let mut queue = OutboundQueue::new();
    queue.enqueue(chat("once"));
    queue.drain_into(|_| {});

    let drained = queue.drain_into(|_| panic!("nothing should be replayed"));

    assert_eq!(drained, 0);
}

/// **VALUE**: Verifies clear reports how many requests were dropped.
#[test]
fn given_queued_requests_when_cleared_then_count_returned() {
    let mut queue = OutboundQueue::new();
    queue.enqueue(chat("x"));
    queue.enqueue(chat("y"));

    assert_eq!(queue.clear(), 2);
    assert_eq!(queue.len(), 0);
    assert_eq!(queue.clear(), 0);
}

/// **VALUE**: Verifies the caller-facing shape of a send result.
///
/// **WHY THIS MATTERS**: Scripts check `queued` to know whether the message left yet.
///
/// **BUG THIS CATCHES**: Would catch the enum serializing with serde's default
/// externally tagged layout.
#[test]
fn given_send_outcomes_when_serialized_then_flat_flags() {
    use crate::connection::SendOutcome;
    use serde_json::json;

    let queued = serde_json::to_value(SendOutcome::Queued { queue_length: 1 }).unwrap();
    let sent = serde_json::to_value(SendOutcome::Sent {
        message_id: "msg_1".into(),
    })
    .unwrap();

    assert_eq!(queued, json!({ "queued": true, "queueLength": 1 }));
    assert_eq!(sent, json!({ "sent": true, "messageId": "msg_1" }));
}
