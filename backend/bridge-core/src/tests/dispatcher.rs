use crate::dispatcher::{DispatchReport, EventDispatcher, handler};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::{Value, json};

/// **VALUE**: Verifies every handler for an event runs, in registration order.
///
/// **BUG THIS CATCHES**: Would catch handlers being stored in a set or map that loses order.
#[test]
fn given_multiple_handlers_when_emitting_then_called_in_registration_order() {
    // GIVEN: Three handlers recording their position
    let dispatcher = EventDispatcher::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    for n in 0..3 {
        let calls = Arc::clone(&calls);
        dispatcher.on(
            "message",
            handler(move |_| {
                calls.lock().unwrap().push(n);
                Ok(())
            }),
        );
    }

    // WHEN: Emitting once
    let report = dispatcher.emit("message", &json!({}));

    // THEN: All ran in order
    assert_eq!(*calls.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(report, DispatchReport { delivered: 3, failed: 0 });
}

/// **VALUE**: Verifies a failing or panicking handler does not stop the others.
///
/// **WHY THIS MATTERS**: Handlers are caller code. One buggy subscriber must not take
/// down the connection task or starve the other subscribers.
///
/// **BUG THIS CATCHES**: Would catch a missing `catch_unwind` or an early return on error.
#[test]
fn given_faulty_handlers_when_emitting_then_remaining_handlers_still_run() {
    // GIVEN: An erroring handler, a panicking handler and a good one
    let dispatcher = EventDispatcher::new();
    let good_calls = Arc::new(AtomicUsize::new(0));

    dispatcher.on("error", handler(|_| Err("handler refused".into())));
    dispatcher.on("error", handler(|_| panic!("handler exploded")));
    let counter = Arc::clone(&good_calls);
    dispatcher.on(
        "error",
        handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    );

    // WHEN: Emitting
    let report = dispatcher.emit("error", &json!({ "message": "x" }));

    // THEN: The good handler ran and the failures were counted
    assert_eq!(good_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.delivered, 1);
}

/// **VALUE**: Verifies registering the same handler twice delivers once.
///
/// **BUG THIS CATCHES**: Would catch duplicate deliveries when a caller re-registers on
/// every reconnect.
#[test]
fn given_same_handler_twice_when_registering_then_delivered_once() {
    let dispatcher = EventDispatcher::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let h = handler(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    assert!(dispatcher.on("connected", Arc::clone(&h)));
    assert!(!dispatcher.on("connected", Arc::clone(&h)));

    dispatcher.emit("connected", &Value::Null);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.handler_count("connected"), 1);
}

/// **VALUE**: Verifies `off` removes exactly the given handler.
///
/// **BUG THIS CATCHES**: Would catch `off` clearing every handler for the event.
#[test]
fn given_registered_handlers_when_removing_one_then_other_remains() {
    let dispatcher = EventDispatcher::new();
    let keep = handler(|_| Ok(()));
    let remove = handler(|_| Ok(()));
    dispatcher.on("complete", Arc::clone(&keep));
    dispatcher.on("complete", Arc::clone(&remove));

    assert!(dispatcher.off("complete", &remove));
    assert!(!dispatcher.off("complete", &remove), "Second removal is a no-op");
    assert!(!dispatcher.off("unknown", &keep));

    assert_eq!(dispatcher.handler_count("complete"), 1);
    assert_eq!(dispatcher.emit("complete", &Value::Null).delivered, 1);
}

/// **VALUE**: Verifies a handler may register another handler without deadlocking.
///
/// **BUG THIS CATCHES**: Would catch emit holding the lock while calling handlers.
#[test]
fn given_handler_that_registers_when_emitting_then_no_deadlock() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let inner = Arc::clone(&dispatcher);
    dispatcher.on(
        "authenticated",
        handler(move |_| {
            inner.on("message", handler(|_| Ok(())));
            Ok(())
        }),
    );

    let report = dispatcher.emit("authenticated", &Value::Null);

    assert_eq!(report.delivered, 1);
    assert_eq!(dispatcher.handler_count("message"), 1);
}

/// **VALUE**: Verifies emitting an event nobody listens to is a no-op.
#[test]
fn given_no_handlers_when_emitting_then_empty_report() {
    let dispatcher = EventDispatcher::new();

    assert_eq!(dispatcher.emit("heartbeat", &Value::Null), DispatchReport::default());
}
