//! Fan-out of connector notifications to caller-registered handlers.
//!
//! Handlers are keyed by notification name. Delivery is synchronous and in
//! registration order. A handler that returns an error or panics is logged
//! and skipped; the remaining handlers for that emission still run and the
//! emitter never sees the failure.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use log::{trace, warn};
use serde_json::Value;

pub type HandlerResult = Result<(), Box<dyn StdError + Send + Sync>>;

/// A registered callback. Identity is the `Arc` allocation: registering a
/// clone of the same `Handler` twice delivers once, and `off` needs that
/// same `Arc` back.
pub type Handler = Arc<dyn Fn(&Value) -> HandlerResult + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Outcome of one [`EventDispatcher::emit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<HashMap<String, Vec<Handler>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`. Returns false if it was already registered.
    pub fn on(&self, event: &str, handler: Handler) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let entry = handlers.entry(event.to_string()).or_default();

        if entry.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            trace!("Handler already registered for '{event}'");
            return false;
        }

        entry.push(handler);
        true
    }

    /// Remove `handler` from `event`. Returns false if it was not registered.
    pub fn off(&self, event: &str, handler: &Handler) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = handlers.get_mut(event) else {
            return false;
        };

        let before = entry.len();
        entry.retain(|h| !Arc::ptr_eq(h, handler));
        let removed = entry.len() != before;

        if entry.is_empty() {
            handlers.remove(event);
        }
        removed
    }

    /// Deliver `payload` to every handler registered for `event`.
    ///
    /// The handler list is snapshotted before delivery, so handlers may
    /// register or remove handlers without deadlocking; such changes apply
    /// from the next emission.
    pub fn emit(&self, event: &str, payload: &Value) -> DispatchReport {
        let snapshot: Vec<Handler> = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            match handlers.get(event) {
                Some(entry) => entry.clone(),
                None => return DispatchReport::default(),
            }
        };

        let mut report = DispatchReport::default();
        for (index, handler) in snapshot.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!("Handler #{index} for '{event}' failed: {e}");
                    report.failed += 1;
                }
                Err(panic) => {
                    warn!(
                        "Handler #{index} for '{event}' panicked: {}",
                        panic_message(panic.as_ref())
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&str, usize> =
            handlers.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        f.debug_struct("EventDispatcher").field("handlers", &counts).finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
