//! Envelope decoding and subscriber fan-out.

use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use tracing::warn;

/// Reserved kind whose subscribers receive every decoded envelope.
pub const WILDCARD_KIND: &str = "all";

type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct RouterInner {
    next_id: u64,
    handlers: HashMap<String, Vec<(u64, Handler)>>,
}

/// Dispatches decoded `{type, data}` envelopes to registered subscribers.
///
/// Kind-specific subscribers run first, in insertion order, with the `data`
/// payload; [`WILDCARD_KIND`] subscribers then receive the full envelope.
/// Malformed frames are dropped and logged, never surfaced.
#[derive(Clone, Default)]
pub struct MessageRouter {
    inner: Arc<Mutex<RouterInner>>,
}

/// Capability to remove one registered subscriber.
///
/// Calling [`Subscription::cancel`] more than once is harmless.
pub struct Subscription {
    kind: String,
    id: u64,
    inner: Weak<Mutex<RouterInner>>,
}

impl Subscription {
    /// Remove exactly the callback this handle was returned for.
    pub fn cancel(&self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut inner = inner.lock().unwrap();
            if let Some(list) = inner.handlers.get_mut(&self.kind) {
                list.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

impl MessageRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for a message kind and return its cancel handle.
    pub fn subscribe<F>(&self, kind: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .handlers
            .entry(kind.to_owned())
            .or_default()
            .push((id, Arc::new(handler)));

        Subscription {
            kind: kind.to_owned(),
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Decode a raw frame and deliver it to subscribers.
    pub fn dispatch(&self, raw: &str) {
        let envelope: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                return;
            }
        };
        let Some(kind) = envelope.get("type").and_then(Value::as_str) else {
            warn!("Dropping frame without a type field");
            return;
        };
        let data = envelope.get("data").cloned().unwrap_or(Value::Null);

        // Snapshot the subscriber lists so callbacks run without the lock
        // held and may subscribe/cancel reentrantly.
        let (for_kind, for_all) = {
            let inner = self.inner.lock().unwrap();
            (
                snapshot_handlers(&inner, kind),
                snapshot_handlers(&inner, WILDCARD_KIND),
            )
        };

        for handler in &for_kind {
            invoke(handler, &data);
        }
        for handler in &for_all {
            invoke(handler, &envelope);
        }
    }
}

fn snapshot_handlers(inner: &RouterInner, kind: &str) -> Vec<Handler> {
    inner
        .handlers
        .get(kind)
        .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
        .unwrap_or_default()
}

/// Invoke one subscriber, isolating a panic so the rest still run.
fn invoke(handler: &Handler, payload: &Value) {
    if catch_unwind(AssertUnwindSafe(|| handler(payload))).is_err() {
        warn!("Subscriber panicked during dispatch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_subscriber(router: &MessageRouter, kind: &str) -> (Subscription, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let sub = router.subscribe(kind, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (sub, count)
    }

    #[test]
    fn test_dispatch_to_kind_and_wildcard() {
        let router = MessageRouter::new();
        let (_sub_update, updates) = counting_subscriber(&router, "update");
        let (_sub_all, all) = counting_subscriber(&router, WILDCARD_KIND);
        let (_sub_other, other) = counting_subscriber(&router, "status");

        router.dispatch(r#"{"type":"update","data":{"progress":0.5}}"#);

        assert_eq!(updates.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 1);
        assert_eq!(other.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_kind_subscribers_receive_data_payload() {
        let router = MessageRouter::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let _sub = router.subscribe("update", move |data| {
            *sink.lock().unwrap() = Some(data.clone());
        });

        router.dispatch(r#"{"type":"update","data":{"progress":0.5}}"#);

        let payload = seen.lock().unwrap().take().unwrap();
        assert_eq!(payload["progress"], 0.5);
        assert!(payload.get("type").is_none());
    }

    #[test]
    fn test_wildcard_receives_full_envelope() {
        let router = MessageRouter::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let _sub = router.subscribe(WILDCARD_KIND, move |envelope| {
            *sink.lock().unwrap() = Some(envelope.clone());
        });

        router.dispatch(r#"{"type":"error","message":"boom"}"#);

        let envelope = seen.lock().unwrap().take().unwrap();
        assert_eq!(envelope["type"], "error");
        assert_eq!(envelope["message"], "boom");
    }

    #[test]
    fn test_malformed_frames_are_dropped() {
        let router = MessageRouter::new();
        let (_sub, count) = counting_subscriber(&router, WILDCARD_KIND);

        router.dispatch("not json at all");
        router.dispatch(r#"{"data":{"progress":1.0}}"#);

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_is_exact_and_idempotent() {
        let router = MessageRouter::new();
        let (sub_a, count_a) = counting_subscriber(&router, "update");
        let (_sub_b, count_b) = counting_subscriber(&router, "update");

        sub_a.cancel();
        sub_a.cancel();
        router.dispatch(r#"{"type":"update","data":{}}"#);

        assert_eq!(count_a.load(Ordering::SeqCst), 0);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_the_next() {
        let router = MessageRouter::new();
        let _panicker = router.subscribe("update", |_| panic!("subscriber bug"));
        let (_sub, count) = counting_subscriber(&router, "update");

        router.dispatch(r#"{"type":"update","data":{}}"#);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_order_is_insertion_order() {
        let router = MessageRouter::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let subs: Vec<Subscription> = ["first", "second", "third"]
            .into_iter()
            .map(|label| {
                let log = order.clone();
                router.subscribe("update", move |_| log.lock().unwrap().push(label))
            })
            .collect();

        router.dispatch(r#"{"type":"update","data":{}}"#);

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
        drop(subs);
    }
}
