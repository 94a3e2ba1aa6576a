//! Subscribers, watchers and batched notification.
//!
//! Subscribers register a list of (pattern, handler) watchers plus an
//! optional ready callback. Subscriber lifecycle is decoupled from any UI
//! lifecycle: whoever subscribed owns the teardown via `unsubscribe`.

use crate::{ChangeEvent, EventKind, Pattern, StateTree};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

/// Payload delivered to a watcher handler.
///
/// `element` is the affected element for element-scoped events; it is
/// `None` for record and whole-state events, and for deletions, where the
/// value no longer exists. `state` is the full current tree as a read-only
/// view.
pub struct Notification<'a> {
    /// The change that matched the watcher's pattern.
    pub event: &'a ChangeEvent,
    /// The affected element, when it still exists.
    pub element: Option<&'a Value>,
    /// The full current tree.
    pub state: &'a StateTree,
}

type WatchHandler = Box<dyn Fn(&Notification<'_>) + Send + Sync>;
type ReadyHandler = Box<dyn Fn(&StateTree) + Send + Sync>;

/// A (pattern, handler) pair registered by a subscriber.
pub struct Watcher {
    pattern: Pattern,
    handler: WatchHandler,
}

impl Watcher {
    /// Create a watcher.
    pub fn new(pattern: Pattern, handler: impl Fn(&Notification<'_>) + Send + Sync + 'static) -> Self {
        Self {
            pattern,
            handler: Box::new(handler),
        }
    }

    /// The pattern this watcher fires on.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }
}

/// A subscriber: a watcher list and an optional ready callback.
///
/// # Examples
///
/// ```
/// use reactive_store::{Pattern, Subscriber};
///
/// let subscriber = Subscriber::new()
///     .on_ready(|_state| { /* initial render */ })
///     .watch(Pattern::scope("people"), |notification| {
///         let _ = notification.element;
///     });
/// ```
#[derive(Default)]
pub struct Subscriber {
    watchers: Vec<Watcher>,
    on_ready: Option<ReadyHandler>,
}

impl Subscriber {
    /// Create a subscriber with no watchers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a watcher (builder).
    pub fn watch(
        mut self,
        pattern: Pattern,
        handler: impl Fn(&Notification<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.watchers.push(Watcher::new(pattern, handler));
        self
    }

    /// Set the initial-state callback, fired exactly once (builder).
    pub fn on_ready(mut self, handler: impl Fn(&StateTree) + Send + Sync + 'static) -> Self {
        self.on_ready = Some(Box::new(handler));
        self
    }

    /// The registered watchers.
    pub fn watchers(&self) -> &[Watcher] {
        &self.watchers
    }
}

/// Per-subscriber watcher lists and batch notification.
#[derive(Default)]
pub struct WatcherRegistry {
    subscribers: IndexMap<String, Subscriber>,
}

impl WatcherRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber under an id, replacing any earlier one.
    pub fn subscribe(&mut self, id: impl Into<String>, subscriber: Subscriber) {
        self.subscribers.insert(id.into(), subscriber);
    }

    /// Remove a subscriber. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        self.subscribers.shift_remove(id).is_some()
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether no subscribers are registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver one change batch.
    ///
    /// For each event, every watcher whose pattern the event satisfies
    /// fires once. A watcher matching two distinct elements in the same
    /// batch therefore fires twice, once per element. All handler calls
    /// complete before this returns; call order across subscribers is
    /// unspecified.
    pub fn notify(&self, batch: &[ChangeEvent], state: &StateTree) {
        for event in batch {
            let element = match &event.element_id {
                Some(id) if event.kind != EventKind::Deleted => state.element(&event.scope, id),
                _ => None,
            };
            let notification = Notification {
                event,
                element,
                state,
            };
            for (id, subscriber) in &self.subscribers {
                for watcher in &subscriber.watchers {
                    if watcher.pattern.matches(event) {
                        trace!(subscriber = %id, event = %event, "firing watcher");
                        (watcher.handler)(&notification);
                    }
                }
            }
        }
    }

    /// Deliver the ready notification to every subscriber, regardless of
    /// watcher list.
    pub fn notify_ready(&self, state: &StateTree) {
        for subscriber in self.subscribers.values() {
            if let Some(on_ready) = &subscriber.on_ready {
                on_ready(state);
            }
        }
    }

    /// Deliver the ready notification to one subscriber (used when a
    /// subscriber registers after the initial state was loaded).
    pub(crate) fn ready_one(&self, id: &str, state: &StateTree) {
        if let Some(subscriber) = self.subscribers.get(id) {
            if let Some(on_ready) = &subscriber.on_ready {
                on_ready(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Id;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn tree() -> StateTree {
        StateTree::from_value(json!({
            "people": [
                {"id": 1, "name": "Carlos", "bitten": true},
                {"id": 2, "name": "Amaia", "bitten": true},
            ],
        }))
        .unwrap()
    }

    #[test]
    fn scope_watcher_fires_once_per_distinct_element() {
        let state = tree();
        let fired = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&fired);

        let mut registry = WatcherRegistry::new();
        registry.subscribe(
            "list",
            Subscriber::new().watch(Pattern::scope("people"), move |n| {
                log.lock().unwrap().push(n.event.to_string());
            }),
        );

        let batch = vec![
            ChangeEvent::updated("people", Id::from(1)),
            ChangeEvent::updated("people", Id::from(2)),
        ];
        registry.notify(&batch, &state);

        let fired = fired.lock().unwrap();
        assert_eq!(*fired, vec!["people[1]:updated", "people[2]:updated"]);
    }

    #[test]
    fn element_payload_carries_current_value() {
        let state = tree();
        let bitten = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&bitten);

        let mut registry = WatcherRegistry::new();
        registry.subscribe(
            "person",
            Subscriber::new().watch(Pattern::element("people", 2), move |n| {
                *seen.lock().unwrap() = n.element.map(|e| e["bitten"].clone());
            }),
        );

        registry.notify(&[ChangeEvent::updated("people", Id::from(2))], &state);
        assert_eq!(*bitten.lock().unwrap(), Some(json!(true)));
    }

    #[test]
    fn deletion_payload_has_no_element() {
        let state = tree();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&calls);

        let mut registry = WatcherRegistry::new();
        registry.subscribe(
            "attr",
            Subscriber::new().watch(Pattern::attribute("people", 3, "bitten"), move |n| {
                log.lock().unwrap().push((n.event.kind, n.element.is_none()));
            }),
        );

        // Element 3 no longer exists in the tree.
        registry.notify(&[ChangeEvent::deleted("people", Id::from(3))], &state);
        assert_eq!(*calls.lock().unwrap(), vec![(EventKind::Deleted, true)]);
    }

    #[test]
    fn unsubscribed_handlers_stop_firing() {
        let state = tree();
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);

        let mut registry = WatcherRegistry::new();
        registry.subscribe(
            "list",
            Subscriber::new().watch(Pattern::scope("people"), move |_| {
                *counter.lock().unwrap() += 1;
            }),
        );

        let batch = vec![ChangeEvent::updated("people", Id::from(1))];
        registry.notify(&batch, &state);
        assert!(registry.unsubscribe("list"));
        assert!(!registry.unsubscribe("list"));
        registry.notify(&batch, &state);

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn ready_reaches_every_subscriber_even_without_watchers() {
        let state = tree();
        let ready = Arc::new(Mutex::new(Vec::new()));

        let mut registry = WatcherRegistry::new();
        for name in ["a", "b"] {
            let log = Arc::clone(&ready);
            registry.subscribe(
                name,
                Subscriber::new().on_ready(move |_| log.lock().unwrap().push(name)),
            );
        }
        registry.subscribe("no-ready", Subscriber::new());

        registry.notify_ready(&state);
        assert_eq!(*ready.lock().unwrap(), vec!["a", "b"]);
    }
}
