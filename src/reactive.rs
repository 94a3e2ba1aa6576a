//! The reactive instance: store handle, dispatch and notification wiring.
//!
//! One `Reactive` is constructed per state tree and passed by reference to
//! every subscriber; there is no ambient global. It wires the store, the
//! mutation registry and the watcher registry together and is the only
//! place notification delivery happens.

use crate::{
    apply_updates, ChangeEvent, Id, KeyedCollection, Mutation, MutationRegistry, PlainRecord,
    StateStore, StateTree, StateUpdate, StoreError, StoreResult, Subscriber, WatcherRegistry,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// A reactive state instance.
///
/// Control flow: a subscriber calls [`dispatch`](Reactive::dispatch), the
/// registered handler prepares asynchronously, then mutates inside a write
/// window; closing the window queues a change batch; the dispatcher routes
/// each queued batch to the watchers whose patterns it satisfies.
pub struct Reactive {
    name: String,
    store: StateStore,
    mutations: MutationRegistry,
    watchers: WatcherRegistry,
}

impl Reactive {
    /// Create an instance with an empty, uninitialized store.
    ///
    /// The name is only used in log messages, to tell instances apart when
    /// several coexist.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: StateStore::new(),
            mutations: MutationRegistry::new(),
            watchers: WatcherRegistry::new(),
        }
    }

    /// The instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current tree, as a read-only view.
    pub fn state(&self) -> &StateTree {
        self.store.state()
    }

    /// Whether the write gate is currently closed.
    pub fn is_read_only(&self) -> bool {
        self.store.is_read_only()
    }

    /// Events accumulated in an open write window, for inspection.
    pub fn pending_changes(&self) -> &[ChangeEvent] {
        self.store.pending_changes()
    }

    /// Get a collection element by id.
    pub fn get(&self, scope: &str, id: impl Into<Id>) -> StoreResult<&Value> {
        self.store.get(scope, id)
    }

    /// Get the live collection under a root key.
    pub fn get_all(&self, scope: &str) -> StoreResult<&KeyedCollection> {
        self.store.get_all(scope)
    }

    /// Get the plain record under a root key.
    pub fn get_record(&self, scope: &str) -> StoreResult<&PlainRecord> {
        self.store.get_record(scope)
    }

    /// Load the initial state. Allowed exactly once per instance.
    ///
    /// Triggers the ready notification for every current subscriber,
    /// regardless of watcher list.
    pub fn set_initial_state(&mut self, value: Value) -> StoreResult<()> {
        self.store.set_initial_state(value)?;
        debug!(instance = %self.name, roots = self.store.state().len(), "initial state loaded");
        self.watchers.notify_ready(self.store.state());
        Ok(())
    }

    /// Register a subscriber under an id.
    ///
    /// If the initial state is already loaded, the subscriber's ready
    /// callback fires immediately, so late registration behaves the same
    /// as early registration.
    pub fn subscribe(&mut self, id: impl Into<String>, subscriber: Subscriber) {
        let id = id.into();
        trace!(instance = %self.name, subscriber = %id, "subscribing");
        self.watchers.subscribe(id.clone(), subscriber);
        if self.store.is_initialized() {
            self.watchers.ready_one(&id, self.store.state());
        }
    }

    /// Remove a subscriber. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        trace!(instance = %self.name, subscriber = %id, "unsubscribing");
        self.watchers.unsubscribe(id)
    }

    /// Install a mutation handler, replacing any earlier one of the same
    /// name.
    pub fn register_mutation(&mut self, name: impl Into<String>, mutation: Arc<dyn Mutation>) {
        self.mutations.register(name, mutation);
    }

    /// Install a synchronous closure as a mutation handler.
    pub fn register_mutation_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut StateStore, &[Value]) -> StoreResult<()> + Send + Sync + 'static,
    {
        self.mutations.register_fn(name, f);
    }

    /// Dispatch a named mutation.
    ///
    /// Fails with an unknown-mutation error for unregistered names. The
    /// handler's preparation phase may suspend; the write window, and
    /// therefore one notification batch, wraps only the synchronous apply
    /// phase. A handler that opens several windows produces several
    /// batches, delivered in the order the windows closed.
    ///
    /// On handler failure the store is forced back to read-only before the
    /// error propagates, and changes recorded before the failure are still
    /// delivered.
    ///
    /// There is no at-most-one-dispatch-in-flight guarantee: two dispatches
    /// that both suspend in their preparation phase may interleave, and the
    /// later apply wins. Handlers must tolerate this.
    pub async fn dispatch(&mut self, name: &str, args: &[Value]) -> StoreResult<()> {
        let handler = self
            .mutations
            .get(name)
            .ok_or_else(|| StoreError::unknown_mutation(name))?;
        trace!(instance = %self.name, mutation = %name, "dispatching");

        let prepared = handler.prepare(self.store.state(), args).await;
        let result = match prepared {
            Ok(prepared) => handler.apply(&mut self.store, prepared, args),
            Err(err) => Err(err),
        };

        self.store.force_read_only();
        self.deliver_batches();

        if let Err(err) = &result {
            debug!(instance = %self.name, mutation = %name, error = %err, "mutation failed");
        }
        result
    }

    /// Apply a server-produced state update list.
    ///
    /// One write window wraps the whole list, producing a single
    /// notification batch for the round trip.
    pub fn process_updates(&mut self, updates: &[StateUpdate]) -> StoreResult<()> {
        let result = apply_updates(&mut self.store, updates);
        self.deliver_batches();
        result
    }

    fn deliver_batches(&mut self) {
        for batch in self.store.take_batches() {
            debug!(instance = %self.name, events = batch.len(), "delivering change batch");
            self.watchers.notify(&batch, self.store.state());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pattern;
    use serde_json::json;
    use std::sync::{Arc as StdArc, Mutex};

    fn city() -> Reactive {
        let mut reactive = Reactive::new("city");
        reactive
            .set_initial_state(json!({
                "people": [
                    {"id": 1, "name": "Carlos", "bitten": false},
                    {"id": 2, "name": "Amaia", "bitten": false},
                ],
            }))
            .unwrap();
        reactive
    }

    #[test]
    fn ready_fires_on_late_subscribe() {
        let mut reactive = city();
        let ready = StdArc::new(Mutex::new(false));
        let flag = StdArc::clone(&ready);
        reactive.subscribe(
            "late",
            Subscriber::new().on_ready(move |state| {
                *flag.lock().unwrap() = !state.is_empty();
            }),
        );
        assert!(*ready.lock().unwrap());
    }

    #[test]
    fn ready_fires_on_initial_load() {
        let mut reactive = Reactive::new("city");
        let ready = StdArc::new(Mutex::new(0));
        let count = StdArc::clone(&ready);
        reactive.subscribe(
            "early",
            Subscriber::new().on_ready(move |_| *count.lock().unwrap() += 1),
        );
        assert_eq!(*ready.lock().unwrap(), 0);

        reactive.set_initial_state(json!({"people": []})).unwrap();
        assert_eq!(*ready.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_mutation_leaves_store_read_only() {
        let mut reactive = city();
        let err = reactive.dispatch("doesNotExist", &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownMutation { .. }));
        assert!(reactive.is_read_only());
    }

    #[tokio::test]
    async fn failed_handler_restores_read_only_and_delivers_partial_batch() {
        let mut reactive = city();
        reactive.register_mutation_fn("breaks", |store, _args| {
            store.set_read_only(false);
            store.set_attribute("people", &Id::from(1), "bitten", json!(true))?;
            Err(StoreError::unknown_scope("towns"))
        });

        let fired = StdArc::new(Mutex::new(0));
        let count = StdArc::clone(&fired);
        reactive.subscribe(
            "list",
            Subscriber::new().watch(Pattern::scope("people"), move |_| {
                *count.lock().unwrap() += 1;
            }),
        );

        let err = reactive.dispatch("breaks", &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownScope { .. }));
        assert!(reactive.is_read_only());
        assert_eq!(*fired.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn handler_with_two_windows_produces_two_batches() {
        let mut reactive = city();
        reactive.register_mutation_fn("two_windows", |store, _args| {
            store.set_read_only(false);
            store.set_attribute("people", &Id::from(1), "bitten", json!(true))?;
            store.set_read_only(true);
            store.set_read_only(false);
            store.set_attribute("people", &Id::from(2), "bitten", json!(true))?;
            store.set_read_only(true);
            Ok(())
        });

        let batches = StdArc::new(Mutex::new(Vec::new()));
        let log = StdArc::clone(&batches);
        reactive.subscribe(
            "list",
            Subscriber::new().watch(Pattern::scope("people"), move |n| {
                log.lock().unwrap().push(n.event.to_string());
            }),
        );

        reactive.dispatch("two_windows", &[]).await.unwrap();
        assert_eq!(
            *batches.lock().unwrap(),
            vec!["people[1]:updated", "people[2]:updated"]
        );
    }
}
