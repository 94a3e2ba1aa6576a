//! Named mutations and their registry.
//!
//! Mutations are the sole sanctioned way to change state. A mutation is a
//! two-phase handler: an asynchronous preparation phase that may await
//! remote work and must not touch the store, followed by a synchronous
//! apply phase that opens a write window, mutates, and closes it. The
//! write gate does not hold across the preparation await, which makes the
//! non-atomicity of suspended dispatches explicit.

use crate::{StateStore, StateTree, StoreResult};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A named state mutation.
///
/// # Examples
///
/// ```
/// use reactive_store::{Mutation, StateStore, StateTree, StoreResult, Id};
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
///
/// struct Bite;
///
/// #[async_trait]
/// impl Mutation for Bite {
///     fn apply(&self, store: &mut StateStore, _prepared: Value, args: &[Value]) -> StoreResult<()> {
///         let id = Id::from_value(&args[0]).expect("person id");
///         store.set_read_only(false);
///         let result = store.set_attribute("people", &id, "bitten", json!(true));
///         store.set_read_only(true);
///         result
///     }
/// }
/// ```
#[async_trait]
pub trait Mutation: Send + Sync {
    /// Asynchronous preparation phase.
    ///
    /// Runs before any write window opens, against a read-only view of the
    /// tree. Typically awaits a remote round trip and returns its result
    /// for `apply`. The default implementation prepares nothing.
    async fn prepare(&self, state: &StateTree, args: &[Value]) -> StoreResult<Value> {
        let _ = (state, args);
        Ok(Value::Null)
    }

    /// Synchronous apply phase. The only phase allowed to open write
    /// windows; must leave the store read-only on return (the dispatcher
    /// enforces this even on error).
    fn apply(&self, store: &mut StateStore, prepared: Value, args: &[Value]) -> StoreResult<()>;
}

/// Adapter for plain synchronous mutation closures.
struct FnMutation<F> {
    f: F,
}

#[async_trait]
impl<F> Mutation for FnMutation<F>
where
    F: Fn(&mut StateStore, &[Value]) -> StoreResult<()> + Send + Sync,
{
    fn apply(&self, store: &mut StateStore, _prepared: Value, args: &[Value]) -> StoreResult<()> {
        (self.f)(store, args)
    }
}

/// Maps mutation names to handlers. The sole legal path to mutate.
///
/// Registering a name that already exists replaces the earlier handler
/// (last wins), which supports incremental extension of a base mutation
/// set.
#[derive(Default)]
pub struct MutationRegistry {
    handlers: IndexMap<String, Arc<dyn Mutation>>,
}

impl MutationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler under a name, replacing any earlier registration.
    pub fn register(&mut self, name: impl Into<String>, mutation: Arc<dyn Mutation>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), mutation).is_some() {
            debug!(mutation = %name, "replacing mutation handler");
        }
    }

    /// Install a synchronous closure as a handler.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut StateStore, &[Value]) -> StoreResult<()> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnMutation { f }));
    }

    /// Look up a handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Mutation>> {
        self.handlers.get(name).cloned()
    }

    /// Whether a handler is registered under the name.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_fn_and_lookup() {
        let mut registry = MutationRegistry::new();
        registry.register_fn("bite", |_store, _args| Ok(()));
        assert!(registry.contains("bite"));
        assert!(registry.get("bite").is_some());
        assert!(registry.get("cure").is_none());
    }

    #[test]
    fn later_registration_wins() {
        let mut registry = MutationRegistry::new();
        registry.register_fn("bite", |store, _args| {
            store.set_read_only(false);
            let result = store.set_record_attribute("settings", "version", json!(1));
            store.set_read_only(true);
            result
        });
        registry.register_fn("bite", |store, _args| {
            store.set_read_only(false);
            let result = store.set_record_attribute("settings", "version", json!(2));
            store.set_read_only(true);
            result
        });
        assert_eq!(registry.len(), 1);

        let mut store = StateStore::new();
        store
            .set_initial_state(json!({"settings": {"version": 0}}))
            .unwrap();
        let handler = registry.get("bite").unwrap();
        handler.apply(&mut store, Value::Null, &[]).unwrap();
        assert_eq!(
            store.get_record("settings").unwrap().get("version"),
            Some(&json!(2))
        );
    }

    #[tokio::test]
    async fn default_prepare_returns_null() {
        struct Noop;

        #[async_trait]
        impl Mutation for Noop {
            fn apply(
                &self,
                _store: &mut StateStore,
                _prepared: Value,
                _args: &[Value],
            ) -> StoreResult<()> {
                Ok(())
            }
        }

        let tree = StateTree::new();
        let prepared = Noop.prepare(&tree, &[]).await.unwrap();
        assert_eq!(prepared, Value::Null);
    }
}
