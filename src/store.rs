//! The state store: tree ownership, write gate and change batching.
//!
//! At rest the store is read-only. Every mutation path opens a write window
//! with `set_read_only(false)`, performs its changes through the checked
//! primitives, and closes the window with `set_read_only(true)`. The gate
//! nests: the window closes, and the accumulated change batch is queued,
//! only on the outermost close.

use crate::{
    ChangeEvent, ChangeTracker, Id, KeyedCollection, PlainRecord, StateTree, StoreError,
    StoreResult,
};
use serde_json::Value;
use tracing::trace;

/// Owns the state tree and enforces single-writer mutation discipline.
///
/// The store never notifies by itself: batches closed by the write gate are
/// queued in close order and drained by the dispatching layer, which routes
/// them to watchers.
#[derive(Debug, Default)]
pub struct StateStore {
    tree: StateTree,
    initialized: bool,
    write_depth: u32,
    tracker: ChangeTracker,
    closed_batches: Vec<Vec<ChangeEvent>>,
}

impl StateStore {
    /// Create an empty, read-only store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current tree, as a read-only view.
    pub fn state(&self) -> &StateTree {
        &self.tree
    }

    /// Whether the write gate is closed.
    pub fn is_read_only(&self) -> bool {
        self.write_depth == 0
    }

    /// Whether the initial state has been loaded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Events accumulated in the currently open write window.
    pub fn pending_changes(&self) -> &[ChangeEvent] {
        self.tracker.pending()
    }

    /// Toggle the write gate.
    ///
    /// Unlocking nests: each `set_read_only(false)` must be balanced by a
    /// `set_read_only(true)`, and only the outermost close ends the write
    /// window and queues the accumulated batch. Closing an already closed
    /// gate is a no-op.
    pub fn set_read_only(&mut self, read_only: bool) {
        if !read_only {
            self.write_depth += 1;
            return;
        }
        match self.write_depth {
            0 => trace!("write gate already closed"),
            1 => {
                self.write_depth = 0;
                self.queue_batch();
            }
            _ => self.write_depth -= 1,
        }
    }

    /// Close the write gate regardless of nesting depth.
    ///
    /// Used by the dispatcher to restore the read-only invariant after a
    /// handler error. Any changes recorded before the failure are still
    /// queued as a batch.
    pub(crate) fn force_read_only(&mut self) {
        if self.write_depth > 0 {
            trace!(depth = self.write_depth, "forcing write gate closed");
            self.write_depth = 0;
            self.queue_batch();
        }
    }

    fn queue_batch(&mut self) {
        let batch = self.tracker.drain();
        if !batch.is_empty() {
            self.closed_batches.push(batch);
        }
    }

    /// Take the queued change batches, in the order their windows closed.
    pub(crate) fn take_batches(&mut self) -> Vec<Vec<ChangeEvent>> {
        std::mem::take(&mut self.closed_batches)
    }

    /// Replace the whole tree. Allowed exactly once per store.
    ///
    /// The value must be a JSON object whose roots are either arrays of
    /// id-carrying objects (keyed collections) or objects (plain records).
    pub fn set_initial_state(&mut self, value: Value) -> StoreResult<()> {
        if self.initialized {
            return Err(StoreError::AlreadyInitialized);
        }
        self.tree = StateTree::from_value(value)?;
        self.initialized = true;
        Ok(())
    }

    fn check_writable(&self, scope: &str, attribute: &str) -> StoreResult<()> {
        if self.is_read_only() {
            return Err(StoreError::locked(scope, attribute));
        }
        Ok(())
    }

    // ===== Read access =====

    /// Get a collection element by id.
    pub fn get(&self, scope: &str, id: impl Into<Id>) -> StoreResult<&Value> {
        let id = id.into();
        self.tree
            .collection(scope)?
            .get(&id)
            .ok_or_else(|| StoreError::not_found(scope, id))
    }

    /// Get the live collection under a root key.
    pub fn get_all(&self, scope: &str) -> StoreResult<&KeyedCollection> {
        self.tree.collection(scope)
    }

    /// Get the plain record under a root key.
    pub fn get_record(&self, scope: &str) -> StoreResult<&PlainRecord> {
        self.tree.record(scope)
    }

    // ===== Mutation primitives (write window required) =====

    /// Add a new element to a collection. The id must not exist yet.
    pub fn add_element(&mut self, scope: &str, element: Value) -> StoreResult<Id> {
        self.check_writable(scope, "elements")?;
        if !element.is_object() {
            return Err(StoreError::missing_id(scope));
        }
        let id = Id::from_element(&element).ok_or_else(|| StoreError::missing_id(scope))?;
        let collection = self.tree.collection_mut(scope)?;
        if collection.contains(&id) {
            return Err(StoreError::duplicate_id(scope, id));
        }
        collection.insert(id.clone(), element);
        self.tracker.record(ChangeEvent::created(scope, id.clone()));
        Ok(id)
    }

    /// Add or replace an element. Replacing an identical element records
    /// no events.
    pub fn put_element(&mut self, scope: &str, element: Value) -> StoreResult<Id> {
        self.check_writable(scope, "elements")?;
        let Some(new_obj) = element.as_object() else {
            return Err(StoreError::missing_id(scope));
        };
        let id = Id::from_element(&element).ok_or_else(|| StoreError::missing_id(scope))?;
        let new_obj = new_obj.clone();

        let collection = self.tree.collection_mut(scope)?;
        let changed: Vec<String> = match collection.get(&id) {
            None => {
                collection.insert(id.clone(), element);
                self.tracker.record(ChangeEvent::created(scope, id.clone()));
                return Ok(id);
            }
            Some(existing) if existing == &element => return Ok(id),
            Some(existing) => {
                let empty = serde_json::Map::new();
                let old_obj = existing.as_object().unwrap_or(&empty);
                let mut changed = Vec::new();
                for (key, value) in &new_obj {
                    if old_obj.get(key) != Some(value) {
                        changed.push(key.clone());
                    }
                }
                for key in old_obj.keys() {
                    if !new_obj.contains_key(key) {
                        changed.push(key.clone());
                    }
                }
                changed
            }
        };

        self.tree
            .collection_mut(scope)?
            .insert(id.clone(), element);
        for attribute in changed {
            self.tracker
                .record(ChangeEvent::attribute_updated(scope, id.clone(), attribute));
        }
        self.tracker.record(ChangeEvent::updated(scope, id.clone()));
        Ok(id)
    }

    /// Merge fields into an existing element. Fails if the id is absent.
    /// Unchanged values record no events.
    pub fn update_element(&mut self, scope: &str, id: &Id, fields: &Value) -> StoreResult<()> {
        self.check_writable(scope, "elements")?;
        let Some(fields_map) = fields.as_object() else {
            return Err(StoreError::missing_id(scope));
        };
        let collection = self.tree.collection_mut(scope)?;
        let element = collection
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(scope, id.clone()))?;
        let mut changed = Vec::new();
        if let Some(obj) = element.as_object_mut() {
            for (key, value) in fields_map {
                if obj.get(key) != Some(value) {
                    obj.insert(key.clone(), value.clone());
                    changed.push(key.clone());
                }
            }
        }
        if !changed.is_empty() {
            for attribute in changed {
                self.tracker
                    .record(ChangeEvent::attribute_updated(scope, id.clone(), attribute));
            }
            self.tracker.record(ChangeEvent::updated(scope, id.clone()));
        }
        Ok(())
    }

    /// Remove an element. Fails if the id is absent; the idempotent-delete
    /// policy lives in the state-update applier, not here.
    pub fn delete_element(&mut self, scope: &str, id: &Id) -> StoreResult<Value> {
        self.check_writable(scope, "elements")?;
        let collection = self.tree.collection_mut(scope)?;
        let removed = collection
            .remove(id)
            .ok_or_else(|| StoreError::not_found(scope, id.clone()))?;
        self.tracker.record(ChangeEvent::deleted(scope, id.clone()));
        Ok(removed)
    }

    /// Set one attribute of a collection element. Writing the current value
    /// back records no events.
    pub fn set_attribute(
        &mut self,
        scope: &str,
        id: &Id,
        attribute: &str,
        value: Value,
    ) -> StoreResult<()> {
        self.check_writable(scope, attribute)?;
        let collection = self.tree.collection_mut(scope)?;
        let element = collection
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(scope, id.clone()))?;
        let Some(obj) = element.as_object_mut() else {
            return Err(StoreError::missing_id(scope));
        };
        if obj.get(attribute) == Some(&value) {
            return Ok(());
        }
        obj.insert(attribute.to_owned(), value);
        self.tracker
            .record(ChangeEvent::attribute_updated(scope, id.clone(), attribute));
        self.tracker.record(ChangeEvent::updated(scope, id.clone()));
        Ok(())
    }

    /// Set one attribute of a plain record. Writing the current value back
    /// records no events.
    pub fn set_record_attribute(
        &mut self,
        scope: &str,
        attribute: &str,
        value: Value,
    ) -> StoreResult<()> {
        self.check_writable(scope, attribute)?;
        let record = self.tree.record_mut(scope)?;
        if record.get(attribute) == Some(&value) {
            return Ok(());
        }
        record.set(attribute, value);
        self.tracker
            .record(ChangeEvent::record_attribute_updated(scope, attribute));
        self.tracker.record(ChangeEvent::record_updated(scope));
        Ok(())
    }
}
