//! Server-produced state updates.
//!
//! A state update is an ordered list of `{name, action, fields}` records,
//! typically the return value of a remote call. Applying the list opens one
//! write window for the whole list and therefore produces a single
//! notification batch per round trip, no matter how many elements changed.

use crate::{Container, Id, StateStore, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The operation a state update performs on its target root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    /// Add a new element; fails if the id already exists.
    Add,
    /// Merge fields into an existing element; fails if the id is absent.
    Update,
    /// Remove an element; a no-op if the id is already absent.
    Delete,
    /// Add or replace an element.
    Put,
}

/// One `{name, action, fields}` record of a state update list.
///
/// Deserializes directly from the JSON a collaborator's web service
/// returns:
///
/// ```
/// use reactive_store::{StateUpdate, UpdateAction};
///
/// let ops: Vec<StateUpdate> = serde_json::from_str(
///     r#"[{"name": "people", "action": "put",
///          "fields": {"id": 1, "name": "A", "bitten": false}}]"#,
/// ).unwrap();
/// assert_eq!(ops[0].action, UpdateAction::Put);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Root key the update targets.
    pub name: String,
    /// What to do.
    pub action: UpdateAction,
    /// Element fields; a delete only needs an identifying id here.
    pub fields: Value,
}

impl StateUpdate {
    /// Create a state update record.
    pub fn new(name: impl Into<String>, action: UpdateAction, fields: Value) -> Self {
        Self {
            name: name.into(),
            action,
            fields,
        }
    }
}

/// Apply an ordered state update list inside one write window.
///
/// Ops apply strictly in list order; later ops on the same (scope, id) win.
/// On the first failing op the window still closes before the error
/// propagates, so changes applied up to that point form a batch.
pub fn apply_updates(store: &mut StateStore, updates: &[StateUpdate]) -> StoreResult<()> {
    store.set_read_only(false);
    let result = apply_all(store, updates);
    store.set_read_only(true);
    result
}

fn apply_all(store: &mut StateStore, updates: &[StateUpdate]) -> StoreResult<()> {
    for update in updates {
        apply_one(store, update)?;
    }
    Ok(())
}

fn apply_one(store: &mut StateStore, update: &StateUpdate) -> StoreResult<()> {
    let scope = update.name.as_str();

    // Record roots take the fields as attribute merges; a delete on a
    // record is a no-op, mirroring the idempotent-delete policy.
    if matches!(store.state().get(scope), Some(Container::Record(_))) {
        if update.action == UpdateAction::Delete {
            return Ok(());
        }
        let Some(fields) = update.fields.as_object() else {
            return Err(StoreError::missing_id(scope));
        };
        for (attribute, value) in fields.clone() {
            store.set_record_attribute(scope, &attribute, value)?;
        }
        return Ok(());
    }

    match update.action {
        UpdateAction::Add => store.add_element(scope, update.fields.clone()).map(|_| ()),
        UpdateAction::Put => store.put_element(scope, update.fields.clone()).map(|_| ()),
        UpdateAction::Update => {
            let id =
                Id::from_element(&update.fields).ok_or_else(|| StoreError::missing_id(scope))?;
            store.update_element(scope, &id, &update.fields)
        }
        UpdateAction::Delete => {
            let id =
                Id::from_element(&update.fields).ok_or_else(|| StoreError::missing_id(scope))?;
            if store.get_all(scope)?.contains(&id) {
                store.delete_element(scope, &id)?;
            }
            Ok(())
        }
    }
}
