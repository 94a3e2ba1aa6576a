//! Root containers: keyed collections, plain records and the state tree.
//!
//! Only two shapes are permitted at the root of the tree: a keyed collection
//! (insertion-ordered map from element id to JSON object) or a plain record
//! (flat attribute map). Any other root shape is rejected when the tree is
//! registered.

use crate::error::value_type_name;
use crate::{Id, StoreError, StoreResult};
use indexmap::IndexMap;
use serde_json::Value;

/// An insertion-ordered mapping from element id to JSON object.
///
/// Every element carries an `id` attribute, unique within the collection.
/// Built from a JSON array at registration; exported back to a JSON array
/// for template-consuming collaborators.
#[derive(Clone, Debug, Default)]
pub struct KeyedCollection {
    items: IndexMap<Id, Value>,
}

impl KeyedCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from a JSON array of id-carrying objects.
    pub fn from_value(scope: &str, value: Value) -> StoreResult<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(StoreError::invalid_root(scope, value_type_name(&other))),
        };
        let mut collection = Self::new();
        for element in items {
            if !element.is_object() {
                return Err(StoreError::missing_id(scope));
            }
            let id = Id::from_element(&element).ok_or_else(|| StoreError::missing_id(scope))?;
            if collection.items.insert(id.clone(), element).is_some() {
                return Err(StoreError::duplicate_id(scope, id));
            }
        }
        Ok(collection)
    }

    /// Get an element by id.
    pub fn get(&self, id: &Id) -> Option<&Value> {
        self.items.get(id)
    }

    /// Whether an element with the given id exists.
    pub fn contains(&self, id: &Id) -> bool {
        self.items.contains_key(id)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Id, &Value)> {
        self.items.iter()
    }

    /// Iterate element ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &Id> {
        self.items.keys()
    }

    /// Export the collection as a JSON array, in insertion order.
    pub fn to_value(&self) -> Value {
        Value::Array(self.items.values().cloned().collect())
    }

    pub(crate) fn insert(&mut self, id: Id, element: Value) -> Option<Value> {
        self.items.insert(id, element)
    }

    pub(crate) fn get_mut(&mut self, id: &Id) -> Option<&mut Value> {
        self.items.get_mut(id)
    }

    /// Remove preserving the order of the remaining elements.
    pub(crate) fn remove(&mut self, id: &Id) -> Option<Value> {
        self.items.shift_remove(id)
    }
}

/// A flat attribute map at the root of the tree.
#[derive(Clone, Debug, Default)]
pub struct PlainRecord {
    fields: IndexMap<String, Value>,
}

impl PlainRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON object.
    pub fn from_value(scope: &str, value: Value) -> StoreResult<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(StoreError::invalid_root(scope, value_type_name(&other))),
        };
        Ok(Self {
            fields: map.into_iter().collect(),
        })
    }

    /// Get an attribute value.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.fields.get(attribute)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no attributes.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Export the record as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub(crate) fn set(&mut self, attribute: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(attribute.into(), value)
    }
}

/// A root-level container: collection or record. No other shape is allowed.
#[derive(Clone, Debug)]
pub enum Container {
    /// A keyed collection of id-carrying objects.
    Collection(KeyedCollection),
    /// A plain record of attributes.
    Record(PlainRecord),
}

impl Container {
    /// Build a container from a JSON root value, validating its shape.
    ///
    /// Arrays become keyed collections (every element must carry an id),
    /// objects become plain records. Anything else is a configuration error.
    pub fn from_value(scope: &str, value: Value) -> StoreResult<Self> {
        match value {
            Value::Array(_) => Ok(Container::Collection(KeyedCollection::from_value(scope, value)?)),
            Value::Object(_) => Ok(Container::Record(PlainRecord::from_value(scope, value)?)),
            other => Err(StoreError::invalid_root(scope, value_type_name(&other))),
        }
    }

    /// Get the collection if this is one.
    pub fn as_collection(&self) -> Option<&KeyedCollection> {
        match self {
            Container::Collection(c) => Some(c),
            Container::Record(_) => None,
        }
    }

    /// Get the record if this is one.
    pub fn as_record(&self) -> Option<&PlainRecord> {
        match self {
            Container::Collection(_) => None,
            Container::Record(r) => Some(r),
        }
    }

    /// Export the container back to plain JSON.
    pub fn to_value(&self) -> Value {
        match self {
            Container::Collection(c) => c.to_value(),
            Container::Record(r) => r.to_value(),
        }
    }
}

/// The full state tree: root key to container.
#[derive(Clone, Debug, Default)]
pub struct StateTree {
    roots: IndexMap<String, Container>,
}

impl StateTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a JSON object, validating every root shape.
    pub fn from_value(value: Value) -> StoreResult<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(StoreError::invalid_root("state", value_type_name(&other))),
        };
        let mut roots = IndexMap::new();
        for (scope, root) in map {
            let container = Container::from_value(&scope, root)?;
            roots.insert(scope, container);
        }
        Ok(Self { roots })
    }

    /// Get a root container.
    pub fn get(&self, scope: &str) -> Option<&Container> {
        self.roots.get(scope)
    }

    /// Get a root collection, failing if absent or not a collection.
    pub fn collection(&self, scope: &str) -> StoreResult<&KeyedCollection> {
        self.roots
            .get(scope)
            .ok_or_else(|| StoreError::unknown_scope(scope))?
            .as_collection()
            .ok_or(StoreError::WrongContainer {
                scope: scope.to_owned(),
                expected: "collection",
            })
    }

    /// Get a root record, failing if absent or not a record.
    pub fn record(&self, scope: &str) -> StoreResult<&PlainRecord> {
        self.roots
            .get(scope)
            .ok_or_else(|| StoreError::unknown_scope(scope))?
            .as_record()
            .ok_or(StoreError::WrongContainer {
                scope: scope.to_owned(),
                expected: "record",
            })
    }

    /// Convenience element lookup across the tree.
    pub fn element(&self, scope: &str, id: &Id) -> Option<&Value> {
        self.get(scope)?.as_collection()?.get(id)
    }

    /// Iterate root containers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Container)> {
        self.roots.iter()
    }

    /// Number of root containers.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the tree has no roots.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Export the whole tree back to plain JSON (collections as arrays).
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.roots
                .iter()
                .map(|(k, c)| (k.clone(), c.to_value()))
                .collect(),
        )
    }

    pub(crate) fn collection_mut(&mut self, scope: &str) -> StoreResult<&mut KeyedCollection> {
        match self.roots.get_mut(scope) {
            Some(Container::Collection(c)) => Ok(c),
            Some(Container::Record(_)) => Err(StoreError::WrongContainer {
                scope: scope.to_owned(),
                expected: "collection",
            }),
            None => Err(StoreError::unknown_scope(scope)),
        }
    }

    pub(crate) fn record_mut(&mut self, scope: &str) -> StoreResult<&mut PlainRecord> {
        match self.roots.get_mut(scope) {
            Some(Container::Record(r)) => Ok(r),
            Some(Container::Collection(_)) => Err(StoreError::WrongContainer {
                scope: scope.to_owned(),
                expected: "record",
            }),
            None => Err(StoreError::unknown_scope(scope)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people_tree() -> StateTree {
        StateTree::from_value(json!({
            "people": [
                {"id": 1, "name": "Carlos", "bitten": false},
                {"id": 2, "name": "Amaia", "bitten": false},
            ],
            "settings": {"title": "Transylvania"},
        }))
        .unwrap()
    }

    #[test]
    fn from_value_builds_collections_and_records() {
        let tree = people_tree();
        let people = tree.collection("people").unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people.get(&Id::from(2)).unwrap()["name"], "Amaia");
        let settings = tree.record("settings").unwrap();
        assert_eq!(settings.get("title"), Some(&json!("Transylvania")));
    }

    #[test]
    fn rejects_scalar_root() {
        let err = StateTree::from_value(json!({"count": 3})).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidRoot { found: "number", .. }
        ));
    }

    #[test]
    fn rejects_array_of_scalars() {
        let err = StateTree::from_value(json!({"tags": ["a", "b"]})).unwrap_err();
        assert!(matches!(err, StoreError::MissingId { .. }));
    }

    #[test]
    fn rejects_elements_without_id() {
        let err = StateTree::from_value(json!({"people": [{"name": "Carlos"}]})).unwrap_err();
        assert!(matches!(err, StoreError::MissingId { .. }));
    }

    #[test]
    fn rejects_duplicate_ids_at_registration() {
        let err = StateTree::from_value(json!({
            "people": [{"id": 1, "name": "a"}, {"id": 1, "name": "b"}]
        }))
        .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
    }

    #[test]
    fn rejects_non_object_tree() {
        let err = StateTree::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRoot { .. }));
    }

    #[test]
    fn collection_preserves_insertion_order_across_removal() {
        let mut collection = KeyedCollection::from_value(
            "people",
            json!([{"id": 1}, {"id": 2}, {"id": 3}]),
        )
        .unwrap();
        collection.remove(&Id::from(2));
        let ids: Vec<_> = collection.ids().cloned().collect();
        assert_eq!(ids, vec![Id::from(1), Id::from(3)]);
    }

    #[test]
    fn export_round_trips_to_plain_json() {
        let tree = people_tree();
        let exported = tree.to_value();
        assert_eq!(exported["people"][1]["name"], "Amaia");
        assert_eq!(exported["settings"]["title"], "Transylvania");
    }

    #[test]
    fn wrong_container_errors() {
        let tree = people_tree();
        assert!(matches!(
            tree.collection("settings").unwrap_err(),
            StoreError::WrongContainer { expected: "collection", .. }
        ));
        assert!(matches!(
            tree.record("people").unwrap_err(),
            StoreError::WrongContainer { expected: "record", .. }
        ));
        assert!(matches!(
            tree.collection("towns").unwrap_err(),
            StoreError::UnknownScope { .. }
        ));
    }
}
