//! Error types for store operations.

use crate::Id;
use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or mutating the store.
///
/// All errors are raised synchronously to the immediate caller. The store
/// guarantees internal consistency after any error: a failed mutation never
/// leaves the write gate open.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A mutating primitive was invoked outside a write window.
    #[error("state is read-only: use a mutation to change {attribute} in {scope}")]
    Locked {
        /// The root container the caller tried to change.
        scope: String,
        /// The attribute (or element description) the caller tried to change.
        attribute: String,
    },

    /// `dispatch` was called with an unregistered mutation name.
    #[error("unknown mutation: {name}")]
    UnknownMutation {
        /// The name that was dispatched.
        name: String,
    },

    /// The initial state was loaded more than once.
    #[error("initial state already loaded")]
    AlreadyInitialized,

    /// No root container is registered under the given name.
    #[error("no state root named {scope}")]
    UnknownScope {
        /// The missing root key.
        scope: String,
    },

    /// A root container exists but is not the expected shape for the call.
    #[error("state root {scope} is not a {expected}")]
    WrongContainer {
        /// The root key.
        scope: String,
        /// "collection" or "record".
        expected: &'static str,
    },

    /// An element lookup, update or delete referenced an absent id.
    #[error("element {id} not found in {scope}")]
    NotFound {
        /// The collection that was searched.
        scope: String,
        /// The id that was not found.
        id: Id,
    },

    /// An add used an id that already exists in the collection.
    #[error("duplicate id {id} in {scope}")]
    DuplicateId {
        /// The collection.
        scope: String,
        /// The conflicting id.
        id: Id,
    },

    /// A root value had a shape the tree does not permit.
    #[error("invalid root shape for {scope}: expected object or array of objects, found {found}")]
    InvalidRoot {
        /// The root key being registered.
        scope: String,
        /// The JSON type that was found.
        found: &'static str,
    },

    /// A collection element was not an object carrying an id.
    #[error("element for {scope} must be an object with an id")]
    MissingId {
        /// The collection the element was destined for.
        scope: String,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a locked-state error.
    #[inline]
    pub fn locked(scope: impl Into<String>, attribute: impl Into<String>) -> Self {
        StoreError::Locked {
            scope: scope.into(),
            attribute: attribute.into(),
        }
    }

    /// Create an unknown-mutation error.
    #[inline]
    pub fn unknown_mutation(name: impl Into<String>) -> Self {
        StoreError::UnknownMutation { name: name.into() }
    }

    /// Create an unknown-scope error.
    #[inline]
    pub fn unknown_scope(scope: impl Into<String>) -> Self {
        StoreError::UnknownScope {
            scope: scope.into(),
        }
    }

    /// Create a not-found error.
    #[inline]
    pub fn not_found(scope: impl Into<String>, id: Id) -> Self {
        StoreError::NotFound {
            scope: scope.into(),
            id,
        }
    }

    /// Create a duplicate-id error.
    #[inline]
    pub fn duplicate_id(scope: impl Into<String>, id: Id) -> Self {
        StoreError::DuplicateId {
            scope: scope.into(),
            id,
        }
    }

    /// Create an invalid-root error.
    #[inline]
    pub fn invalid_root(scope: impl Into<String>, found: &'static str) -> Self {
        StoreError::InvalidRoot {
            scope: scope.into(),
            found,
        }
    }

    /// Create a missing-id error.
    #[inline]
    pub fn missing_id(scope: impl Into<String>) -> Self {
        StoreError::MissingId {
            scope: scope.into(),
        }
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_display_names_scope_and_attribute() {
        let err = StoreError::locked("people", "bitten");
        let msg = err.to_string();
        assert!(msg.contains("people"));
        assert!(msg.contains("bitten"));
        assert!(msg.contains("read-only"));
    }

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("people", Id::from(42));
        assert_eq!(err.to_string(), "element 42 not found in people");
    }

    #[test]
    fn test_value_type_name() {
        use serde_json::json;

        assert_eq!(value_type_name(&json!(null)), "null");
        assert_eq!(value_type_name(&json!(true)), "boolean");
        assert_eq!(value_type_name(&json!(42)), "number");
        assert_eq!(value_type_name(&json!("hello")), "string");
        assert_eq!(value_type_name(&json!([1, 2, 3])), "array");
        assert_eq!(value_type_name(&json!({"a": 1})), "object");
    }
}
