//! Change events recorded during a write window.
//!
//! Events carry the scope (root key), an optional element id, an optional
//! attribute and a kind. Collection mutations emit element-level events
//! (`attribute: None`) alongside attribute-level detail events; record
//! mutations do the same without an element id. Duplicate events collapse
//! within one write window, so a watcher fires at most once per distinct
//! event per batch.

use crate::Id;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of change an event describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// An element was added to a collection.
    Created,
    /// An element or attribute changed value.
    Updated,
    /// An element was removed from a collection.
    Deleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// A single structured change notification.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Root key of the container that changed.
    pub scope: String,
    /// Element id for collection events, `None` for record events.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub element_id: Option<Id>,
    /// Attribute path for attribute-level detail events.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attribute: Option<String>,
    /// What happened.
    pub kind: EventKind,
}

impl ChangeEvent {
    /// An element was added to a collection.
    pub fn created(scope: impl Into<String>, id: Id) -> Self {
        Self {
            scope: scope.into(),
            element_id: Some(id),
            attribute: None,
            kind: EventKind::Created,
        }
    }

    /// An element changed (element-level, no attribute detail).
    pub fn updated(scope: impl Into<String>, id: Id) -> Self {
        Self {
            scope: scope.into(),
            element_id: Some(id),
            attribute: None,
            kind: EventKind::Updated,
        }
    }

    /// A specific attribute of an element changed.
    pub fn attribute_updated(scope: impl Into<String>, id: Id, attribute: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            element_id: Some(id),
            attribute: Some(attribute.into()),
            kind: EventKind::Updated,
        }
    }

    /// An element was removed from a collection.
    pub fn deleted(scope: impl Into<String>, id: Id) -> Self {
        Self {
            scope: scope.into(),
            element_id: Some(id),
            attribute: None,
            kind: EventKind::Deleted,
        }
    }

    /// A plain record changed (record-level, no attribute detail).
    pub fn record_updated(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            element_id: None,
            attribute: None,
            kind: EventKind::Updated,
        }
    }

    /// A specific attribute of a plain record changed.
    pub fn record_attribute_updated(scope: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            element_id: None,
            attribute: Some(attribute.into()),
            kind: EventKind::Updated,
        }
    }

    /// Whether this event carries attribute-level detail.
    #[inline]
    pub fn is_attribute_level(&self) -> bool {
        self.attribute.is_some()
    }
}

impl fmt::Display for ChangeEvent {
    /// Renders the informal `scope[id].attribute:kind` form, for logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scope)?;
        if let Some(id) = &self.element_id {
            write!(f, "[{}]", id)?;
        }
        if let Some(attr) = &self.attribute {
            write!(f, ".{}", attr)?;
        }
        write!(f, ":{}", self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(
            ChangeEvent::attribute_updated("people", Id::from(2), "bitten").to_string(),
            "people[2].bitten:updated"
        );
        assert_eq!(
            ChangeEvent::created("people", Id::from(6)).to_string(),
            "people[6]:created"
        );
        assert_eq!(
            ChangeEvent::record_attribute_updated("settings", "title").to_string(),
            "settings.title:updated"
        );
    }

    #[test]
    fn identity_collapses_duplicates() {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        assert!(seen.insert(ChangeEvent::updated("people", Id::from(1))));
        assert!(!seen.insert(ChangeEvent::updated("people", Id::from(1))));
        // A different kind on the same element is a distinct event.
        assert!(seen.insert(ChangeEvent::deleted("people", Id::from(1))));
    }

    #[test]
    fn serde_round_trip() {
        let event = ChangeEvent::attribute_updated("people", Id::from(2), "bitten");
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }
}
