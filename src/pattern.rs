//! Watcher patterns and event matching.
//!
//! A pattern is a tagged structure rather than a parsed string: an optional
//! scope, optional element id, optional attribute path and optional kind.
//! Leaving a field unset widens the match. The universal pattern (no scope)
//! matches any change anywhere.
//!
//! Granularity rule: a pattern without an attribute matches only
//! element-level events, so a scope watcher fires once per changed element
//! even when several attributes of that element changed in the same window.
//! A pattern with an attribute matches the attribute-level detail events.

use crate::{ChangeEvent, EventKind, Id};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A watcher pattern.
///
/// # Examples
///
/// ```
/// use reactive_store::{ChangeEvent, EventKind, Id, Pattern};
///
/// let scope = Pattern::scope("people");
/// let bitten = Pattern::attribute("people", Id::from(2), "bitten").kind(EventKind::Updated);
///
/// let event = ChangeEvent::attribute_updated("people", Id::from(2), "bitten");
/// assert!(bitten.matches(&event));
/// assert!(!scope.matches(&event)); // scope patterns match element-level events
/// assert!(scope.matches(&ChangeEvent::updated("people", Id::from(2))));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    /// Root key to match, `None` for the universal pattern.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub scope: Option<String>,
    /// Element id to match, `None` matches any element (and records).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub element_id: Option<Id>,
    /// Attribute path to match; `None` matches element-level events only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attribute: Option<String>,
    /// Kind filter, `None` matches any kind.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kind: Option<EventKind>,
}

impl Pattern {
    /// The universal pattern: any change anywhere.
    pub fn any() -> Self {
        Self::default()
    }

    /// Match any element-level change in a scope.
    pub fn scope(scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
            ..Self::default()
        }
    }

    /// Match element-level changes of one element.
    pub fn element(scope: impl Into<String>, id: impl Into<Id>) -> Self {
        Self {
            scope: Some(scope.into()),
            element_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Match changes of one attribute of one element.
    pub fn attribute(scope: impl Into<String>, id: impl Into<Id>, attribute: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
            element_id: Some(id.into()),
            attribute: Some(attribute.into()),
            ..Self::default()
        }
    }

    /// Match changes of one attribute of a plain record (no element id).
    pub fn record_attribute(scope: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
            attribute: Some(attribute.into()),
            ..Self::default()
        }
    }

    /// Restrict the pattern to one event kind (builder).
    pub fn kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Whether this pattern is satisfied by the given event.
    ///
    /// A deleted element still satisfies patterns keyed to its attribute
    /// paths: the handler receives the deleted-kind event and must treat it
    /// as a distinct case, since the attribute value no longer exists.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if let Some(scope) = &self.scope {
            if *scope != event.scope {
                return false;
            }
        }
        if let Some(id) = &self.element_id {
            if event.element_id.as_ref() != Some(id) {
                return false;
            }
        }
        match &self.attribute {
            // Element-level patterns only see element-level events.
            None => {
                if event.attribute.is_some() {
                    return false;
                }
            }
            Some(attr) => {
                let attribute_matches = event.attribute.as_deref() == Some(attr.as_str());
                let deleted_element = event.kind == EventKind::Deleted && event.attribute.is_none();
                if !attribute_matches && !deleted_element {
                    return false;
                }
            }
        }
        if let Some(kind) = self.kind {
            if kind != event.kind {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for Pattern {
    /// Renders the informal `scope[id].attribute:kind` form, for logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            None => write!(f, "*")?,
            Some(scope) => write!(f, "{}", scope)?,
        }
        if let Some(id) = &self.element_id {
            write!(f, "[{}]", id)?;
        }
        if let Some(attr) = &self.attribute {
            write!(f, ".{}", attr)?;
        }
        if let Some(kind) = self.kind {
            write!(f, ":{}", kind)?;
        }
        Ok(())
    }
}
