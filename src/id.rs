//! Element identity within a keyed collection.
//!
//! Ids are either integers or strings, unique within their collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An element id: integer or string.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// Integer id.
    Int(i64),
    /// String id.
    Str(String),
}

impl Id {
    /// Extract an id from a JSON value (number or string).
    pub fn from_value(value: &Value) -> Option<Id> {
        match value {
            Value::Number(n) => n.as_i64().map(Id::Int),
            Value::String(s) => Some(Id::Str(s.clone())),
            _ => None,
        }
    }

    /// Extract the `id` attribute of a JSON object element.
    pub fn from_element(element: &Value) -> Option<Id> {
        element.get("id").and_then(Id::from_value)
    }

    /// Returns true if this is an integer id.
    #[inline]
    pub fn is_int(&self) -> bool {
        matches!(self, Id::Int(_))
    }

    /// Get the integer value if this is an integer id.
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Id::Int(i) => Some(*i),
            Id::Str(_) => None,
        }
    }

    /// Get the string value if this is a string id.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Id::Int(_) => None,
            Id::Str(s) => Some(s),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Int(i) => write!(f, "{}", i),
            Id::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Id {
    fn from(i: i64) -> Self {
        Id::Int(i)
    }
}

impl From<i32> for Id {
    fn from(i: i32) -> Self {
        Id::Int(i64::from(i))
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Str(s.to_owned())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::Str(s)
    }
}
