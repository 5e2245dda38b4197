use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::value::Value;

/// Represents a vertex record returned by the server.
///
/// The identifier is opaque and server-assigned; properties map a key to
/// one or many values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vertex {
    pub id: Value,
    pub label: String,
    pub properties: HashMap<String, Vec<Value>>,
}

impl Vertex {
    pub fn new(id: Value, label: String) -> Self {
        Self {
            id,
            label,
            properties: HashMap::new(),
        }
    }

    pub fn with_properties(
        id: Value,
        label: String,
        properties: HashMap<String, Vec<Value>>,
    ) -> Self {
        Self {
            id,
            label,
            properties,
        }
    }

    /// Get the first value of a property, if present.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).and_then(|values| values.first())
    }

    /// Get all values of a property.
    pub fn property_values(&self, key: &str) -> Option<&[Value]> {
        self.properties.get(key).map(|values| values.as_slice())
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Append a property value, keeping existing values for the key.
    pub fn add_property(&mut self, key: String, value: Value) {
        self.properties.entry(key).or_default().push(value);
    }
}

/// Represents an edge record returned by the server.
///
/// Edges additionally carry the source and destination vertex identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub id: Value,
    pub label: String,
    pub src: Value,
    pub dst: Value,
    pub properties: HashMap<String, Vec<Value>>,
}

impl Edge {
    pub fn new(id: Value, label: String, src: Value, dst: Value) -> Self {
        Self {
            id,
            label,
            src,
            dst,
            properties: HashMap::new(),
        }
    }

    pub fn with_properties(
        id: Value,
        label: String,
        src: Value,
        dst: Value,
        properties: HashMap<String, Vec<Value>>,
    ) -> Self {
        Self {
            id,
            label,
            src,
            dst,
            properties,
        }
    }

    /// Get the first value of a property, if present.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).and_then(|values| values.first())
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Append a property value, keeping existing values for the key.
    pub fn add_property(&mut self, key: String, value: Value) {
        self.properties.entry(key).or_default().push(value);
    }
}
