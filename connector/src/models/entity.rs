//! Normalized graph entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat attribute bag value. No nested objects: rich content is flattened to
/// plain text before it lands here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Number(f64),
    Bool(bool),
    StringList(Vec<String>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        AttributeValue::StringList(value)
    }
}

/// A normalized graph node.
///
/// `key` is globally unique and stable across runs for the same provider id;
/// `class` carries the semantic labels downstream schema validation keys on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub key: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub class: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Entity {
    pub fn new(entity_type: &str, provider_id: &str, class: &[&str]) -> Self {
        Entity {
            key: entity_key(entity_type, provider_id),
            entity_type: entity_type.to_string(),
            class: class.iter().map(|label| label.to_string()).collect(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn string_attribute(&self, name: &str) -> Option<&str> {
        match self.attributes.get(name) {
            Some(AttributeValue::String(value)) => Some(value),
            _ => None,
        }
    }
}

/// The identity backbone: `key(type, id) = "{type}_{id}"`. Injective over
/// `(type, id)` pairs and stable across runs.
pub fn entity_key(entity_type: &str, provider_id: &str) -> String {
    format!("{entity_type}_{provider_id}")
}
