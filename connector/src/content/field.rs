//! Scalar extraction from heterogeneous custom-field payloads.
//!
//! Provider fields arrive in a handful of shapes; [`classify`] maps a raw
//! JSON value onto the closed [`FieldShape`] set and [`extract_value`]
//! resolves each shape through exhaustive matching. Shapes nobody recognizes
//! resolve to the [`UNPARSEABLE_VALUE`] sentinel instead of being dropped.

use serde_json::Value;

use super::adf::{document_to_text, AdfNode};
use crate::models::AttributeValue;

/// Sentinel for field payloads whose shape is not recognized.
pub const UNPARSEABLE_VALUE: &str = "unable to parse";

/// How collection-shaped fields are flattened. Both behaviors exist in the
/// schema's history; `Joined` is the canonical mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Map each element, then comma-join into a single string.
    Joined,
    /// Keep the extracted values as a string array.
    Array,
}

/// Extracted scalar (or scalar list) form of a field payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Number(f64),
    Bool(bool),
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn render(&self) -> String {
        match self {
            FieldValue::String(value) => value.clone(),
            FieldValue::Number(value) => render_number(*value),
            FieldValue::Bool(value) => value.to_string(),
            FieldValue::List(values) => values
                .iter()
                .map(FieldValue::render)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    pub fn into_attribute(self) -> AttributeValue {
        match self {
            FieldValue::String(value) => AttributeValue::String(value),
            FieldValue::Number(value) => AttributeValue::Number(value),
            FieldValue::Bool(value) => AttributeValue::Bool(value),
            FieldValue::List(values) => {
                AttributeValue::StringList(values.iter().map(FieldValue::render).collect())
            }
        }
    }
}

/// The known provider field shapes, plus an explicit fallback.
enum FieldShape<'a> {
    Primitive(&'a Value),
    Document(&'a Value),
    ValueWrapper(&'a Value),
    NamedReference(&'a Value),
    Collection(&'a Vec<Value>),
    Unrecognized,
}

fn classify(value: &Value) -> FieldShape<'_> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => FieldShape::Primitive(value),
        Value::Array(items) => FieldShape::Collection(items),
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("doc") {
                return FieldShape::Document(value);
            }
            if let Some(inner) = map.get("value") {
                return FieldShape::ValueWrapper(inner);
            }
            // Priority order: name, then id, then key.
            if let Some(named) = map.get("name").or_else(|| map.get("id")).or_else(|| map.get("key")) {
                return FieldShape::NamedReference(named);
            }
            FieldShape::Unrecognized
        }
        Value::Null => FieldShape::Unrecognized,
    }
}

/// Extract a display value from an arbitrarily-shaped field payload.
pub fn extract_value(value: &Value, mode: ListMode) -> FieldValue {
    match classify(value) {
        FieldShape::Primitive(primitive) => extract_primitive(primitive),
        FieldShape::Document(document) => {
            let parsed: AdfNode = match serde_json::from_value(document.clone()) {
                Ok(node) => node,
                Err(_) => return FieldValue::String(UNPARSEABLE_VALUE.to_string()),
            };
            FieldValue::String(document_to_text(&parsed))
        }
        FieldShape::ValueWrapper(inner) => extract_wrapped(inner),
        FieldShape::NamedReference(named) => extract_primitive(named),
        FieldShape::Collection(items) => {
            let extracted: Vec<FieldValue> = items
                .iter()
                .map(|item| extract_value(item, mode))
                .collect();
            match mode {
                ListMode::Joined => FieldValue::String(
                    extracted
                        .iter()
                        .map(FieldValue::render)
                        .collect::<Vec<_>>()
                        .join(","),
                ),
                ListMode::Array => FieldValue::List(extracted),
            }
        }
        FieldShape::Unrecognized => FieldValue::String(UNPARSEABLE_VALUE.to_string()),
    }
}

fn extract_primitive(value: &Value) -> FieldValue {
    match value {
        Value::String(text) => FieldValue::String(text.clone()),
        Value::Number(number) => FieldValue::Number(number.as_f64().unwrap_or(0.0)),
        Value::Bool(flag) => FieldValue::Bool(*flag),
        other => FieldValue::String(other.to_string()),
    }
}

/// `.value` wrappers: objects and arrays are JSON-stringified, numeric-looking
/// strings are parsed to numbers, everything else passes through.
fn extract_wrapped(inner: &Value) -> FieldValue {
    match inner {
        Value::Object(_) | Value::Array(_) => FieldValue::String(inner.to_string()),
        Value::String(text) => {
            if is_decimal_string(text) {
                match text.parse::<f64>() {
                    Ok(number) => FieldValue::Number(number),
                    Err(_) => FieldValue::String(text.clone()),
                }
            } else {
                FieldValue::String(text.clone())
            }
        }
        Value::Number(number) => FieldValue::Number(number.as_f64().unwrap_or(0.0)),
        Value::Bool(flag) => FieldValue::Bool(*flag),
        Value::Null => FieldValue::String(UNPARSEABLE_VALUE.to_string()),
    }
}

/// Plain decimal forms only: optional sign, digits, at most one point.
/// `f64::from_str` would also accept "inf", "NaN", and exponents, which are
/// free text as far as field values go.
fn is_decimal_string(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    if unsigned.is_empty() {
        return false;
    }
    let mut parts = unsigned.splitn(2, '.');
    let integer = parts.next().unwrap_or_default();
    let fraction = parts.next();
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    all_digits(integer) && fraction.map_or(true, all_digits)
}

fn render_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
