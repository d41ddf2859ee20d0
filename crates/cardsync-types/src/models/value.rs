//! Variable variants as stored by the rendering engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a card variable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Boolean,
    Integer,
    Number,
    String,
    Color,
    Url,
    Dict,
    Array,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Boolean => write!(f, "boolean"),
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
            Self::Color => write!(f, "color"),
            Self::Url => write!(f, "url"),
            Self::Dict => write!(f, "dict"),
            Self::Array => write!(f, "array"),
        }
    }
}

impl VariableKind {
    /// Parse the raw string form the engine's `update` accepts.
    ///
    /// Booleans are written as `"1"` / `"0"`; `"true"` / `"false"` are
    /// accepted too. Returns `None` when the text does not fit the kind.
    pub fn parse_raw(self, raw: &str) -> Option<VariableValue> {
        match self {
            Self::Boolean => match raw.trim() {
                "1" | "true" => Some(VariableValue::Bool(true)),
                "0" | "false" => Some(VariableValue::Bool(false)),
                _ => None,
            },
            Self::Integer => raw.trim().parse().ok().map(VariableValue::Integer),
            Self::Number => raw.trim().parse().ok().map(VariableValue::Number),
            Self::String => Some(VariableValue::String(raw.to_string())),
            Self::Color => {
                let hex = raw.trim().strip_prefix('#')?;
                let valid = matches!(hex.len(), 3 | 4 | 6 | 8)
                    && hex.chars().all(|c| c.is_ascii_hexdigit());
                valid.then(|| VariableValue::Color(raw.trim().to_string()))
            },
            Self::Url => {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then(|| VariableValue::Url(trimmed.to_string()))
            },
            Self::Dict => match serde_json::from_str(raw) {
                Ok(serde_json::Value::Object(map)) => Some(VariableValue::Dict(map)),
                _ => None,
            },
            Self::Array => match serde_json::from_str(raw) {
                Ok(serde_json::Value::Array(items)) => Some(VariableValue::Array(items)),
                _ => None,
            },
        }
    }

    /// Convert a JSON literal from a card declaration into a typed value.
    ///
    /// Boolean declarations accept JSON booleans as well as `0` / `1`.
    pub fn from_json(self, value: &serde_json::Value) -> Option<VariableValue> {
        use serde_json::Value;

        match (self, value) {
            (Self::Boolean, Value::Bool(b)) => Some(VariableValue::Bool(*b)),
            (Self::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(0) => Some(VariableValue::Bool(false)),
                Some(1) => Some(VariableValue::Bool(true)),
                _ => None,
            },
            (Self::Integer, Value::Number(n)) => n.as_i64().map(VariableValue::Integer),
            (Self::Number, Value::Number(n)) => n.as_f64().map(VariableValue::Number),
            (Self::Dict, Value::Object(map)) => Some(VariableValue::Dict(map.clone())),
            (Self::Array, Value::Array(items)) => Some(VariableValue::Array(items.clone())),
            (Self::String | Self::Color | Self::Url, Value::String(s)) => self.parse_raw(s),
            _ => None,
        }
    }
}

/// A variable's current value inside the engine's store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum VariableValue {
    #[serde(rename = "boolean")]
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Color(String),
    Url(String),
    Dict(serde_json::Map<String, serde_json::Value>),
    Array(Vec<serde_json::Value>),
}

impl VariableValue {
    pub fn kind(&self) -> VariableKind {
        match self {
            Self::Bool(_) => VariableKind::Boolean,
            Self::Integer(_) => VariableKind::Integer,
            Self::Number(_) => VariableKind::Number,
            Self::String(_) => VariableKind::String,
            Self::Color(_) => VariableKind::Color,
            Self::Url(_) => VariableKind::Url,
            Self::Dict(_) => VariableKind::Dict,
            Self::Array(_) => VariableKind::Array,
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) | Self::Color(s) | Self::Url(s) => write!(f, "{}", s),
            Self::Dict(map) => write!(f, "{}", serde_json::Value::Object(map.clone())),
            Self::Array(items) => write!(f, "{}", serde_json::Value::Array(items.clone())),
        }
    }
}
