//! Declarative card source as handed over by the loader.

use serde::{Deserialize, Serialize};

use super::value::{VariableKind, VariableValue};

/// A variable declared in the card's `variables` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    /// Initial value as written in the document
    #[serde(default)]
    pub value: serde_json::Value,
}

impl VariableDecl {
    /// Typed initial value, or `None` if the literal does not fit the declared kind.
    pub fn initial_value(&self) -> Option<VariableValue> {
        self.kind.from_json(&self.value)
    }
}

/// A successfully parsed card.
///
/// `scope_id` is the stable identifier of the card's variable namespace
/// inside the engine (the card's `log_id`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardSource {
    pub scope_id: String,
    pub variables: Vec<VariableDecl>,
    /// The whole document, for whatever renders it
    pub document: serde_json::Value,
}

impl CardSource {
    pub fn variable(&self, name: &str) -> Option<&VariableDecl> {
        self.variables.iter().find(|v| v.name == name)
    }
}
