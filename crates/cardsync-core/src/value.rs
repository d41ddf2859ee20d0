//! Mapping between the bridge's local value type and engine variants.
//!
//! Decoding never fails: an absent variable or a variant of the wrong kind
//! becomes the type's zero value so the sync path keeps running.

use cardsync_types::{VariableKind, VariableValue};
use std::fmt::Debug;
use tracing::debug;

/// A value that can live in both the local cell and the engine's store.
pub trait SyncValue: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Variable kind this type expects to find in the engine
    const KIND: VariableKind;

    /// Raw string form accepted by the engine's `update`.
    fn encode(&self) -> String;

    /// Decode a queried variant; unexpected or absent kinds yield the default.
    fn decode(value: Option<&VariableValue>) -> Self;
}

fn log_decode_fallback(expected: VariableKind, found: Option<&VariableValue>) {
    debug!(
        expected = %expected,
        found = ?found.map(VariableValue::kind),
        "Variant does not decode, using default"
    );
}

impl SyncValue for bool {
    const KIND: VariableKind = VariableKind::Boolean;

    fn encode(&self) -> String {
        let digit = if *self { "1" } else { "0" };
        digit.to_string()
    }

    fn decode(value: Option<&VariableValue>) -> Self {
        match value {
            Some(VariableValue::Bool(b)) => *b,
            other => {
                log_decode_fallback(Self::KIND, other);
                false
            },
        }
    }
}

impl SyncValue for i64 {
    const KIND: VariableKind = VariableKind::Integer;

    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(value: Option<&VariableValue>) -> Self {
        match value {
            Some(VariableValue::Integer(i)) => *i,
            other => {
                log_decode_fallback(Self::KIND, other);
                0
            },
        }
    }
}

impl SyncValue for String {
    const KIND: VariableKind = VariableKind::String;

    fn encode(&self) -> String {
        self.clone()
    }

    fn decode(value: Option<&VariableValue>) -> Self {
        match value {
            Some(VariableValue::String(s)) => s.clone(),
            other => {
                log_decode_fallback(Self::KIND, other);
                String::new()
            },
        }
    }
}
