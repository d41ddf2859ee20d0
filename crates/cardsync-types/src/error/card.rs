//! Card loading errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a declarative card.
///
/// Any of these puts the hosting view into its failed state; a bridge is
/// never attached to a card that failed to load.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum CardError {
    /// Card file does not exist
    #[error("Card not found: {name}")]
    NotFound {
        /// File name or path that was looked up
        name: String,
    },

    /// Card document is not valid JSON, or could not be read
    #[error("Card parse error: {message}")]
    Parse {
        /// Description of the parse failure
        message: String,
    },

    /// Document parsed but has no `card` object
    #[error("Document has no card object: {path}")]
    MissingCard {
        /// Where the document came from
        path: String,
    },

    /// A declared variable has a value that does not fit its type
    #[error("Invalid variable {name}: {message}")]
    InvalidVariable {
        /// Declared variable name
        name: String,
        /// Why the declaration was rejected
        message: String,
    },
}

impl CardError {
    /// Create a parse error from a serde_json error.
    pub fn from_json_error(e: &serde_json::Error) -> Self {
        Self::Parse { message: e.to_string() }
    }
}
