//! Bridge lifecycle errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::CardError;

/// Errors surfaced by `attach` / `detach`.
///
/// Propagation itself never errors: a sync attempt that cannot run is
/// reported as a skipped [`SyncOutcome`](crate::SyncOutcome) instead.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum BridgeError {
    /// The card never loaded, so there is nothing to attach to
    #[error("Card failed to load: {0}")]
    Card(#[from] CardError),

    /// `attach` was called on a lifecycle that already owns a bridge
    #[error("Bridge already attached to scope {scope_id}")]
    AlreadyAttached {
        /// Scope of the live bridge
        scope_id: String,
    },

    /// The engine does not declare the variable the bridge is configured for
    #[error("Variable {variable} is not declared in scope {scope_id}")]
    UnknownVariable {
        /// Card scope that was searched
        scope_id: String,
        /// Configured variable name
        variable: String,
    },
}
