//! Contract of the rendering engine's variable store.
//!
//! The engine is an opaque third-party component. All the bridge gets is an
//! imperative write, a synchronous read, and a change feed that fires for
//! every variable in every scope. No write is acknowledged.
//!
//! ```text
//! ┌──────────────┐  update(scope, var, raw)   ┌─────────────────────┐
//! │  SyncBridge  │ ─────────────────────────▶ │   ExternalStore     │
//! │              │ ◀─── observer(key) ─────── │  (engine variables) │
//! │              │ ──── query(scope, var) ──▶ │                     │
//! └──────────────┘                            └─────────────────────┘
//! ```

mod memory;


pub use memory::MemoryVariableStore;

use cardsync_types::VariableValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifies one variable inside one card scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableKey {
    pub scope_id: String,
    pub name: String,
}

impl VariableKey {
    pub fn new(scope_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { scope_id: scope_id.into(), name: name.into() }
    }

    pub fn matches(&self, scope_id: &str, name: &str) -> bool {
        self.scope_id == scope_id && self.name == name
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope_id, self.name)
    }
}

/// Callback registered with [`ExternalStore::observe`].
///
/// Receives the key that changed and nothing else; the new value has to be
/// fetched with [`ExternalStore::query`].
pub type ObserverCallback = Arc<dyn Fn(&VariableKey) + Send + Sync>;

/// Opaque registration handle returned by `observe`.
///
/// Not `Clone`: whoever holds it owns the registration and releases it by
/// passing it to [`ExternalStore::dispose`].
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping a subscription handle leaks the observer registration"]
pub struct SubscriptionHandle {
    id: u64,
}

impl SubscriptionHandle {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// The engine's variable store, as consumed by the bridge.
pub trait ExternalStore: Send + Sync {
    /// Imperative write. No return value and no delivery guarantee.
    fn update(&self, scope_id: &str, variable: &str, value: &str);

    /// Register a callback for changes to any variable in any scope.
    ///
    /// Callbacks may run synchronously inside `update`, so callers must not
    /// hold locks that the callback needs while writing.
    fn observe(&self, callback: ObserverCallback) -> SubscriptionHandle;

    /// Synchronous read of the current value.
    fn query(&self, scope_id: &str, variable: &str) -> Option<VariableValue>;

    /// Release a registration. No callback is delivered after this returns.
    fn dispose(&self, handle: SubscriptionHandle);
}
