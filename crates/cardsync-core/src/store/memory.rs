//! In-process engine variable store.
//!
//! Behaves like a declarative engine's storage: variables are declared with
//! a type by the card that owns them, `update` takes the engine's raw string
//! form and converts it per declared type, and every accepted write notifies
//! all observers (writes of an unchanged value included).

use cardsync_types::{CardSource, VariableKind, VariableValue};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use super::{ExternalStore, ObserverCallback, SubscriptionHandle, VariableKey};

#[derive(Debug, Clone)]
struct StoredVariable {
    kind: VariableKind,
    value: VariableValue,
    writes: u64,
}

/// Engine store kept entirely in memory
pub struct MemoryVariableStore {
    variables: RwLock<HashMap<VariableKey, StoredVariable>>,
    observers: DashMap<u64, ObserverCallback>,
    next_observer_id: AtomicU64,
    notifications: AtomicU64,
}

impl Default for MemoryVariableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryVariableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryVariableStore")
            .field("variables", &self.variables.read().len())
            .field("observers", &self.observers.len())
            .field("notifications", &self.notifications.load(Ordering::Relaxed))
            .finish()
    }
}

impl MemoryVariableStore {
    pub fn new() -> Self {
        Self {
            variables: RwLock::new(HashMap::new()),
            observers: DashMap::new(),
            next_observer_id: AtomicU64::new(1),
            notifications: AtomicU64::new(0),
        }
    }

    /// Create a store with every variable the card declares.
    ///
    /// Declarations whose initial literal does not fit the declared type are
    /// skipped with a warning, as the engine would.
    pub fn from_card(card: &CardSource) -> Self {
        let store = Self::new();
        store.load_card(card);
        store
    }

    /// Declare (or re-declare) a card's variables. Does not notify observers.
    pub fn load_card(&self, card: &CardSource) {
        let mut variables = self.variables.write();
        for decl in &card.variables {
            match decl.initial_value() {
                Some(value) => {
                    variables.insert(
                        VariableKey::new(card.scope_id.clone(), decl.name.clone()),
                        StoredVariable { kind: decl.kind, value, writes: 0 },
                    );
                },
                None => {
                    warn!(
                        scope = %card.scope_id,
                        variable = %decl.name,
                        kind = %decl.kind,
                        "[Engine] Skipping declaration with ill-typed initial value"
                    );
                },
            }
        }
        debug!(
            scope = %card.scope_id,
            count = card.variables.len(),
            "[Engine] Card variables declared"
        );
    }

    pub fn declare(&self, scope_id: &str, name: &str, value: VariableValue) {
        let kind = value.kind();
        self.variables
            .write()
            .insert(VariableKey::new(scope_id, name), StoredVariable { kind, value, writes: 0 });
    }

    /// The engine's own `set_variable` action, as fired by a card button.
    pub fn set_variable(&self, scope_id: &str, name: &str, raw: &str) {
        debug!(scope = %scope_id, variable = %name, raw = %raw, "[Engine] set_variable action");
        self.write(scope_id, name, raw);
    }

    /// Number of accepted writes to one variable, from `update` and actions alike.
    pub fn write_count(&self, scope_id: &str, name: &str) -> u64 {
        self.variables
            .read()
            .get(&VariableKey::new(scope_id, name))
            .map_or(0, |v| v.writes)
    }

    pub fn notification_count(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn write(&self, scope_id: &str, name: &str, raw: &str) {
        let key = VariableKey::new(scope_id, name);
        {
            let mut variables = self.variables.write();
            let Some(stored) = variables.get_mut(&key) else {
                warn!(variable = %key, "[Engine] Write to undeclared variable dropped");
                return;
            };
            let Some(value) = stored.kind.parse_raw(raw) else {
                warn!(
                    variable = %key,
                    kind = %stored.kind,
                    raw = %raw,
                    "[Engine] Write does not parse as declared type, dropped"
                );
                return;
            };
            stored.value = value;
            stored.writes += 1;
        }
        self.notify(&key);
    }

    fn notify(&self, key: &VariableKey) {
        // Snapshot first: callbacks may re-enter the store (update/observe/dispose).
        let mut callbacks: Vec<(u64, ObserverCallback)> =
            self.observers.iter().map(|e| (*e.key(), e.value().clone())).collect();
        callbacks.sort_by_key(|(id, _)| *id);

        for (id, callback) in callbacks {
            if !self.observers.contains_key(&id) {
                continue;
            }
            self.notifications.fetch_add(1, Ordering::Relaxed);
            callback(key);
        }
    }
}

impl ExternalStore for MemoryVariableStore {
    fn update(&self, scope_id: &str, variable: &str, value: &str) {
        self.write(scope_id, variable, value);
    }

    fn observe(&self, callback: ObserverCallback) -> SubscriptionHandle {
        let id = self.next_observer_id.fetch_add(1, Ordering::Relaxed);
        self.observers.insert(id, callback);
        debug!(observer = id, "[Engine] Observer registered");
        SubscriptionHandle::new(id)
    }

    fn query(&self, scope_id: &str, variable: &str) -> Option<VariableValue> {
        self.variables
            .read()
            .get(&VariableKey::new(scope_id, variable))
            .map(|v| v.value.clone())
    }

    fn dispose(&self, handle: SubscriptionHandle) {
        if self.observers.remove(&handle.id()).is_some() {
            debug!(observer = handle.id(), "[Engine] Observer disposed");
        } else {
            debug!(observer = handle.id(), "[Engine] Dispose of unknown observer ignored");
        }
    }
}
