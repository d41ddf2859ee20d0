//! Shared helpers for the bridge integration tests.

#![allow(dead_code)]

use cardsync_core::{
    ExternalStore, LocalCell, MemoryVariableStore, ObserverCallback, SubscriptionHandle,
    SubscriptionLifecycle, VariableKey,
};
use cardsync_types::{CardSource, SyncConfig, VariableDecl, VariableKind, VariableValue};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const SCOPE: &str = "module_a_dynamic_form";
pub const VARIABLE: &str = "is_liked";

pub const POLL_MS: u64 = 10;
pub const COOLDOWN_MS: u64 = 40;

/// Wait until a condition is met or timeout expires.
/// Returns true if condition was met, false if timed out.
pub async fn wait_until<F>(predicate: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    predicate()
}

pub fn card() -> CardSource {
    CardSource {
        scope_id: SCOPE.to_string(),
        variables: vec![VariableDecl {
            name: VARIABLE.to_string(),
            kind: VariableKind::Boolean,
            value: serde_json::json!(0),
        }],
        document: serde_json::Value::Null,
    }
}

pub fn fast_config() -> SyncConfig {
    SyncConfig { poll_interval_ms: POLL_MS, cooldown_ms: COOLDOWN_MS, ..SyncConfig::default() }
}

pub fn engine_value(store: &dyn ExternalStore) -> Option<VariableValue> {
    store.query(SCOPE, VARIABLE)
}

/// Attach a boolean bridge to a fresh in-memory engine.
pub fn attached(
    config: SyncConfig,
) -> (SubscriptionLifecycle<bool>, Arc<MemoryVariableStore>, LocalCell<bool>) {
    let store = Arc::new(MemoryVariableStore::from_card(&card()));
    let cell = LocalCell::new(false);
    let lifecycle = SubscriptionLifecycle::new(config, cell.clone()).expect("valid config");
    lifecycle.attach(Ok(card()), store.clone()).expect("attach");
    (lifecycle, store, cell)
}

/// Engine whose change notifications arrive `lag` after the write.
pub struct LaggyStore {
    inner: MemoryVariableStore,
    observers: Arc<Mutex<Vec<(u64, ObserverCallback)>>>,
    next_id: AtomicU64,
    lag: Duration,
}

impl LaggyStore {
    pub fn new(lag: Duration) -> Self {
        Self {
            inner: MemoryVariableStore::from_card(&card()),
            observers: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
            lag,
        }
    }

    pub fn write_count(&self) -> u64 {
        self.inner.write_count(SCOPE, VARIABLE)
    }
}

impl ExternalStore for LaggyStore {
    fn update(&self, scope_id: &str, variable: &str, value: &str) {
        self.inner.update(scope_id, variable, value);

        let key = VariableKey::new(scope_id, variable);
        let observers = Arc::clone(&self.observers);
        let lag = self.lag;
        tokio::spawn(async move {
            tokio::time::sleep(lag).await;
            let callbacks: Vec<ObserverCallback> =
                observers.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
            for callback in callbacks {
                callback(&key);
            }
        });
    }

    fn observe(&self, callback: ObserverCallback) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers.lock().push((id, callback));
        SubscriptionHandle::new(id)
    }

    fn query(&self, scope_id: &str, variable: &str) -> Option<VariableValue> {
        self.inner.query(scope_id, variable)
    }

    fn dispose(&self, handle: SubscriptionHandle) {
        self.observers.lock().retain(|(id, _)| *id != handle.id());
    }
}
