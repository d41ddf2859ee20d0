//! Bidirectional sync bridge
//!
//! Keeps one local value and one engine variable equal without letting a
//! change bounce back and forth between the two stores.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  SyncBridge                                                  │
//! │  ├── cell: LocalCell<T>         (value + detector marker)    │
//! │  ├── store: ExternalStore       (connected after card load)  │
//! │  ├── outbound: CircuitBreaker   (local → external)           │
//! │  ├── inbound: CircuitBreaker    (external → local)           │
//! │  └── gate: last synced value, deferred flags, echo ledger    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Echo guards
//!
//! - **Cooldown**: a write engages its direction's breaker, which is released
//!   after a fixed delay. While engaged, changes arriving from the opposite
//!   side are treated as echoes and dropped.
//! - **OriginTag**: outbound writes are recorded with a sequence number and
//!   the engine notification carrying the same value is consumed as their
//!   echo, however late it arrives. A notification carrying any other value
//!   means the engine has overtaken them, and the records are dropped.
//!
//! A change dropped only because a breaker was held is remembered; once both
//! breakers are clear the bridge re-checks both sides and re-issues the
//! latest value if they still disagree.
//!
//! # Locking
//!
//! The gate serializes every check-and-engage decision. It is never held
//! across an [`ExternalStore`] call, because the engine may run observers
//! synchronously inside `update`.

mod ledger;

#[cfg(test)]
mod tests;

use cardsync_types::{
    BridgeState, Direction, EchoGuard, SkipReason, SuppressReason, SyncConfig, SyncOutcome,
};
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::breaker::{BreakerSummary, CircuitBreaker};
use crate::local::LocalCell;
use crate::store::{ExternalStore, ObserverCallback, VariableKey};
use crate::value::SyncValue;
use ledger::EchoLedger;

/// Counters over the bridge's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub outbound_writes: u64,
    pub inbound_applies: u64,
    pub suppressed: u64,
    pub skipped: u64,
    pub outstanding_echoes: usize,
}

#[derive(Debug, Default)]
struct Counters {
    outbound_writes: AtomicU64,
    inbound_applies: AtomicU64,
    suppressed: AtomicU64,
    skipped: AtomicU64,
}

#[derive(Debug)]
struct Gate<T> {
    /// Last value both stores were known to agree on
    last_synced: T,
    deferred_outbound: bool,
    deferred_inbound: bool,
    ledger: EchoLedger<T>,
}

struct BridgeInner<T: SyncValue> {
    id: Uuid,
    scope_id: String,
    variable: String,
    cooldown: Duration,
    echo_guard: EchoGuard,
    cell: LocalCell<T>,
    store: RwLock<Option<Arc<dyn ExternalStore>>>,
    outbound: Arc<CircuitBreaker>,
    inbound: Arc<CircuitBreaker>,
    gate: Mutex<Gate<T>>,
    live: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    counters: Counters,
}

/// Coordinator between a [`LocalCell`] and one engine variable.
///
/// Cheap to clone; clones share state. Must be driven from within a Tokio
/// runtime, since breaker releases are spawned as tasks.
pub struct SyncBridge<T: SyncValue> {
    inner: Arc<BridgeInner<T>>,
}

impl<T: SyncValue> Clone for SyncBridge<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: SyncValue> std::fmt::Debug for SyncBridge<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncBridge")
            .field("id", &self.inner.id)
            .field("scope_id", &self.inner.scope_id)
            .field("variable", &self.inner.variable)
            .field("state", &self.state())
            .field("live", &self.is_live())
            .finish()
    }
}

/// Non-owning handle, held by observer callbacks and release timers.
pub struct WeakBridge<T: SyncValue> {
    inner: Weak<BridgeInner<T>>,
}

impl<T: SyncValue> WeakBridge<T> {
    pub fn upgrade(&self) -> Option<SyncBridge<T>> {
        self.inner.upgrade().map(|inner| SyncBridge { inner })
    }
}

impl<T: SyncValue> SyncBridge<T> {
    /// Build a bridge for `config.variable` in `scope_id`.
    ///
    /// The detector marker is aligned with the cell's current value and both
    /// breakers start clear. No store is connected yet.
    pub fn new(config: &SyncConfig, scope_id: impl Into<String>, cell: LocalCell<T>) -> Self {
        cell.sync_marker();
        let (shutdown_tx, _) = watch::channel(false);
        let initial = cell.get();

        Self {
            inner: Arc::new(BridgeInner {
                id: Uuid::new_v4(),
                scope_id: scope_id.into(),
                variable: config.variable.clone(),
                cooldown: config.cooldown(),
                echo_guard: config.echo_guard,
                cell,
                store: RwLock::new(None),
                outbound: CircuitBreaker::new(Direction::LocalToExternal),
                inbound: CircuitBreaker::new(Direction::ExternalToLocal),
                gate: Mutex::new(Gate {
                    last_synced: initial,
                    deferred_outbound: false,
                    deferred_inbound: false,
                    ledger: EchoLedger::new(config.echo_ledger_capacity),
                }),
                live: AtomicBool::new(true),
                shutdown_tx,
                counters: Counters::default(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn scope_id(&self) -> &str {
        &self.inner.scope_id
    }

    pub fn variable(&self) -> &str {
        &self.inner.variable
    }

    pub fn cell(&self) -> &LocalCell<T> {
        &self.inner.cell
    }

    pub fn echo_guard(&self) -> EchoGuard {
        self.inner.echo_guard
    }

    pub fn downgrade(&self) -> WeakBridge<T> {
        WeakBridge { inner: Arc::downgrade(&self.inner) }
    }

    pub fn connect(&self, store: Arc<dyn ExternalStore>) {
        *self.inner.store.write() = Some(store);
        debug!(bridge = %self.inner.id, scope = %self.inner.scope_id, "[Bridge] Store connected");
    }

    /// Drop the bridge's reference to the store.
    pub fn disconnect(&self) -> Option<Arc<dyn ExternalStore>> {
        self.inner.store.write().take()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.store.read().is_some()
    }

    fn store(&self) -> Option<Arc<dyn ExternalStore>> {
        self.inner.store.read().clone()
    }

    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::Acquire)
    }

    /// Receiver that flips to `true` when the bridge is shut down.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.inner.shutdown_tx.subscribe()
    }

    /// Stop the bridge: every later propagation attempt is skipped, pending
    /// breaker releases are cancelled, and both breakers are cleared.
    ///
    /// Returns `false` if the bridge was already shut down.
    pub fn shutdown(&self) -> bool {
        if !self.inner.live.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.inner.shutdown_tx.send_replace(true);
        self.inner.outbound.reset();
        self.inner.inbound.reset();
        self.inner.gate.lock().ledger.clear();
        info!(bridge = %self.inner.id, scope = %self.inner.scope_id, "[Bridge] Shut down");
        true
    }

    pub fn state(&self) -> BridgeState {
        match self.inner.echo_guard {
            EchoGuard::Cooldown => BridgeState::from_breakers(
                self.inner.outbound.is_engaged(),
                self.inner.inbound.is_engaged(),
            ),
            EchoGuard::OriginTag => {
                if self.inner.gate.lock().ledger.is_empty() {
                    BridgeState::Idle
                } else {
                    BridgeState::PropagatingLocalToExternal
                }
            },
        }
    }

    pub fn breaker(&self, direction: Direction) -> BreakerSummary {
        match direction {
            Direction::LocalToExternal => self.inner.outbound.summary(),
            Direction::ExternalToLocal => self.inner.inbound.summary(),
        }
    }

    pub fn stats(&self) -> SyncStats {
        let c = &self.inner.counters;
        SyncStats {
            outbound_writes: c.outbound_writes.load(Ordering::Relaxed),
            inbound_applies: c.inbound_applies.load(Ordering::Relaxed),
            suppressed: c.suppressed.load(Ordering::Relaxed),
            skipped: c.skipped.load(Ordering::Relaxed),
            outstanding_echoes: self.inner.gate.lock().ledger.len(),
        }
    }

    /// Observer to register with the engine. Holds only a weak reference.
    pub fn observer_callback(&self) -> ObserverCallback {
        let bridge = self.downgrade();
        Arc::new(move |key: &VariableKey| {
            if let Some(bridge) = bridge.upgrade() {
                bridge.handle_external_change(key);
            }
        })
    }

    fn suppressed(&self, direction: Direction, reason: SuppressReason) -> SyncOutcome {
        self.inner.counters.suppressed.fetch_add(1, Ordering::Relaxed);
        debug!(
            bridge = %self.inner.id,
            direction = %direction,
            reason = ?reason,
            "[Bridge] 🚫 Propagation suppressed"
        );
        SyncOutcome::Suppressed(reason)
    }

    fn skipped(&self, reason: SkipReason) -> SyncOutcome {
        self.inner.counters.skipped.fetch_add(1, Ordering::Relaxed);
        SyncOutcome::Skipped(reason)
    }

    /// Push a locally detected change into the engine.
    pub fn push_local_to_external(&self, value: T) -> SyncOutcome {
        const DIRECTION: Direction = Direction::LocalToExternal;

        if !self.is_live() {
            return self.skipped(SkipReason::Detached);
        }
        let Some(store) = self.store() else {
            warn!(
                bridge = %self.inner.id,
                scope = %self.inner.scope_id,
                "[Bridge] ⚠️ Engine store not ready, local change not synced"
            );
            return self.skipped(SkipReason::NotReady);
        };

        {
            let mut gate = self.inner.gate.lock();
            match self.inner.echo_guard {
                EchoGuard::Cooldown => {
                    if self.inner.inbound.is_engaged() {
                        gate.deferred_outbound = true;
                        drop(gate);
                        return self.suppressed(DIRECTION, SuppressReason::OppositeDirectionCooling);
                    }
                    if !self.inner.outbound.try_enter() {
                        gate.deferred_outbound = true;
                        drop(gate);
                        return self.suppressed(DIRECTION, SuppressReason::AlreadyPropagating);
                    }
                },
                EchoGuard::OriginTag => {
                    let seq = gate.ledger.record(value.clone());
                    trace!(bridge = %self.inner.id, seq, "[Bridge] Outbound write tagged");
                },
            }
            gate.last_synced = value.clone();
        }

        info!(
            bridge = %self.inner.id,
            scope = %self.inner.scope_id,
            variable = %self.inner.variable,
            value = ?value,
            "[Bridge] ➡️ Syncing local→external"
        );
        store.update(&self.inner.scope_id, &self.inner.variable, &value.encode());
        self.inner.counters.outbound_writes.fetch_add(1, Ordering::Relaxed);

        if self.inner.echo_guard == EchoGuard::Cooldown {
            self.schedule_release(&self.inner.outbound);
        }
        SyncOutcome::Propagated
    }

    /// Observer entry point: filter, query, decode, then propagate inward.
    pub fn handle_external_change(&self, key: &VariableKey) -> SyncOutcome {
        if !key.matches(&self.inner.scope_id, &self.inner.variable) {
            trace!(bridge = %self.inner.id, key = %key, "[Bridge] Ignoring unrelated variable");
            return SyncOutcome::Skipped(SkipReason::Filtered);
        }
        if !self.is_live() {
            return self.skipped(SkipReason::Detached);
        }
        let Some(store) = self.store() else {
            warn!(
                bridge = %self.inner.id,
                "[Bridge] ⚠️ Engine store not ready, change not queried"
            );
            return self.skipped(SkipReason::NotReady);
        };

        let value = T::decode(store.query(&self.inner.scope_id, &self.inner.variable).as_ref());
        debug!(
            bridge = %self.inner.id,
            key = %key,
            value = ?value,
            "[Bridge] 👁️ Engine variable changed"
        );
        self.push_external_to_local(value)
    }

    /// Apply an engine-side value to the local cell.
    pub fn push_external_to_local(&self, value: T) -> SyncOutcome {
        const DIRECTION: Direction = Direction::ExternalToLocal;

        if !self.is_live() {
            return self.skipped(SkipReason::Detached);
        }

        let mut gate = self.inner.gate.lock();
        match self.inner.echo_guard {
            EchoGuard::Cooldown => {
                if self.inner.outbound.is_engaged() {
                    gate.deferred_inbound = true;
                    drop(gate);
                    return self.suppressed(DIRECTION, SuppressReason::EchoOfOwnWrite);
                }
                if self.inner.cell.get() == value {
                    return self.absorb_unchanged(gate, value);
                }
                if !self.inner.inbound.try_enter() {
                    gate.deferred_inbound = true;
                    drop(gate);
                    return self.suppressed(DIRECTION, SuppressReason::AlreadyPropagating);
                }
            },
            EchoGuard::OriginTag => {
                if let Some(seq) = gate.ledger.consume(&value) {
                    trace!(bridge = %self.inner.id, seq, "[Bridge] Echo matched outbound write");
                    drop(gate);
                    return self.suppressed(DIRECTION, SuppressReason::EchoOfOwnWrite);
                }
                // None of our outstanding writes carried this value: the engine
                // has moved past all of them.
                if !gate.ledger.is_empty() {
                    debug!(
                        bridge = %self.inner.id,
                        overtaken = gate.ledger.len(),
                        "[Bridge] Engine overtook outstanding writes"
                    );
                    gate.ledger.clear();
                }
                if self.inner.cell.get() == value {
                    return self.absorb_unchanged(gate, value);
                }
            },
        }

        info!(
            bridge = %self.inner.id,
            scope = %self.inner.scope_id,
            variable = %self.inner.variable,
            value = ?value,
            "[Bridge] ⬅️ Syncing external→local"
        );
        gate.last_synced = value.clone();
        self.inner.cell.apply_external(value);
        drop(gate);
        self.inner.counters.inbound_applies.fetch_add(1, Ordering::Relaxed);

        if self.inner.echo_guard == EchoGuard::Cooldown {
            self.schedule_release(&self.inner.inbound);
        }
        SyncOutcome::Propagated
    }

    /// The engine reports the value the cell already holds. Nothing to
    /// write, but a pending user edit of the same value is now accounted for.
    fn absorb_unchanged(&self, mut gate: MutexGuard<'_, Gate<T>>, value: T) -> SyncOutcome {
        self.inner.cell.apply_external(value.clone());
        gate.last_synced = value;
        drop(gate);
        self.suppressed(Direction::ExternalToLocal, SuppressReason::Unchanged)
    }

    fn schedule_release(&self, breaker: &Arc<CircuitBreaker>) {
        let bridge = self.downgrade();
        // Detached task: cancelled through the shutdown signal, not the handle.
        drop(breaker.schedule_release(self.inner.cooldown, self.shutdown_signal(), move || {
            if let Some(bridge) = bridge.upgrade() {
                bridge.reconcile();
            }
        }));
    }

    /// Runs after a breaker release. Once both breakers are clear, re-issue
    /// whatever was dropped while they were held, if the stores still disagree.
    fn reconcile(&self) {
        if !self.is_live() || self.inner.outbound.is_engaged() || self.inner.inbound.is_engaged()
        {
            return;
        }

        let (deferred_outbound, deferred_inbound, last_synced) = {
            let mut gate = self.inner.gate.lock();
            (
                std::mem::take(&mut gate.deferred_outbound),
                std::mem::take(&mut gate.deferred_inbound),
                gate.last_synced.clone(),
            )
        };

        if deferred_outbound {
            let local = self.inner.cell.get();
            if local != last_synced {
                debug!(
                    bridge = %self.inner.id,
                    value = ?local,
                    "[Bridge] Re-issuing deferred local change"
                );
                self.push_local_to_external(local);
                return;
            }
        }

        if deferred_inbound {
            let Some(store) = self.store() else {
                return;
            };
            let external =
                T::decode(store.query(&self.inner.scope_id, &self.inner.variable).as_ref());
            if external != last_synced {
                debug!(
                    bridge = %self.inner.id,
                    value = ?external,
                    "[Bridge] Applying deferred engine change"
                );
                self.push_external_to_local(external);
            }
        }
    }
}
