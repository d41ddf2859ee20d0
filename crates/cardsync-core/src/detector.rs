//! Local change detection.
//!
//! The hosting UI gives no callback when the user edits the cell, so the
//! poller compares the cell against its observed marker on a fixed
//! interval. In notify mode the same check runs on every change signal
//! from the cell instead.

use cardsync_types::{DetectionMode, SyncConfig, SyncOutcome};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::bridge::SyncBridge;
use crate::value::SyncValue;

/// Drives [`SyncBridge::push_local_to_external`] from local edits.
pub struct ChangePoller<T: SyncValue> {
    bridge: SyncBridge<T>,
    mode: DetectionMode,
    period: Duration,
}

impl<T: SyncValue> ChangePoller<T> {
    pub fn new(bridge: SyncBridge<T>, config: &SyncConfig) -> Self {
        Self { bridge, mode: config.detection, period: config.poll_interval() }
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    /// One detection step: move the marker forward if the cell changed and
    /// hand the new value to the bridge. `None` when nothing changed.
    pub fn check_once(&self) -> Option<SyncOutcome> {
        let value = self.bridge.cell().take_local_delta()?;
        debug!(bridge = %self.bridge.id(), value = ?value, "[Poller] Local change detected");
        Some(self.bridge.push_local_to_external(value))
    }

    /// Run until the bridge shuts down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                bridge = %self.bridge.id(),
                mode = %self.mode,
                period_ms = self.period.as_millis() as u64,
                "[Poller] Change detection started"
            );
            match self.mode {
                DetectionMode::Poll => self.poll_loop().await,
                DetectionMode::Notify => self.notify_loop().await,
            }
            debug!(bridge = %self.bridge.id(), "[Poller] Change detection stopped");
        })
    }

    async fn poll_loop(&self) {
        let mut shutdown = self.bridge.shutdown_signal();
        if *shutdown.borrow_and_update() {
            return;
        }

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_once();
                }
                _ = shutdown.changed() => break,
            }
        }
    }

    async fn notify_loop(&self) {
        let mut shutdown = self.bridge.shutdown_signal();
        if *shutdown.borrow_and_update() {
            return;
        }
        let mut changes = self.bridge.cell().subscribe();

        // Edits made before the loop subscribed.
        self.check_once();

        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.check_once();
                }
                _ = shutdown.changed() => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalCell;
    use crate::store::{ExternalStore, MemoryVariableStore};
    use cardsync_types::{SuppressReason, VariableValue};
    use std::sync::Arc;

    const SCOPE: &str = "baseline";

    fn bridge(config: &SyncConfig) -> (SyncBridge<bool>, Arc<MemoryVariableStore>) {
        let store = Arc::new(MemoryVariableStore::new());
        store.declare(SCOPE, "is_liked", VariableValue::Bool(false));
        let bridge = SyncBridge::new(config, SCOPE, LocalCell::new(false));
        bridge.connect(store.clone());
        (bridge, store)
    }

    #[tokio::test]
    async fn test_check_once_reports_each_change_once() {
        let config = SyncConfig::default();
        let (bridge, store) = bridge(&config);
        let poller = ChangePoller::new(bridge.clone(), &config);

        assert_eq!(poller.check_once(), None);

        bridge.cell().set(true);
        assert_eq!(poller.check_once(), Some(SyncOutcome::Propagated));
        assert_eq!(poller.check_once(), None);
        assert_eq!(store.query(SCOPE, "is_liked"), Some(VariableValue::Bool(true)));

        bridge.cell().set(false);
        assert_eq!(
            poller.check_once(),
            Some(SyncOutcome::Suppressed(SuppressReason::AlreadyPropagating))
        );
        bridge.shutdown();
    }

    #[tokio::test]
    async fn test_poll_loop_pushes_local_edit() {
        let config = SyncConfig { poll_interval_ms: 10, cooldown_ms: 20, ..SyncConfig::default() };
        let (bridge, store) = bridge(&config);
        let handle = ChangePoller::new(bridge.clone(), &config).spawn();

        bridge.cell().set(true);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.query(SCOPE, "is_liked"), Some(VariableValue::Bool(true)));

        bridge.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_notify_loop_pushes_local_edit() {
        let config = SyncConfig {
            detection: DetectionMode::Notify,
            cooldown_ms: 20,
            ..SyncConfig::default()
        };
        let (bridge, store) = bridge(&config);
        let handle = ChangePoller::new(bridge.clone(), &config).spawn();
        tokio::task::yield_now().await;

        bridge.cell().set(true);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.query(SCOPE, "is_liked"), Some(VariableValue::Bool(true)));

        bridge.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_loop_exits_when_already_shut_down() {
        let config = SyncConfig::default();
        let (bridge, _store) = bridge(&config);
        bridge.shutdown();

        let handle = ChangePoller::new(bridge, &config).spawn();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
