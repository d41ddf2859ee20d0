//! Attach / detach ordering for a bridge owned by a hosting view.
//!
//! Attach: card loaded → bridge connected → observer registered → change
//! detection started. Detach reverses it and is idempotent. A view whose
//! card failed to load never gets a bridge.

use cardsync_types::{BridgeError, CardError, CardSource, ConfigError, SyncConfig};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bridge::SyncBridge;
use crate::detector::ChangePoller;
use crate::local::LocalCell;
use crate::store::{ExternalStore, SubscriptionHandle};
use crate::value::SyncValue;

/// What the hosting view shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ViewState {
    Loading,
    Ready,
    /// Card failed to load; carries the error text
    Failed(String),
    Detached,
}

struct Attachment<T: SyncValue> {
    bridge: SyncBridge<T>,
    store: Arc<dyn ExternalStore>,
    subscription: SubscriptionHandle,
    detector: JoinHandle<()>,
}

/// Owns the bridge, the observer registration and the detector task of
/// one view. Dropping it detaches.
pub struct SubscriptionLifecycle<T: SyncValue> {
    config: SyncConfig,
    cell: LocalCell<T>,
    view_state: RwLock<ViewState>,
    attachment: Mutex<Option<Attachment<T>>>,
}

impl<T: SyncValue> SubscriptionLifecycle<T> {
    pub fn new(config: SyncConfig, cell: LocalCell<T>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            cell,
            view_state: RwLock::new(ViewState::Loading),
            attachment: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn cell(&self) -> &LocalCell<T> {
        &self.cell
    }

    pub fn view_state(&self) -> ViewState {
        self.view_state.read().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.lock().is_some()
    }

    pub fn bridge(&self) -> Option<SyncBridge<T>> {
        self.attachment.lock().as_ref().map(|a| a.bridge.clone())
    }

    /// Attach a bridge to the loaded card. Must run inside a Tokio runtime.
    ///
    /// On a load failure the view moves to [`ViewState::Failed`] and no
    /// observer is registered.
    pub fn attach(
        &self,
        card: Result<CardSource, CardError>,
        store: Arc<dyn ExternalStore>,
    ) -> Result<SyncBridge<T>, BridgeError> {
        let mut attachment = self.attachment.lock();
        if let Some(existing) = attachment.as_ref() {
            return Err(BridgeError::AlreadyAttached {
                scope_id: existing.bridge.scope_id().to_string(),
            });
        }

        let card = match card {
            Ok(card) => card,
            Err(e) => {
                error!(error = %e, "❌ Card failed to load, bridge not attached");
                *self.view_state.write() = ViewState::Failed(e.to_string());
                return Err(e.into());
            },
        };

        let scope_id = self.config.scope_id.clone().unwrap_or_else(|| card.scope_id.clone());
        let Some(decl) = card.variable(&self.config.variable) else {
            let err = BridgeError::UnknownVariable {
                scope_id,
                variable: self.config.variable.clone(),
            };
            error!(error = %err, "❌ Bridge not attached");
            *self.view_state.write() = ViewState::Failed(err.to_string());
            return Err(err);
        };
        if decl.kind != T::KIND {
            warn!(
                variable = %decl.name,
                declared = %decl.kind,
                expected = %T::KIND,
                "Declared type differs from the bridge's, engine values will decode to default"
            );
        }

        let bridge = SyncBridge::new(&self.config, scope_id, self.cell.clone());
        bridge.connect(Arc::clone(&store));
        let subscription = store.observe(bridge.observer_callback());
        let detector = ChangePoller::new(bridge.clone(), &self.config).spawn();

        info!(
            bridge = %bridge.id(),
            scope = %bridge.scope_id(),
            variable = %bridge.variable(),
            detection = %self.config.detection,
            echo_guard = %self.config.echo_guard,
            "🔗 Bridge attached"
        );

        *attachment = Some(Attachment {
            bridge: bridge.clone(),
            store,
            subscription,
            detector,
        });
        *self.view_state.write() = ViewState::Ready;
        Ok(bridge)
    }

    /// Tear down the bridge. Returns `false` if nothing was attached.
    pub fn detach(&self) -> bool {
        let Some(attachment) = self.attachment.lock().take() else {
            debug!("Detach without a live bridge ignored");
            return false;
        };
        let Attachment { bridge, store, subscription, detector } = attachment;

        // Stops the detector loop and cancels pending breaker releases.
        bridge.shutdown();
        detector.abort();
        store.dispose(subscription);
        bridge.disconnect();

        *self.view_state.write() = ViewState::Detached;
        info!(bridge = %bridge.id(), scope = %bridge.scope_id(), "🔌 Bridge detached");
        true
    }
}

impl<T: SyncValue> Drop for SubscriptionLifecycle<T> {
    fn drop(&mut self) {
        self.detach();
    }
}
