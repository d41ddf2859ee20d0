//! The local reactive slot owned by the hosting UI.
//!
//! Besides the value itself the cell keeps the change detector's
//! *observed* marker (the last value the detector has accounted for). Both
//! live under one lock: an engine-driven write updates the marker and the
//! value in the same critical section, so the detector can never see the
//! new value without the matching marker and mistake it for a user edit.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::value::SyncValue;

/// Who performed the most recent write to the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// The hosting UI (a user edit)
    Local,
    /// The bridge, applying an engine-side change
    External,
}

#[derive(Debug)]
struct CellState<T> {
    value: T,
    observed: T,
    version: u64,
    origin: Origin,
}

struct CellShared<T> {
    state: Mutex<CellState<T>>,
    changes: watch::Sender<u64>,
}

/// Shared, cloneable handle to a local value slot.
pub struct LocalCell<T> {
    shared: Arc<CellShared<T>>,
}

impl<T> Clone for LocalCell<T> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<T: SyncValue> std::fmt::Debug for LocalCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("LocalCell")
            .field("value", &state.value)
            .field("observed", &state.observed)
            .field("version", &state.version)
            .field("origin", &state.origin)
            .finish()
    }
}

impl<T: SyncValue> LocalCell<T> {
    pub fn new(value: T) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            shared: Arc::new(CellShared {
                state: Mutex::new(CellState {
                    observed: value.clone(),
                    value,
                    version: 0,
                    origin: Origin::Local,
                }),
                changes,
            }),
        }
    }

    pub fn get(&self) -> T {
        self.shared.state.lock().value.clone()
    }

    /// User-side write. Setting the current value is a no-op.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        let version = {
            let mut state = self.shared.state.lock();
            if state.value == value {
                return false;
            }
            state.value = value;
            state.version += 1;
            state.origin = Origin::Local;
            state.version
        };
        self.shared.changes.send_replace(version);
        true
    }

    pub fn version(&self) -> u64 {
        self.shared.state.lock().version
    }

    /// Origin of the most recent write.
    pub fn origin(&self) -> Origin {
        self.shared.state.lock().origin
    }

    /// Last value the change detector has accounted for.
    pub fn observed(&self) -> T {
        self.shared.state.lock().observed.clone()
    }

    /// Change notifications carrying the new version.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.changes.subscribe()
    }

    /// Compare the value against the marker and, on mismatch, move the
    /// marker forward and return the new value. Atomic with respect to
    /// every other cell operation.
    pub(crate) fn take_local_delta(&self) -> Option<T> {
        let mut state = self.shared.state.lock();
        if state.value == state.observed {
            return None;
        }
        state.observed = state.value.clone();
        Some(state.value.clone())
    }

    /// Engine-driven write: marker first, then the value, in one critical section.
    pub(crate) fn apply_external(&self, value: T) {
        let version = {
            let mut state = self.shared.state.lock();
            state.observed = value.clone();
            if state.value == value {
                return;
            }
            state.value = value;
            state.version += 1;
            state.origin = Origin::External;
            state.version
        };
        self.shared.changes.send_replace(version);
    }

    /// Align the marker with the current value (bridge construction).
    pub(crate) fn sync_marker(&self) {
        let mut state = self.shared.state.lock();
        state.observed = state.value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_bumps_version_only_on_change() {
        let cell = LocalCell::new(false);
        assert!(!cell.set(false));
        assert_eq!(cell.version(), 0);

        assert!(cell.set(true));
        assert_eq!(cell.version(), 1);
        assert_eq!(cell.origin(), Origin::Local);
        assert!(cell.get());
    }

    #[test]
    fn test_local_delta_is_taken_once() {
        let cell = LocalCell::new(false);
        assert_eq!(cell.take_local_delta(), None);

        cell.set(true);
        assert_eq!(cell.take_local_delta(), Some(true));
        assert_eq!(cell.take_local_delta(), None);
        assert!(cell.observed());
    }

    #[test]
    fn test_external_write_is_not_a_local_delta() {
        let cell = LocalCell::new(false);

        cell.apply_external(true);

        assert!(cell.get());
        assert!(cell.observed());
        assert_eq!(cell.origin(), Origin::External);
        assert_eq!(cell.take_local_delta(), None);
    }

    #[test]
    fn test_external_write_absorbs_pending_user_edit_of_same_value() {
        let cell = LocalCell::new(false);
        cell.set(true);

        // The engine reports the value the user already typed: nothing left to push.
        cell.apply_external(true);
        assert_eq!(cell.version(), 1);
        assert_eq!(cell.take_local_delta(), None);
    }

    #[tokio::test]
    async fn test_subscribers_see_versions() {
        let cell = LocalCell::new(0_i64);
        let mut rx = cell.subscribe();

        cell.set(5);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);

        cell.apply_external(6);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let cell = LocalCell::new(String::from("a"));
        let other = cell.clone();
        other.set("b".to_string());
        assert_eq!(cell.get(), "b");
    }
}
