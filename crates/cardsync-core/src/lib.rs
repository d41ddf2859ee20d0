//! # cardsync Core
//!
//! Bidirectional synchronization between a local reactive cell and one
//! variable in a declarative rendering engine.
//!
//! ## Architecture
//!
//! ```text
//! cardsync-core/src/
//! ├── breaker/     # per-direction circuit breakers with timed release
//! ├── store/       # ExternalStore contract + in-memory engine
//! ├── bridge/      # SyncBridge: echo suppression and propagation
//! ├── local.rs     # LocalCell: value + detector marker
//! ├── detector.rs  # ChangePoller: poll or notify local change detection
//! ├── lifecycle.rs # SubscriptionLifecycle: attach / detach ordering
//! ├── card.rs      # CardLoader: card JSON → scope id + declarations
//! └── modules/     # config persistence, logging setup
//! ```

#![allow(
    clippy::significant_drop_tightening,
    reason = "Gate and cell guards are scoped by hand around store calls"
)]

pub mod breaker;
pub mod bridge;
pub mod card;
pub mod detector;
pub mod lifecycle;
pub mod local;
pub mod modules;
pub mod store;
pub mod value;

pub use breaker::{BreakerSummary, CircuitBreaker};
pub use bridge::{SyncBridge, SyncStats, WeakBridge};
pub use card::{BuiltinCard, CardLoader};
pub use detector::ChangePoller;
pub use lifecycle::{SubscriptionLifecycle, ViewState};
pub use local::{LocalCell, Origin};
pub use store::{
    ExternalStore, MemoryVariableStore, ObserverCallback, SubscriptionHandle, VariableKey,
};
pub use value::SyncValue;
