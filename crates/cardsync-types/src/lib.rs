//! # cardsync Types
//!
//! Core types, models, and error definitions for cardsync.
//!
//! - **`error`** - Typed error hierarchy for card loading, configuration, and the bridge
//! - **`models`** - Engine variable variants, card declarations, bridge config, sync outcomes
//!
//! ## Architecture Role
//!
//! `cardsync-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!         cardsync-types (this crate)
//!                 │
//!                 ▼
//!          cardsync-core
//!                 │
//!                 ▼
//!          cardsync-demo
//! ```

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{BridgeError, CardError, ConfigError};

// Re-export core model types
pub use models::{
    BridgeState, CardSource, DetectionMode, Direction, EchoGuard, SkipReason, SuppressReason,
    SyncConfig, SyncOutcome, VariableDecl, VariableKind, VariableValue,
};
