//! Core domain models for cardsync.

mod card;
mod config;
mod sync;
mod value;

pub use card::{CardSource, VariableDecl};
pub use config::{DetectionMode, EchoGuard, SyncConfig};
pub use sync::{BridgeState, Direction, SkipReason, SuppressReason, SyncOutcome};
pub use value::{VariableKind, VariableValue};
