//! Typed error definitions for cardsync.
//!
//! Every error here is recoverable from the host's point of view: the worst
//! outcome of any of them is a card view in its failed state or a skipped
//! sync cycle.

mod bridge;
mod card;
mod config;

pub use bridge::BridgeError;
pub use card::CardError;
pub use config::ConfigError;
