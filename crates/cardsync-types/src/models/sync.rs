//! Propagation directions, bridge state, and per-attempt outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a propagation write.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LocalToExternal,
    ExternalToLocal,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::LocalToExternal => write!(f, "local→external"),
            Self::ExternalToLocal => write!(f, "external→local"),
        }
    }
}

/// Bridge state, derived from which breakers are engaged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
    Idle,
    PropagatingLocalToExternal,
    PropagatingExternalToLocal,
    /// Both breakers engaged at once; only seen around cooldown boundaries
    Settling,
}

impl BridgeState {
    pub fn from_breakers(outbound: bool, inbound: bool) -> Self {
        match (outbound, inbound) {
            (false, false) => Self::Idle,
            (true, false) => Self::PropagatingLocalToExternal,
            (false, true) => Self::PropagatingExternalToLocal,
            (true, true) => Self::Settling,
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Idle => write!(f, "idle"),
            Self::PropagatingLocalToExternal => write!(f, "propagating local→external"),
            Self::PropagatingExternalToLocal => write!(f, "propagating external→local"),
            Self::Settling => write!(f, "settling"),
        }
    }
}

/// Why a propagation attempt was dropped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    /// External change is the echo of a write the bridge just issued
    EchoOfOwnWrite,
    /// The opposite direction is still cooling down
    OppositeDirectionCooling,
    /// This direction's breaker is already engaged
    AlreadyPropagating,
    /// The receiving side already holds the value
    Unchanged,
}

/// Why a propagation attempt never ran.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No engine store is connected yet
    NotReady,
    /// The bridge has been torn down
    Detached,
    /// The observer notification was for another scope or variable
    Filtered,
}

/// Result of one propagation attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum SyncOutcome {
    Propagated,
    Suppressed(SuppressReason),
    Skipped(SkipReason),
}
