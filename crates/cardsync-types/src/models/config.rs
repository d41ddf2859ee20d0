//! Bridge configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

/// How local mutations are detected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Compare against the last observed value on a fixed interval
    #[default]
    Poll,
    /// React to the local cell's change notification
    Notify,
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Poll => write!(f, "poll"),
            Self::Notify => write!(f, "notify"),
        }
    }
}

impl DetectionMode {
    /// Parse from string.
    pub fn from_string(s: &str) -> Self {
        match s {
            "notify" => Self::Notify,
            _ => Self::Poll,
        }
    }
}

/// How the bridge recognizes the echo of its own writes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EchoGuard {
    /// Per-direction circuit breakers released after a fixed cooldown
    #[default]
    Cooldown,
    /// Outbound writes carry a sequence number; matching echoes are consumed
    OriginTag,
}

impl fmt::Display for EchoGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Cooldown => write!(f, "cooldown"),
            Self::OriginTag => write!(f, "origin_tag"),
        }
    }
}

impl EchoGuard {
    /// Parse from string.
    pub fn from_string(s: &str) -> Self {
        match s {
            "origin_tag" | "origin-tag" => Self::OriginTag,
            _ => Self::Cooldown,
        }
    }
}

/// Configuration of one bridge instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Overrides the card's own scope id when set
    pub scope_id: Option<String>,
    /// Name of the synchronized variable
    pub variable: String,
    /// Poll period for local change detection (ms)
    pub poll_interval_ms: u64,
    /// Breaker cooldown (ms). Must exceed the engine's propagation latency.
    pub cooldown_ms: u64,
    pub detection: DetectionMode,
    pub echo_guard: EchoGuard,
    /// Outstanding outbound writes remembered by the origin-tag guard
    pub echo_ledger_capacity: usize,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self {
            scope_id: None,
            variable: "is_liked".to_string(),
            poll_interval_ms: 50,
            cooldown_ms: 50,
            detection: DetectionMode::Poll,
            echo_guard: EchoGuard::Cooldown,
            echo_ledger_capacity: 8,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.variable.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "variable".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidField {
                field: "poll_interval_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.cooldown_ms == 0 {
            return Err(ConfigError::InvalidField {
                field: "cooldown_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.echo_ledger_capacity == 0 {
            return Err(ConfigError::InvalidField {
                field: "echo_ledger_capacity".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
