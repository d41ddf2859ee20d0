//! Errors from resolving and persisting the bridge configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to produce a usable [`crate::SyncConfig`].
///
/// A missing `cardsync.json` is not an error (defaults apply); these cover
/// a data directory that cannot be located or written, a file that is not a
/// config document, and values the bridge cannot run with.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// `CARDSYNC_DATA_DIR` is unset and there is no home directory to put
    /// `.cardsync` in
    #[error("No data directory: set CARDSYNC_DATA_DIR")]
    NoDataDir,

    /// The config file exists but could not be read
    #[error("Cannot read config {path}: {message}")]
    Unreadable { path: String, message: String },

    /// The config file is not a `cardsync.json` document
    #[error("Malformed config: {message}")]
    Malformed { message: String },

    /// A field (or its environment override) the bridge cannot run with
    #[error("Invalid config field {field}: {message}")]
    InvalidField { field: String, message: String },

    /// Creating the data directory or saving the file failed
    #[error("Cannot write config: {message}")]
    Io { message: String },
}

impl ConfigError {
    pub fn from_json_error(e: &serde_json::Error) -> Self {
        Self::Malformed { message: e.to_string() }
    }

    pub fn from_io_error(e: &std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}
