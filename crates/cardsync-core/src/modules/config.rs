use cardsync_types::{ConfigError, SyncConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DATA_DIR: &str = ".cardsync";
const CONFIG_FILE: &str = "cardsync.json";

pub const ENV_DATA_DIR: &str = "CARDSYNC_DATA_DIR";
pub const ENV_POLL_MS: &str = "CARDSYNC_POLL_MS";
pub const ENV_COOLDOWN_MS: &str = "CARDSYNC_COOLDOWN_MS";

/// Get data directory path.
///
/// Priority:
/// 1. `CARDSYNC_DATA_DIR` environment variable
/// 2. `~/.cardsync`
///
/// The directory is created if missing.
pub fn get_data_dir() -> Result<PathBuf, ConfigError> {
    let data_dir = if let Ok(custom_dir) = std::env::var(ENV_DATA_DIR) {
        PathBuf::from(custom_dir)
    } else {
        let home = dirs::home_dir().ok_or(ConfigError::NoDataDir)?;
        home.join(DATA_DIR)
    };

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir).map_err(|e| ConfigError::from_io_error(&e))?;
    }

    Ok(data_dir)
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(get_data_dir()?.join(CONFIG_FILE))
}

/// Load the bridge configuration from the data directory, apply environment
/// overrides and validate the result.
pub fn load_config() -> Result<SyncConfig, ConfigError> {
    load_config_at(&config_path()?)
}

/// [`load_config`] for an explicit file instead of the data directory.
pub fn load_config_at(path: &Path) -> Result<SyncConfig, ConfigError> {
    let mut config = load_config_from(path)?;
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Read a config file. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<SyncConfig, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(SyncConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))
}

pub fn save_config(config: &SyncConfig) -> Result<PathBuf, ConfigError> {
    let dir = get_data_dir()?;
    save_config_to(&dir, config)
}

/// Write `cardsync.json` into `dir` atomically (temp file + rename).
pub fn save_config_to(dir: &Path, config: &SyncConfig) -> Result<PathBuf, ConfigError> {
    config.validate()?;

    let config_path = dir.join(CONFIG_FILE);
    let temp_path = dir.join(format!("{}.tmp", CONFIG_FILE));

    let content =
        serde_json::to_string_pretty(config).map_err(|e| ConfigError::from_json_error(&e))?;

    // Atomic write
    fs::write(&temp_path, content).map_err(|e| ConfigError::from_io_error(&e))?;
    fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::from_io_error(&e))?;

    info!(path = %config_path.display(), "💾 Config saved");
    Ok(config_path)
}

pub fn apply_env_overrides(config: &mut SyncConfig) -> Result<(), ConfigError> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply `CARDSYNC_POLL_MS` / `CARDSYNC_COOLDOWN_MS` as returned by `lookup`.
pub fn apply_overrides_from<F>(config: &mut SyncConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_POLL_MS) {
        config.poll_interval_ms = parse_millis(ENV_POLL_MS, &raw)?;
    }
    if let Some(raw) = lookup(ENV_COOLDOWN_MS) {
        config.cooldown_ms = parse_millis(ENV_COOLDOWN_MS, &raw)?;
    }
    Ok(())
}

fn parse_millis(field: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidField {
        field: field.to_string(),
        message: format!("expected milliseconds, got {:?}", raw),
    })
}
