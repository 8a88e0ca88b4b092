//! Application-level configuration loading: court layout, admin secret and timings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{
    board::{BoardLayout, MIN_COURTS},
    capability::AdminKey,
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BADMINTON_BOARD_CONFIG_PATH";
/// Environment variable that overrides the admin secret from the file.
const ADMIN_KEY_ENV: &str = "BADMINTON_BOARD_ADMIN_KEY";

const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    admin_key: AdminKey,
    layout: BoardLayout,
    write_timeout: Duration,
    tick_interval: Duration,
}

impl AppConfig {
    /// Load the configuration from disk and the environment, falling back to defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded board configuration");
                    raw
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    RawConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                RawConfig::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                RawConfig::default()
            }
        };

        let mut config = Self::from(raw);
        if let Some(secret) = env::var(ADMIN_KEY_ENV).ok().filter(|value| !value.is_empty()) {
            config.admin_key = AdminKey::new(Some(secret));
        }
        if !config.admin_key.is_configured() {
            warn!("no admin key configured; privileged requests will be rejected");
        }
        config
    }

    /// Replace the admin secret.
    pub fn with_admin_key(mut self, secret: impl Into<String>) -> Self {
        self.admin_key = AdminKey::new(Some(secret.into()));
        self
    }

    /// Override the per-write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Key privileged callers must present.
    pub fn admin_key(&self) -> &AdminKey {
        &self.admin_key
    }

    /// Court layout derived from the configured court count.
    pub fn layout(&self) -> BoardLayout {
        self.layout
    }

    /// Upper bound on a single collection write.
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Period of the court clock broadcast.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    admin_key: Option<String>,
    courts: Option<usize>,
    write_timeout_ms: Option<u64>,
    tick_interval_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            admin_key: AdminKey::new(value.admin_key),
            layout: BoardLayout::new(value.courts.unwrap_or(MIN_COURTS)),
            write_timeout: Duration::from_millis(
                value
                    .write_timeout_ms
                    .filter(|ms| *ms > 0)
                    .unwrap_or(DEFAULT_WRITE_TIMEOUT_MS),
            ),
            tick_interval: Duration::from_millis(
                value
                    .tick_interval_ms
                    .filter(|ms| *ms > 0)
                    .unwrap_or(DEFAULT_TICK_INTERVAL_MS),
            ),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
