use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracker_engine::{BackendSettings, DispatchPolicy, DEFAULT_SAVE_DELAY};

use super::logging::LogDestination;

pub const CONFIG_FILENAME: &str = "tracker.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Quiet window before edits are saved.
    pub save_delay_ms: u64,
    pub dispatch: DispatchPolicy,
    pub log: LogDestination,
    /// Log at debug level instead of info.
    pub verbose: bool,
    pub backend: BackendConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            save_delay_ms: DEFAULT_SAVE_DELAY.as_millis() as u64,
            dispatch: DispatchPolicy::default(),
            log: LogDestination::File,
            verbose: false,
            backend: BackendConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendConfig {
    /// One JSON file per day under `dir`.
    Local { dir: PathBuf },
    /// Hosted REST backend.
    Hosted {
        base_url: String,
        api_key: String,
        #[serde(default = "default_key_column")]
        key_column: String,
        #[serde(default = "default_request_timeout_ms")]
        request_timeout_ms: u64,
        /// Insert the day's row on first save instead of failing.
        #[serde(default = "default_create_missing")]
        create_missing: bool,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local {
            dir: PathBuf::from("tracker_data"),
        }
    }
}

impl BackendConfig {
    /// Settings for the hosted client; `None` for local storage.
    pub fn backend_settings(&self) -> Option<BackendSettings> {
        match self {
            BackendConfig::Local { .. } => None,
            BackendConfig::Hosted {
                base_url,
                api_key,
                key_column,
                request_timeout_ms,
                create_missing,
            } => Some(BackendSettings {
                key_column: key_column.clone(),
                request_timeout: Duration::from_millis(*request_timeout_ms),
                create_missing: *create_missing,
                ..BackendSettings::new(base_url.clone(), api_key.clone())
            }),
        }
    }
}

fn default_key_column() -> String {
    "date".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_create_missing() -> bool {
    true
}

/// Reads the config file; `Ok(None)` when it does not exist.
pub fn load_config(path: &Path) -> anyhow::Result<Option<AppConfig>> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config {path:?}"));
        }
    };
    let config: AppConfig = ron::from_str(&content)
        .with_context(|| format!("failed to parse config {path:?}"))?;
    Ok(Some(config))
}
