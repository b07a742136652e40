use anyhow::bail;
use pkg_constants::countdown::{
    DEFAULT_BATCH_SIZE, DEFAULT_SYNC_INTERVAL_MS, DEFAULT_TICK_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Countdown engine tuning.
///
/// Example `config.yaml` fragment:
/// ```yaml
/// sync-interval-ms: 600000
/// tick-interval-ms: 1000
/// batch-size: 50
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_sync_interval_ms", alias = "sync-interval-ms")]
    pub sync_interval_ms: u64,
    #[serde(default = "default_tick_interval_ms", alias = "tick-interval-ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_batch_size", alias = "batch-size")]
    pub batch_size: usize,
}

fn default_sync_interval_ms() -> u64 {
    DEFAULT_SYNC_INTERVAL_MS
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: DEFAULT_SYNC_INTERVAL_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl EngineConfig {
    /// Reject values that would produce a busy loop or empty batches.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sync_interval_ms == 0 {
            bail!("sync interval must be greater than 0 ms");
        }
        if self.tick_interval_ms == 0 {
            bail!("tick interval must be greater than 0 ms");
        }
        if self.batch_size == 0 {
            bail!("batch size must be at least 1");
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// `countdownctl` configuration file (YAML).
///
/// Example `config.yaml`:
/// ```yaml
/// server: https://api.example.com
/// token: my-secret-token
/// engine:
///   sync-interval-ms: 600000
///   batch-size: 50
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CtlConfigFile {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, alias = "timeout-ms")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub engine: Option<EngineConfig>,
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}
