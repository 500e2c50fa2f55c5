use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::ConfigError;
use crate::raw::RawConfig;

/// Metadata-store backend the master should dial on startup. Only `Memory`
/// is implemented today; the field exists so a real backend (etcd, as
/// spec.md's key layout assumes) can be added without a config-format
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
}

/// Fully parsed, typed startup configuration for the master (§7 ambient
/// additions): bind address, store backend, and the tunables spec.md names
/// by their original field names (`runtimeRecoverEnable`,
/// `retryKillIntervalMs`, `g_killTimeout`).
#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub bind_address: String,
    pub store_backend: StoreBackend,
    pub runtime_recover_enable: bool,
    pub retry_kill_interval: Duration,
    pub kill_timeout: Duration,
    pub sweep_interval: Duration,
    pub auth_token: String,
    /// `(node id, address)` pairs for the fixed node directory (§4.I).
    pub nodes: Vec<(String, String)>,
}

/// Load and validate the master's YAML config file.
pub fn load_master_config(path: &Path) -> Result<MasterConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let raw: RawConfig = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
        path: path.display().to_string(),
        source: e,
    })?;

    debug!(path = %path.display(), "loaded master config");
    convert(raw, path)
}

fn convert(raw: RawConfig, path: &Path) -> Result<MasterConfig, ConfigError> {
    let store_backend = match raw.store_backend.as_str() {
        "memory" => StoreBackend::Memory,
        other => {
            return Err(ConfigError::Conversion {
                path: path.display().to_string(),
                message: format!("unknown store backend '{}'", other),
            })
        }
    };

    if raw.auth_token.is_empty() {
        return Err(ConfigError::Conversion {
            path: path.display().to_string(),
            message: "auth_token must not be empty".to_string(),
        });
    }

    Ok(MasterConfig {
        bind_address: raw.bind_address,
        store_backend,
        runtime_recover_enable: raw.runtime_recover_enable,
        retry_kill_interval: Duration::from_millis(raw.retry_kill_interval_ms),
        kill_timeout: Duration::from_secs(raw.kill_timeout_secs),
        sweep_interval: Duration::from_secs(raw.sweep_interval_secs),
        auth_token: raw.auth_token,
        nodes: raw.nodes.into_iter().map(|n| (n.id, n.address)).collect(),
    })
}
