use serde::Deserialize;

/// Raw YAML representation of the master's startup config file.
#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub bind_address: String,
    #[serde(default = "default_store_backend")]
    pub store_backend: String,
    #[serde(default = "default_true")]
    pub runtime_recover_enable: bool,
    #[serde(default = "default_retry_kill_interval_ms")]
    pub retry_kill_interval_ms: u64,
    #[serde(default = "default_kill_timeout_secs")]
    pub kill_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    pub auth_token: String,
    /// Fixed node directory (§4.I `QueryNodes()` stand-in), empty by
    /// default for single-process/test configs that never register a node.
    #[serde(default)]
    pub nodes: Vec<RawNode>,
}

#[derive(Debug, Deserialize)]
pub struct RawNode {
    pub id: String,
    pub address: String,
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_true() -> bool {
    true
}

/// Matches `fmaster_signal::retry::DEFAULT_RETRY_KILL_INTERVAL`.
fn default_retry_kill_interval_ms() -> u64 {
    15_000
}

/// Matches `fmaster_signal::retry::DEFAULT_KILL_TIMEOUT` (`g_killTimeout`, §6).
fn default_kill_timeout_secs() -> u64 {
    30
}

/// Matches `fmaster_reconciler::DEFAULT_SWEEP_INTERVAL`.
fn default_sweep_interval_secs() -> u64 {
    30
}
