//! Engine configuration with environment-independent defaults.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::EngineError;
use crate::profiles::{DEFAULT_CPU_SHARE_WEIGHT, DEFAULT_MEMORY_LIMIT_BYTES};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Seconds to wait for the Docker daemon to answer the startup probe.
    pub ping_timeout_secs: u64,
    /// Memory ceiling applied to every sandbox container, in bytes.
    pub memory_limit_bytes: i64,
    /// Relative CPU weight applied to every sandbox container.
    pub cpu_share_weight: i64,
    /// Per-language wall-clock timeout overrides, in seconds.
    pub timeout_overrides_secs: HashMap<String, u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ping_timeout_secs: 5,
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            cpu_share_weight: DEFAULT_CPU_SHARE_WEIGHT,
            timeout_overrides_secs: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&raw)
            .map_err(|e| EngineError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }
}
