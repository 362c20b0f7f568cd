//! LAN HTTP transport configuration.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LanConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for LanConfig {
    fn default() -> Self {
        Self { timeout_ms: default_timeout_ms() }
    }
}
