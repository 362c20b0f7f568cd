//! Top-level `Manager` configuration: one struct per concern, composed
//! the way the sub-crates expect them, loadable from TOML or built
//! programmatically.

use serde::Deserialize;

use meross_http::HttpConfig;
use meross_lan::LanConfig;
use meross_mqtt::MqttSessionConfig;
use meross_router::RouterConfig;
use meross_subscribe::SubscriptionConfig;

/// Configuration for one `Manager` instance.
///
/// Loading this from a file or environment is out of scope (see
/// `DESIGN.md`'s Non-goals) — callers either construct it programmatically
/// or call [`ManagerConfig::from_file`] themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub mqtt: MqttSessionConfig,
    #[serde(default)]
    pub lan: LanConfig,
    /// `RouterConfig` carries `Duration` fields with no TOML mapping, so
    /// it is programmatic-only — build it with struct-update syntax over
    /// `RouterConfig::default()` rather than through a config file.
    #[serde(skip)]
    pub router: RouterConfig,
    /// Default polling configuration new subscriptions use unless the
    /// caller overrides it per device; programmatic-only for the same
    /// reason as `router`.
    #[serde(skip)]
    pub default_subscription: SubscriptionConfig,
    /// Capacity of each statistics ring buffer.
    #[serde(default = "default_stats_capacity")]
    pub stats_capacity: usize,
}

fn default_stats_capacity() -> usize {
    1000
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            mqtt: MqttSessionConfig::default(),
            lan: LanConfig::default(),
            router: RouterConfig::default(),
            default_subscription: SubscriptionConfig::default(),
            stats_capacity: default_stats_capacity(),
        }
    }
}

impl ManagerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_each_component_default() {
        let config = ManagerConfig::default();
        assert_eq!(config.http.timeout_ms, 10_000);
        assert_eq!(config.mqtt.broker_port, 443);
        assert_eq!(config.stats_capacity, 1000);
    }

    #[test]
    fn deserialize_empty_toml_uses_defaults() {
        let config: ManagerConfig = toml::from_str("").unwrap();
        assert_eq!(config.router.error_budget_max, 5);
    }

    #[test]
    fn deserialize_overrides_nested_fields() {
        let toml = r#"
[http]
timeout_ms = 5000

[mqtt]
broker_port = 8883
"#;
        let config: ManagerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.http.timeout_ms, 5000);
        assert_eq!(config.mqtt.broker_port, 8883);
    }

    #[test]
    fn router_and_subscription_defaults_are_programmatic() {
        let config: ManagerConfig = toml::from_str("").unwrap();
        assert_eq!(config.router.mode, meross_router::TransportMode::LanHttpFirst);
        assert!(config.default_subscription.smart_caching);
    }
}
