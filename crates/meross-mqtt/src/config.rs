//! MQTT session configuration.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct MqttSessionConfig {
    /// Broker TLS port (§4.3: always 443 for the vendor broker).
    #[serde(default = "default_broker_port")]
    pub broker_port: u16,
    /// Prefix used when generating the MQTT client ID (`<prefix>-<uuid v4>`).
    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u16,
    /// Default per-request reply timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_broker_port() -> u16 {
    443
}

fn default_client_id_prefix() -> String {
    "app".into()
}

fn default_keepalive_secs() -> u16 {
    30
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for MqttSessionConfig {
    fn default() -> Self {
        Self {
            broker_port: default_broker_port(),
            client_id_prefix: default_client_id_prefix(),
            keepalive_secs: default_keepalive_secs(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}
