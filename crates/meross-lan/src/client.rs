//! Direct HTTP POST to a device's LAN IP (C4, spec §4.4 step 4, §6).

use std::time::Duration;

use meross_protocol::envelope::Envelope;
use meross_protocol::error::MerossResult;

use crate::config::LanConfig;
use crate::error::LanError;

/// POSTs signed envelopes straight to a device's `http://<lanIp>/config`
/// endpoint. No discovery: the caller already knows `lan_ip` (set on the
/// device descriptor from a prior `System.All` response).
pub struct LanClient {
    http: reqwest::Client,
    config: LanConfig,
}

impl LanClient {
    pub fn new(config: LanConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("failed to build reqwest client");
        Self { http, config }
    }

    /// Send a pre-built, already-signed envelope and return the device's
    /// reply envelope's payload. The response is the same `{header,
    /// payload}` shape as an MQTT reply (§6).
    pub async fn send(&self, lan_ip: &str, envelope: &Envelope) -> MerossResult<serde_json::Value> {
        let url = format!("http://{lan_ip}/config");

        let response = self.http.post(&url).json(envelope).send().await.map_err(LanError::Transport)?;

        let reply: Envelope = response.json().await.map_err(LanError::Transport)?;
        Ok(reply.payload)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }
}
