//! Publish/subscribe abstraction over the MQTT broker, mockable for tests
//! without a live connection.

use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use uuid::Uuid;

use crate::config::MqttSessionConfig;
use crate::error::MqttResult;

#[async_trait]
pub trait Channel: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> MqttResult<()>;
    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()>;
    async fn unsubscribe(&self, filter: &str) -> MqttResult<()>;
}

/// The live broker connection. Owns the `AsyncClient` half; the `EventLoop`
/// half is returned separately so the caller drives it in a spawned task
/// via `eventloop.poll()`.
pub struct MqttChannel {
    client: AsyncClient,
}

impl MqttChannel {
    /// `username`/`password` per §4.3: `username = userId`,
    /// `password = MD5(userId + accountKey)` (Open Question, resolved in
    /// DESIGN.md).
    pub fn new(config: &MqttSessionConfig, broker_host: &str, user_id: &str, account_key: &str) -> (Self, EventLoop, String) {
        let client_id = format!("{}-{}", config.client_id_prefix, Uuid::new_v4());
        let mut options = MqttOptions::new(&client_id, broker_host, config.broker_port);
        options.set_keep_alive(std::time::Duration::from_secs(config.keepalive_secs.into()));

        let password = hex::encode(md5::compute(format!("{user_id}{account_key}").as_bytes()).0);
        options.set_credentials(user_id, password);

        let (client, eventloop) = AsyncClient::new(options, 256);
        (Self { client }, eventloop, client_id)
    }
}

#[async_trait]
impl Channel for MqttChannel {
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> MqttResult<()> {
        self.client
            .publish(topic, qos, false, payload)
            .await
            .map_err(|e| crate::error::MqttError::Publish(e.to_string()))
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()> {
        self.client
            .subscribe(filter, qos)
            .await
            .map_err(|e| crate::error::MqttError::Subscribe(e.to_string()))
    }

    async fn unsubscribe(&self, filter: &str) -> MqttResult<()> {
        self.client
            .unsubscribe(filter)
            .await
            .map_err(|e| crate::error::MqttError::Subscribe(e.to_string()))
    }
}
