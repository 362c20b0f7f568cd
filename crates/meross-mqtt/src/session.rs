//! `MqttSession`: owns the broker `Channel`, the pending-request table, and
//! inbound classification (§4.3, §5 Locking discipline, P10 shutdown
//! safety).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rumqttc::QoS;
use serde_json::Value;
use tracing::{debug, warn};

use meross_protocol::envelope::{Envelope, Method};
use meross_protocol::error::{ErrorKind, MerossError, MerossResult};
use meross_protocol::pending::{PendingRequest, Transport};
use meross_protocol::topics;

use crate::channel::Channel;
use crate::config::MqttSessionConfig;
use crate::error::MqttError;
use crate::handler::{self, Dispatch, IncomingEnvelope};

/// A live or mocked MQTT session for one vendor account connection.
///
/// The pending-request table is a plain `std::sync::Mutex<HashMap<..>>`:
/// locked only for the quick insert/remove/resolve, never held across an
/// `.await` (§5 Locking discipline).
pub struct MqttSession<C: Channel> {
    channel: Arc<C>,
    config: MqttSessionConfig,
    reply_topic: String,
    pending: Mutex<HashMap<String, PendingRequest>>,
}

impl<C: Channel> MqttSession<C> {
    pub fn new(channel: Arc<C>, config: MqttSessionConfig, user_id: &str, client_id: &str) -> Self {
        let reply_topic = topics::client_reply_topic(user_id, client_id);
        Self { channel, config, reply_topic, pending: Mutex::new(HashMap::new()) }
    }

    /// The per-client reply topic placed in `header.from` on outgoing
    /// requests; also subscribed to for replies routed by the server.
    pub fn reply_topic(&self) -> &str {
        &self.reply_topic
    }

    pub async fn subscribe_device(&self, uuid: &str) -> MerossResult<()> {
        self.channel
            .subscribe(&topics::device_publish(uuid), QoS::AtLeastOnce)
            .await
            .map_err(MerossError::from)
    }

    pub async fn subscribe_reply_topic(&self) -> MerossResult<()> {
        self.channel.subscribe(&self.reply_topic, QoS::AtLeastOnce).await.map_err(MerossError::from)
    }

    pub async fn unsubscribe_device(&self, uuid: &str) -> MerossResult<()> {
        self.channel.unsubscribe(&topics::device_publish(uuid)).await.map_err(MerossError::from)
    }

    /// Build, sign, and publish a request; await its reply (or timeout) on a
    /// dedicated oneshot channel keyed by `messageId`.
    pub async fn publish(
        &self,
        uuid: &str,
        device_key: &str,
        method: Method,
        namespace: &str,
        payload: Value,
        timeout: Option<Duration>,
    ) -> MerossResult<Value> {
        let timeout = timeout.unwrap_or_else(|| Duration::from_millis(self.config.request_timeout_ms));
        let envelope = Envelope::new_request(method, namespace, uuid, payload, device_key, self.reply_topic.clone(), "1");
        let message_id = envelope.header.message_id.clone();
        let deadline = Instant::now() + timeout;

        let (request, rx) = PendingRequest::new(message_id.clone(), method, namespace, deadline, Transport::Mqtt);
        {
            let mut table = self.pending.lock().unwrap();
            table.insert(message_id.clone(), request);
        }

        let bytes = serde_json::to_vec(&envelope).map_err(|e| MqttError::Serialization(e.to_string()))?;
        if let Err(e) = self.channel.publish(&topics::device_subscribe(uuid), bytes, QoS::AtMostOnce).await {
            self.pending.lock().unwrap().remove(&message_id);
            return Err(e.into());
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                self.pending.lock().unwrap().remove(&message_id);
                Err(MqttError::Disconnected.into())
            }
            Err(_) => {
                self.pending.lock().unwrap().remove(&message_id);
                Err(MqttError::Timeout { timeout_ms: timeout.as_millis() as u64 }.into())
            }
        }
    }

    /// Feed one inbound MQTT publish into the session.
    ///
    /// Resolves the matching pending request in place for acks and returns
    /// `None`; returns `Some` for unsolicited `PUSH`/`SET` envelopes so the
    /// caller can route them to the push parser.
    pub fn handle_inbound(&self, topic: &str, payload: &[u8]) -> Option<IncomingEnvelope> {
        match handler::classify(topic, payload) {
            Dispatch::Ack { message_id, payload } => {
                let mut table = self.pending.lock().unwrap();
                match table.remove(&message_id) {
                    Some(mut req) => req.resolve(Ok(payload)),
                    None => debug!(message_id, "ack for unknown or already-settled request"),
                }
                None
            }
            Dispatch::Push(incoming) => Some(incoming),
            Dispatch::Unrecognized { topic } => {
                warn!(topic, "unrecognized inbound mqtt message");
                None
            }
        }
    }

    /// Resolve every outstanding request with a disconnect error and clear
    /// the table (P10: no waiter is left hanging across a reconnect).
    pub fn cancel_all(&self) {
        let mut table = self.pending.lock().unwrap();
        for (_, mut req) in table.drain() {
            req.resolve(Err(MerossError::new(ErrorKind::Unconnected, "session disconnected")));
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChannel;

    fn session() -> MqttSession<MockChannel> {
        MqttSession::new(Arc::new(MockChannel::new()), MqttSessionConfig::default(), "user-1", "client-a")
    }

    #[tokio::test]
    async fn publish_resolves_on_matching_ack() {
        let session = session();
        let publish_fut = session.publish(
            "uuid-1",
            "device-key",
            Method::Set,
            "Appliance.Control.ToggleX",
            serde_json::json!({"channel": 0}),
            Some(Duration::from_secs(1)),
        );

        tokio::pin!(publish_fut);
        // Give the publish a moment to register in the pending table, then
        // simulate the device's ack arriving on the device's publish topic.
        tokio::task::yield_now().await;
        assert_eq!(session.pending_count(), 1);

        let sent = session.channel.last_published().expect("request should have been published");
        let sent_envelope: Envelope = serde_json::from_slice(&sent.payload).unwrap();

        let mut ack = sent_envelope.clone();
        ack.header.method = Method::SetAck;
        ack.payload = serde_json::json!({"togglex": {"channel": 0, "onoff": 1}});
        let ack_bytes = serde_json::to_vec(&ack).unwrap();

        assert!(session.handle_inbound("/appliance/uuid-1/publish", &ack_bytes).is_none());

        let reply = publish_fut.await.unwrap();
        assert_eq!(reply["togglex"]["onoff"], 1);
        assert_eq!(session.pending_count(), 0);
    }

    #[tokio::test]
    async fn publish_times_out_without_ack() {
        let session = session();
        let result = session
            .publish(
                "uuid-1",
                "device-key",
                Method::Get,
                "Appliance.System.All",
                serde_json::json!({}),
                Some(Duration::from_millis(20)),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(session.pending_count(), 0);
    }

    #[tokio::test]
    async fn handle_inbound_returns_push_for_unsolicited_messages() {
        let session = session();
        let env = Envelope::new_request(Method::Push, "Appliance.Control.ToggleX", "uuid-1", serde_json::json!({}), "k", "/app/x/subscribe", "1");
        let bytes = serde_json::to_vec(&env).unwrap();
        let incoming = session.handle_inbound("/appliance/uuid-1/publish", &bytes);
        assert!(incoming.is_some());
    }

    #[tokio::test]
    async fn cancel_all_resolves_outstanding_requests_with_error() {
        let session = session();
        let publish_fut = session.publish(
            "uuid-1",
            "device-key",
            Method::Set,
            "Appliance.Control.ToggleX",
            serde_json::json!({}),
            Some(Duration::from_secs(5)),
        );
        tokio::pin!(publish_fut);
        tokio::task::yield_now().await;
        assert_eq!(session.pending_count(), 1);

        session.cancel_all();
        assert_eq!(session.pending_count(), 0);

        let result = publish_fut.await;
        assert!(result.is_err());
    }
}
