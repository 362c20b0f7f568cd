//! Shared test harness wiring every meross-core crate together through a
//! shared `MockChannel`, exercising real code paths across crate
//! boundaries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use meross_http::{HttpConfig, MerossHttpClient};
use meross_lan::{LanClient, LanConfig};
use meross_mqtt::{MockChannel, MqttSession, MqttSessionConfig};
use meross_stats::Statistics;
use meross_protocol::device::{DeviceDescriptor, OnlineStatus, SubDeviceDescriptor};
use meross_protocol::envelope::{Envelope, Method};
use meross_protocol::error::MerossResult;
use meross_push::{PushReducer, ReducedEvent};
use meross_registry::{Device, Registry, SubDevice};
use meross_router::{CommandRouter, RouterConfig, Target};
use meross_subscribe::SubscriptionManager;
use serde_json::Value;
use tokio::task::JoinHandle;

/// Wires C2 (mocked via wiremock in tests that need it), C3 (MQTT over a
/// shared `MockChannel`), C4, C5, C6+C7, C8, and C9 together the way a real
/// caller would, so a test exercises the actual dispatch/reduce/poll code
/// paths rather than stubs.
pub struct TestHarness {
    pub channel: Arc<MockChannel>,
    pub mqtt: Arc<MqttSession<MockChannel>>,
    pub http: Arc<MerossHttpClient>,
    pub router: Arc<CommandRouter<MockChannel>>,
    pub registry: Arc<Registry<MockChannel>>,
    pub reducer: PushReducer<MockChannel>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_configs(RouterConfig::default(), LanConfig::default(), None)
    }

    pub fn with_router_config(router_config: RouterConfig) -> Self {
        Self::with_configs(router_config, LanConfig::default(), None)
    }

    pub fn with_configs(router_config: RouterConfig, lan_config: LanConfig, stats: Option<Arc<tokio::sync::Mutex<Statistics>>>) -> Self {
        let channel = Arc::new(MockChannel::new());
        let mqtt = Arc::new(MqttSession::new(Arc::clone(&channel), MqttSessionConfig::default(), "user-1", "client-a"));
        let mut http_client = MerossHttpClient::new(HttpConfig::default());
        if let Some(stats) = stats {
            http_client = http_client.with_statistics(stats);
        }
        let http = Arc::new(http_client);
        let lan = Arc::new(LanClient::new(lan_config));
        let router = Arc::new(CommandRouter::new(Arc::clone(&mqtt), lan, router_config));
        let registry = Arc::new(Registry::new(Arc::clone(&http), Arc::clone(&mqtt), Arc::clone(&router)));
        let reducer = PushReducer::new(Arc::clone(&registry));
        Self { channel, mqtt, http, router, registry, reducer }
    }

    pub fn subscription_manager(self: &Arc<Self>) -> (Arc<SubscriptionManager<MockChannel>>, tokio::sync::mpsc::UnboundedReceiver<meross_subscribe::SubscriptionEvent>) {
        SubscriptionManager::new(Arc::clone(&self.registry), Arc::clone(&self.router), self.mqtt.reply_topic().to_string())
    }

    pub fn device_descriptor(uuid: &str, device_type: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            uuid: uuid.into(),
            name: "Test Device".into(),
            device_type: device_type.into(),
            sub_type: String::new(),
            hardware_version: "1.0.0".into(),
            firmware_version: "6.1.0".into(),
            online_status: OnlineStatus::Online,
            domain: "iot.meross.com".into(),
            reserved_domain: String::new(),
            device_class: String::new(),
        }
    }

    /// Register a device directly with the given abilities, bypassing
    /// discovery, so a test can drive the router/push/subscribe stack
    /// without standing up a mocked vendor HTTP API.
    pub fn register_device(&self, uuid: &str, device_type: &str, abilities: &[&str]) {
        let mut device = Device::new(Self::device_descriptor(uuid, device_type), "device-key");
        device.abilities = abilities.iter().map(|a| (a.to_string(), Value::Null)).collect();
        self.registry.insert_device(device);
    }

    pub fn register_hub_sub_device(&self, hub_uuid: &str, sub_id: &str, sub_type: &str, allowed: &[&str]) {
        let sub = SubDevice::new(
            SubDeviceDescriptor { sub_device_id: sub_id.into(), sub_device_type: sub_type.into(), sub_device_name: "Sensor".into(), hub_uuid: hub_uuid.into() },
            allowed.iter().map(|a| a.to_string()).collect(),
        );
        self.registry.insert_sub_device(hub_uuid, sub_id, sub);
    }

    /// Simulate an unsolicited device push arriving over MQTT and run it
    /// through the push reducer.
    pub fn push(&self, uuid: &str, namespace: &str, payload: Value) -> Vec<ReducedEvent> {
        let envelope = Envelope::new_request(Method::Push, namespace, uuid, payload, "device-key", "/app/u-c/subscribe", "1");
        let incoming = meross_mqtt::IncomingEnvelope { uuid: uuid.to_string(), envelope };
        self.reducer.handle(incoming)
    }

    /// Drive one `router.dispatch` to completion by acking the request it
    /// publishes on the shared channel, mirroring the request/reply
    /// round-trip a real broker would perform.
    pub async fn dispatch_with_ack(&self, uuid: &str, method: Method, namespace: &str, payload: Value, ack_payload: Value) -> MerossResult<Value> {
        let target = Target { uuid: uuid.to_string(), device_key: "device-key".into(), lan_ip: None, reply_topic: self.mqtt.reply_topic().to_string() };
        let dispatch_fut = self.router.dispatch(&target, method, namespace, payload, Some(Duration::from_secs(2)));
        tokio::pin!(dispatch_fut);
        tokio::task::yield_now().await;

        let sent = self.channel.last_published().expect("router should have published a request");
        self.ack(&sent.payload, method, ack_payload);

        dispatch_fut.await
    }

    fn ack(&self, sent_bytes: &[u8], method: Method, ack_payload: Value) {
        let sent_envelope: Envelope = serde_json::from_slice(sent_bytes).unwrap();
        let mut ack = sent_envelope;
        ack.header.method = if method == Method::Set { Method::SetAck } else { Method::GetAck };
        ack.payload = ack_payload;
        let ack_bytes = serde_json::to_vec(&ack).unwrap();
        assert!(self.mqtt.handle_inbound(&meross_protocol::topics::device_publish(&ack.header.uuid), &ack_bytes).is_none());
    }

    /// Spawn a background task that answers every request published for a
    /// namespace in `responses` as soon as it appears on the channel —
    /// needed for flows like `initialize_device` that issue more than one
    /// sequential request before returning.
    pub fn spawn_auto_responder(self: &Arc<Self>, responses: HashMap<&'static str, Value>) -> JoinHandle<()> {
        let harness = Arc::clone(self);
        let responses: HashMap<String, Value> = responses.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        tokio::spawn(async move {
            let mut seen = 0usize;
            loop {
                tokio::time::sleep(Duration::from_millis(5)).await;
                let published = harness.channel.published();
                for msg in published.iter().skip(seen) {
                    let Ok(sent) = serde_json::from_slice::<Envelope>(&msg.payload) else { continue };
                    let Some(reply) = responses.get(&sent.header.namespace) else { continue };
                    harness.ack(&msg.payload, sent.header.method, reply.clone());
                }
                seen = published.len();
            }
        })
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
