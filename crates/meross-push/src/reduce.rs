//! State reduction (§4.6 "Reduction"): turns a classified push into `Change`
//! records applied against the registry's live `Device`/`SubDevice` state.
//! Never panics on malformed input (§7 "C8 never throws") — anything that
//! doesn't fit the expected shape is logged and dropped.

use std::sync::Arc;

use chrono::Utc;
use meross_mqtt::{Channel, IncomingEnvelope};
use meross_protocol::change::{Change, ChangeSource};
use meross_protocol::device::OnlineStatus;
use meross_registry::Registry;
use serde_json::Value;
use tracing::warn;

use crate::classify::{entries_for, is_hub_namespace};

const ONLINE_NAMESPACE: &str = "Appliance.System.Online";

/// One outcome of reducing a push notification.
#[derive(Debug, Clone)]
pub enum ReducedEvent {
    State(Change),
    Online { uuid: String, previous: OnlineStatus, current: OnlineStatus },
}

pub struct PushReducer<C: Channel> {
    registry: Arc<Registry<C>>,
}

impl<C: Channel> PushReducer<C> {
    pub fn new(registry: Arc<Registry<C>>) -> Self {
        Self { registry }
    }

    /// Reduce one inbound MQTT push into zero or more events. Dropping a
    /// notification for an unregistered device/sub-device is expected
    /// behavior, not an error — devices can be removed while in flight.
    pub fn handle(&self, incoming: IncomingEnvelope) -> Vec<ReducedEvent> {
        let uuid = incoming.uuid;
        let namespace = incoming.envelope.header.namespace;
        let payload = incoming.envelope.payload;

        if namespace == ONLINE_NAMESPACE {
            return self.reduce_online(&uuid, &payload);
        }

        if is_hub_namespace(&namespace) {
            return self.reduce_hub(&uuid, &namespace, &payload);
        }

        self.reduce_device(&uuid, &namespace, &payload)
    }

    fn reduce_online(&self, uuid: &str, payload: &Value) -> Vec<ReducedEvent> {
        let Some(status) = payload.get("online").and_then(|o| o.get("status")).and_then(Value::as_i64) else {
            warn!(uuid, "online push missing status, dropping");
            return Vec::new();
        };
        let current = OnlineStatus::from_vendor_code(status);

        match self.registry.with_device_mut(uuid, |d| d.set_online_status(current)) {
            Some(Some((previous, current))) => vec![ReducedEvent::Online { uuid: uuid.to_string(), previous, current }],
            Some(None) => Vec::new(),
            None => {
                warn!(uuid, "online push for unregistered device, dropping");
                Vec::new()
            }
        }
    }

    fn reduce_device(&self, uuid: &str, namespace: &str, payload: &Value) -> Vec<ReducedEvent> {
        let Some((descriptor, abilities)) = self.registry.with_device(uuid, |d| (d.descriptor.clone(), d.abilities.clone())) else {
            warn!(uuid, namespace, "push for unregistered device, dropping");
            return Vec::new();
        };

        let entries = entries_for(namespace, payload);
        if entries.is_empty() {
            return Vec::new();
        }

        let feature_set = self.registry.feature_set_for(&descriptor, &abilities);
        let handler = feature_set.resolve(namespace);
        let now = Utc::now();

        let mut events = Vec::new();
        for entry in &entries {
            let Some((channel, projection)) = handler.extract(entry) else { continue };
            if let Some(changes) = self.registry.with_device_mut(uuid, |device| {
                device.apply_projection(namespace, channel, projection, handler.projection_fields(), ChangeSource::Push, now)
            }) {
                events.extend(changes.into_iter().map(ReducedEvent::State));
            }
        }
        events
    }

    /// Hub namespaces fan out per entry to the sub-device named by its `id`
    /// field; an entry naming an unknown sub-device is dropped, not an error
    /// (§4.6 "Hub routing").
    fn reduce_hub(&self, hub_uuid: &str, namespace: &str, payload: &Value) -> Vec<ReducedEvent> {
        let Some(feature_set) = self.registry.feature_set_for_hub(hub_uuid) else {
            warn!(hub_uuid, namespace, "push for unregistered hub, dropping");
            return Vec::new();
        };

        let entries = entries_for(namespace, payload);
        let handler = feature_set.resolve(namespace);
        let now = Utc::now();

        let mut events = Vec::new();
        for entry in &entries {
            let Some(sub_id) = entry.get("id").and_then(Value::as_str) else {
                warn!(hub_uuid, namespace, "hub push entry missing id, dropping");
                continue;
            };
            let Some((channel, projection)) = handler.extract(entry) else { continue };

            match self.registry.with_sub_device_mut(hub_uuid, sub_id, |sub| {
                sub.apply_projection(namespace, channel, projection, handler.projection_fields(), ChangeSource::Push, now)
            }) {
                Some(changes) => events.extend(changes.into_iter().map(ReducedEvent::State)),
                None => warn!(hub_uuid, sub_id, "push for unknown sub-device, dropping"),
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meross_http::MerossHttpClient;
    use meross_lan::{LanClient, LanConfig};
    use meross_mqtt::{MockChannel, MqttSession, MqttSessionConfig};
    use meross_protocol::device::{DeviceDescriptor, SubDeviceDescriptor};
    use meross_protocol::envelope::{Envelope, Method};
    use meross_registry::{Device, SubDevice};
    use meross_router::{CommandRouter, RouterConfig};

    fn reducer() -> (PushReducer<MockChannel>, Arc<Registry<MockChannel>>) {
        let http = Arc::new(MerossHttpClient::new(Default::default()));
        let mqtt = Arc::new(MqttSession::new(Arc::new(MockChannel::new()), MqttSessionConfig::default(), "user-1", "client-a"));
        let lan = Arc::new(LanClient::new(LanConfig::default()));
        let router = Arc::new(CommandRouter::new(Arc::clone(&mqtt), lan, RouterConfig::default()));
        let registry = Arc::new(Registry::new(http, mqtt, router));
        (PushReducer::new(Arc::clone(&registry)), registry)
    }

    fn descriptor(uuid: &str, device_type: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            uuid: uuid.into(),
            name: "Plug".into(),
            device_type: device_type.into(),
            sub_type: String::new(),
            hardware_version: "1.0.0".into(),
            firmware_version: "2.1.0".into(),
            online_status: OnlineStatus::Online,
            domain: "iot.example.com".into(),
            reserved_domain: String::new(),
            device_class: String::new(),
        }
    }

    fn incoming(uuid: &str, namespace: &str, payload: Value) -> IncomingEnvelope {
        let envelope = Envelope::new_request(Method::Push, namespace, uuid, payload, "key", "/app/u-c/subscribe", "1");
        IncomingEnvelope { uuid: uuid.to_string(), envelope }
    }

    #[test]
    fn unregistered_device_push_is_dropped_without_panicking() {
        let (reducer, _registry) = reducer();
        let incoming = incoming("unknown-uuid", "Appliance.Control.ToggleX", serde_json::json!({"togglex": {"channel": 0, "onoff": 1}}));
        let events = reducer.handle(incoming);
        assert!(events.is_empty());
    }

    #[test]
    fn online_push_for_unregistered_device_is_dropped() {
        let (reducer, _registry) = reducer();
        let incoming = incoming("unknown-uuid", ONLINE_NAMESPACE, serde_json::json!({"online": {"status": 1}}));
        assert!(reducer.handle(incoming).is_empty());
    }

    #[test]
    fn malformed_online_payload_is_dropped_not_panicked() {
        let (reducer, _registry) = reducer();
        let incoming = incoming("uuid-1", ONLINE_NAMESPACE, serde_json::json!({"not_online": {}}));
        assert!(reducer.handle(incoming).is_empty());
    }

    #[test]
    fn hub_entry_missing_id_is_dropped() {
        let (reducer, _registry) = reducer();
        let incoming = incoming("hub-1", "Appliance.Hub.Sensor.TempHum", serde_json::json!({"tempHum": {"temperature": 215}}));
        assert!(reducer.handle(incoming).is_empty());
    }

    #[test]
    fn unknown_sub_device_id_is_dropped() {
        let (reducer, registry) = reducer();
        let mut hub = Device::new(descriptor("hub-1", "msh300"), "key");
        hub.abilities = [("Appliance.Hub.Sensor.TempHum".to_string(), Value::Null), ("Appliance.Hub.SubdeviceList".to_string(), Value::Null)].into_iter().collect();
        registry.insert_device(hub);

        let incoming = incoming("hub-1", "Appliance.Hub.Sensor.TempHum", serde_json::json!({"tempHum": {"id": "no-such-sub", "temperature": 215}}));
        assert!(reducer.handle(incoming).is_empty());
    }

    #[test]
    fn toggle_push_for_registered_device_emits_state_change() {
        let (reducer, registry) = reducer();
        let mut device = Device::new(descriptor("uuid-1", "mss310"), "key");
        device.abilities = [("Appliance.Control.ToggleX".to_string(), Value::Null)].into_iter().collect();
        registry.insert_device(device);

        let incoming = incoming("uuid-1", "Appliance.Control.ToggleX", serde_json::json!({"togglex": {"channel": 0, "onoff": 1}}));
        let events = reducer.handle(incoming);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ReducedEvent::State(change) => {
                assert_eq!(change.change_type, "isOn");
                assert_eq!(change.new_value, Value::Bool(true));
            }
            other => panic!("expected a state change, got {other:?}"),
        }
    }

    #[test]
    fn hub_sensor_push_routes_to_matching_sub_device() {
        let (reducer, registry) = reducer();
        let mut hub = Device::new(descriptor("hub-1", "msh300"), "key");
        hub.abilities = [("Appliance.Hub.Sensor.TempHum".to_string(), Value::Null), ("Appliance.Hub.SubdeviceList".to_string(), Value::Null)].into_iter().collect();
        registry.insert_device(hub);

        let sub = SubDevice::new(
            SubDeviceDescriptor { sub_device_id: "sub-1".into(), sub_device_type: "ms100".into(), sub_device_name: "Sensor".into(), hub_uuid: "hub-1".into() },
            vec!["Appliance.Hub.Sensor.TempHum".into(), "Appliance.Hub.Online".into()],
        );
        registry.insert_sub_device("hub-1", "sub-1", sub);

        let incoming = incoming("hub-1", "Appliance.Hub.Sensor.TempHum", serde_json::json!({"tempHum": {"id": "sub-1", "temperature": 215, "humidity": 480}}));
        let events = reducer.handle(incoming);
        assert!(!events.is_empty(), "expected at least one state change for the matched sub-device");
    }
}
