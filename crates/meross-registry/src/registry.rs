//! `Registry`: the lifecycle owner for `Device`/`SubDevice` entities (§4.5).
//!
//! Discovery talks to C2 only; `initialize*` additionally binds a device to
//! C3/C5 and composes its `FeatureSet`, cached per `(deviceType, hwVersion,
//! fwVersion)` so sibling devices of the same model/firmware share one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use meross_http::MerossHttpClient;
use meross_mqtt::{Channel, MqttSession};
use meross_protocol::device::{DeviceDescriptor, OnlineStatus, SubDeviceDescriptor};
use meross_protocol::envelope::Method;
use meross_protocol::error::{ErrorKind, MerossError, MerossResult};
use meross_protocol::Credentials;
use meross_router::{CommandRouter, Target};

use crate::ability::{self, FeatureSet};
use crate::device::Device;
use crate::sub_device::SubDevice;

/// Optional filters accepted by `discover`/`find` (§4.5).
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    pub online_only: bool,
    pub device_types: Option<Vec<String>>,
    pub uuids: Option<Vec<String>>,
}

impl DeviceFilter {
    fn matches_descriptor(&self, descriptor: &DeviceDescriptor) -> bool {
        if self.online_only && descriptor.online_status != OnlineStatus::Online {
            return false;
        }
        if let Some(types) = &self.device_types {
            if !types.iter().any(|t| t == &descriptor.device_type) {
                return false;
            }
        }
        if let Some(uuids) = &self.uuids {
            if !uuids.iter().any(|u| u == &descriptor.uuid) {
                return false;
            }
        }
        true
    }
}

/// A read-only view of a registered `Device`, safe to hand to callers
/// without leaking the internal lock.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub uuid: String,
    pub name: String,
    pub device_type: String,
    pub online_status: OnlineStatus,
    pub mac_address: Option<String>,
    pub lan_ip: Option<String>,
    pub is_connected: bool,
}

impl From<&Device> for DeviceSnapshot {
    fn from(device: &Device) -> Self {
        Self {
            uuid: device.uuid().to_string(),
            name: device.descriptor.name.clone(),
            device_type: device.descriptor.device_type.clone(),
            online_status: device.online_status,
            mac_address: device.mac_address.clone(),
            lan_ip: device.lan_ip.clone(),
            is_connected: device.is_connected(),
        }
    }
}

/// Identifies either a top-level device or a hub-owned sub-device
/// (§4.5 "initializeDevice"/"remove").
#[derive(Debug, Clone)]
pub enum DeviceIdentifier {
    Device(String),
    SubDevice { hub_uuid: String, sub_device_id: String },
}

pub struct Registry<C: Channel> {
    http: Arc<MerossHttpClient>,
    mqtt: Arc<MqttSession<C>>,
    router: Arc<CommandRouter<C>>,
    devices: Mutex<HashMap<String, Device>>,
    sub_devices: Mutex<HashMap<(String, String), SubDevice>>,
    feature_cache: Mutex<HashMap<(String, String, String), Arc<FeatureSet>>>,
}

impl<C: Channel> Registry<C> {
    pub fn new(http: Arc<MerossHttpClient>, mqtt: Arc<MqttSession<C>>, router: Arc<CommandRouter<C>>) -> Self {
        Self {
            http,
            mqtt,
            router,
            devices: Mutex::new(HashMap::new()),
            sub_devices: Mutex::new(HashMap::new()),
            feature_cache: Mutex::new(HashMap::new()),
        }
    }

    /// List descriptors from the vendor API without creating any `Device`
    /// (§4.5 "discover").
    pub async fn discover(&self, creds: &mut Credentials, filter: &DeviceFilter) -> MerossResult<Vec<DeviceDescriptor>> {
        let all = self.http.list_devices(creds).await?;
        Ok(all.into_iter().filter(|d| filter.matches_descriptor(d)).collect())
    }

    /// Discover, then fully initialize every matching device (§4.5
    /// "initialize"). Returns the uuids that initialized successfully. A
    /// single device's failure is logged and skipped rather than aborting
    /// the batch, unless the error is fatal (bad credentials, unknown
    /// device type), in which case it propagates immediately.
    pub async fn initialize(&self, creds: &mut Credentials, filter: &DeviceFilter) -> MerossResult<Vec<String>> {
        let descriptors = self.discover(creds, filter).await?;
        let mut initialized = Vec::new();
        for descriptor in descriptors {
            let uuid = descriptor.uuid.clone();
            match self.initialize_device(creds, descriptor).await {
                Ok(()) => initialized.push(uuid),
                Err(e) if e.is_fatal_for_initialization() => return Err(e),
                Err(e) => warn!(uuid, error = %e, "failed to initialize device, skipping"),
            }
        }
        Ok(initialized)
    }

    /// Fetch `Appliance.System.Ability` and `Appliance.System.All`, compose
    /// (or reuse a cached) `FeatureSet`, subscribe on MQTT, and register the
    /// `Device` (§4.5). If the device is a hub, its sub-devices are fetched
    /// and registered too.
    pub async fn initialize_device(&self, creds: &mut Credentials, descriptor: DeviceDescriptor) -> MerossResult<()> {
        let uuid = descriptor.uuid.clone();
        let target = Target { uuid: uuid.clone(), device_key: creds.key.clone(), lan_ip: None, reply_topic: self.mqtt.reply_topic().to_string() };

        let ability_reply = self.router.dispatch(&target, Method::Get, "Appliance.System.Ability", serde_json::json!({}), None).await?;
        let abilities: HashMap<String, Value> = ability_reply.get("Ability").and_then(Value::as_object).cloned().unwrap_or_default().into_iter().collect();

        let all_reply = self.router.dispatch(&target, Method::Get, "Appliance.System.All", serde_json::json!({}), None).await?;

        let mut device = Device::new(descriptor.clone(), creds.key.clone());
        device.abilities = abilities.clone();
        device.absorb_system_all(&all_reply, Utc::now());
        device.derive_encryption_key(&creds.key);

        self.mqtt.subscribe_device(&uuid).await?;

        let is_hub = ability::is_hub(&abilities);
        let feature_set = self.feature_set_for(&descriptor, &abilities);
        info!(uuid = %uuid, is_hub, namespace_count = feature_set.namespaces().count(), "device initialized");

        self.devices.lock().unwrap().insert(uuid.clone(), device);

        if is_hub {
            if let Err(e) = self.initialize_sub_devices(creds, &uuid, &abilities).await {
                warn!(uuid = %uuid, error = %e, "failed to list sub-devices for hub");
            }
        }

        Ok(())
    }

    async fn initialize_sub_devices(&self, creds: &mut Credentials, hub_uuid: &str, hub_abilities: &HashMap<String, Value>) -> MerossResult<()> {
        let sub_descriptors = self.http.list_sub_devices(creds, hub_uuid).await?;
        let mut table = self.sub_devices.lock().unwrap();
        for sub in sub_descriptors {
            let allowed = ability::filter_hub_abilities_for_sub_device(hub_abilities, &sub.sub_device_type);
            let key = (hub_uuid.to_string(), sub.sub_device_id.clone());
            table.insert(key, SubDevice::new(sub, allowed));
        }
        Ok(())
    }

    /// Ensure `hub_uuid`/`sub_device_id` is registered, initializing the hub
    /// first if it isn't already known (§4.5 "initializeDevice").
    pub async fn initialize_sub_device(&self, creds: &mut Credentials, hub_uuid: &str, sub_device_id: &str) -> MerossResult<()> {
        let hub_known = self.devices.lock().unwrap().contains_key(hub_uuid);
        if !hub_known {
            let descriptors = self.http.list_devices(creds).await?;
            let hub_descriptor = descriptors
                .into_iter()
                .find(|d| d.uuid == hub_uuid)
                .ok_or_else(|| MerossError::new(ErrorKind::NotFound, format!("hub {hub_uuid} not found")))?;
            self.initialize_device(creds, hub_descriptor).await?;
        }

        let known = self.sub_devices.lock().unwrap().contains_key(&(hub_uuid.to_string(), sub_device_id.to_string()));
        if known {
            Ok(())
        } else {
            Err(MerossError::new(ErrorKind::NotFound, format!("sub-device {sub_device_id} not reported by hub {hub_uuid}")))
        }
    }

    /// Unsubscribe, drop from the registry, and (for a hub) cascade to its
    /// sub-devices (§4.5 "remove"). Outstanding MQTT requests aren't tagged
    /// by uuid (see `PendingRequest`), so per-device cancellation on
    /// removal isn't possible here; only a full `MqttSession::cancel_all`
    /// can fail every pending request at once.
    pub async fn remove(&self, identifier: &DeviceIdentifier) -> MerossResult<()> {
        match identifier {
            DeviceIdentifier::Device(uuid) => self.remove_device(uuid).await,
            DeviceIdentifier::SubDevice { hub_uuid, sub_device_id } => {
                self.sub_devices.lock().unwrap().remove(&(hub_uuid.clone(), sub_device_id.clone()));
                Ok(())
            }
        }
    }

    async fn remove_device(&self, uuid: &str) -> MerossResult<()> {
        let removed = self.devices.lock().unwrap().remove(uuid).is_some();
        if !removed {
            return Ok(());
        }
        self.mqtt.unsubscribe_device(uuid).await?;
        self.sub_devices.lock().unwrap().retain(|(hub, _), _| hub != uuid);
        info!(uuid, "device removed");
        Ok(())
    }

    pub fn get(&self, uuid: &str) -> Option<DeviceSnapshot> {
        self.devices.lock().unwrap().get(uuid).map(DeviceSnapshot::from)
    }

    pub fn list(&self) -> Vec<DeviceSnapshot> {
        self.devices.lock().unwrap().values().map(DeviceSnapshot::from).collect()
    }

    pub fn find(&self, filter: &DeviceFilter) -> Vec<DeviceSnapshot> {
        self.devices
            .lock()
            .unwrap()
            .values()
            .filter(|d| {
                if filter.online_only && d.online_status != OnlineStatus::Online {
                    return false;
                }
                if let Some(types) = &filter.device_types {
                    if !types.iter().any(|t| t == &d.descriptor.device_type) {
                        return false;
                    }
                }
                if let Some(uuids) = &filter.uuids {
                    if !uuids.iter().any(|u| u == d.uuid()) {
                        return false;
                    }
                }
                true
            })
            .map(DeviceSnapshot::from)
            .collect()
    }

    /// Directly register an already-constructed `Device`, bypassing
    /// discovery/initialization. Used by tests and by callers restoring a
    /// previously persisted snapshot.
    pub fn insert_device(&self, device: Device) {
        self.devices.lock().unwrap().insert(device.uuid().to_string(), device);
    }

    /// Directly register an already-constructed `SubDevice` under its hub.
    pub fn insert_sub_device(&self, hub_uuid: &str, sub_device_id: &str, sub_device: SubDevice) {
        self.sub_devices.lock().unwrap().insert((hub_uuid.to_string(), sub_device_id.to_string()), sub_device);
    }

    pub fn sub_device_ids_of(&self, hub_uuid: &str) -> Vec<String> {
        self.sub_devices.lock().unwrap().keys().filter(|(hub, _)| hub == hub_uuid).map(|(_, id)| id.clone()).collect()
    }

    /// Run `f` against the live `Device`, if registered.
    pub fn with_device<R>(&self, uuid: &str, f: impl FnOnce(&Device) -> R) -> Option<R> {
        self.devices.lock().unwrap().get(uuid).map(f)
    }

    /// Run `f` against the live `Device`, if registered, with mutable access
    /// (used by the push reducer to merge incoming state).
    pub fn with_device_mut<R>(&self, uuid: &str, f: impl FnOnce(&mut Device) -> R) -> Option<R> {
        self.devices.lock().unwrap().get_mut(uuid).map(f)
    }

    pub fn with_sub_device_mut<R>(&self, hub_uuid: &str, sub_device_id: &str, f: impl FnOnce(&mut SubDevice) -> R) -> Option<R> {
        self.sub_devices.lock().unwrap().get_mut(&(hub_uuid.to_string(), sub_device_id.to_string())).map(f)
    }

    /// Compose (or reuse a cached) `FeatureSet` for `(deviceType, hwVersion,
    /// fwVersion)` (§4.5, §8).
    pub fn feature_set_for(&self, descriptor: &DeviceDescriptor, abilities: &HashMap<String, Value>) -> Arc<FeatureSet> {
        let key = (descriptor.device_type.clone(), descriptor.hardware_version.clone(), descriptor.firmware_version.clone());
        let mut cache = self.feature_cache.lock().unwrap();
        if let Some(set) = cache.get(&key) {
            return Arc::clone(set);
        }
        let set = Arc::new(if ability::is_hub(abilities) { ability::compose_hub(abilities) } else { ability::compose_device(abilities) });
        cache.insert(key, Arc::clone(&set));
        set
    }

    /// The hub's own `FeatureSet`, as reused by its sub-devices for
    /// namespace resolution (§4.5 "SubDevice abilities").
    pub fn feature_set_for_hub(&self, hub_uuid: &str) -> Option<Arc<FeatureSet>> {
        let devices = self.devices.lock().unwrap();
        let hub = devices.get(hub_uuid)?;
        Some(self.feature_set_for(&hub.descriptor, &hub.abilities))
    }
}
