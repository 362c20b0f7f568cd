//! The registry-owned `Device` entity (§3): descriptor fields plus the
//! mutable, live state the router and push reducer update.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use meross_protocol::change::{Change, ChangeSource};
use meross_protocol::device::{ChannelInfo, DeviceDescriptor, OnlineStatus};
use serde_json::Value;

use crate::state_store::{FeatureStateStore, Projection};

pub struct Device {
    pub descriptor: DeviceDescriptor,
    pub device_key: String,
    pub abilities: HashMap<String, Value>,
    pub channels: Vec<ChannelInfo>,
    pub mac_address: Option<String>,
    pub lan_ip: Option<String>,
    pub mqtt_host: Option<String>,
    pub mqtt_port: Option<u16>,
    pub online_status: OnlineStatus,
    pub encryption_supported: bool,
    pub encryption_key: Option<String>,
    pub last_full_update_timestamp: Option<DateTime<Utc>>,
    state: FeatureStateStore,
}

impl Device {
    pub fn new(descriptor: DeviceDescriptor, device_key: impl Into<String>) -> Self {
        Self {
            online_status: descriptor.online_status,
            descriptor,
            device_key: device_key.into(),
            abilities: HashMap::new(),
            channels: vec![ChannelInfo::master()],
            mac_address: None,
            lan_ip: None,
            mqtt_host: None,
            mqtt_port: None,
            encryption_supported: false,
            encryption_key: None,
            last_full_update_timestamp: None,
            state: FeatureStateStore::new(),
        }
    }

    pub fn uuid(&self) -> &str {
        &self.descriptor.uuid
    }

    /// A `Device` is "connected" only once it has answered a full
    /// `System.All` or provided ability info (§3 invariant).
    pub fn is_connected(&self) -> bool {
        self.online_status == OnlineStatus::Online && self.last_full_update_timestamp.is_some()
    }

    pub fn cached_state(&self, namespace: &str, channel: u32) -> Option<&Projection> {
        self.state.get(namespace, channel)
    }

    pub fn apply_projection(&mut self, namespace: &str, channel: u32, incoming: Projection, tracked_fields: &[&str], source: ChangeSource, now: DateTime<Utc>) -> Vec<Change> {
        self.state.apply(namespace, channel, incoming, tracked_fields, source, now)
    }

    /// `encryptionKey` exists iff encryption is supported AND the MAC
    /// address AND account key are known (§3 invariant 4).
    pub fn derive_encryption_key(&mut self, account_key: &str) {
        if self.encryption_supported {
            if let Some(mac) = self.mac_address.clone() {
                if let Ok(key) = meross_protocol::crypto::derive_device_key(&self.descriptor.uuid, account_key, &mac) {
                    self.encryption_key = Some(hex::encode(key));
                }
            }
        }
    }

    /// Absorb the hardware/firmware/online sections of an `Appliance.System.All`
    /// response into device metadata (§4.6 "System.All absorption"). Digest
    /// sections are routed to feature reducers by the caller, not here.
    pub fn absorb_system_all(&mut self, all: &Value, now: DateTime<Utc>) {
        let system = all.get("all").and_then(|a| a.get("system"));

        if let Some(hardware) = system.and_then(|s| s.get("hardware")) {
            if let Some(mac) = hardware.get("macAddress").and_then(Value::as_str) {
                self.mac_address = Some(mac.to_string());
            }
        }

        if let Some(firmware) = system.and_then(|s| s.get("firmware")) {
            if let Some(ip) = firmware.get("innerIp").and_then(Value::as_str) {
                self.lan_ip = Some(ip.to_string());
            }
            if let Some(server) = firmware.get("server").and_then(Value::as_str) {
                self.mqtt_host = Some(server.to_string());
            }
            if let Some(port) = firmware.get("port").and_then(Value::as_u64) {
                self.mqtt_port = Some(port as u16);
            }
        }

        if let Some(status) = system.and_then(|s| s.get("online")).and_then(|o| o.get("status")).and_then(Value::as_i64) {
            self.set_online_status(OnlineStatus::from_vendor_code(status));
        }

        self.last_full_update_timestamp = Some(now);
    }

    /// Transition online status. Per §3 invariant 2 this is monotonic per
    /// notification timestamp; callers are responsible for not calling this
    /// with a stale timestamp (the registry enforces ordering, not this
    /// setter).
    pub fn set_online_status(&mut self, status: OnlineStatus) -> Option<(OnlineStatus, OnlineStatus)> {
        if status == self.online_status {
            return None;
        }
        let previous = self.online_status;
        self.online_status = status;
        Some((previous, status))
    }
}
