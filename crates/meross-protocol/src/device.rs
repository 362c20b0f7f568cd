//! Descriptor types for devices and sub-devices as reported by the vendor
//! HTTP API (§3). These are immutable once stored; the mutable, live
//! `Device`/`SubDevice` entities that the registry owns are built on top of
//! them in `meross-registry`.

use serde::{Deserialize, Serialize};

/// Online/reachability status as reported by the vendor or last observed
/// locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnlineStatus {
    Unknown,
    NotOnline,
    Online,
    Offline,
    Upgrading,
}

impl OnlineStatus {
    pub fn from_vendor_code(code: i64) -> Self {
        match code {
            1 => OnlineStatus::NotOnline,
            2 => OnlineStatus::Online,
            3 => OnlineStatus::Offline,
            4 => OnlineStatus::Upgrading,
            _ => OnlineStatus::Unknown,
        }
    }
}

/// One row of a `/v1/Device/devList` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "device_type")]
    pub device_type: String,
    #[serde(rename = "sub_type", default)]
    pub sub_type: String,
    pub hardware_version: String,
    pub firmware_version: String,
    pub online_status: OnlineStatus,
    pub domain: String,
    #[serde(default)]
    pub reserved_domain: String,
    #[serde(default)]
    pub device_class: String,
}

/// One row of a `/v1/Hub/getSubDevices` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubDeviceDescriptor {
    pub sub_device_id: String,
    pub sub_device_type: String,
    #[serde(default)]
    pub sub_device_name: String,
    pub hub_uuid: String,
}

/// One channel exposed by a device (a relay, a bulb, a roller axis, ...).
///
/// Master channel is `index == 0` by convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
    pub is_master: bool,
}

impl ChannelInfo {
    pub fn master() -> Self {
        Self { index: 0, name: None, channel_type: None, is_master: true }
    }
}
