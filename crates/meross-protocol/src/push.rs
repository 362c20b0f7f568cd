//! The `PushNotification` sum type (§3): constructed by C8 on every inbound
//! non-response MQTT message. Classification and normalization live in
//! `meross-push`; this module only defines the shared shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One normalized entry inside a push notification's payload. Firmwares
/// disagree on whether a section is a single object or an array; C8
/// normalizes to this shape before reduction (§4.6 Normalization).
pub type Entries = Vec<Value>;

/// The namespace-tagged variant of an incoming push payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PushPayload {
    ToggleX { entries: Entries },
    LightX { entries: Entries },
    ThermostatMode { entries: Entries },
    HubOnline { entries: Entries },
    HubSensorTempHum { entries: Entries },
    HubSensorSmoke { entries: Entries },
    Online { entries: Entries },
    Bind { entries: Entries },
    Unbind { entries: Entries },
    Alarm { entries: Entries },
    SensorLatestX { entries: Entries },
    DiffuserLight { entries: Entries },
    DiffuserSpray { entries: Entries },
    Garage { entries: Entries },
    Spray { entries: Entries },
    TimerX { entries: Entries },
    TriggerX { entries: Entries },
    RollerPosition { entries: Entries },
    /// Catch-all for unrecognized namespaces (§4.6 Dispatch).
    Generic,
}

impl PushPayload {
    pub fn namespace_label(&self) -> &'static str {
        match self {
            PushPayload::ToggleX { .. } => "ToggleX",
            PushPayload::LightX { .. } => "LightX",
            PushPayload::ThermostatMode { .. } => "ThermostatMode",
            PushPayload::HubOnline { .. } => "HubOnline",
            PushPayload::HubSensorTempHum { .. } => "HubSensorTempHum",
            PushPayload::HubSensorSmoke { .. } => "HubSensorSmoke",
            PushPayload::Online { .. } => "Online",
            PushPayload::Bind { .. } => "Bind",
            PushPayload::Unbind { .. } => "Unbind",
            PushPayload::Alarm { .. } => "Alarm",
            PushPayload::SensorLatestX { .. } => "SensorLatestX",
            PushPayload::DiffuserLight { .. } => "DiffuserLight",
            PushPayload::DiffuserSpray { .. } => "DiffuserSpray",
            PushPayload::Garage { .. } => "Garage",
            PushPayload::Spray { .. } => "Spray",
            PushPayload::TimerX { .. } => "TimerX",
            PushPayload::TriggerX { .. } => "TriggerX",
            PushPayload::RollerPosition { .. } => "RollerPosition",
            PushPayload::Generic => "Generic",
        }
    }
}

/// A fully parsed push notification, carrying both the raw wire data (for
/// `rawData` event consumers) and the typed, normalized payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushNotification {
    pub originating_uuid: String,
    pub namespace: String,
    pub raw_data: Value,
    pub payload: PushPayload,
}

impl PushNotification {
    pub fn new(originating_uuid: impl Into<String>, namespace: impl Into<String>, raw_data: Value, payload: PushPayload) -> Self {
        Self { originating_uuid: originating_uuid.into(), namespace: namespace.into(), raw_data, payload }
    }
}
