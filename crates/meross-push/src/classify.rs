//! Namespace → `PushPayload` dispatch (§4.6 "Dispatch"). Unknown namespaces
//! become `Generic`. `wire_key` is the single source of truth for which
//! payload field each namespace normalizes (§4.6 "Normalization"); both
//! `classify_push` and the reducer look it up from here.

use meross_protocol::push::{Entries, PushNotification, PushPayload};
use serde_json::Value;

use crate::normalize::normalize_entries;

fn wire_key(namespace: &str) -> Option<&'static str> {
    match namespace {
        "Appliance.Control.ToggleX" => Some("togglex"),
        "Appliance.Control.Toggle" => Some("toggle"),
        "Appliance.Control.Light" => Some("light"),
        "Appliance.Control.Thermostat.Mode" => Some("mode"),
        "Appliance.RollerShutter.Position" => Some("position"),
        "Appliance.GarageDoor.State" => Some("state"),
        "Appliance.Control.Spray" => Some("spray"),
        "Appliance.Control.Diffuser.Light" => Some("light"),
        "Appliance.Control.Diffuser.Spray" => Some("spray"),
        "Appliance.Control.Sensor.LatestX" => Some("latest"),
        "Appliance.Control.TimerX" => Some("timerx"),
        "Appliance.Control.TriggerX" => Some("triggerx"),
        "Appliance.Hub.Online" => Some("online"),
        "Appliance.Hub.Sensor.TempHum" => Some("tempHum"),
        "Appliance.Hub.Sensor.Smoke" => Some("smokeAlarm"),
        "Appliance.System.Online" => Some("online"),
        "Appliance.Hub.Mts100.All" => Some("all"),
        _ => None,
    }
}

/// Whether `namespace` is reduced against a hub's sub-devices rather than
/// the hub `Device` itself (§4.6 "Hub routing").
pub fn is_hub_namespace(namespace: &str) -> bool {
    matches!(namespace, "Appliance.Hub.Online" | "Appliance.Hub.Sensor.TempHum" | "Appliance.Hub.Sensor.Smoke" | "Appliance.Hub.Mts100.All")
}

pub fn entries_for(namespace: &str, payload: &Value) -> Entries {
    match wire_key(namespace) {
        Some(key) => normalize_entries(payload, key),
        None => Vec::new(),
    }
}

pub fn classify_push(namespace: &str, payload: &Value) -> PushPayload {
    let entries = entries_for(namespace, payload);
    match namespace {
        "Appliance.Control.ToggleX" | "Appliance.Control.Toggle" => PushPayload::ToggleX { entries },
        "Appliance.Control.Light" => PushPayload::LightX { entries },
        "Appliance.Control.Thermostat.Mode" => PushPayload::ThermostatMode { entries },
        "Appliance.RollerShutter.Position" => PushPayload::RollerPosition { entries },
        "Appliance.GarageDoor.State" => PushPayload::Garage { entries },
        "Appliance.Control.Spray" => PushPayload::Spray { entries },
        "Appliance.Control.Diffuser.Light" => PushPayload::DiffuserLight { entries },
        "Appliance.Control.Diffuser.Spray" => PushPayload::DiffuserSpray { entries },
        "Appliance.Control.Sensor.LatestX" => PushPayload::SensorLatestX { entries },
        "Appliance.Control.TimerX" => PushPayload::TimerX { entries },
        "Appliance.Control.TriggerX" => PushPayload::TriggerX { entries },
        "Appliance.Hub.Online" => PushPayload::HubOnline { entries },
        "Appliance.Hub.Sensor.TempHum" => PushPayload::HubSensorTempHum { entries },
        "Appliance.Hub.Sensor.Smoke" => PushPayload::HubSensorSmoke { entries },
        "Appliance.System.Online" => PushPayload::Online { entries },
        "Appliance.Hub.Mts100.All" => PushPayload::ThermostatMode { entries },
        _ => PushPayload::Generic,
    }
}

/// Build a full, typed `PushNotification` carrying both the classified
/// payload and the raw wire data (§3 "rawData event consumers").
pub fn classify(uuid: &str, namespace: &str, raw_payload: Value) -> PushNotification {
    let payload = classify_push(namespace, &raw_payload);
    PushNotification::new(uuid, namespace, raw_payload, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_namespace_normalizes_entries() {
        let payload = serde_json::json!({"togglex": {"channel": 0, "onoff": 1}});
        match classify_push("Appliance.Control.ToggleX", &payload) {
            PushPayload::ToggleX { entries } => assert_eq!(entries.len(), 1),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_namespace_is_generic() {
        assert!(matches!(classify_push("Appliance.Totally.Unknown", &serde_json::json!({})), PushPayload::Generic));
    }

    #[test]
    fn hub_namespaces_are_flagged() {
        assert!(is_hub_namespace("Appliance.Hub.Sensor.TempHum"));
        assert!(!is_hub_namespace("Appliance.Control.ToggleX"));
    }

    #[test]
    fn classify_carries_raw_data_alongside_typed_payload() {
        let raw = serde_json::json!({"togglex": {"channel": 0, "onoff": 1}});
        let notification = classify("uuid-1", "Appliance.Control.ToggleX", raw.clone());
        assert_eq!(notification.raw_data, raw);
        assert_eq!(notification.payload.namespace_label(), "ToggleX");
    }
}
