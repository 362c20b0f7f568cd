//! Hub-owned sensor namespaces (§4.5, §4.6). These run against the
//! `SubDevice`'s own `FeatureStateStore`, not the hub's — the hub's fan-out
//! routing (owned by `meross-push`) resolves which sub-device an entry's
//! `id` belongs to before calling `reduce`.

use serde_json::Value;

use crate::feature::FeatureHandler;
use crate::state_store::Projection;

pub struct HubOnlineHandler;

impl FeatureHandler for HubOnlineHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.Hub.Online"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["status"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let status = entry.get("status").and_then(Value::as_i64)?;
        let mut projection = Projection::new();
        projection.insert("status".into(), Value::from(status));
        Some((0, projection))
    }
}

pub struct HubSensorTempHumHandler;

impl FeatureHandler for HubSensorTempHumHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.Hub.Sensor.TempHum"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["temperature", "humidity"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let mut projection = Projection::new();
        if let Some(temp) = entry.get("latestTemperature").and_then(Value::as_i64) {
            projection.insert("temperature".into(), serde_json::json!(temp as f64 / 10.0));
        }
        if let Some(humidity) = entry.get("latestHumidity").and_then(Value::as_i64) {
            projection.insert("humidity".into(), serde_json::json!(humidity as f64 / 10.0));
        }
        if projection.is_empty() {
            return None;
        }
        Some((0, projection))
    }
}

pub struct HubSensorSmokeHandler;

impl FeatureHandler for HubSensorSmokeHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.Hub.Sensor.Smoke"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["status", "interConn"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let status = entry.get("status").and_then(Value::as_i64)?;
        let mut projection = Projection::new();
        projection.insert("status".into(), Value::from(status));
        if let Some(inter_conn) = entry.get("interConn").and_then(Value::as_i64) {
            projection.insert("interConn".into(), Value::from(inter_conn));
        }
        Some((0, projection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_hum_converts_tenths() {
        let handler = HubSensorTempHumHandler;
        let (_, projection) = handler.extract(&serde_json::json!({"id": "1", "latestTemperature": 250, "latestHumidity": 560})).unwrap();
        assert_eq!(projection["temperature"], serde_json::json!(25.0));
        assert_eq!(projection["humidity"], serde_json::json!(56.0));
    }

    #[test]
    fn smoke_requires_status() {
        let handler = HubSensorSmokeHandler;
        assert!(handler.extract(&serde_json::json!({"id": "1"})).is_none());
    }
}
