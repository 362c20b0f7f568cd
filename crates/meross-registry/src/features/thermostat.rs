//! `Appliance.Control.Thermostat.Mode`.

use serde_json::Value;

use crate::feature::{channel_or_master, FeatureHandler};
use crate::state_store::Projection;

pub struct ThermostatHandler;

impl FeatureHandler for ThermostatHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.Control.Thermostat.Mode"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["mode", "state", "targetTemp", "currentTemp"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let mut projection = Projection::new();
        if let Some(mode) = entry.get("mode").and_then(Value::as_i64) {
            projection.insert("mode".into(), Value::from(mode));
        }
        if let Some(onoff) = entry.get("onoff").and_then(Value::as_i64) {
            projection.insert("state".into(), Value::Bool(onoff != 0));
        }
        // Firmware reports tenths of a degree.
        if let Some(target) = entry.get("targetTemp").and_then(Value::as_i64) {
            projection.insert("targetTemp".into(), serde_json::json!(target as f64 / 10.0));
        }
        if let Some(current) = entry.get("currentTemp").and_then(Value::as_i64) {
            projection.insert("currentTemp".into(), serde_json::json!(current as f64 / 10.0));
        }
        if projection.is_empty() {
            return None;
        }
        Some((channel_or_master(entry), projection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperatures_are_converted_from_tenths_of_a_degree() {
        let handler = ThermostatHandler;
        let (_, projection) = handler.extract(&serde_json::json!({"channel": 0, "mode": 1, "onoff": 1, "targetTemp": 215, "currentTemp": 198})).unwrap();
        assert_eq!(projection["targetTemp"], serde_json::json!(21.5));
        assert_eq!(projection["currentTemp"], serde_json::json!(19.8));
    }
}
