//! `Appliance.Control.Sensor.LatestX` presence/motion sensors.

use serde_json::Value;

use crate::feature::{channel_or_master, FeatureHandler};
use crate::state_store::Projection;

pub struct PresenceSensorHandler;

impl FeatureHandler for PresenceSensorHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.Control.Sensor.LatestX"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["presence", "distanceCm"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let mut projection = Projection::new();
        if let Some(value) = entry.get("value").and_then(Value::as_array) {
            if let Some(first) = value.first() {
                if let Some(presence) = first.get("presence").and_then(Value::as_i64) {
                    projection.insert("presence".into(), Value::Bool(presence != 0));
                }
                if let Some(distance) = first.get("distance").and_then(Value::as_i64) {
                    projection.insert("distanceCm".into(), Value::from(distance));
                }
            }
        }
        if projection.is_empty() {
            return None;
        }
        Some((channel_or_master(entry), projection))
    }
}
