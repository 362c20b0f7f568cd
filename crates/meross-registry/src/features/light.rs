//! `Appliance.Control.Light`: on/off, brightness, color mode, and RGB.

use serde_json::Value;

use meross_protocol::util::int_to_rgb;

use crate::feature::{channel_or_master, FeatureHandler};
use crate::state_store::Projection;

pub struct LightHandler;

impl FeatureHandler for LightHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.Control.Light"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["isOn", "brightness", "mode", "rgb"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let mut projection = Projection::new();
        if let Some(onoff) = entry.get("onoff").and_then(Value::as_i64) {
            projection.insert("isOn".into(), Value::Bool(onoff != 0));
        }
        if let Some(luminance) = entry.get("luminance").and_then(Value::as_i64) {
            projection.insert("brightness".into(), Value::from(luminance));
        }
        if let Some(capacity) = entry.get("capacity").and_then(Value::as_i64) {
            projection.insert("mode".into(), Value::from(capacity));
        }
        if let Some(rgb_int) = entry.get("rgb").and_then(Value::as_i64) {
            let [r, g, b] = int_to_rgb(rgb_int as u32);
            projection.insert("rgb".into(), serde_json::json!([r, g, b]));
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
    fn decodes_rgb_int_into_triple() {
        let handler = LightHandler;
        let (channel, projection) = handler.extract(&serde_json::json!({"channel": 0, "onoff": 1, "luminance": 80, "rgb": 16711680})).unwrap();
        assert_eq!(channel, 0);
        assert_eq!(projection["rgb"], serde_json::json!([255, 0, 0]));
        assert_eq!(projection["brightness"], Value::from(80));
    }

    #[test]
    fn partial_entry_only_sets_present_fields() {
        let handler = LightHandler;
        let (_, projection) = handler.extract(&serde_json::json!({"luminance": 40})).unwrap();
        assert!(!projection.contains_key("isOn"));
        assert_eq!(projection["brightness"], Value::from(40));
    }
}
