//! Diffuser devices expose a light sub-feature and a spray sub-feature
//! under two distinct namespaces, composed as two independent handlers.

use serde_json::Value;

use meross_protocol::util::int_to_rgb;

use crate::feature::{channel_or_master, FeatureHandler};
use crate::state_store::Projection;

pub struct DiffuserLightHandler;

impl FeatureHandler for DiffuserLightHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.Control.Diffuser.Light"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["isOn", "brightness", "rgb", "mode"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let mut projection = Projection::new();
        if let Some(onoff) = entry.get("onoff").and_then(Value::as_i64) {
            projection.insert("isOn".into(), Value::Bool(onoff != 0));
        }
        if let Some(luminance) = entry.get("luminance").and_then(Value::as_i64) {
            projection.insert("brightness".into(), Value::from(luminance));
        }
        if let Some(rgb_int) = entry.get("rgb").and_then(Value::as_i64) {
            let [r, g, b] = int_to_rgb(rgb_int as u32);
            projection.insert("rgb".into(), serde_json::json!([r, g, b]));
        }
        if let Some(mode) = entry.get("mode").and_then(Value::as_i64) {
            projection.insert("mode".into(), Value::from(mode));
        }
        if projection.is_empty() {
            return None;
        }
        Some((channel_or_master(entry), projection))
    }
}

pub struct DiffuserSprayHandler;

impl FeatureHandler for DiffuserSprayHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.Control.Diffuser.Spray"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["mode"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let mode = entry.get("mode").and_then(Value::as_i64)?;
        let mut projection = Projection::new();
        projection.insert("mode".into(), Value::from(mode));
        Some((channel_or_master(entry), projection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_and_spray_are_independent_namespaces() {
        assert_ne!(DiffuserLightHandler.candidate_namespaces(), DiffuserSprayHandler.candidate_namespaces());
    }
}
