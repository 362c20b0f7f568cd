//! `Toggle`/`ToggleX` (P6 "X wins" composition).

use serde_json::Value;

use crate::feature::{channel_or_master, FeatureHandler};
use crate::state_store::Projection;

pub struct ToggleHandler;

impl FeatureHandler for ToggleHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.Control.ToggleX", "Appliance.Control.Toggle"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["isOn"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let onoff = entry.get("onoff")?.as_i64()?;
        let mut projection = Projection::new();
        projection.insert("isOn".into(), Value::Bool(onoff != 0));
        Some((channel_or_master(entry), projection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn togglex_entry_with_explicit_channel() {
        let handler = ToggleHandler;
        let (channel, projection) = handler.extract(&serde_json::json!({"channel": 2, "onoff": 1})).unwrap();
        assert_eq!(channel, 2);
        assert_eq!(projection["isOn"], Value::Bool(true));
    }

    #[test]
    fn toggle_entry_without_channel_defaults_to_master() {
        let handler = ToggleHandler;
        let (channel, projection) = handler.extract(&serde_json::json!({"onoff": 0})).unwrap();
        assert_eq!(channel, 0);
        assert_eq!(projection["isOn"], Value::Bool(false));
    }

    #[test]
    fn missing_onoff_field_is_not_extractable() {
        let handler = ToggleHandler;
        assert!(handler.extract(&serde_json::json!({"channel": 0})).is_none());
    }
}
