//! `Appliance.GarageDoor.State`.

use serde_json::Value;

use crate::feature::{channel_or_master, FeatureHandler};
use crate::state_store::Projection;

pub struct GarageHandler;

impl FeatureHandler for GarageHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.GarageDoor.State"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["isOpen"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let open = entry.get("open").and_then(Value::as_i64)?;
        let mut projection = Projection::new();
        projection.insert("isOpen".into(), Value::Bool(open != 0));
        Some((channel_or_master(entry), projection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_open_state() {
        let handler = GarageHandler;
        let (_, projection) = handler.extract(&serde_json::json!({"channel": 0, "open": 1})).unwrap();
        assert_eq!(projection["isOpen"], Value::Bool(true));
    }
}
