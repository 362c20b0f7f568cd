//! `Appliance.RollerShutter.Position`.

use serde_json::Value;

use crate::feature::{channel_or_master, FeatureHandler};
use crate::state_store::Projection;

pub struct RollerHandler;

impl FeatureHandler for RollerHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.RollerShutter.Position"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["position"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let position = entry.get("position").and_then(Value::as_i64)?;
        let mut projection = Projection::new();
        projection.insert("position".into(), Value::from(position));
        Some((channel_or_master(entry), projection))
    }
}
