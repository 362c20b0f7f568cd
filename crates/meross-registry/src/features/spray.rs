//! `Appliance.Control.Spray` (plain humidifier/sprayer, not the diffuser
//! combo unit — see `diffuser.rs`).

use serde_json::Value;

use crate::feature::{channel_or_master, FeatureHandler};
use crate::state_store::Projection;

pub struct SprayHandler;

impl FeatureHandler for SprayHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.Control.Spray"]
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
