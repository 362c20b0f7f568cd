//! Catch-all for namespaces with no dedicated feature module, and the
//! data-only `timer`/`trigger` projections (§1: exact per-namespace
//! payload shapes for timers/triggers are out of scope; callers read the
//! raw projection themselves).

use serde_json::Value;

use crate::feature::{channel_or_master, FeatureHandler};
use crate::state_store::Projection;

/// Stores the entire entry verbatim under `raw`; never returns `None` so it
/// can always serve as the composition fallback.
pub struct GenericHandler;

impl FeatureHandler for GenericHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &[]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["raw"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let mut projection = Projection::new();
        projection.insert("raw".into(), entry.clone());
        Some((channel_or_master(entry), projection))
    }
}

pub struct TimerHandler;

impl FeatureHandler for TimerHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.Control.TimerX"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["raw"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let mut projection = Projection::new();
        projection.insert("raw".into(), entry.clone());
        Some((channel_or_master(entry), projection))
    }
}

pub struct TriggerHandler;

impl FeatureHandler for TriggerHandler {
    fn candidate_namespaces(&self) -> &'static [&'static str] {
        &["Appliance.Control.TriggerX"]
    }

    fn projection_fields(&self) -> &'static [&'static str] {
        &["raw"]
    }

    fn extract(&self, entry: &Value) -> Option<(u32, Projection)> {
        let mut projection = Projection::new();
        projection.insert("raw".into(), entry.clone());
        Some((channel_or_master(entry), projection))
    }
}
