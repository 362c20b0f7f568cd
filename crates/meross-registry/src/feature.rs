//! `FeatureHandler` (§4.5): the unit of dynamic composition. Each handler
//! knows which namespace(s) it can bind to and how to turn one raw push/
//! digest entry into a named projection that `FeatureStateStore` diffs.

use serde_json::Value;

use crate::state_store::Projection;

/// A cohesive unit implementing the reducer for one ability family.
///
/// `extract` is the only namespace-specific logic; diffing itself lives in
/// `state_store::FeatureStateStore` so every feature shares one diff rule.
pub trait FeatureHandler: Send + Sync {
    /// Namespaces this handler can bind to, most-specific (`X`-suffixed)
    /// first — composition picks the first one present in the device's
    /// abilities (P6 "X wins").
    fn candidate_namespaces(&self) -> &'static [&'static str];

    /// The projection fields this feature's diff tracks.
    fn projection_fields(&self) -> &'static [&'static str];

    /// Turn one already-normalized entry (a single object, never an array)
    /// into `(channel, projection)`, or `None` if the entry doesn't carry
    /// enough information to act on.
    fn extract(&self, entry: &Value) -> Option<(u32, Projection)>;
}

fn channel_of(entry: &Value) -> Option<u32> {
    entry.get("channel").and_then(Value::as_u64).map(|c| c as u32)
}

pub(crate) fn channel_or_master(entry: &Value) -> u32 {
    channel_of(entry).unwrap_or(0)
}
