//! Shared per-(feature, channel) state cache used by both `Device` and
//! `SubDevice`, and the generic field-level diff all feature modules reduce
//! through (§4.6 "Reduction").

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use meross_protocol::change::{Change, ChangeSource};
use serde_json::{Map, Value};

/// The latest known value of one feature/channel pair, stored as a loose
/// JSON object so every feature module shares one diff routine regardless
/// of its own field set (mirrors a reported/desired shadow diff, generalized
/// from one comparison per update to one comparison per tracked field).
pub type Projection = Map<String, Value>;

#[derive(Debug, Default)]
pub struct FeatureStateStore {
    cached: HashMap<(String, u32), Projection>,
}

impl FeatureStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, namespace: &str, channel: u32) -> Option<&Projection> {
        self.cached.get(&(namespace.to_string(), channel))
    }

    /// Merge `incoming` into the cached projection for `(namespace,
    /// channel)`, preserving fields the update didn't mention, then emit one
    /// `Change` per field in `tracked_fields` whose value actually moved.
    pub fn apply(&mut self, namespace: &str, channel: u32, incoming: Projection, tracked_fields: &[&str], source: ChangeSource, now: DateTime<Utc>) -> Vec<Change> {
        let key = (namespace.to_string(), channel);
        let previous = self.cached.get(&key).cloned().unwrap_or_default();

        let mut merged = previous.clone();
        for (field, value) in &incoming {
            merged.insert(field.clone(), value.clone());
        }

        let mut changes = Vec::new();
        for field in tracked_fields {
            let old_value = previous.get(*field).cloned();
            let new_value = match merged.get(*field) {
                Some(v) => v.clone(),
                None => continue,
            };
            let change = Change::new(*field, channel, old_value, new_value, source);
            if change.is_meaningful() {
                changes.push(Change { timestamp: now, ..change });
            }
        }

        self.cached.insert(key, merged);
        changes
    }
}
