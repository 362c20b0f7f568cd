//! Routes the per-feature `digest` sections of an `Appliance.System.All`
//! reply through the device's composed `FeatureSet` (§4.6 "System.All
//! absorption": `Device::absorb_system_all` only absorbs hardware/firmware/
//! online metadata; distributing the digest to feature reducers is left to
//! the caller, which for a poll-driven refresh is this module).

use chrono::{DateTime, Utc};
use meross_protocol::change::{Change, ChangeSource};
use meross_push::normalize_entries;
use meross_registry::{Device, FeatureSet};
use serde_json::Value;

fn digest_namespace(key: &str) -> Option<&'static str> {
    match key {
        "togglex" => Some("Appliance.Control.ToggleX"),
        "toggle" => Some("Appliance.Control.Toggle"),
        "light" => Some("Appliance.Control.Light"),
        "thermostat" => Some("Appliance.Control.Thermostat.Mode"),
        "garageDoor" => Some("Appliance.GarageDoor.State"),
        "spray" => Some("Appliance.Control.Spray"),
        _ => None,
    }
}

/// Reduce `all.digest` into `Change`s against `device`'s own state store,
/// using `source = Poll`. Digest keys with no known feature mapping (hub
/// digests, diffuser's nested shape, anything unrecognized) are skipped —
/// they either don't apply to a non-hub device or aren't part of this
/// poll's scope.
pub fn reduce_system_all_digest(device: &mut Device, feature_set: &FeatureSet, all_reply: &Value, now: DateTime<Utc>) -> Vec<Change> {
    let Some(digest) = all_reply.get("all").and_then(|a| a.get("digest")).and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut changes = Vec::new();
    for (key, value) in digest {
        let Some(namespace) = digest_namespace(key) else { continue };
        let wrapped = serde_json::json!({ key.as_str(): value });
        let entries = normalize_entries(&wrapped, key);
        let handler = feature_set.resolve(namespace);

        for entry in &entries {
            if let Some((channel, projection)) = handler.extract(entry) {
                changes.extend(device.apply_projection(namespace, channel, projection, handler.projection_fields(), ChangeSource::Poll, now));
            }
        }
    }
    changes
}
