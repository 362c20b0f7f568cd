//! `SubDevice` (§3): owned by its hub, keyed by `(hubUuid, subdeviceId)`.

use meross_protocol::change::{Change, ChangeSource};
use meross_protocol::device::SubDeviceDescriptor;
use chrono::{DateTime, Utc};

use crate::state_store::{FeatureStateStore, Projection};

pub struct SubDevice {
    pub descriptor: SubDeviceDescriptor,
    /// The subset of the hub's abilities relevant to this sub-device's
    /// type, computed once at bind time (§4.5 SubDevice abilities).
    pub abilities: Vec<String>,
    state: FeatureStateStore,
}

impl SubDevice {
    pub fn new(descriptor: SubDeviceDescriptor, abilities: Vec<String>) -> Self {
        Self { descriptor, abilities, state: FeatureStateStore::new() }
    }

    pub fn hub_uuid(&self) -> &str {
        &self.descriptor.hub_uuid
    }

    pub fn id(&self) -> &str {
        &self.descriptor.sub_device_id
    }

    pub fn cached_state(&self, namespace: &str, channel: u32) -> Option<&Projection> {
        self.state.get(namespace, channel)
    }

    pub fn apply_projection(&mut self, namespace: &str, channel: u32, incoming: Projection, tracked_fields: &[&str], source: ChangeSource, now: DateTime<Utc>) -> Vec<Change> {
        self.state.apply(namespace, channel, incoming, tracked_fields, source, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_device_is_keyed_by_hub_and_id() {
        let sub = SubDevice::new(
            SubDeviceDescriptor { sub_device_id: "1".into(), sub_device_type: "ms100".into(), sub_device_name: "Sensor".into(), hub_uuid: "hub-1".into() },
            vec!["Appliance.Hub.Sensor.TempHum".into()],
        );
        assert_eq!(sub.hub_uuid(), "hub-1");
        assert_eq!(sub.id(), "1");
    }
}
