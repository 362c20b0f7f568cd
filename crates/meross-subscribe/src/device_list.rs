//! Diffing for `subscribeToDeviceList` (§4.7): compares one poll's
//! descriptors against the previous snapshot and reports `{added, removed,
//! changed}`.

use meross_registry::DeviceSnapshot;

use crate::event::DeviceListDelta;

/// Diff `current` against `previous`, both keyed by `uuid`. `changed`
/// contains entries present in both whose snapshot differs.
pub fn diff(previous: &[DeviceSnapshot], current: &[DeviceSnapshot]) -> DeviceListDelta {
    let mut delta = DeviceListDelta::default();

    for device in current {
        match previous.iter().find(|p| p.uuid == device.uuid) {
            None => delta.added.push(device.clone()),
            Some(prior) if prior != device => delta.changed.push(device.clone()),
            Some(_) => {}
        }
    }

    for prior in previous {
        if !current.iter().any(|d| d.uuid == prior.uuid) {
            delta.removed.push(prior.uuid.clone());
        }
    }

    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use meross_protocol::device::OnlineStatus;

    fn snapshot(uuid: &str, online: OnlineStatus) -> DeviceSnapshot {
        DeviceSnapshot {
            uuid: uuid.into(),
            name: "Plug".into(),
            device_type: "mss310".into(),
            online_status: online,
            mac_address: None,
            lan_ip: None,
            is_connected: online == OnlineStatus::Online,
        }
    }

    #[test]
    fn new_device_is_added() {
        let delta = diff(&[], &[snapshot("uuid-1", OnlineStatus::Online)]);
        assert_eq!(delta.added.len(), 1);
        assert!(delta.removed.is_empty());
        assert!(delta.changed.is_empty());
    }

    #[test]
    fn missing_device_is_removed() {
        let delta = diff(&[snapshot("uuid-1", OnlineStatus::Online)], &[]);
        assert_eq!(delta.removed, vec!["uuid-1".to_string()]);
    }

    #[test]
    fn status_transition_is_a_change_not_add_or_remove() {
        let previous = vec![snapshot("uuid-1", OnlineStatus::Online)];
        let current = vec![snapshot("uuid-1", OnlineStatus::Offline)];
        let delta = diff(&previous, &current);
        assert_eq!(delta.changed.len(), 1);
        assert!(delta.added.is_empty());
        assert!(delta.removed.is_empty());
    }

    #[test]
    fn identical_snapshot_is_no_change() {
        let snap = snapshot("uuid-1", OnlineStatus::Online);
        let delta = diff(&[snap.clone()], &[snap]);
        assert!(delta.is_empty());
    }
}
