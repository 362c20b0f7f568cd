//! Events emitted by the subscription manager (§4.7).

use chrono::{DateTime, Utc};
use meross_protocol::change::{Change, ChangeSource};
use meross_protocol::error::MerossError;
use meross_registry::DeviceSnapshot;
use serde_json::Value;

/// Merged poll/push result for one device: the per-request reply (`state`)
/// and the diffs it produced (`changes`), carrying whichever `ChangeSource`
/// triggered it.
#[derive(Debug, Clone)]
pub struct DeviceUpdate {
    pub uuid: String,
    pub source: ChangeSource,
    pub timestamp: DateTime<Utc>,
    pub state: Value,
    pub changes: Vec<Change>,
}

/// The result of diffing one `subscribeToDeviceList` tick against the
/// previous snapshot.
#[derive(Debug, Clone, Default)]
pub struct DeviceListDelta {
    pub added: Vec<DeviceSnapshot>,
    pub removed: Vec<String>,
    pub changed: Vec<DeviceSnapshot>,
}

impl DeviceListDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum SubscriptionEvent {
    DeviceUpdate(DeviceUpdate),
    DeviceListChanged(DeviceListDelta),
    /// Forwarded per §7's "C9 forwards errors as error(err, ctx) without
    /// halting unrelated subscriptions" — `uuid` is `None` for account-level
    /// failures like the device-list poll.
    Error { error: MerossError, uuid: Option<String> },
}
