//! Change records (§3): produced by C8's reducer, consumed by the `state`
//! event listeners described in §6.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a state change originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    Push,
    Poll,
    Response,
}

/// A single per-channel, per-field state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    #[serde(rename = "type")]
    pub change_type: String,
    pub channel: u32,
    pub old_value: Option<Value>,
    pub new_value: Value,
    pub source: ChangeSource,
    pub timestamp: DateTime<Utc>,
}

impl Change {
    pub fn new(
        change_type: impl Into<String>,
        channel: u32,
        old_value: Option<Value>,
        new_value: Value,
        source: ChangeSource,
    ) -> Self {
        Self { change_type: change_type.into(), channel, old_value, new_value, source, timestamp: Utc::now() }
    }

    /// Whether this record represents an actual transition (old != new).
    /// Reducers must only emit `Change`s that already passed this check
    /// (§4.6 step 4); kept here as the shared predicate so both C8 and its
    /// tests apply exactly one definition of "changed".
    pub fn is_meaningful(&self) -> bool {
        self.old_value.as_ref() != Some(&self.new_value)
    }
}
