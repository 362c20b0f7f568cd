//! MQTT topic builders for the Meross broker topology (§4.3, §6).
//!
//! ```text
//! /appliance/<uuid>/publish      device replies, pushes (subscribe to this)
//! /appliance/<uuid>/subscribe    commands to the device (publish to this)
//! /app/<userId>-<clientId>/subscribe   per-client reply topic
//! ```

/// Topic a client subscribes to in order to receive a device's replies and
/// pushes.
pub fn device_publish(uuid: &str) -> String {
    format!("/appliance/{uuid}/publish")
}

/// Topic a client publishes commands to for a given device.
pub fn device_subscribe(uuid: &str) -> String {
    format!("/appliance/{uuid}/subscribe")
}

/// The per-client reply topic; also the value placed in `header.from` on
/// outgoing messages.
pub fn client_reply_topic(user_id: &str, client_id: &str) -> String {
    format!("/app/{user_id}-{client_id}/subscribe")
}

/// Parse `/appliance/<uuid>/publish` back into its device UUID, returning
/// `None` for any other shape.
pub fn parse_device_publish(topic: &str) -> Option<&str> {
    topic.strip_prefix("/appliance/")?.strip_suffix("/publish")
}
