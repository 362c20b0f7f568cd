//! Device message envelope (§4.1): `{header, payload}` sent over both MQTT
//! and LAN HTTP transports.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto;

/// The four methods a device message header can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "GETACK")]
    GetAck,
    #[serde(rename = "SET")]
    Set,
    #[serde(rename = "SETACK")]
    SetAck,
    #[serde(rename = "PUSH")]
    Push,
}

impl Method {
    /// Whether this method is an acknowledgement that should resolve a
    /// pending request rather than be dispatched to the push parser.
    pub fn is_ack(self) -> bool {
        matches!(self, Method::GetAck | Method::SetAck)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "messageId")]
    pub message_id: String,
    pub namespace: String,
    pub method: Method,
    #[serde(rename = "payloadVersion")]
    pub payload_version: u32,
    pub from: String,
    pub timestamp: i64,
    #[serde(rename = "timestampMs")]
    pub timestamp_ms: i64,
    pub sign: String,
    #[serde(rename = "triggerSrc")]
    pub trigger_src: String,
    pub uuid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub header: Header,
    pub payload: Value,
}

impl Envelope {
    /// Build and sign a new outbound envelope.
    ///
    /// `from` is the MQTT reply topic for the current session (§4.3).
    pub fn new_request(
        method: Method,
        namespace: impl Into<String>,
        uuid: impl Into<String>,
        payload: Value,
        device_key: &str,
        from: impl Into<String>,
        trigger_src: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let timestamp = now.timestamp();
        let timestamp_ms = now.timestamp_millis();
        let message_id = crypto::random_message_id();
        let sign = crypto::sign_device_message(&message_id, device_key, timestamp);

        Self {
            header: Header {
                message_id,
                namespace: namespace.into(),
                method,
                payload_version: 1,
                from: from.into(),
                timestamp,
                timestamp_ms,
                sign,
                trigger_src: trigger_src.into(),
                uuid: uuid.into(),
            },
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_serializes_as_vendor_strings() {
        assert_eq!(serde_json::to_string(&Method::Get).unwrap(), r#""GET""#);
        assert_eq!(serde_json::to_string(&Method::SetAck).unwrap(), r#""SETACK""#);
        assert_eq!(serde_json::to_string(&Method::Push).unwrap(), r#""PUSH""#);
    }

    #[test]
    fn ack_classification() {
        assert!(Method::GetAck.is_ack());
        assert!(Method::SetAck.is_ack());
        assert!(!Method::Push.is_ack());
        assert!(!Method::Get.is_ack());
    }

    #[test]
    fn new_request_produces_consistent_signature() {
        let env = Envelope::new_request(
            Method::Set,
            "Appliance.Control.ToggleX",
            "uuid-1",
            serde_json::json!({"togglex": {"channel": 0, "onoff": 1}}),
            "device-key",
            "/app/u1-client/subscribe",
            "1",
        );
        let expected = crypto::sign_device_message(&env.header.message_id, "device-key", env.header.timestamp);
        assert_eq!(env.header.sign, expected);
        assert_eq!(env.header.message_id.len(), 32);
        assert_eq!(env.header.payload_version, 1);
    }

    #[test]
    fn envelope_roundtrips_through_json() {
        let env = Envelope::new_request(
            Method::Get,
            "Appliance.System.All",
            "uuid-1",
            serde_json::json!({}),
            "device-key",
            "/app/u1-client/subscribe",
            "1",
        );
        let json = serde_json::to_string(&env).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.header.namespace, "Appliance.System.All");
        assert_eq!(back.header.method, Method::Get);
    }
}
