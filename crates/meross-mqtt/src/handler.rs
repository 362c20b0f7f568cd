//! Incoming MQTT message classification (§4.3 Reply routing).

use meross_protocol::envelope::Envelope;
use meross_protocol::topics;

/// An unsolicited device message (`PUSH`/`SET`), handed off to the push
/// parser (C8) by whoever owns the session.
#[derive(Debug, Clone)]
pub struct IncomingEnvelope {
    pub uuid: String,
    pub envelope: Envelope,
}

/// The result of classifying one inbound MQTT publish.
#[derive(Debug)]
pub enum Dispatch {
    /// `GETACK`/`SETACK` carrying a `messageId` that should resolve a
    /// pending request.
    Ack { message_id: String, payload: serde_json::Value },
    /// `PUSH`/`SET` from a device, to be routed to the push parser.
    Push(IncomingEnvelope),
    /// Topic didn't match `/appliance/<uuid>/publish`, or the payload
    /// wasn't a well-formed envelope.
    Unrecognized { topic: String },
}

/// Classify a raw inbound publish on `/appliance/<uuid>/publish`.
pub fn classify(topic: &str, payload: &[u8]) -> Dispatch {
    let Some(uuid) = topics::parse_device_publish(topic) else {
        return Dispatch::Unrecognized { topic: topic.to_string() };
    };

    let Ok(envelope) = serde_json::from_slice::<Envelope>(payload) else {
        return Dispatch::Unrecognized { topic: topic.to_string() };
    };

    if envelope.header.method.is_ack() {
        Dispatch::Ack { message_id: envelope.header.message_id.clone(), payload: envelope.payload }
    } else {
        Dispatch::Push(IncomingEnvelope { uuid: uuid.to_string(), envelope })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meross_protocol::envelope::Method;

    fn envelope_bytes(method: Method, message_id: &str) -> Vec<u8> {
        let env = Envelope::new_request(method, "Appliance.Control.ToggleX", "uuid-1", serde_json::json!({}), "key", "/app/u-c/subscribe", "1");
        let mut env = env;
        env.header.message_id = message_id.to_string();
        serde_json::to_vec(&env).unwrap()
    }

    #[test]
    fn classify_ack_by_message_id() {
        let bytes = envelope_bytes(Method::SetAck, "mid-123");
        let dispatch = classify("/appliance/uuid-1/publish", &bytes);
        assert!(matches!(dispatch, Dispatch::Ack { ref message_id, .. } if message_id == "mid-123"));
    }

    #[test]
    fn classify_push_routes_to_push_parser() {
        let bytes = envelope_bytes(Method::Push, "mid-456");
        let dispatch = classify("/appliance/uuid-1/publish", &bytes);
        match dispatch {
            Dispatch::Push(incoming) => assert_eq!(incoming.uuid, "uuid-1"),
            _ => panic!("expected Push"),
        }
    }

    #[test]
    fn classify_unrecognized_topic() {
        let dispatch = classify("garbage/topic", b"{}");
        assert!(matches!(dispatch, Dispatch::Unrecognized { .. }));
    }

    #[test]
    fn classify_malformed_payload() {
        let dispatch = classify("/appliance/uuid-1/publish", b"not json");
        assert!(matches!(dispatch, Dispatch::Unrecognized { .. }));
    }
}
