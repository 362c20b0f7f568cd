//! Crate-local MQTT error enum, converted to the stable `MerossError` at the
//! session's public boundary.

use meross_protocol::{ErrorContext, ErrorKind, MerossError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqttError {
    #[error("mqtt connection error: {0}")]
    Connection(String),

    #[error("mqtt publish error: {0}")]
    Publish(String),

    #[error("mqtt subscribe error: {0}")]
    Subscribe(String),

    #[error("payload was not valid JSON envelope: {0}")]
    Serialization(String),

    #[error("no reply within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("session is not connected")]
    Disconnected,
}

pub type MqttResult<T> = Result<T, MqttError>;

impl From<MqttError> for MerossError {
    fn from(e: MqttError) -> Self {
        match &e {
            MqttError::Timeout { timeout_ms } => MerossError::new(ErrorKind::CommandTimeout, e.to_string())
                .with_context(ErrorContext::default().with_timeout_ms(*timeout_ms)),
            MqttError::Disconnected => MerossError::new(ErrorKind::Unconnected, e.to_string()),
            MqttError::Connection(_) | MqttError::Publish(_) | MqttError::Subscribe(_) | MqttError::Serialization(_) => {
                MerossError::new(ErrorKind::MqttError, e.to_string())
            }
        }
    }
}
