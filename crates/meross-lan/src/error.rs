//! Crate-local LAN transport error enum, converted to the stable
//! `MerossError` at the client's public boundary.

use meross_protocol::{ErrorContext, ErrorKind, MerossError};

#[derive(Debug, thiserror::Error)]
pub enum LanError {
    #[error("lan http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("lan response was not a valid envelope: {0}")]
    Decode(serde_json::Error),

    #[error("lan request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl From<LanError> for MerossError {
    fn from(e: LanError) -> Self {
        match &e {
            LanError::Timeout { timeout_ms } => MerossError::new(ErrorKind::NetworkTimeout, e.to_string())
                .with_context(ErrorContext::default().with_timeout_ms(*timeout_ms)),
            LanError::Transport(_) | LanError::Decode(_) => MerossError::new(ErrorKind::Unconnected, e.to_string()),
        }
    }
}
