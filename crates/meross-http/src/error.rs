//! Crate-local HTTP error enum, converted to the stable `MerossError` at the
//! client's public boundary.

use meross_protocol::{ErrorContext, ErrorKind, MerossError};

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("response body was not valid JSON: {0}")]
    Decode(serde_json::Error),

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("http status {status}")]
    HttpStatus { status: u16 },

    #[error("domain redirect exhausted after {attempts} attempts")]
    BadDomain { attempts: u32, api_domain: Option<String>, mqtt_domain: Option<String> },
}

impl From<HttpError> for MerossError {
    fn from(e: HttpError) -> Self {
        match &e {
            HttpError::Timeout { timeout_ms } => MerossError::new(ErrorKind::NetworkTimeout, e.to_string())
                .with_context(ErrorContext::default().with_timeout_ms(*timeout_ms)),
            HttpError::HttpStatus { status } => MerossError::new(ErrorKind::HttpApiError, e.to_string())
                .with_context(ErrorContext::default().with_http_status(*status)),
            HttpError::BadDomain { .. } => MerossError::new(ErrorKind::BadDomain, e.to_string()),
            HttpError::Transport(_) | HttpError::Decode(_) => MerossError::new(ErrorKind::HttpApiError, e.to_string()),
        }
    }
}
