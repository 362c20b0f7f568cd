//! Stable, language-independent error kinds shared by every meross-core crate.

use thiserror::Error;

/// Stable error kind, independent of the crate that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    MfaRequired,
    MfaWrong,
    TokenExpired,
    TooManyTokens,
    Unauthorized,
    HttpApiError,
    BadDomain,
    ApiLimitReached,
    ResourceAccessDenied,
    RateLimit,
    OperationLocked,
    Unsupported,
    Validation,
    NotFound,
    NetworkTimeout,
    CommandTimeout,
    CommandFailed,
    MqttError,
    Unconnected,
    UnknownDeviceType,
    ParseError,
    InitializationFailed,
    SignError,
    CryptoError,
}

impl ErrorKind {
    /// Whether an error of this kind is typically a recoverable retry candidate
    /// rather than a programmer/configuration error.
    pub fn is_operational(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimit
                | ErrorKind::NetworkTimeout
                | ErrorKind::CommandTimeout
                | ErrorKind::MqttError
                | ErrorKind::Unconnected
                | ErrorKind::ApiLimitReached
                | ErrorKind::OperationLocked
                | ErrorKind::HttpApiError
        )
    }
}

/// Additional structured context carried alongside a `MerossError`.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub device_uuid: Option<String>,
    pub timeout_ms: Option<u64>,
    pub http_status_code: Option<u16>,
    pub field: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
}

impl ErrorContext {
    pub fn with_device(mut self, uuid: impl Into<String>) -> Self {
        self.device_uuid = Some(uuid.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_http_status(mut self, code: u16) -> Self {
        self.http_status_code = Some(code);
        self
    }
}

/// The unified error type propagated across the whole workspace.
#[derive(Debug, Error, Clone)]
#[error("{kind:?}: {message}")]
pub struct MerossError {
    pub kind: ErrorKind,
    pub message: String,
    pub error_code: Option<i64>,
    pub context: ErrorContext,
}

impl MerossError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            error_code: None,
            context: ErrorContext::default(),
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.error_code = Some(code);
        self
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    pub fn is_operational(&self) -> bool {
        self.kind.is_operational()
    }

    /// Fatal kinds abort the current high-level operation rather than retry (§7).
    pub fn is_fatal_for_initialization(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Authentication | ErrorKind::TokenExpired | ErrorKind::UnknownDeviceType
        )
    }
}

pub type MerossResult<T> = Result<T, MerossError>;

/// Map a vendor HTTP API status code to a stable `ErrorKind`, per spec §4.2.
pub fn api_status_to_kind(api_status: i64) -> ErrorKind {
    match api_status {
        1000..=1008 => ErrorKind::Authentication,
        1019 | 1022 | 1200 => ErrorKind::TokenExpired,
        1032 => ErrorKind::MfaWrong,
        1033 => ErrorKind::MfaRequired,
        1028 => ErrorKind::RateLimit,
        1035 => ErrorKind::OperationLocked,
        1042 => ErrorKind::ApiLimitReached,
        1043 => ErrorKind::ResourceAccessDenied,
        1301 => ErrorKind::TooManyTokens,
        20101 => ErrorKind::Validation,
        20106 => ErrorKind::NotFound,
        20112 => ErrorKind::Unsupported,
        _ => ErrorKind::HttpApiError,
    }
}
