//! Account credentials (§3): immutable after creation, consumed by the HTTP
//! client and MQTT session.

use serde::{Deserialize, Serialize};

/// Per-account Meross credentials returned by login or loaded from a
/// persisted `tokenData` blob.
///
/// `key` is the account's shared secret; it is never logged or exposed
/// except as an MD5 signing ingredient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    pub key: String,
    pub user_id: String,
    pub user_email: String,
    pub http_domain: String,
    pub mqtt_domain: String,
}

impl Credentials {
    pub fn new(
        token: impl Into<String>,
        key: impl Into<String>,
        user_id: impl Into<String>,
        user_email: impl Into<String>,
        http_domain: impl Into<String>,
        mqtt_domain: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            key: key.into(),
            user_id: user_id.into(),
            user_email: user_email.into(),
            http_domain: http_domain.into(),
            mqtt_domain: mqtt_domain.into(),
        }
    }

    /// Apply a domain redirect (`apiStatus == 1030`), updating both domains
    /// transactionally (either both change or neither does).
    pub fn with_redirect(mut self, http_domain: impl Into<String>, mqtt_domain: impl Into<String>) -> Self {
        self.http_domain = http_domain.into();
        self.mqtt_domain = mqtt_domain.into();
        self
    }
}
