//! HTTP client configuration.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in milliseconds (§4.2 default 10s).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Whether to transparently follow `apiStatus == 1030` domain redirects.
    #[serde(default = "default_auto_retry_domain")]
    pub auto_retry_domain: bool,
    /// Maximum redirect attempts before surfacing `BadDomain` (§4.2, P5).
    #[serde(default = "default_max_domain_retries")]
    pub max_domain_retries: u32,
    /// Vendor app identification string sent with every request.
    #[serde(default = "default_app_identifier")]
    pub app_identifier: String,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_auto_retry_domain() -> bool {
    true
}

fn default_max_domain_retries() -> u32 {
    3
}

fn default_app_identifier() -> String {
    "meross-core".into()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            auto_retry_domain: default_auto_retry_domain(),
            max_domain_retries: default_max_domain_retries(),
            app_identifier: default_app_identifier(),
        }
    }
}
