//! Signed HTTP client for the vendor REST API (C2, spec §4.2).

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use meross_protocol::{Credentials, DeviceDescriptor, ErrorKind, MerossError, MerossResult, SubDeviceDescriptor, crypto};
use meross_stats::{HttpSample, Statistics};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::HttpConfig;
use crate::error::HttpError;

/// Fixed ecosystem-wide signing secret shared by every client of the vendor
/// API (§4.1). Configurable for forks that target a different deployment.
const DEFAULT_REQUEST_SECRET: &str = "meross-core-request-secret";

#[derive(Debug, serde::Deserialize)]
struct ApiEnvelope {
    #[serde(rename = "apiStatus")]
    api_status: i64,
    #[serde(default)]
    #[allow(dead_code)]
    info: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, serde::Deserialize)]
struct RedirectData {
    #[serde(rename = "apiDomain")]
    api_domain: Option<String>,
    #[serde(rename = "mqttDomain")]
    mqtt_domain: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct LoginData {
    token: String,
    key: String,
    #[serde(rename = "userid")]
    user_id: String,
    email: String,
}

pub struct MerossHttpClient {
    http: reqwest::Client,
    config: HttpConfig,
    request_secret: String,
    stats: Option<Arc<Mutex<Statistics>>>,
}

impl MerossHttpClient {
    pub fn new(config: HttpConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("failed to build reqwest client");
        Self { http, config, request_secret: DEFAULT_REQUEST_SECRET.to_string(), stats: None }
    }

    pub fn with_statistics(mut self, stats: Arc<Mutex<Statistics>>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Override the request-signing secret (for deployments against a
    /// non-default vendor endpoint).
    pub fn with_request_secret(mut self, secret: impl Into<String>) -> Self {
        self.request_secret = secret.into();
        self
    }

    /// Sign and POST `params` to `https://{domain}{path}`, following up to
    /// `max_domain_retries` `apiStatus == 1030` redirects (§4.2, P5).
    ///
    /// `domain` and `mqtt_domain` are updated in place, transactionally,
    /// on redirect so the caller's stored credentials stay consistent with
    /// the last successful attempt.
    async fn signed_post(&self, domain: &mut String, mqtt_domain: &mut String, path: &str, params: &Value) -> MerossResult<Value> {
        let mut attempts = 0u32;
        loop {
            let started = Instant::now();
            let result = self.send_once(domain, path, params).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok((api_status, http_status, data)) => {
                    self.record(path, http_status, Some(api_status), elapsed_ms).await;

                    if api_status == 0 {
                        return Ok(data);
                    }

                    if api_status == 1030 && self.config.auto_retry_domain && attempts < self.config.max_domain_retries {
                        if let Ok(redirect) = serde_json::from_value::<RedirectData>(data.clone()) {
                            if let Some(new_domain) = redirect.api_domain.clone() {
                                *domain = new_domain;
                            }
                            if let Some(new_mqtt_domain) = redirect.mqtt_domain.clone() {
                                *mqtt_domain = new_mqtt_domain;
                            }
                            attempts += 1;
                            tracing::warn!(attempts, new_domain = %domain, new_mqtt_domain = %mqtt_domain, "vendor API issued a domain redirect");
                            continue;
                        }
                    }

                    if api_status == 1030 {
                        return Err(HttpError::BadDomain {
                            attempts,
                            api_domain: serde_json::from_value::<RedirectData>(data.clone()).ok().and_then(|r| r.api_domain),
                            mqtt_domain: serde_json::from_value::<RedirectData>(data).ok().and_then(|r| r.mqtt_domain),
                        }
                        .into());
                    }

                    return Err(MerossError::new(
                        meross_protocol::error::api_status_to_kind(api_status),
                        format!("vendor API returned apiStatus {api_status}"),
                    )
                    .with_code(api_status));
                }
                Err(e) => {
                    self.record(path, None, None, elapsed_ms).await;
                    return Err(e.into());
                }
            }
        }
    }

    async fn send_once(&self, domain: &str, path: &str, params: &Value) -> Result<(i64, Option<u16>, Value), HttpError> {
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let nonce = crypto::random_nonce(16);
        let params_json = serde_json::to_string(params).map_err(HttpError::Decode)?;
        let params_b64 = BASE64.encode(params_json.as_bytes());
        let sign = crypto::sign_request(&self.request_secret, timestamp_ms, &nonce, &params_b64);

        let url = if domain.starts_with("http://") || domain.starts_with("https://") {
            format!("{domain}{path}")
        } else {
            format!("https://{domain}{path}")
        };
        let body = serde_json::json!({
            "params": params_b64,
            "sign": sign,
            "timestamp": timestamp_ms,
            "nonce": nonce,
        });

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| self.classify_reqwest_error(e))?;
        let status = response.status();
        let http_status = status.as_u16();
        if !status.is_success() {
            return Err(HttpError::HttpStatus { status: http_status });
        }
        let envelope: ApiEnvelope = response.json().await.map_err(|e| self.classify_reqwest_error(e))?;
        Ok((envelope.api_status, Some(http_status), envelope.data))
    }

    /// A timed-out transport call reports `is_timeout()`; everything else
    /// stays a generic transport error (§4.2: exceeded → `NETWORK_TIMEOUT`).
    fn classify_reqwest_error(&self, e: reqwest::Error) -> HttpError {
        if e.is_timeout() {
            HttpError::Timeout { timeout_ms: self.config.timeout_ms }
        } else {
            HttpError::Transport(e)
        }
    }

    async fn record(&self, path: &str, http_status: Option<u16>, api_status: Option<i64>, latency_ms: u64) {
        if let Some(stats) = &self.stats {
            let mut guard = stats.lock().await;
            guard.record_http(HttpSample {
                url: path.to_string(),
                method: "POST".to_string(),
                http_status,
                api_status,
                latency_ms,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    pub async fn login(&self, domain: &str, email: &str, password: &str, mfa_code: Option<&str>) -> MerossResult<Credentials> {
        let mut domain = domain.to_string();
        let mut mqtt_domain = domain.clone();
        let password_md5 = hex::encode(md5::compute(password.as_bytes()).0);

        let mut params = serde_json::json!({
            "email": email,
            "password": password_md5,
            "encryption": 1,
        });
        if let Some(code) = mfa_code {
            params["mfaCode"] = Value::String(code.to_string());
        }

        let data = self.signed_post(&mut domain, &mut mqtt_domain, "/v1/Auth/signIn", &params).await?;
        let login_data: LoginData = deserialize_data(data)?;

        Ok(Credentials::new(login_data.token, login_data.key, login_data.user_id, login_data.email, domain, mqtt_domain))
    }

    pub async fn list_devices(&self, creds: &mut Credentials) -> MerossResult<Vec<DeviceDescriptor>> {
        let params = serde_json::json!({});
        let data = self.authenticated_post(creds, "/v1/Device/devList", &params).await?;
        deserialize_data(data)
    }

    pub async fn list_sub_devices(&self, creds: &mut Credentials, hub_uuid: &str) -> MerossResult<Vec<SubDeviceDescriptor>> {
        let params = serde_json::json!({ "uuid": hub_uuid });
        let data = self.authenticated_post(creds, "/v1/Hub/getSubDevices", &params).await?;
        deserialize_data(data)
    }

    pub async fn logout(&self, creds: &mut Credentials) -> MerossResult<()> {
        let params = serde_json::json!({});
        self.authenticated_post(creds, "/v1/Profile/logout", &params).await?;
        Ok(())
    }

    /// Fire-and-forget client telemetry. Failures are swallowed per §7 but
    /// still logged at `debug`.
    pub async fn log_activity(&self, creds: &Credentials, meta: Value) {
        let mut domain = creds.http_domain.clone();
        let mut mqtt_domain = creds.mqtt_domain.clone();
        if let Err(e) = self.signed_post(&mut domain, &mut mqtt_domain, "/log/user", &meta).await {
            tracing::debug!(error = %e, "logActivity failed (swallowed)");
        }
    }

    /// Redirect updates are written back transactionally: both domains
    /// change together or neither does (§4.2, P5).
    async fn authenticated_post(&self, creds: &mut Credentials, path: &str, params: &Value) -> MerossResult<Value> {
        let mut domain = creds.http_domain.clone();
        let mut mqtt_domain = creds.mqtt_domain.clone();
        let result = self.signed_post(&mut domain, &mut mqtt_domain, path, params).await;
        if domain != creds.http_domain || mqtt_domain != creds.mqtt_domain {
            creds.http_domain = domain;
            creds.mqtt_domain = mqtt_domain;
        }
        result
    }
}

fn deserialize_data<T: DeserializeOwned>(data: Value) -> MerossResult<T> {
    serde_json::from_value(data).map_err(|e| MerossError::new(ErrorKind::ParseError, format!("malformed API response: {e}")))
}
