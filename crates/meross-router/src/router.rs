//! `CommandRouter`: the per-request transport-selection algorithm of §4.4.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};

use meross_protocol::envelope::Method;
use meross_protocol::error::{ErrorKind, MerossError, MerossResult};
use meross_mqtt::{Channel, MqttSession};
use meross_lan::LanClient;

use crate::budget::ErrorBudget;

/// Which transport a caller wants requests routed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// All traffic goes over C3 (MQTT).
    MqttOnly,
    /// Try LAN first for every method; fall back to cloud on failure.
    LanHttpFirst,
    /// Try LAN first only for GETs; SETs always go straight to cloud.
    LanHttpFirstOnlyGet,
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub mode: TransportMode,
    /// Starting/reset value of each device's LAN error budget.
    pub error_budget_max: u32,
    /// How long LAN stays disabled once a device's budget hits zero.
    pub error_budget_cooldown: Duration,
    /// Default per-request deadline when the caller doesn't supply one.
    pub default_timeout: Duration,
    /// Cap on cloud-retry attempts after a LAN→cloud fallback (GETs only).
    pub max_fallback_retries: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::LanHttpFirst,
            error_budget_max: 5,
            error_budget_cooldown: Duration::from_secs(60),
            default_timeout: Duration::from_secs(10),
            max_fallback_retries: 3,
        }
    }
}

/// The addressing and keying information the router needs for one device;
/// owned by the caller (the registry), not the router (§9 "circular
/// references become unidirectional").
#[derive(Debug, Clone)]
pub struct Target {
    pub uuid: String,
    pub device_key: String,
    pub lan_ip: Option<String>,
    pub reply_topic: String,
}

pub struct CommandRouter<C: Channel> {
    mqtt: Arc<MqttSession<C>>,
    lan: Arc<LanClient>,
    config: RouterConfig,
    budgets: Mutex<HashMap<String, ErrorBudget>>,
}

impl<C: Channel> CommandRouter<C> {
    pub fn new(mqtt: Arc<MqttSession<C>>, lan: Arc<LanClient>, config: RouterConfig) -> Self {
        Self { mqtt, lan, config, budgets: Mutex::new(HashMap::new()) }
    }

    fn budget_available(&self, uuid: &str, now: Instant) -> bool {
        let mut table = self.budgets.lock().unwrap();
        table.entry(uuid.to_string()).or_insert_with(|| ErrorBudget::new(self.config.error_budget_max, self.config.error_budget_cooldown)).is_available(now)
    }

    fn record_lan_success(&self, uuid: &str) {
        if let Some(budget) = self.budgets.lock().unwrap().get_mut(uuid) {
            budget.record_success();
        }
    }

    fn record_lan_failure(&self, uuid: &str, now: Instant) {
        let mut table = self.budgets.lock().unwrap();
        table.entry(uuid.to_string()).or_insert_with(|| ErrorBudget::new(self.config.error_budget_max, self.config.error_budget_cooldown)).record_failure(now);
    }

    fn wants_lan(&self, target: &Target, method: Method, now: Instant) -> bool {
        let eligible_method = match self.config.mode {
            TransportMode::MqttOnly => return false,
            TransportMode::LanHttpFirst => true,
            TransportMode::LanHttpFirstOnlyGet => method == Method::Get,
        };
        eligible_method && target.lan_ip.is_some() && self.budget_available(&target.uuid, now)
    }

    /// Run the §4.4 per-request algorithm: pick a primary transport, send,
    /// fall back from LAN to cloud on transport failure, and (for GETs
    /// only) retry the cloud leg with backoff if it times out transiently.
    pub async fn dispatch(&self, target: &Target, method: Method, namespace: &str, payload: serde_json::Value, timeout: Option<Duration>) -> MerossResult<serde_json::Value> {
        let timeout = timeout.unwrap_or(self.config.default_timeout);
        let deadline = Instant::now() + timeout;

        if self.wants_lan(target, method, Instant::now()) {
            let lan_ip = target.lan_ip.clone().expect("checked by wants_lan");
            let remaining = deadline.saturating_duration_since(Instant::now());

            match self.try_lan(target, &lan_ip, method, namespace, payload.clone(), remaining).await {
                Ok(reply) => {
                    self.record_lan_success(&target.uuid);
                    return Ok(reply);
                }
                Err(e) => {
                    self.record_lan_failure(&target.uuid, Instant::now());
                    warn!(uuid = %target.uuid, error = %e, "lan attempt failed, falling back to cloud");
                }
            }
        }

        self.dispatch_cloud(target, method, namespace, payload, deadline).await
    }

    async fn try_lan(&self, target: &Target, lan_ip: &str, method: Method, namespace: &str, payload: serde_json::Value, remaining: Duration) -> MerossResult<serde_json::Value> {
        let envelope = meross_protocol::envelope::Envelope::new_request(method, namespace, &target.uuid, payload, &target.device_key, &target.reply_topic, "1");
        match tokio::time::timeout(remaining, self.lan.send(lan_ip, &envelope)).await {
            Ok(result) => result,
            Err(_) => Err(MerossError::new(ErrorKind::NetworkTimeout, "lan request timed out")),
        }
    }

    async fn dispatch_cloud(&self, target: &Target, method: Method, namespace: &str, payload: serde_json::Value, deadline: Instant) -> MerossResult<serde_json::Value> {
        let mut attempt = 0u32;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(MerossError::new(ErrorKind::CommandTimeout, format!("no time remaining for {namespace} after LAN fallback")));
            }

            let result = self.mqtt.publish(&target.uuid, &target.device_key, method, namespace, payload.clone(), Some(remaining)).await;

            match result {
                Ok(reply) => return Ok(reply),
                Err(e) if e.kind == ErrorKind::CommandTimeout && method == Method::Get && attempt < self.config.max_fallback_retries => {
                    attempt += 1;
                    let backoff = backoff_with_jitter(attempt);
                    let sleep_for = backoff.min(deadline.saturating_duration_since(Instant::now()));
                    if sleep_for.is_zero() {
                        return Err(e);
                    }
                    debug!(uuid = %target.uuid, attempt, ?sleep_for, "retrying cloud GET after timeout");
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exponential backoff doubling from 200ms, capped at 5s, with up-to-30%
/// jitter so concurrent retries don't synchronize.
fn backoff_with_jitter(attempt: u32) -> Duration {
    let base_ms = 200u64.saturating_mul(1u64 << attempt.min(8)).min(5_000);
    let jitter_ms = rand::thread_rng().gen_range(0..=(base_ms / 3).max(1));
    Duration::from_millis(base_ms + jitter_ms)
}
