//! Bounded statistics ring-buffers for HTTP and MQTT traffic (C10, spec
//! §4.8). Queries aggregate within a time window and never allocate
//! proportional to full history — only to the slice inside the window.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_CAPACITY: usize = 1000;

/// One recorded HTTP call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSample {
    pub url: String,
    pub method: String,
    pub http_status: Option<u16>,
    pub api_status: Option<i64>,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// One recorded MQTT publish/reply cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttSample {
    pub namespace: String,
    pub method: String,
    pub delayed: bool,
    pub dropped: bool,
    pub latency_ms: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// A fixed-capacity FIFO buffer: pushing past capacity evicts the oldest
/// sample. This bounds memory regardless of traffic volume.
#[derive(Debug)]
struct RingBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> RingBuffer<T> {
    fn new(capacity: usize) -> Self {
        Self { capacity, items: VecDeque::with_capacity(capacity) }
    }

    fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }
}

/// Aggregated counts for an HTTP query window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HttpSummary {
    pub total: usize,
    pub by_http_status: Vec<(u16, usize)>,
    pub by_api_status: Vec<(i64, usize)>,
    pub by_url: Vec<(String, usize)>,
    pub average_latency_ms: f64,
}

/// Aggregated counts for an MQTT query window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MqttSummary {
    pub total: usize,
    pub by_namespace_method: Vec<((String, String), usize)>,
    pub delayed: usize,
    pub dropped: usize,
    pub average_latency_ms: f64,
}

/// The process-wide (or per-account) statistics sink threaded through C2
/// and C3.
pub struct Statistics {
    http: RingBuffer<HttpSample>,
    mqtt: RingBuffer<MqttSample>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { http: RingBuffer::new(capacity), mqtt: RingBuffer::new(capacity) }
    }

    pub fn record_http(&mut self, sample: HttpSample) {
        self.http.push(sample);
    }

    pub fn record_mqtt(&mut self, sample: MqttSample) {
        self.mqtt.push(sample);
    }

    /// Aggregate HTTP samples whose timestamp falls within `[now - window, now]`.
    pub fn query_http(&self, now: DateTime<Utc>, window: Duration) -> HttpSummary {
        let cutoff = now - window;
        let in_window: Vec<&HttpSample> = self.http.items.iter().filter(|s| s.timestamp >= cutoff && s.timestamp <= now).collect();

        let mut by_http_status: std::collections::BTreeMap<u16, usize> = Default::default();
        let mut by_api_status: std::collections::BTreeMap<i64, usize> = Default::default();
        let mut by_url: std::collections::BTreeMap<String, usize> = Default::default();
        let mut total_latency = 0u64;

        for s in &in_window {
            if let Some(status) = s.http_status {
                *by_http_status.entry(status).or_insert(0) += 1;
            }
            if let Some(status) = s.api_status {
                *by_api_status.entry(status).or_insert(0) += 1;
            }
            *by_url.entry(s.url.clone()).or_insert(0) += 1;
            total_latency += s.latency_ms;
        }

        HttpSummary {
            total: in_window.len(),
            by_http_status: by_http_status.into_iter().collect(),
            by_api_status: by_api_status.into_iter().collect(),
            by_url: by_url.into_iter().collect(),
            average_latency_ms: if in_window.is_empty() { 0.0 } else { total_latency as f64 / in_window.len() as f64 },
        }
    }

    /// Aggregate MQTT samples whose timestamp falls within `[now - window, now]`.
    pub fn query_mqtt(&self, now: DateTime<Utc>, window: Duration) -> MqttSummary {
        let cutoff = now - window;
        let in_window: Vec<&MqttSample> = self.mqtt.items.iter().filter(|s| s.timestamp >= cutoff && s.timestamp <= now).collect();

        let mut by_namespace_method: std::collections::BTreeMap<(String, String), usize> = Default::default();
        let mut delayed = 0;
        let mut dropped = 0;
        let mut total_latency = 0u64;
        let mut latency_count = 0usize;

        for s in &in_window {
            *by_namespace_method.entry((s.namespace.clone(), s.method.clone())).or_insert(0) += 1;
            if s.delayed {
                delayed += 1;
            }
            if s.dropped {
                dropped += 1;
            }
            if let Some(ms) = s.latency_ms {
                total_latency += ms;
                latency_count += 1;
            }
        }

        MqttSummary {
            total: in_window.len(),
            by_namespace_method: by_namespace_method.into_iter().collect(),
            delayed,
            dropped,
            average_latency_ms: if latency_count == 0 { 0.0 } else { total_latency as f64 / latency_count as f64 },
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}
