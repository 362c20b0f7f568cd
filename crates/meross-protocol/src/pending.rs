//! The pending-request table entry shared by the MQTT session (C3) and the
//! command router (C5): `{messageId, method, namespace, sentAt, deadline,
//! transport, resolver}` (§3).

use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::envelope::Method;
use crate::error::MerossResult;

/// Which wire transport a request was (or will be) issued over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Mqtt,
    LanHttp,
}

/// A reply, delivered exactly once, to whoever is awaiting a given
/// `messageId`.
pub type Reply = MerossResult<serde_json::Value>;

/// Tracks one in-flight request from `publish` to response/timeout.
///
/// At most one instance exists per `messageId` at a time (global invariant
/// 1, §3); the owning table enforces this on insert.
pub struct PendingRequest {
    pub message_id: String,
    pub method: Method,
    pub namespace: String,
    pub sent_at: DateTime<Utc>,
    pub deadline: Instant,
    pub transport: Transport,
    resolver: Option<oneshot::Sender<Reply>>,
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("message_id", &self.message_id)
            .field("method", &self.method)
            .field("namespace", &self.namespace)
            .field("sent_at", &self.sent_at)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl PendingRequest {
    pub fn new(
        message_id: impl Into<String>,
        method: Method,
        namespace: impl Into<String>,
        deadline: Instant,
        transport: Transport,
    ) -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        let req = Self {
            message_id: message_id.into(),
            method,
            namespace: namespace.into(),
            sent_at: Utc::now(),
            deadline,
            transport,
            resolver: Some(tx),
        };
        (req, rx)
    }

    /// Resolve the waiter with a reply. Idempotent: a second call is a no-op
    /// (the resolver was already consumed), matching "resolution happens
    /// exactly once" (§5 Ordering).
    pub fn resolve(&mut self, reply: Reply) {
        if let Some(tx) = self.resolver.take() {
            let _ = tx.send(reply);
        }
    }

    pub fn is_settled(&self) -> bool {
        self.resolver.is_none()
    }
}
