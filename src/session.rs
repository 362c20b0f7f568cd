//! `SessionHandle`: the narrow manager-facing surface application code can
//! hold for a single device instead of the whole `Manager` (§9 "circular
//! references become unidirectional" — the registry's `Device` never holds
//! a reference back to the manager; callers that want one get this
//! instead).

use std::sync::Arc;
use std::time::Duration;

use meross_mqtt::Channel;
use meross_protocol::envelope::Method;
use meross_protocol::error::{ErrorKind, MerossError, MerossResult};
use meross_registry::Registry;
use meross_router::{CommandRouter, Target};
use serde_json::Value;

use crate::events::{Event, EventEmitter};

/// A narrow, cloneable handle scoped to one device's uuid.
pub struct SessionHandle<C: Channel> {
    uuid: String,
    reply_topic: String,
    router: Arc<CommandRouter<C>>,
    registry: Arc<Registry<C>>,
    events: Arc<EventEmitter>,
}

impl<C: Channel> SessionHandle<C> {
    pub(crate) fn new(uuid: impl Into<String>, reply_topic: impl Into<String>, router: Arc<CommandRouter<C>>, registry: Arc<Registry<C>>, events: Arc<EventEmitter>) -> Self {
        Self { uuid: uuid.into(), reply_topic: reply_topic.into(), router, registry, events }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Send a command for this device through the router, emitting
    /// `rawSendData` first.
    pub async fn publish(&self, method: Method, namespace: &str, payload: Value, timeout: Option<Duration>) -> MerossResult<Value> {
        let target = self.target()?;
        self.events.emit(Event::RawSendData { uuid: self.uuid.clone(), namespace: namespace.to_string(), payload: payload.clone() });
        self.router.dispatch(&target, method, namespace, payload, timeout).await
    }

    /// This device's last-known LAN address, if any.
    pub fn lan_address(&self) -> Option<String> {
        self.registry.with_device(&self.uuid, |device| device.lan_ip.clone()).flatten()
    }

    pub fn emit(&self, event: Event) {
        self.events.emit(event);
    }

    fn target(&self) -> MerossResult<Target> {
        self.registry
            .with_device(&self.uuid, |device| Target { uuid: device.uuid().to_string(), device_key: device.device_key.clone(), lan_ip: device.lan_ip.clone(), reply_topic: self.reply_topic.clone() })
            .ok_or_else(|| MerossError::new(ErrorKind::NotFound, format!("device {} is not registered", self.uuid)))
    }
}
