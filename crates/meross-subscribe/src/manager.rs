//! `SubscriptionManager` (C9, §4.7): one `tokio::time::interval` task per
//! configured section of each subscribed device, plus an optional account-
//! level device-list poller. Grounded on the teacher's per-task tick-loop
//! shape (`zc-fleet-agent::heartbeat::run`/`shadow_sync::run`), generalized
//! from one fixed loop per process to many dynamically spawned loops keyed
//! by uuid and section.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::warn;

use meross_protocol::change::ChangeSource;
use meross_protocol::envelope::Method;
use meross_protocol::Credentials;
use meross_mqtt::Channel;
use meross_registry::{DeviceFilter, Registry};
use meross_router::{CommandRouter, Target};

use crate::config::SubscriptionConfig;
use crate::digest::reduce_system_all_digest;
use crate::device_list;
use crate::event::{DeviceUpdate, SubscriptionEvent};
use crate::freshness::Freshness;
use crate::section::Section;

pub struct SubscriptionManager<C: Channel> {
    registry: Arc<Registry<C>>,
    router: Arc<CommandRouter<C>>,
    reply_topic: String,
    freshness: Freshness,
    events: mpsc::UnboundedSender<SubscriptionEvent>,
    device_tasks: Mutex<HashMap<String, Vec<JoinHandle<()>>>>,
    device_list_task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Channel + 'static> SubscriptionManager<C> {
    pub fn new(registry: Arc<Registry<C>>, router: Arc<CommandRouter<C>>, reply_topic: impl Into<String>) -> (Arc<Self>, mpsc::UnboundedReceiver<SubscriptionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let manager = Arc::new(Self {
            registry,
            router,
            reply_topic: reply_topic.into(),
            freshness: Freshness::new(),
            events,
            device_tasks: Mutex::new(HashMap::new()),
            device_list_task: Mutex::new(None),
        });
        (manager, receiver)
    }

    /// Start one timer task per configured section for `uuid` (§4.7 "Config
    /// (per subscription)"). Replaces any existing subscription for the same
    /// device.
    pub fn subscribe_device(self: &Arc<Self>, uuid: &str, config: SubscriptionConfig) {
        self.unsubscribe(uuid);

        let mut handles = vec![self.spawn_section(uuid, Section::DeviceState, config.device_state_interval, &config)];
        if let Some(interval) = config.electricity_interval {
            handles.push(self.spawn_section(uuid, Section::Electricity, interval, &config));
        }
        if let Some(interval) = config.consumption_interval {
            handles.push(self.spawn_section(uuid, Section::Consumption, interval, &config));
        }

        self.device_tasks.lock().unwrap().insert(uuid.to_string(), handles);
    }

    /// Stop `uuid`'s per-section timers (§4.7 "Cancellation").
    pub fn unsubscribe(&self, uuid: &str) {
        if let Some(handles) = self.device_tasks.lock().unwrap().remove(uuid) {
            for handle in handles {
                handle.abort();
            }
        }
    }

    /// Poll `listDevices` at `interval`, diffing each tick against the
    /// previous snapshot (§4.7 "subscribeToDeviceList").
    pub fn subscribe_to_device_list(self: &Arc<Self>, creds: Credentials, filter: DeviceFilter, interval: Duration) {
        if let Some(old) = self.device_list_task.lock().unwrap().take() {
            old.abort();
        }

        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut creds = creds;
            let mut previous = manager.registry.find(&filter);
            let mut ticker = time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match manager.registry.discover(&mut creds, &filter).await {
                    Ok(_) => {
                        let current = manager.registry.find(&filter);
                        let delta = device_list::diff(&previous, &current);
                        if !delta.is_empty() {
                            let _ = manager.events.send(SubscriptionEvent::DeviceListChanged(delta));
                        }
                        previous = current;
                    }
                    Err(error) => {
                        warn!(error = %error, "device-list poll failed");
                        let _ = manager.events.send(SubscriptionEvent::Error { error, uuid: None });
                    }
                }
            }
        });

        *self.device_list_task.lock().unwrap() = Some(handle);
    }

    /// Stop every timer task, including the device-list poller (§4.7
    /// "destroy").
    pub fn destroy(&self) {
        for (_, handles) in self.device_tasks.lock().unwrap().drain() {
            for handle in handles {
                handle.abort();
            }
        }
        if let Some(handle) = self.device_list_task.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Mark `uuid`'s section fresh because a push notification on
    /// `namespace` just updated it in place, suppressing the corresponding
    /// poll's next tick (§4.7).
    pub fn notify_push(&self, uuid: &str, namespace: &str) {
        if let Some(section) = Section::for_namespace(namespace) {
            self.freshness.mark(uuid, section, Instant::now());
        }
    }

    fn spawn_section(self: &Arc<Self>, uuid: &str, section: Section, interval: Duration, config: &SubscriptionConfig) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let uuid = uuid.to_string();
        let smart_caching = config.smart_caching;
        let cache_max_age = config.cache_max_age;

        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let now = Instant::now();
                if smart_caching && !manager.freshness.is_stale(&uuid, section, cache_max_age, now) {
                    continue;
                }
                manager.poll_section(&uuid, section).await;
            }
        })
    }

    async fn poll_section(&self, uuid: &str, section: Section) {
        let Some(target) = self.target_for(uuid) else {
            return;
        };

        match self.router.dispatch(&target, Method::Get, section.namespace(), serde_json::json!({}), None).await {
            Ok(reply) => self.apply_poll_result(uuid, section, &reply),
            Err(error) => {
                warn!(uuid, section = section.label(), error = %error, "poll failed");
                let _ = self.events.send(SubscriptionEvent::Error { error, uuid: Some(uuid.to_string()) });
            }
        }

        self.freshness.mark(uuid, section, Instant::now());
    }

    fn target_for(&self, uuid: &str) -> Option<Target> {
        self.registry.with_device(uuid, |device| Target {
            uuid: device.uuid().to_string(),
            device_key: device.device_key.clone(),
            lan_ip: device.lan_ip.clone(),
            reply_topic: self.reply_topic.clone(),
        })
    }

    fn apply_poll_result(&self, uuid: &str, section: Section, reply: &Value) {
        let now = Utc::now();
        let changes = self.registry.with_device_mut(uuid, |device| match section {
            Section::DeviceState => {
                device.absorb_system_all(reply, now);
                let feature_set = self.registry.feature_set_for(&device.descriptor, &device.abilities);
                reduce_system_all_digest(device, &feature_set, reply, now)
            }
            Section::Electricity | Section::Consumption => {
                let feature_set = self.registry.feature_set_for(&device.descriptor, &device.abilities);
                let handler = feature_set.resolve(section.namespace());
                let entries = meross_push::normalize_entries(reply, section.wire_key());
                let mut changes = Vec::new();
                for entry in &entries {
                    if let Some((channel, projection)) = handler.extract(entry) {
                        changes.extend(device.apply_projection(section.namespace(), channel, projection, handler.projection_fields(), ChangeSource::Poll, now));
                    }
                }
                changes
            }
        });

        let Some(changes) = changes else {
            warn!(uuid, section = section.label(), "poll reply for unregistered device, dropping");
            return;
        };

        if !changes.is_empty() {
            let update = DeviceUpdate { uuid: uuid.to_string(), source: ChangeSource::Poll, timestamp: now, state: reply.clone(), changes };
            let _ = self.events.send(SubscriptionEvent::DeviceUpdate(update));
        }
    }
}
