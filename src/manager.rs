//! `Manager`: the library's composition root (§12). Owns the account's
//! MQTT session, the device registry, the command router, the
//! subscription manager, and the statistics sinks; exposes the operations
//! application code actually calls. Grounded on the teacher's `AppState`
//! composition-root pattern (`zc-cloud-api::state::AppState`) and
//! `zc-fleet-agent::mqtt_loop::run`'s event-loop-driving shape.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{Event as MqttEvent, EventLoop, Packet};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info};

use meross_http::MerossHttpClient;
use meross_lan::LanClient;
use meross_mqtt::{Channel, MqttChannel, MqttSession};
use meross_protocol::error::{ErrorKind, MerossError, MerossResult};
use meross_protocol::Credentials;
use meross_push::{PushReducer, ReducedEvent};
use meross_registry::{Device, DeviceFilter, DeviceIdentifier, DeviceSnapshot, Registry};
use meross_router::CommandRouter;
use meross_stats::{HttpSummary, MqttSummary, Statistics};
use meross_subscribe::{SubscriptionConfig, SubscriptionEvent, SubscriptionManager};

use crate::config::ManagerConfig;
use crate::events::{Event, EventEmitter, EventKind};
use crate::session::SessionHandle;

/// Everything that exists only while a live (or mocked) MQTT connection is
/// up. `None` before the first `connect`/attach and after `destroy`.
struct Session<C: Channel> {
    mqtt: Arc<MqttSession<C>>,
    router: Arc<CommandRouter<C>>,
    registry: Arc<Registry<C>>,
    subscriptions: Arc<SubscriptionManager<C>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<C: Channel> Session<C> {
    fn shutdown(self) {
        self.subscriptions.destroy();
        self.mqtt.cancel_all();
        for task in self.tasks {
            task.abort();
        }
    }
}

/// The library's public composition root. Generic over the MQTT transport
/// so tests can inject a `MockChannel`-backed session without a live
/// broker; application code uses the default `MqttChannel`.
pub struct Manager<C: Channel = MqttChannel> {
    config: ManagerConfig,
    http: Arc<MerossHttpClient>,
    stats: Arc<tokio::sync::Mutex<Statistics>>,
    events: Arc<EventEmitter>,
    session: RwLock<Option<Session<C>>>,
}

impl<C: Channel + 'static> Manager<C> {
    pub fn new(config: ManagerConfig) -> Arc<Self> {
        let stats = Arc::new(tokio::sync::Mutex::new(Statistics::with_capacity(config.stats_capacity)));
        let http = Arc::new(MerossHttpClient::new(config.http.clone()).with_statistics(Arc::clone(&stats)));
        Arc::new(Self { config, http, stats, events: Arc::new(EventEmitter::new()), session: RwLock::new(None) })
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub fn on(&self, kind: EventKind, listener: impl Fn(&Event) + Send + Sync + 'static) {
        self.events.on(kind, listener);
    }

    pub async fn http_summary(&self, window: Duration) -> HttpSummary {
        self.stats.lock().await.query_http(chrono::Utc::now(), chrono::Duration::from_std(window).unwrap_or_default())
    }

    pub async fn mqtt_summary(&self, window: Duration) -> MqttSummary {
        self.stats.lock().await.query_mqtt(chrono::Utc::now(), chrono::Duration::from_std(window).unwrap_or_default())
    }

    /// Log in to the vendor HTTP API. Does not itself establish MQTT — the
    /// returned credentials still need `connect`/`attach_session`.
    pub async fn login(&self, domain: &str, email: &str, password: &str, mfa_code: Option<&str>) -> MerossResult<Credentials> {
        self.http.login(domain, email, password, mfa_code).await
    }

    pub async fn logout(&self, creds: &mut Credentials) -> MerossResult<()> {
        self.http.logout(creds).await
    }

    /// Wire a ready-made MQTT session (real or mocked) into a fresh
    /// `Session`, replacing and shutting down any previous one. Returns
    /// the subscription-event receiver so the caller can forward it
    /// (`connect` does this itself for the real `MqttChannel` path;
    /// callers plugging in their own `Channel` impl own that wiring).
    pub async fn attach_session(self: &Arc<Self>, mqtt: Arc<MqttSession<C>>, lan: Arc<LanClient>) -> (Arc<Registry<C>>, tokio::sync::mpsc::UnboundedReceiver<SubscriptionEvent>) {
        let router = Arc::new(CommandRouter::new(Arc::clone(&mqtt), lan, self.config.router.clone()));
        let registry = Arc::new(Registry::new(Arc::clone(&self.http), Arc::clone(&mqtt), Arc::clone(&router)));
        let (subscriptions, subscription_events) = SubscriptionManager::new(Arc::clone(&registry), Arc::clone(&router), mqtt.reply_topic().to_string());

        let old = self.session.write().await.replace(Session { mqtt, router, registry: Arc::clone(&registry), subscriptions, tasks: Vec::new() });
        if let Some(old) = old {
            old.shutdown();
        }

        (registry, subscription_events)
    }

    /// Attach background tasks (e.g. the event-loop driver) to the current
    /// session so `destroy`/a future `attach_session` aborts them too.
    async fn push_tasks(&self, tasks: impl IntoIterator<Item = JoinHandle<()>>) {
        if let Some(session) = self.session.write().await.as_mut() {
            session.tasks.extend(tasks);
        }
    }

    /// Spawn the task that forwards `SubscriptionManager` events into the
    /// facade's `EventEmitter`.
    fn spawn_subscription_forwarder(events: Arc<EventEmitter>, mut rx: tokio::sync::mpsc::UnboundedReceiver<SubscriptionEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    SubscriptionEvent::DeviceUpdate(update) => {
                        events.emit(Event::State { uuid: update.uuid, changes: update.changes, source: update.source });
                    }
                    SubscriptionEvent::DeviceListChanged(delta) => {
                        info!(added = delta.added.len(), removed = delta.removed.len(), changed = delta.changed.len(), "device list changed");
                    }
                    SubscriptionEvent::Error { error, uuid } => {
                        events.emit(Event::Error { error, uuid });
                    }
                }
            }
        })
    }

    async fn with_session<R>(&self, f: impl FnOnce(&Session<C>) -> R) -> MerossResult<R> {
        let guard = self.session.read().await;
        guard.as_ref().map(f).ok_or_else(|| MerossError::new(ErrorKind::Unconnected, "manager has no active session"))
    }

    pub async fn discover(&self, creds: &mut Credentials, filter: &DeviceFilter) -> MerossResult<Vec<meross_protocol::DeviceDescriptor>> {
        let registry = self.with_session(|s| Arc::clone(&s.registry)).await?;
        registry.discover(creds, filter).await
    }

    /// Discover and initialize devices, emitting `deviceInitialized` for
    /// each uuid that came up successfully.
    pub async fn initialize(&self, creds: &mut Credentials, filter: &DeviceFilter) -> MerossResult<Vec<String>> {
        let registry = self.with_session(|s| Arc::clone(&s.registry)).await?;
        let initialized = registry.initialize(creds, filter).await?;
        for uuid in &initialized {
            self.events.emit(Event::DeviceInitialized { uuid: uuid.clone() });
        }
        Ok(initialized)
    }

    pub async fn get(&self, uuid: &str) -> MerossResult<Option<DeviceSnapshot>> {
        self.with_session(|s| s.registry.get(uuid)).await
    }

    pub async fn list(&self) -> MerossResult<Vec<DeviceSnapshot>> {
        self.with_session(|s| s.registry.list()).await
    }

    pub async fn find(&self, filter: &DeviceFilter) -> MerossResult<Vec<DeviceSnapshot>> {
        self.with_session(|s| s.registry.find(filter)).await
    }

    pub async fn remove(&self, identifier: &DeviceIdentifier) -> MerossResult<()> {
        let registry = self.with_session(|s| Arc::clone(&s.registry)).await?;
        registry.remove(identifier).await
    }

    /// Start polling `uuid` per `config` (caller-chosen, or
    /// `self.config.default_subscription`).
    pub async fn subscribe_device(&self, uuid: &str, config: SubscriptionConfig) -> MerossResult<()> {
        self.with_session(|s| s.subscriptions.subscribe_device(uuid, config)).await
    }

    pub async fn unsubscribe_device(&self, uuid: &str) -> MerossResult<()> {
        self.with_session(|s| s.subscriptions.unsubscribe(uuid)).await
    }

    /// A narrow handle application code can hold for one device instead of
    /// the whole `Manager` (§9 unidirectional references).
    pub async fn session_handle(&self, uuid: &str) -> MerossResult<SessionHandle<C>> {
        self.with_session(|s| SessionHandle::new(uuid, s.mqtt.reply_topic(), Arc::clone(&s.router), Arc::clone(&s.registry), Arc::clone(&self.events))).await
    }

    /// Tear down the live session: stop every subscription timer, resolve
    /// outstanding requests with `Unconnected`, and abort background
    /// tasks. The manager can `attach_session`/`connect` again afterward.
    pub async fn destroy(&self) {
        if let Some(session) = self.session.write().await.take() {
            session.shutdown();
        }
    }
}

impl Manager<MqttChannel> {
    /// Establish a live MQTT connection for `creds` and start routing
    /// inbound traffic through the push reducer and subscription manager.
    pub async fn connect(self: &Arc<Self>, creds: &Credentials) -> MerossResult<()> {
        let (channel, eventloop, client_id) = MqttChannel::new(&self.config.mqtt, &creds.mqtt_domain, &creds.user_id, &creds.key);
        let mqtt = Arc::new(MqttSession::new(Arc::new(channel), self.config.mqtt.clone(), &creds.user_id, &client_id));
        let lan = Arc::new(LanClient::new(self.config.lan.clone()));

        mqtt.subscribe_reply_topic().await?;

        let (registry, subscription_events) = self.attach_session(Arc::clone(&mqtt), lan).await;
        let reducer = PushReducer::new(Arc::clone(&registry));

        let forward_task = Self::spawn_subscription_forwarder(Arc::clone(&self.events), subscription_events);
        let event_loop_task = tokio::spawn(run_mqtt_event_loop(eventloop, mqtt, reducer, Arc::clone(&self.events)));
        self.push_tasks([forward_task, event_loop_task]).await;

        Ok(())
    }
}

/// Drive the `rumqttc` event loop: classify inbound publishes, feed them
/// to the push reducer, and emit the resulting facade events. Runs until
/// the task is aborted (by `destroy`/a subsequent `connect`).
async fn run_mqtt_event_loop(mut eventloop: EventLoop, mqtt: Arc<MqttSession<MqttChannel>>, reducer: PushReducer<MqttChannel>, events: Arc<EventEmitter>) {
    let mut reconnect_attempt = 0u32;
    loop {
        match eventloop.poll().await {
            Ok(MqttEvent::Incoming(Packet::ConnAck(_))) => {
                reconnect_attempt = 0;
                events.emit(Event::Connected);
            }
            Ok(MqttEvent::Incoming(Packet::Publish(publish))) => {
                if let Some(incoming) = mqtt.handle_inbound(&publish.topic, &publish.payload) {
                    let uuid = incoming.uuid.clone();
                    let namespace = incoming.envelope.header.namespace.clone();
                    let payload = incoming.envelope.payload.clone();

                    events.emit(Event::RawData { uuid: uuid.clone(), namespace: namespace.clone(), payload: payload.clone() });
                    events.emit(Event::PushNotification { uuid: uuid.clone(), namespace, payload });

                    for reduced in reducer.handle(incoming) {
                        match reduced {
                            ReducedEvent::State(change) => {
                                events.emit(Event::State { uuid: uuid.clone(), changes: vec![change], source: meross_protocol::ChangeSource::Push });
                            }
                            ReducedEvent::Online { uuid, previous, current } => {
                                events.emit(Event::Online { uuid, previous, current });
                            }
                        }
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                reconnect_attempt += 1;
                error!(error = %e, attempt = reconnect_attempt, "mqtt event loop error, reconnecting in 5s");
                events.emit(Event::Disconnected { reason: Some(e.to_string()) });
                tokio::time::sleep(Duration::from_secs(5)).await;
                events.emit(Event::Reconnect { attempt: reconnect_attempt });
            }
        }
    }
}

#[allow(dead_code)]
fn assert_device_has_no_manager_backreference(_device: &Device) {
    // Compile-time documentation only: `Device` never holds an `Arc<Manager>`
    // (§9 "circular references become unidirectional") — callers needing
    // to talk back to the manager use `SessionHandle` instead.
}
