//! Top-level facade over the Meross device-control stack: one `Manager`
//! composes HTTP login/discovery, the MQTT session, the LAN/cloud command
//! router, the device registry, polling subscriptions, and statistics
//! into the handful of operations application code actually needs.
//!
//! Crates that only need one slice of this (e.g. pure HTTP discovery, or
//! routing logic against an already-built session) can depend on the
//! relevant `meross-*` crate directly instead of going through `Manager`.

pub mod config;
pub mod events;
pub mod manager;
pub mod session;

pub use config::ManagerConfig;
pub use events::{Event, EventEmitter, EventKind};
pub use manager::Manager;
pub use session::SessionHandle;

// Re-exported for callers that only want HTTP login/discovery without a
// live MQTT session.
pub use meross_http::{HttpConfig, MerossHttpClient};
pub use meross_protocol::error::{ErrorKind, MerossError, MerossResult};
pub use meross_protocol::{ChangeSource, Credentials, DeviceDescriptor};
pub use meross_registry::{DeviceFilter, DeviceIdentifier, DeviceSnapshot};
pub use meross_subscribe::SubscriptionConfig;
