//! Per-device polling scheduler with smart-caching and account device-list
//! polling (C9, §4.7).

pub mod config;
pub mod device_list;
pub mod digest;
pub mod event;
pub mod freshness;
pub mod manager;
pub mod section;

pub use config::SubscriptionConfig;
pub use event::{DeviceListDelta, DeviceUpdate, SubscriptionEvent};
pub use manager::SubscriptionManager;
pub use section::Section;
