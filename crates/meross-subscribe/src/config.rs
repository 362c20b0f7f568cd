//! Per-subscription configuration (§4.7).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    pub device_state_interval: Duration,
    /// `None` disables the electricity poll (not every device reports it).
    pub electricity_interval: Option<Duration>,
    /// `None` disables the consumption poll.
    pub consumption_interval: Option<Duration>,
    pub smart_caching: bool,
    pub cache_max_age: Duration,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            device_state_interval: Duration::from_secs(60),
            electricity_interval: None,
            consumption_interval: None,
            smart_caching: true,
            cache_max_age: Duration::from_secs(10),
        }
    }
}
