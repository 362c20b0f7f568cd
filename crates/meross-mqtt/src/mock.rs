//! Mock channel for testing the session and router without a live broker.

use std::sync::Mutex;

use async_trait::async_trait;
use rumqttc::QoS;

use crate::channel::Channel;
use crate::error::MqttResult;

#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

pub struct MockChannel {
    published: Mutex<Vec<PublishedMessage>>,
    subscriptions: Mutex<Vec<String>>,
    unsubscribed_count: Mutex<usize>,
    /// When set, every publish fails with this error instead of succeeding
    /// (used to simulate LAN/cloud transport failure in router tests).
    fail_publish: Mutex<bool>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self { published: Mutex::new(Vec::new()), subscriptions: Mutex::new(Vec::new()), unsubscribed_count: Mutex::new(0), fail_publish: Mutex::new(false) }
    }

    pub fn set_fail_publish(&self, fail: bool) {
        *self.fail_publish.lock().unwrap() = fail;
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn last_published(&self) -> Option<PublishedMessage> {
        self.published.lock().unwrap().last().cloned()
    }

    pub fn is_subscribed_to(&self, filter: &str) -> bool {
        self.subscriptions.lock().unwrap().iter().any(|f| f == filter)
    }

    pub fn unsubscribe_count(&self) -> usize {
        *self.unsubscribed_count.lock().unwrap()
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> MqttResult<()> {
        if *self.fail_publish.lock().unwrap() {
            return Err(crate::error::MqttError::Publish("mock publish failure".into()));
        }
        self.published.lock().unwrap().push(PublishedMessage { topic: topic.to_string(), payload, qos });
        Ok(())
    }

    async fn subscribe(&self, filter: &str, _qos: QoS) -> MqttResult<()> {
        self.subscriptions.lock().unwrap().push(filter.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, filter: &str) -> MqttResult<()> {
        self.subscriptions.lock().unwrap().retain(|f| f != filter);
        *self.unsubscribed_count.lock().unwrap() += 1;
        Ok(())
    }
}
