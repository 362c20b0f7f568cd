//! Per-`(uuid, section)` last-touched bookkeeping, driving the smart-caching
//! suppression described in §4.7.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::section::Section;

#[derive(Default)]
pub struct Freshness {
    touched: Mutex<HashMap<(String, Section), Instant>>,
}

impl Freshness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `(uuid, section)` hasn't been touched within `max_age` and
    /// therefore needs a fresh poll.
    pub fn is_stale(&self, uuid: &str, section: Section, max_age: Duration, now: Instant) -> bool {
        match self.touched.lock().unwrap().get(&(uuid.to_string(), section)) {
            Some(last) => now.saturating_duration_since(*last) >= max_age,
            None => true,
        }
    }

    pub fn mark(&self, uuid: &str, section: Section, now: Instant) {
        self.touched.lock().unwrap().insert((uuid.to_string(), section), now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_section_is_stale() {
        let f = Freshness::new();
        assert!(f.is_stale("uuid-1", Section::DeviceState, Duration::from_secs(10), Instant::now()));
    }

    #[test]
    fn freshly_touched_section_suppresses_poll() {
        let f = Freshness::new();
        let now = Instant::now();
        f.mark("uuid-1", Section::DeviceState, now);
        assert!(!f.is_stale("uuid-1", Section::DeviceState, Duration::from_secs(10), now));
    }

    #[test]
    fn touch_expires_past_max_age() {
        let f = Freshness::new();
        let now = Instant::now();
        f.mark("uuid-1", Section::DeviceState, now);
        let later = now + Duration::from_secs(11);
        assert!(f.is_stale("uuid-1", Section::DeviceState, Duration::from_secs(10), later));
    }

    #[test]
    fn sections_are_independent() {
        let f = Freshness::new();
        let now = Instant::now();
        f.mark("uuid-1", Section::DeviceState, now);
        assert!(f.is_stale("uuid-1", Section::Electricity, Duration::from_secs(10), now));
    }
}
