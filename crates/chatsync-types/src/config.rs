use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for the synchronization driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How often the thread directory is re-fetched while signed in
    pub thread_poll_interval: Duration,
    /// How often the selected thread's messages are re-fetched
    pub message_poll_interval: Duration,
    /// `limit` sent with every message fetch
    pub message_page_limit: u32,
    /// Max clock skew between an optimistic message and its remote copy
    pub signature_tolerance: Duration,
    /// Buffer size of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            thread_poll_interval: Duration::from_secs(5),
            message_poll_interval: Duration::from_secs(2),
            message_page_limit: 100,
            signature_tolerance: Duration::from_secs(10),
            event_capacity: 256,
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread_poll_interval(mut self, interval: Duration) -> Self {
        self.thread_poll_interval = interval;
        self
    }

    pub fn with_message_poll_interval(mut self, interval: Duration) -> Self {
        self.message_poll_interval = interval;
        self
    }

    pub fn with_message_page_limit(mut self, limit: u32) -> Self {
        self.message_page_limit = limit;
        self
    }

    pub fn with_signature_tolerance(mut self, tolerance: Duration) -> Self {
        self.signature_tolerance = tolerance;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Signature tolerance as a signed chrono duration
    pub fn tolerance(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.signature_tolerance.as_millis() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_polling_cadence() {
        let config = SyncConfig::default();
        assert_eq!(config.thread_poll_interval, Duration::from_secs(5));
        assert_eq!(config.message_poll_interval, Duration::from_secs(2));
        assert_eq!(config.message_page_limit, 100);
    }

    #[test]
    fn test_builder_setters() {
        let config = SyncConfig::new()
            .with_thread_poll_interval(Duration::from_millis(500))
            .with_signature_tolerance(Duration::from_secs(3))
            .with_event_capacity(0);

        assert_eq!(config.thread_poll_interval, Duration::from_millis(500));
        assert_eq!(config.tolerance(), chrono::Duration::seconds(3));
        assert_eq!(config.event_capacity, 1);
    }
}
