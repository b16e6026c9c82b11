//! Client configuration.

use browserdeck_core::TaskId;
use std::time::Duration;

use crate::poll::POLL_INTERVAL;
use crate::reconnect::RECONNECT_DELAY;

/// Configuration for the synchronization client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,

    /// Delay between channel reconnect attempts.
    pub reconnect_delay: Duration,

    /// Period of the polling fallback.
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            reconnect_delay: RECONNECT_DELAY,
            poll_interval: POLL_INTERVAL,
        }
    }
}

impl ClientConfig {
    /// Create a config for the given backend base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Channel endpoint for a task, derived from the base URL.
    pub fn ws_url(&self, task_id: &TaskId) -> String {
        let base = self.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws_base}/ws/{task_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_derivation() {
        let config = ClientConfig::new("http://127.0.0.1:8000/");
        let task = TaskId::new("abc-123");
        assert_eq!(config.ws_url(&task), "ws://127.0.0.1:8000/ws/abc-123");
    }

    #[test]
    fn test_ws_url_tls() {
        let config = ClientConfig::new("https://deck.example.com");
        let task = TaskId::new("t1");
        assert_eq!(config.ws_url(&task), "wss://deck.example.com/ws/t1");
    }
}
