use std::time::Duration;

use thiserror::Error;

use crate::catalog::NodeKeyPolicy;

pub const DEFAULT_CONTROLLER: &str = "192.168.10.228";
pub const DEFAULT_HISTORY: usize = 100;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub controller: String,
    pub data_interval: Duration,
    pub status_interval: Duration,
    pub request_timeout: Duration,
    pub history: usize,
    pub node_keys: NodeKeyPolicy,
}

impl MonitorConfig {
    /// Status is polled at twice the data cadence.
    pub fn with_data_interval(mut self, interval: Duration) -> Self {
        self.data_interval = interval;
        self.status_interval = interval * 2;
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            controller: DEFAULT_CONTROLLER.to_string(),
            data_interval: Duration::from_millis(5000),
            status_interval: Duration::from_millis(10_000),
            request_timeout: Duration::from_millis(5000),
            history: DEFAULT_HISTORY,
            node_keys: NodeKeyPolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}
