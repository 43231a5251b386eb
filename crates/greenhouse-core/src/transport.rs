use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::status::RawStatus;

pub const SNAPSHOT_PATH: &str = "/datos_filtrados";
pub const STATUS_PATH: &str = "/estado";
pub const RESET_ALARM_PATH: &str = "/reset_emergencia";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,
    #[error("controller returned status {0}")]
    Status(u16),
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ControllerTransport: Send + Sync + 'static {
    async fn fetch_snapshot(&self) -> Result<Value, TransportError>;
    async fn fetch_status(&self) -> Result<RawStatus, TransportError>;
    async fn reset_alarm(&self) -> Result<(), TransportError>;
    fn set_base_address(&self, address: &str);
    fn base_address(&self) -> String;
}

/// `192.168.10.228` and `http://192.168.10.228/` both become
/// `http://192.168.10.228`.
pub fn normalize_base_address(address: &str) -> String {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

pub struct HttpTransport {
    http: Client,
    base_url: RwLock<String>,
}

impl HttpTransport {
    pub fn new(address: &str, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "falling back to default http client");
                Client::new()
            });

        Self {
            http,
            base_url: RwLock::new(normalize_base_address(address)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_address())
    }

    async fn get_json(&self, path: &str) -> Result<Value, TransportError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let resp = self.http.get(&url).send().await.map_err(map_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        resp.json::<Value>()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))
    }
}

fn map_reqwest(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Http(err.to_string())
    }
}

#[async_trait]
impl ControllerTransport for HttpTransport {
    async fn fetch_snapshot(&self) -> Result<Value, TransportError> {
        self.get_json(SNAPSHOT_PATH).await
    }

    async fn fetch_status(&self) -> Result<RawStatus, TransportError> {
        let body = self.get_json(STATUS_PATH).await?;
        serde_json::from_value(body).map_err(|err| TransportError::Decode(err.to_string()))
    }

    async fn reset_alarm(&self) -> Result<(), TransportError> {
        let url = self.url(RESET_ALARM_PATH);
        debug!(%url, "POST");
        let resp = self
            .http
            .post(&url)
            .json(&json!({}))
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(())
    }

    fn set_base_address(&self, address: &str) {
        let normalized = normalize_base_address(address);
        let mut guard = self.base_url.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = normalized;
    }

    fn base_address(&self) -> String {
        self.base_url
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_addresses_get_http_scheme() {
        assert_eq!(normalize_base_address("192.168.10.228"), "http://192.168.10.228");
        assert_eq!(normalize_base_address(" http://esp32.local/ "), "http://esp32.local");
        assert_eq!(normalize_base_address("https://gw:8443"), "https://gw:8443");
    }

    #[test]
    fn base_address_can_be_reconfigured() {
        let transport = HttpTransport::new("10.0.0.1", Duration::from_millis(100));

        transport.set_base_address("10.0.0.2:8080");

        assert_eq!(transport.base_address(), "http://10.0.0.2:8080");
        assert_eq!(transport.url(STATUS_PATH), "http://10.0.0.2:8080/estado");
    }
}
