use hostname::get as get_hostname;
use std::env;
use std::time::Duration;

use url::Url;

use crate::client::LinkError;

#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub endpoint: String,
    pub client_id: String,
    pub connect_timeout_secs: u64,
    pub event_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            endpoint: dronewatch_core::default_stream_url(),
            client_id: default_client_id(),
            connect_timeout_secs: 5,
            event_capacity: 64,
        }
    }
}

impl LinkConfig {
    pub fn from_env() -> Self {
        let mut cfg = LinkConfig::default();

        if let Ok(v) = env::var("DRONEWATCH_ENDPOINT") {
            if !v.is_empty() {
                cfg.endpoint = v;
            }
        }
        if let Ok(v) = env::var("DRONEWATCH_CLIENT_ID") {
            if !v.is_empty() {
                cfg.client_id = v;
            }
        }
        if let Ok(v) = env::var("DRONEWATCH_CONNECT_TIMEOUT_SECS") {
            if let Ok(s) = v.parse::<u64>() {
                cfg.connect_timeout_secs = s;
            }
        }

        cfg
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    /// Parsed endpoint; only `ws://` and `wss://` are accepted.
    pub fn endpoint_url(&self) -> Result<Url, LinkError> {
        let url = Url::parse(&self.endpoint).map_err(|e| LinkError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(LinkError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: format!("unsupported scheme `{}`", other),
            }),
        }
    }
}

fn default_client_id() -> String {
    let host = get_hostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string());
    let pid = std::process::id();
    format!("dronewatch-{}-{}", host, pid)
}
