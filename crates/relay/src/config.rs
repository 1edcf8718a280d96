use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub addr: SocketAddr,
    /// Frames buffered per client before a slow client starts skipping.
    pub capacity: usize,
    pub simulate: bool,
    pub simulate_hz: f64,
    /// ZMQ PUB endpoint to relay from, e.g. `tcp://localhost:5556`.
    pub upstream: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], dronewatch_core::DEFAULT_PORT)),
            capacity: 256,
            simulate: false,
            simulate_hz: 10.0,
            upstream: None,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = RelayConfig::default();

        if let Ok(v) = env::var("DRONEWATCH_RELAY_ADDR") {
            if !v.is_empty() {
                cfg.addr = v
                    .parse()
                    .with_context(|| format!("invalid DRONEWATCH_RELAY_ADDR `{}`", v))?;
            }
        }
        if let Ok(v) = env::var("DRONEWATCH_RELAY_CAPACITY") {
            if let Ok(n) = v.parse::<usize>() {
                if n > 0 {
                    cfg.capacity = n;
                }
            }
        }
        if let Ok(v) = env::var("DRONEWATCH_SIMULATE") {
            cfg.simulate = parse_flag(&v);
        }
        if let Ok(v) = env::var("DRONEWATCH_SIMULATE_HZ") {
            if let Ok(hz) = v.parse::<f64>() {
                if hz.is_finite() && hz > 0.0 {
                    cfg.simulate_hz = hz;
                }
            }
        }

        if let Ok(v) = env::var("DRONEWATCH_RELAY_UPSTREAM") {
            if !v.trim().is_empty() {
                cfg.upstream = Some(v.trim().to_string());
            }
        }

        Ok(cfg)
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
