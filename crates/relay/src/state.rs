use std::sync::Arc;

use dronewatch_core::{ParseError, TelemetrySample};
use prometheus::{IntCounter, IntGauge, Registry};
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
    samples_tx: broadcast::Sender<String>,
    pub metrics: Arc<Metrics>,
}

pub struct Metrics {
    pub registry: Registry,
    pub ws_clients: IntGauge,
    pub samples_total: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let ws_clients = IntGauge::new(
            "dronewatch_relay_ws_clients",
            "Number of connected WebSocket clients",
        )
        .unwrap();
        let samples_total = IntCounter::new(
            "dronewatch_relay_samples_total",
            "Total telemetry samples published",
        )
        .unwrap();

        let registry = Registry::new();
        let _ = registry.register(Box::new(ws_clients.clone()));
        let _ = registry.register(Box::new(samples_total.clone()));

        Arc::new(Self { registry, ws_clients, samples_total })
    }
}

impl AppState {
    pub fn new(capacity: usize) -> Self {
        let (samples_tx, _) = broadcast::channel(capacity.max(1));
        Self { samples_tx, metrics: Metrics::new() }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.samples_tx.subscribe()
    }

    /// Fan a sample out to every subscribed client. Returns how many received it.
    pub fn publish(&self, sample: &TelemetrySample) -> usize {
        self.publish_frame(sample.to_json())
    }

    /// Fan out an already validated frame as-is.
    pub fn publish_frame(&self, frame: String) -> usize {
        self.metrics.samples_total.inc();
        self.samples_tx.send(frame).unwrap_or(0)
    }
}

/// Check `text` carries a usable sample and return it as a compact frame.
/// Fields beyond x/y/z are kept.
pub fn validate_frame(text: &str) -> Result<(TelemetrySample, String), ParseError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ParseError::Malformed(e.to_string()))?;
    let sample = TelemetrySample::from_value(&value)?;
    Ok((sample, value.to_string()))
}
