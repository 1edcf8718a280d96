// Endpoint layout shared by the viewer, the relay and the smoke client

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8765;

// Relay routes
pub const STREAM_PATH: &str = "/";
pub const INGEST_PATH: &str = "/telemetry";

pub fn stream_url(host: &str, port: u16) -> String {
    format!("ws://{}:{}{}", host, port, STREAM_PATH)
}

pub fn ingest_url(host: &str, port: u16) -> String {
    format!("http://{}:{}{}", host, port, INGEST_PATH)
}

pub fn default_stream_url() -> String { stream_url(DEFAULT_HOST, DEFAULT_PORT) }
