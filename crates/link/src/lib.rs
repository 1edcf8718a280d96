pub mod client;
pub mod config;

pub use client::{LinkError, LinkEvent, TelemetryLink};
pub use config::LinkConfig;
