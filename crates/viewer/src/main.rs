use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use crossterm::event::EventStream;
use dotenvy::dotenv;
use dronewatch_link::TelemetryLink;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod controller;
mod terminal;
mod ui;

use config::ViewerConfig;
use controller::Controller;
use terminal::TerminalGuard;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cfg = ViewerConfig::from_env()?;
    init_tracing(&cfg.log_file)?;
    info!(endpoint = %cfg.link.endpoint, policy = ?cfg.on_parse_error, "starting drone viewer");

    let link = TelemetryLink::open(&cfg.link)
        .await
        .with_context(|| format!("cannot reach telemetry endpoint {}", cfg.link.endpoint))?;

    let mut guard = TerminalGuard::enter().context("failed to set up terminal")?;
    let ctl = Controller::new(cfg.on_parse_error);
    let result = app::run(guard.terminal_mut(), link, ctl, EventStream::new()).await;
    finish(result, guard.restore())
}

/// The run error wins over a failed terminal restore; both are logged.
fn finish(result: Result<()>, restored: io::Result<()>) -> Result<()> {
    if let Err(e) = &result {
        error!(error = ?e, "viewer stopped");
    }
    match restored {
        Ok(()) => result,
        Err(e) => {
            error!(error = %e, "failed to restore terminal");
            match result {
                Ok(()) => Err(e).context("failed to restore terminal"),
                Err(run_err) => Err(run_err),
            }
        }
    }
}

// The terminal belongs to the view, so logs go to a file.
fn init_tracing(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tungstenite=warn,tokio_tungstenite=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
