use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod routes;
mod simulate;
mod state;
mod upstream;

use config::RelayConfig;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let cfg = RelayConfig::from_env()?;
    let state = AppState::new(cfg.capacity);

    if let Some(endpoint) = cfg.upstream.clone() {
        tokio::spawn(upstream::run_upstream(state.clone(), endpoint));
    }
    if cfg.simulate {
        tokio::spawn(simulate::run_simulator(state.clone(), cfg.simulate_hz));
    }

    let app = routes::router(state);
    info!(addr = %cfg.addr, capacity = cfg.capacity, "Starting telemetry relay");
    let listener = tokio::net::TcpListener::bind(cfg.addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("relay server failed")?;
    info!("relay stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,axum=info,hyper=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
