//! Speech evaluator: binary entrypoint.
//! Boots the Axum HTTP server, wiring config, tracing, metrics and routes.

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use speech_evaluator::config::AppConfig;
use speech_evaluator::metrics::Metrics;

/// Compact logs by default, JSON lines when `LOG_FORMAT=json`.
/// Filter comes from `RUST_LOG`, falling back to `speech_evaluator=info,warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("speech_evaluator=info,evaluation=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default().context("loading configuration")?;
    tracing::info!(config = ?cfg.evaluation, "configuration loaded");

    let metrics = Metrics::init()?;
    let app = speech_evaluator::app(&cfg.evaluation)?.merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind_addr))?;
    tracing::info!(addr = %cfg.server.bind_addr, "server startup done");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    Ok(())
}
