//! `secure-server` — binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP).
//! 3. Build the key cache and replay guard behind an [`EncryptionGateway`].
//! 4. Spawn the background key sweeper.
//! 5. Build the Axum router and serve it over HTTPS or plain HTTP.

use anyhow::{Context, Result};
use tracing::{info, warn};

use secure_server::{
    config::Config,
    gateway::EncryptionGateway,
    keys,
    server::{self, state::AppState},
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        tls = cfg.tls_enabled(),
        key_cache_capacity = cfg.key_cache_capacity,
        "secure-server starting"
    );

    // -----------------------------------------------------------------------
    // 3. Encryption gateway
    // -----------------------------------------------------------------------
    let key_cache = cfg.key_cache();
    let gateway = EncryptionGateway::new(key_cache.clone(), cfg.replay_guard());

    // -----------------------------------------------------------------------
    // 4. Background tasks
    // -----------------------------------------------------------------------
    let _key_sweeper = keys::sweep_task(key_cache, cfg.key_sweep_interval());

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(gateway, cfg.max_body_bytes);
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    match (&cfg.tls_cert_path, &cfg.tls_key_path) {
        (Some(cert), Some(key)) => {
            let tls = server::tls::load_server_config(cert, key).await?;
            info!(addr = %addr, "listening (https)");
            server::tls::serve(listener, tls, router, shutdown_signal()).await;
        }
        _ => {
            warn!(
                addr = %addr,
                "TLS not configured; listening on plain HTTP (payloads are still encrypted)"
            );
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("HTTP server failed")?;
        }
    }

    telemetry::shutdown_telemetry();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
