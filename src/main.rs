use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use middleware_config::{Config, build_router, utils};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!(
        "Starting middleware config demo server v{}",
        env!("CARGO_PKG_VERSION")
    );

    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the server, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    config.server.validate().map_err(|e| {
        error!("Server configuration error: {e}");
        exitcode::CONFIG
    })?;

    let middlewares = config.build();
    middlewares.validate().map_err(|e| {
        error!("Middleware configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        rate = middlewares.rate_limit.rate,
        algorithm = %middlewares.rate_limit.algorithm,
        "Configuration loaded"
    );

    if config.server.tls.is_some() || config.server.auto_tls.is_some() {
        warn!("TLS settings are passed through only; serving plain HTTP");
    }

    let app = build_router(&middlewares);

    // Start server
    let addr: SocketAddr = config.server.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("  GET  /health           - Health check");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let signal = utils::shutdown_signal().await;
        warn!(signal, "Received shutdown signal, initiating graceful shutdown...");
        let _ = shutdown_tx.send(());
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        result = &mut server => return finish(result),
        _ = shutdown_rx => {}
    }

    match utils::drain_with_timeout(&mut server, config.server.shutdown_timeout).await {
        Some(result) => finish(result)?,
        None => server.abort(),
    }

    info!("Server shutdown complete");
    Ok(())
}

fn finish(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), exitcode::ExitCode> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("Server error: {e}");
            Err(exitcode::SOFTWARE)
        }
        Err(e) => {
            error!("Server task failed: {e}");
            Err(exitcode::SOFTWARE)
        }
    }
}
