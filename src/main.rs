use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use ragbot_backend::core::config::Settings;
use ragbot_backend::core::logging;
use ragbot_backend::server;
use ragbot_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (settings, warnings) = Settings::load();
    logging::init(settings.server.log_dir.as_deref());
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }
    tracing::info!("Resolved settings: {}", settings.redacted());

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = AppState::initialize(settings).await?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // the batch exporter flushes with a blocking client
    let tracer = state.tracer.clone();
    if let Err(err) = tokio::task::spawn_blocking(move || tracer.shutdown()).await {
        tracing::warn!("Span flush task failed: {}", err);
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
