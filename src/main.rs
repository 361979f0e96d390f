use anyhow::Context;
use ledgerlens::{api, config, logging, processing::AnalysisService, upload::TransientStore};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let config = config::init_config().context("Failed to load configuration")?;
    tracing::info!(model = %config.llm_model, "Configuration loaded");

    let service = AnalysisService::from_config(config).context("Failed to build analysis pipeline")?;
    let store = TransientStore::new(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to prepare upload directory {}", config.upload_dir.display()))?;
    let app = api::create_router(Arc::new(service), Arc::new(store), config.max_upload_bytes);

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.server_port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.server_port))?;
    tracing::info!("Listening on http://0.0.0.0:{}", config.server_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
