//! Fraud scoring service entrypoint: load config, load the classifier once, serve HTTP.
//! Refuses to bind the listener if the model or its metadata cannot be loaded.

use fraud_scoring::{
    config::ServiceConfig,
    logging::StructuredLogger,
    server::{self, AppState},
};
use tracing::{error, info};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = ServiceConfig::path_from_env();
    let config = ServiceConfig::load(&config_path)?;

    StructuredLogger::init(&config.log)?;

    info!(
        config = %config_path.display(),
        model = %config.model.model_path.display(),
        "fraud scoring service starting"
    );

    let state = match AppState::load(&config) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "startup failed; not accepting traffic");
            return Err(e.into());
        }
    };

    let listener = tokio::net::TcpListener::bind(config.server.bind.as_str()).await?;
    info!(addr = %config.server.bind, "listening");
    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("fraud scoring service stopped");
    Ok(())
}
