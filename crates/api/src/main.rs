use std::sync::Arc;

use anyhow::Context;

use provd_api::app::{build_app, AppServices};
use provd_infra::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    provd_observability::init();

    let config = ServerConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(AppServices::from_config(&config).context("failed to connect pubsub")?);

    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    tracing::info!(addr = %listener.local_addr()?, access_url = %config.access_url, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
