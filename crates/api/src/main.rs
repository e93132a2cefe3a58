use std::sync::Arc;

use anyhow::Context;

use jobhub_api::app;
use jobhub_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jobhub_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = app::services::build_services(&config.jobs)
        .await
        .context("failed to open job store")?;
    let app = app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
