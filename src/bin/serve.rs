//! Self-hosted entrypoint: binds the configured address (default 0.0.0.0:5000).

use anyhow::Context;
use socio_berries::{metrics::Metrics, telemetry, ServiceConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = ServiceConfig::load_default()?;
    let metrics = Metrics::init()?;
    let app = socio_berries::app(&cfg, Some(&metrics))?;

    let listener = tokio::net::TcpListener::bind(cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;
    info!(addr = %cfg.server.bind, "socio-berries listening");
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
