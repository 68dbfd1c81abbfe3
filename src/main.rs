//! SocioBerries service: Shuttle entrypoint.
//! Loads config and both model artifacts, then hands the router to Shuttle.
//! A missing or corrupt model artifact aborts startup.

use shuttle_axum::ShuttleAxum;
use socio_berries::{metrics::Metrics, telemetry, ServiceConfig};
use tracing::info;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = ServiceConfig::load_default()?;
    let metrics = Metrics::init()?;
    let router = socio_berries::app(&cfg, Some(&metrics))?;

    info!(
        user_posts = %cfg.upstream.user_posts_url,
        coin_balances = %cfg.upstream.coin_balances_url,
        "socio-berries ready"
    );
    Ok(router.into())
}
