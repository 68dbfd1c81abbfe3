use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use metrics::{counter, histogram};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::{BerriesOutput, ScoringContext};
use crate::error::BerriesError;

#[derive(Clone)]
pub struct AppState {
    pub scoring: Arc<ScoringContext>,
}

impl AppState {
    pub fn new(scoring: ScoringContext) -> Self {
        Self {
            scoring: Arc::new(scoring),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/calculate_berries", post(calculate_berries))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, serde::Deserialize)]
pub struct BerriesReq {
    pub account_address: String,
}

async fn calculate_berries(
    State(state): State<AppState>,
    Json(body): Json<BerriesReq>,
) -> Result<Json<BerriesOutput>, BerriesError> {
    let t0 = Instant::now();
    counter!("berries_requests_total").increment(1);

    let result = state.scoring.calculate(&body.account_address).await;
    histogram!("berries_request_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    match result {
        Ok(out) => Ok(Json(out)),
        Err(e) => {
            counter!("berries_errors_total", "kind" => e.kind()).increment(1);
            match &e {
                BerriesError::Internal(inner) => tracing::error!(
                    account_address = %body.account_address,
                    kind = e.kind(),
                    error = ?inner,
                    "calculate_berries failed"
                ),
                _ => tracing::error!(
                    account_address = %body.account_address,
                    kind = e.kind(),
                    error = %e,
                    "calculate_berries failed"
                ),
            }
            Err(e)
        }
    }
}
