mod assess;
mod error;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{any, get, post};
use axum::{Json, Router};
use eyre::WrapErr;
use tower_http::cors::{AllowOrigin, CorsLayer};

use riskbtc_core::Assessor;

// ==============================================================================
// Application State
// ==============================================================================

pub struct AppState {
    pub assessor: Arc<Assessor>,
    /// Ceiling on the address count of one `POST /api/v1/batch`.
    pub max_batch: usize,
}

type SharedState = Arc<AppState>;

// ==============================================================================
// Router
// ==============================================================================

pub fn build_router(state: AppState, origin: &str) -> eyre::Result<Router> {
    // Only reflect the allowed origin when the request's Origin header
    // actually matches. Otherwise, omit the header entirely so browsers
    // get a clean CORS rejection instead of a mismatched origin value.
    let allowed: axum::http::HeaderValue = origin
        .parse()
        .wrap_err_with(|| format!("invalid CORS origin `{origin}`"))?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |request_origin: &axum::http::HeaderValue, _| *request_origin == allowed,
        ))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let shared = Arc::new(state);

    // Address lists are small; 256 KB comfortably holds the batch ceiling.
    const BATCH_BODY_LIMIT: usize = 256 * 1024;

    let batch_routes = Router::new()
        .route("/api/v1/batch", post(assess::assess_batch))
        .layer(DefaultBodyLimit::max(BATCH_BODY_LIMIT));

    Ok(Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/assess/{address}", get(assess::assess_address))
        .merge(batch_routes)
        .route("/api", any(api_not_found))
        .route("/api/{*path}", any(api_not_found))
        .layer(cors)
        .with_state(shared))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn api_not_found() -> error::AppError {
    error::AppError::NotFound("API route not found".to_string())
}
