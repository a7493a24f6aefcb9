use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use riskbtc_core::types::{AssessmentResult, BatchReport};
use riskbtc_core::CancelFlag;

use super::error::{map_core_error, AppError};
use super::SharedState;

// ==============================================================================
// DTOs
// ==============================================================================

#[derive(Deserialize)]
pub(super) struct BatchRequest {
    addresses: Vec<String>,
}

// ==============================================================================
// Handlers
// ==============================================================================

pub(super) async fn assess_address(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> Result<Json<AssessmentResult>, AppError> {
    let result = state
        .assessor
        .assess(address.trim())
        .await
        .map_err(map_core_error)?;
    Ok(Json(result))
}

pub(super) async fn assess_batch(
    State(state): State<SharedState>,
    req: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchReport>, AppError> {
    let Json(req) = req.map_err(|e| AppError::BadRequest(e.to_string()))?;

    let addresses: Vec<String> = req
        .addresses
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(str::to_owned)
        .collect();
    if addresses.is_empty() {
        return Err(AppError::BadRequest(
            "addresses must contain at least one address".to_string(),
        ));
    }
    if addresses.len() > state.max_batch {
        return Err(AppError::BadRequest(format!(
            "at most {} addresses per batch",
            state.max_batch
        )));
    }

    // A dropped connection drops this future, which stops the batch.
    let report = state
        .assessor
        .assess_batch(&addresses, &CancelFlag::new())
        .await;
    Ok(Json(report))
}
