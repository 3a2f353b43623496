use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use edalab_learning::{TrainingOutcome, TrainingRequest};
use tracing::info;

use super::run_blocking;
use crate::error::Result;
use crate::state::{AppState, SessionId};

/// Evaluate and deploy a model on the session's processed table.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    SessionId(session_id): SessionId,
    request: std::result::Result<Json<TrainingRequest>, JsonRejection>,
) -> Result<Json<TrainingOutcome>> {
    let processed = state.processed(&session_id)?;
    let Json(request) = request?;

    info!(
        session = %session_id,
        model = %request.model_type,
        target = %request.target_column,
        features = ?request.feature_columns,
        "Prediction requested"
    );

    let worker_state = Arc::clone(&state);
    let outcome = run_blocking(move || {
        Ok(worker_state
            .trainer
            .train(&processed.frame, &request, &worker_state.model_store)?)
    })
    .await?;

    Ok(Json(outcome))
}
