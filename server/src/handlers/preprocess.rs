use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use edalab_processing::{PreprocessingOptions, Preprocessor, TablePreview};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::run_blocking;
use crate::error::Result;
use crate::state::{AppState, SessionId};

/// Preview of the processed table plus the step log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessResponse {
    #[serde(flatten)]
    pub preview: TablePreview,
    pub preprocessing_steps: Vec<String>,
}

/// Run the preprocessing pipeline on the session's raw table.
///
/// The processed table replaces the previous one only if the raw table was
/// not re-uploaded while the pipeline ran.
pub async fn preprocess(
    State(state): State<Arc<AppState>>,
    SessionId(session_id): SessionId,
    options: std::result::Result<Json<PreprocessingOptions>, JsonRejection>,
) -> Result<Json<PreprocessResponse>> {
    let session = state.existing_session(&session_id)?;
    let raw = session.raw()?;
    let Json(options) = options?;

    let source_generation = raw.generation;
    let (outcome, preview) = run_blocking(move || {
        let outcome = Preprocessor::new(options)?.run(&raw.frame)?;
        let preview = TablePreview::from_frame(&outcome.frame)?;
        Ok((outcome, preview))
    })
    .await?;

    let generation = session.commit_processed(outcome.frame, source_generation)?;
    info!(
        session = %session_id,
        rows = preview.shape[0],
        columns = preview.shape[1],
        steps = outcome.steps.len(),
        generation,
        "Processed table stored"
    );

    Ok(Json(PreprocessResponse {
        preview,
        preprocessing_steps: outcome.steps,
    }))
}
