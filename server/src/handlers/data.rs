//! Upload, inspection, EDA and export endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use edalab_processing::{
    DataInfo, EdaPlots, TablePreview, inspect, merge_for_export, read_csv, render_eda,
    to_csv_string,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::run_blocking;
use crate::error::{ApiError, Result};
use crate::state::{AppState, SessionId};

/// Body of `GET /download-results/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvExport {
    pub csv_content: String,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "EDA Lab API is running" }))
}

/// Replace the session's raw table with an uploaded CSV and preview it.
///
/// The first multipart field carrying a file name is used.
pub async fn upload_csv(
    State(state): State<Arc<AppState>>,
    SessionId(session_id): SessionId,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<TablePreview>> {
    let mut multipart = multipart?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let bytes = field.bytes().await?;
            upload = Some((file_name, bytes));
            break;
        }
    }
    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let name = file_name.clone();
    let (frame, preview) = run_blocking(move || {
        let frame = read_csv(&name, &bytes)?;
        let preview = TablePreview::from_frame(&frame)?;
        Ok((frame, preview))
    })
    .await?;

    let generation = state
        .session_for_upload(&session_id)
        .replace_raw(frame, file_name.clone());
    info!(
        session = %session_id,
        file = %file_name,
        rows = preview.shape[0],
        columns = preview.shape[1],
        generation,
        "Dataset uploaded"
    );

    Ok(Json(preview))
}

pub async fn data_info(
    State(state): State<Arc<AppState>>,
    SessionId(session_id): SessionId,
) -> Result<Json<DataInfo>> {
    let raw = state.raw(&session_id)?;
    Ok(Json(inspect(&raw.frame)))
}

pub async fn generate_eda(
    State(state): State<Arc<AppState>>,
    SessionId(session_id): SessionId,
) -> Result<Json<EdaPlots>> {
    let raw = state.raw(&session_id)?;
    let plots = run_blocking(move || Ok(render_eda(&raw.frame)?)).await?;
    Ok(Json(plots))
}

/// The raw table with changed processed columns appended, as CSV text.
pub async fn download_results(
    State(state): State<Arc<AppState>>,
    SessionId(session_id): SessionId,
) -> Result<Json<CsvExport>> {
    let (raw, processed) = state.both(&session_id)?;
    let csv_content = run_blocking(move || {
        let merged = merge_for_export(&raw.frame, &processed.frame)?;
        Ok(to_csv_string(&merged)?)
    })
    .await?;
    Ok(Json(CsvExport { csv_content }))
}
