//! Route table.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{MethodRouter, get, post};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": "Not found", "code": "NOT_FOUND" })),
    )
}

async fn handle_405() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "detail": "Method not allowed", "code": "METHOD_NOT_ALLOWED" })),
    )
}

/// Register `path` both with and without its trailing slash.
fn both_slashes(
    router: Router<Arc<AppState>>,
    path: &str,
    method: MethodRouter<Arc<AppState>>,
) -> Router<Arc<AppState>> {
    let bare = path.trim_end_matches('/');
    router
        .route(&format!("{bare}/"), method.clone())
        .route(bare, method)
}

/// Build the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload_size = state.config.max_upload_size;

    let mut router = Router::new().route("/", get(handlers::root));
    for (path, method) in [
        ("/upload-csv", post(handlers::upload_csv)),
        ("/data-info", get(handlers::data_info)),
        ("/generate-eda", get(handlers::generate_eda)),
        ("/preprocess", post(handlers::preprocess)),
        ("/predict", post(handlers::predict)),
        ("/download-results", get(handlers::download_results)),
    ] {
        router = both_slashes(router, path, method);
    }

    // CORS stays open to any origin; ALLOWED_ORIGINS is informational.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
