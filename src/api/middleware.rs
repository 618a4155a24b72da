//! Request counter middleware.

use super::AppState;
use crate::core::analytics;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::warn;

/// Counts every `/api/` request per (method, path) once the response is ready.
///
/// Counting failures are logged and never affect the response.
pub async fn count_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    if path.starts_with("/api/") {
        if let Err(e) = analytics::record_request(&state.db, &method, &path, Utc::now()).await {
            warn!(method, path, error = %e, "Failed to record API request");
        }
    }
    response
}
