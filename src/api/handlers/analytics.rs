//! Analytics endpoints (administrators only)

use crate::{
    api::{
        AppState,
        extract::{AdminStaff, Json},
    },
    core::analytics::{self, AnalyticsReport},
    entities::api_request_log,
    errors::Result,
};
use axum::extract::State;

pub async fn report(
    State(state): State<AppState>,
    _admin: AdminStaff,
) -> Result<Json<AnalyticsReport>> {
    analytics::analytics_report(&state.db).await.map(Json)
}

pub async fn request_logs(
    State(state): State<AppState>,
    _admin: AdminStaff,
) -> Result<Json<Vec<api_request_log::Model>>> {
    analytics::list_request_logs(&state.db).await.map(Json)
}
