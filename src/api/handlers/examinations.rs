//! Examination endpoints
//!
//! GET  /api/examinations                    all examinations, newest first
//! GET  /api/examinations/pending            waiting for results
//! GET  /api/examinations/booked-for-sales   completed, awaiting an order
//! POST /api/examinations/{id}/register      submit results
//! POST /api/examinations/{id}/book          book a new examination for client `id`

use crate::{
    api::{
        AppState,
        extract::{CurrentStaff, Json},
    },
    core::examination::{self, ExaminationResults, ExaminationView},
    entities::examination as exam_entity,
    errors::Result,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
};

pub async fn list(
    State(state): State<AppState>,
    _staff: CurrentStaff,
) -> Result<Json<Vec<ExaminationView>>> {
    examination::list_examinations(&state.db).await.map(Json)
}

pub async fn pending(
    State(state): State<AppState>,
    _staff: CurrentStaff,
) -> Result<Json<Vec<ExaminationView>>> {
    examination::list_pending(&state.db).await.map(Json)
}

pub async fn booked_for_sales(
    State(state): State<AppState>,
    _staff: CurrentStaff,
) -> Result<Json<Vec<ExaminationView>>> {
    examination::list_booked_for_sales(&state.db).await.map(Json)
}

pub async fn register_results(
    State(state): State<AppState>,
    staff: CurrentStaff,
    Path(examination_id): Path<i64>,
    Json(results): Json<ExaminationResults>,
) -> Result<Json<exam_entity::Model>> {
    examination::complete_examination(&state.db, examination_id, results, &staff.display_name())
        .await
        .map(Json)
}

pub async fn book(
    State(state): State<AppState>,
    _staff: CurrentStaff,
    Path(client_id): Path<i64>,
) -> Result<(StatusCode, Json<exam_entity::Model>)> {
    let exam = examination::book_examination(&state.db, &state.notifier, client_id).await?;
    Ok((StatusCode::CREATED, Json(exam)))
}
