//! Client endpoints
//!
//! POST /api/clients/register           register client + initial examination
//! GET  /api/clients/search?q=          substring search with balance summary
//! GET  /api/clients/{id}/examinations  examinations of one client

use super::SearchQuery;
use crate::{
    api::{
        AppState,
        extract::{CurrentStaff, Json},
    },
    core::{
        client::{self, ClientSummary, NewClient},
        examination::{self, ExaminationView},
    },
    entities::{client as client_entity, examination as exam_entity},
    errors::Result,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RegisteredClient {
    pub client: client_entity::Model,
    pub examination: exam_entity::Model,
}

pub async fn register(
    State(state): State<AppState>,
    staff: CurrentStaff,
    Json(input): Json<NewClient>,
) -> Result<(StatusCode, Json<RegisteredClient>)> {
    let (client, examination) =
        client::register_client(&state.db, &state.notifier, input, &staff.display_name()).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisteredClient {
            client,
            examination,
        }),
    ))
}

pub async fn search(
    State(state): State<AppState>,
    _staff: CurrentStaff,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<ClientSummary>>> {
    let mut summaries = Vec::new();
    for found in client::search_clients(&state.db, &params.q).await? {
        summaries.push(client::summarize(&state.db, found).await?);
    }
    Ok(Json(summaries))
}

pub async fn examinations(
    State(state): State<AppState>,
    _staff: CurrentStaff,
    Path(client_id): Path<i64>,
) -> Result<Json<Vec<ExaminationView>>> {
    examination::list_for_client(&state.db, client_id).await.map(Json)
}
