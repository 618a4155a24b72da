//! Administration endpoints (administrators only)
//!
//! Branch, staff and client maintenance plus the dashboard summary.

use super::ListQuery;
use crate::{
    api::{
        AppState,
        extract::{AdminStaff, Json},
    },
    core::{
        analytics::{self, DashboardSummary},
        branch::{self, BranchUpdate, NewBranch},
        client::{self, ClientSummary, ClientUpdate},
        staff::{self, NewStaff, StaffUpdate},
    },
    entities::{branch as branch_entity, client as client_entity, user_account},
    errors::{Error, Result},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::info;

// ── Branches ──

pub async fn list_branches(
    State(state): State<AppState>,
    _admin: AdminStaff,
) -> Result<Json<Vec<branch_entity::Model>>> {
    branch::list_branches(&state.db).await.map(Json)
}

pub async fn create_branch(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Json(input): Json<NewBranch>,
) -> Result<(StatusCode, Json<branch_entity::Model>)> {
    let created = branch::create_branch(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_branch(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Path(branch_id): Path<i64>,
) -> Result<Json<branch_entity::Model>> {
    branch::get_branch_by_id(&state.db, branch_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Branch", branch_id))
}

pub async fn update_branch(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Path(branch_id): Path<i64>,
    Json(update): Json<BranchUpdate>,
) -> Result<Json<branch_entity::Model>> {
    branch::update_branch(&state.db, branch_id, update)
        .await
        .map(Json)
}

pub async fn delete_branch(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(branch_id): Path<i64>,
) -> Result<StatusCode> {
    branch::delete_branch(&state.db, branch_id).await?;
    info!(branch_id, by = %admin.email, "Branch deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Staff ──

pub async fn list_staff(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<user_account::Model>>> {
    staff::list_staff(&state.db, params.query.as_deref())
        .await
        .map(Json)
}

pub async fn create_staff(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Json(input): Json<NewStaff>,
) -> Result<(StatusCode, Json<user_account::Model>)> {
    let created = staff::create_staff(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_staff(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Path(staff_id): Path<i64>,
) -> Result<Json<user_account::Model>> {
    staff::get_staff_by_id(&state.db, staff_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("User", staff_id))
}

pub async fn update_staff(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Path(staff_id): Path<i64>,
    Json(update): Json<StaffUpdate>,
) -> Result<Json<user_account::Model>> {
    staff::update_staff(&state.db, staff_id, update)
        .await
        .map(Json)
}

pub async fn delete_staff(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(staff_id): Path<i64>,
) -> Result<StatusCode> {
    if admin.id == staff_id {
        return Err(Error::Conflict {
            message: "You cannot delete your own account".to_string(),
        });
    }
    staff::delete_staff(&state.db, staff_id).await?;
    info!(staff_id, by = %admin.email, "Staff account deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Clients ──

pub async fn list_clients(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<client_entity::Model>>> {
    client::list_clients(&state.db, params.query.as_deref())
        .await
        .map(Json)
}

pub async fn get_client(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Path(client_id): Path<i64>,
) -> Result<Json<ClientSummary>> {
    let found = client::get_client_by_id(&state.db, client_id)
        .await?
        .ok_or_else(|| Error::not_found("Client", client_id))?;
    client::summarize(&state.db, found).await.map(Json)
}

pub async fn update_client(
    State(state): State<AppState>,
    _admin: AdminStaff,
    Path(client_id): Path<i64>,
    Json(update): Json<ClientUpdate>,
) -> Result<Json<client_entity::Model>> {
    client::update_client(&state.db, client_id, update)
        .await
        .map(Json)
}

pub async fn delete_client(
    State(state): State<AppState>,
    AdminStaff(admin): AdminStaff,
    Path(client_id): Path<i64>,
) -> Result<StatusCode> {
    client::delete_client(&state.db, client_id).await?;
    info!(client_id, by = %admin.email, "Client deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Dashboard ──

pub async fn dashboard_summary(
    State(state): State<AppState>,
    _admin: AdminStaff,
) -> Result<Json<DashboardSummary>> {
    analytics::dashboard_summary(&state.db, Utc::now())
        .await
        .map(Json)
}
