//! Sales endpoints
//!
//! GET  /api/sales                   recent orders
//! POST /api/sales/create            create the order for an examination
//! GET  /api/sales/search-balance    clients who still owe money
//! GET  /api/sales/{id}              one order
//! PUT  /api/sales/{id}              balance payment and/or edits
//! GET  /api/sales/{id}/receipt      receipt projection

use super::SearchQuery;
use crate::{
    api::{
        AppState,
        extract::{CurrentStaff, Json},
    },
    core::{
        client::ClientSummary,
        sales::{self, NewSale, Receipt, SaleUpdate},
    },
    entities::sales as sales_entity,
    errors::{Error, Result},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};

pub async fn list(
    State(state): State<AppState>,
    _staff: CurrentStaff,
) -> Result<Json<Vec<sales_entity::Model>>> {
    sales::list_sales(&state.db).await.map(Json)
}

pub async fn create(
    State(state): State<AppState>,
    staff: CurrentStaff,
    Json(input): Json<NewSale>,
) -> Result<(StatusCode, Json<sales_entity::Model>)> {
    let sale = sales::create_sale(&state.db, &state.notifier, input, &staff.display_name()).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn search_balance(
    State(state): State<AppState>,
    _staff: CurrentStaff,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<ClientSummary>>> {
    sales::search_outstanding_balances(&state.db, &params.q)
        .await
        .map(Json)
}

pub async fn get(
    State(state): State<AppState>,
    _staff: CurrentStaff,
    Path(sale_id): Path<i64>,
) -> Result<Json<sales_entity::Model>> {
    sales::get_sale_by_id(&state.db, sale_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Sale", sale_id))
}

pub async fn update(
    State(state): State<AppState>,
    _staff: CurrentStaff,
    Path(sale_id): Path<i64>,
    Json(update): Json<SaleUpdate>,
) -> Result<Json<sales_entity::Model>> {
    sales::update_sale(&state.db, &state.notifier, sale_id, update)
        .await
        .map(Json)
}

pub async fn receipt(
    State(state): State<AppState>,
    _staff: CurrentStaff,
    Path(sale_id): Path<i64>,
) -> Result<Json<Receipt>> {
    sales::get_receipt(&state.db, sale_id).await.map(Json)
}
