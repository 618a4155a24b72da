//! HTTP interface.
//!
//! Every route lives under `/api` and requires a staff identity (see
//! [`extract`]). Admin and analytics routes require an administrator.

pub mod error;
pub mod extract;
mod handlers;
mod middleware;

use crate::core::notify::Notifier;
use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use error::ErrorResponse;
use handlers::{admin, analytics, clients, examinations, sales};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub notifier: Arc<Notifier>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, notifier: Notifier) -> Self {
        Self {
            db: Arc::new(db),
            notifier: Arc::new(notifier),
        }
    }
}

/// Builds the complete application router.
pub fn build_router(state: AppState) -> Router {
    let clinical = Router::new()
        .route("/clients/register", post(clients::register))
        .route("/clients/search", get(clients::search))
        .route("/clients/{id}/examinations", get(clients::examinations))
        .route("/examinations", get(examinations::list))
        .route("/examinations/pending", get(examinations::pending))
        .route(
            "/examinations/booked-for-sales",
            get(examinations::booked_for_sales),
        )
        .route(
            "/examinations/{id}/register",
            post(examinations::register_results),
        )
        .route("/examinations/{id}/book", post(examinations::book))
        .route("/sales", get(sales::list))
        .route("/sales/create", post(sales::create))
        .route("/sales/search-balance", get(sales::search_balance))
        .route("/sales/{id}", get(sales::get).put(sales::update))
        .route("/sales/{id}/receipt", get(sales::receipt));

    let admin = Router::new()
        .route(
            "/admin/branches",
            get(admin::list_branches).post(admin::create_branch),
        )
        .route(
            "/admin/branches/{id}",
            get(admin::get_branch)
                .put(admin::update_branch)
                .delete(admin::delete_branch),
        )
        .route(
            "/admin/staff",
            get(admin::list_staff).post(admin::create_staff),
        )
        .route(
            "/admin/staff/{id}",
            get(admin::get_staff)
                .put(admin::update_staff)
                .delete(admin::delete_staff),
        )
        .route("/admin/clients", get(admin::list_clients))
        .route(
            "/admin/clients/{id}",
            get(admin::get_client)
                .patch(admin::update_client)
                .delete(admin::delete_client),
        )
        .route("/admin/dashboard-summary", get(admin::dashboard_summary))
        .route("/analytics/all", get(analytics::report))
        .route("/analytics/request-logs", get(analytics::request_logs));

    Router::new()
        .nest("/api", clinical.merge(admin))
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::count_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("not_found", "Resource not found")),
    )
}
