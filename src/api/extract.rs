//! Request extractors: staff identity and JSON bodies.
//!
//! The gateway in front of this service authenticates staff and forwards the
//! account email in `X-Staff-Email`. Handlers ask for [`CurrentStaff`] (any
//! active account) or [`AdminStaff`] (`is_staff` or `is_superuser`).

use super::AppState;
use crate::{core::staff, entities::user_account, errors::Error};
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::warn;

/// JSON body extractor and response whose rejections use the crate error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        let Self(value) = self;
        axum::Json(value).into_response()
    }
}

pub const STAFF_EMAIL_HEADER: &str = "x-staff-email";

/// Active staff account making the request.
#[derive(Debug, Clone)]
pub struct CurrentStaff(pub user_account::Model);

impl CurrentStaff {
    /// Name captured into `registered_by`, `examined_by` and sale fields.
    pub fn display_name(&self) -> String {
        self.0.display_name()
    }
}

/// Active staff account with administrator rights.
#[derive(Debug, Clone)]
pub struct AdminStaff(pub user_account::Model);

impl FromRequestParts<AppState> for CurrentStaff {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentStaff>() {
            return Ok(current.clone());
        }

        let email = parts
            .headers
            .get(STAFF_EMAIL_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| Error::Unauthorized {
                message: "missing staff identity".to_string(),
            })?;

        let Some(account) = staff::find_active_by_email(&state.db, email).await? else {
            warn!(email, uri = %parts.uri, "Rejected unknown or inactive staff account");
            return Err(Error::Unauthorized {
                message: "unknown or inactive staff account".to_string(),
            });
        };

        let current = CurrentStaff(account);
        parts.extensions.insert(current.clone());
        Ok(current)
    }
}

impl FromRequestParts<AppState> for AdminStaff {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentStaff(account) = CurrentStaff::from_request_parts(parts, state).await?;
        if !account.is_admin() {
            warn!(email = %account.email, uri = %parts.uri, "Rejected non-admin staff account");
            return Err(Error::Forbidden {
                email: account.email,
            });
        }
        Ok(AdminStaff(account))
    }
}
