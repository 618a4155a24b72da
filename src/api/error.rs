//! HTTP mapping for [`Error`].
//!
//! Every error becomes `{"error": <code>, "message": <text>, "field": <name>?}`
//! with a status chosen from [`Error::kind`]. Internal errors are logged and
//! their details are not sent to the caller.

use crate::errors::{Error, ErrorKind};
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
            field: None,
        }
    }
}

const fn status_and_code(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation_error"),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "conflict"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        ErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
        ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
        ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

/// Field named in a body deserialization message, or `body` when there is none.
///
/// Handles serde's ``missing field `x` `` wording and the `path: reason` prefix
/// added for type errors inside a field.
fn rejected_field(detail: &str) -> String {
    if let Some(field) = detail
        .split("missing field `")
        .nth(1)
        .and_then(|rest| rest.split('`').next())
    {
        return field.to_string();
    }
    let detail = detail.rsplit("target type: ").next().unwrap_or(detail);
    match detail.split_once(": ") {
        Some((path, _))
            if !path.is_empty()
                && path
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']')) =>
        {
            path.to_string()
        }
        _ => "body".to_string(),
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        Self::Validation {
            field: rejected_field(&detail),
            message: detail,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = status_and_code(self.kind());
        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
            ErrorResponse::new(code, "Internal server error")
        } else {
            ErrorResponse {
                error: code,
                message: self.to_string(),
                field: self.field().map(str::to_string),
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_field_is_taken_from_serde_message() {
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: missing field `frame_brand` at line 1 column 35"
            ),
            "frame_brand"
        );
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: payment: invalid type: string \"abc\", expected f64 at line 1 column 16"
            ),
            "payment"
        );
        assert_eq!(rejected_field("Failed to parse the request body as JSON: EOF while parsing"), "body");
    }

    #[test]
    fn test_business_rejections_are_conflicts() {
        let response = Error::AlreadyPaid { sale_id: 1 }.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = Error::validation("email", "bad").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = Error::Config {
            message: "secret path".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
