//! Unified error types for the clinic backend.
//!
//! Every fallible operation in `core` returns [`Result`]. Errors classify themselves
//! through [`Error::kind`], which the HTTP layer maps onto status codes.

use thiserror::Error;

/// Broad category of an [`Error`], used to pick the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid input; the operation was aborted before writing.
    Validation,
    /// Business-rule rejection (duplicate sale, overpayment, fully paid order).
    Conflict,
    /// The referenced record does not exist.
    NotFound,
    /// No authenticated staff identity accompanied the request.
    Unauthorized,
    /// The staff member lacks the role required for the operation.
    Forbidden,
    /// Infrastructure failure (database, I/O, configuration).
    Internal,
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("A sale for examination {examination_id} already exists.")]
    DuplicateSale { examination_id: i64 },

    #[error("Sale is already fully paid. No further payments allowed.")]
    AlreadyPaid { sale_id: i64 },

    #[error(
        "Payment exceeds the remaining balance due. Please pay the exact balance amount {balance_due:.2} or less."
    )]
    Overpayment { amount: f64, balance_due: f64 },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Authentication required: {message}")]
    Unauthorized { message: String },

    #[error("Staff member '{email}' is not allowed to perform this action")]
    Forbidden { email: String },

    #[error("Notification delivery failed: {message}")]
    Notification { message: String },
}

impl Error {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a missing record.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classifies the error for the transport layer.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::InvalidAmount { .. } => ErrorKind::Validation,
            Self::DuplicateSale { .. }
            | Self::AlreadyPaid { .. }
            | Self::Overpayment { .. }
            | Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::Notification { .. } => ErrorKind::Internal,
        }
    }

    /// Field name attached to validation errors, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::InvalidAmount { .. } => Some("amount"),
            Self::DuplicateSale { .. } => Some("examination"),
            _ => None,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
