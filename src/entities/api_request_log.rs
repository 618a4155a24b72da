//! API request log entity - One counter row per (method, endpoint) pair.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// API request counter model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "api_request_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// HTTP method (GET, POST, ...)
    pub method: String,
    /// Request path
    pub endpoint: String,
    /// Number of times this pair was requested
    pub count: i64,
    pub last_requested: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
