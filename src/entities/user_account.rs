//! User account entity - Clinic staff.
//!
//! Credentials live with the upstream identity provider; this table only holds
//! the account data the backend needs for access checks and display names.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Staff role
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[sea_orm(string_value = "staff")]
    Staff,
    #[sea_orm(string_value = "receptionist")]
    Receptionist,
    #[sea_orm(string_value = "optometrist")]
    Optometrist,
}

impl Role {
    /// Stored value of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Receptionist => "receptionist",
            Self::Optometrist => "optometrist",
        }
    }
}

/// User account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Login email, stored lower-case
    #[sea_orm(unique)]
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    /// Grants access to the admin endpoints
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Name captured into `registered_by`, `examined_by` and friends.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether the account may use the admin endpoints.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
