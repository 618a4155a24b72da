//! Client entity - A person registered with the clinic.
//!
//! The `reg_no` is assigned once, before the first insert, and never changes.
//! `registered_by` is a snapshot of the receptionist's display name rather than a
//! reference to their account.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Client gender as recorded at registration
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Gender {
    /// Male
    #[sea_orm(string_value = "M")]
    #[serde(rename = "M")]
    Male,
    /// Female
    #[sea_orm(string_value = "F")]
    #[serde(rename = "F")]
    Female,
    /// Other
    #[sea_orm(string_value = "O")]
    #[serde(rename = "O")]
    Other,
}

/// Client database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    /// Unique identifier for the client
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Registration number, e.g. `NRB/2025/03/4F2A9C`
    #[sea_orm(unique)]
    pub reg_no: String,
    pub first_name: String,
    pub last_name: String,
    /// Date of birth
    pub dob: Date,
    pub phone_number: String,
    pub email: String,
    /// Free-text location, matched case-insensitively against branch names
    pub location: String,
    pub gender: Gender,
    /// Free-text prescription the client brought from elsewhere
    pub previous_prescription: String,
    /// Display name of the staff member who registered the client
    pub registered_by: String,
    /// Number of examinations booked, starting at 1
    pub visit_count: i32,
    /// Date of the most recently completed examination
    pub last_examination_date: Option<Date>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Full name as shown on receipts and examination lists.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Defines relationships between Client and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One client has many examinations
    #[sea_orm(has_many = "super::examination::Entity")]
    Examinations,
}

impl Related<super::examination::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Examinations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
