//! Branch entity - Clinic locations used to qualify client registration numbers.
//!
//! Branches are reference data created by an administrator. The short `code`
//! prefixes every registration number issued to clients whose location matches
//! the branch name.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Branch database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "branches")]
pub struct Model {
    /// Unique identifier for the branch
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable branch name (e.g., "Nairobi CBD"), matched against client locations
    #[sea_orm(unique)]
    pub name: String,
    /// Short code (at most five characters) used in registration numbers
    #[sea_orm(unique)]
    pub code: String,
}

/// Branches are looked up by name only; no foreign keys point at them
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
