//! Examination entity - One clinic visit for a client.
//!
//! An examination starts `Pending` and becomes `Completed` once results are
//! submitted. `booked_for_sales` marks a completed examination that has not yet
//! been turned into an order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an examination
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ExaminationState {
    /// Booked, waiting for the optometrist
    #[sea_orm(string_value = "Pending")]
    Pending,
    /// Results recorded
    #[sea_orm(string_value = "Completed")]
    Completed,
}

/// Examination database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "examinations")]
pub struct Model {
    /// Unique identifier for the examination
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the client being examined
    pub client_id: i64,
    /// Date the examination was booked
    pub examination_date: Date,
    /// Display name of the optometrist who recorded the results
    pub examined_by: String,
    pub clinical_history: String,

    // Right eye
    pub right_sph: Option<f64>,
    pub right_cyl: Option<f64>,
    pub right_axis: Option<i32>,
    pub right_add: Option<f64>,
    pub right_va: String,
    pub right_ipd: Option<f64>,

    // Left eye
    pub left_sph: Option<f64>,
    pub left_cyl: Option<f64>,
    pub left_axis: Option<i32>,
    pub left_add: Option<f64>,
    pub left_va: String,
    pub left_ipd: Option<f64>,

    pub state: ExaminationState,
    /// True while the examination is completed but has no order yet
    pub booked_for_sales: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Examination and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each examination belongs to one client
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_delete = "Cascade"
    )]
    Client,
    /// At most one sale is made against an examination
    #[sea_orm(has_one = "super::sales::Entity")]
    Sales,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
