//! Sales entity - The order placed after a completed examination.
//!
//! `total_price`, `balance_due` and the three status columns are derived values;
//! they are recomputed by `core::sales` on every write and never taken from input.
//! `examination_id` is unique so the store rejects a second order for the same
//! examination even when two requests race past the existence check.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Accepted payment methods
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "Cash")]
    Cash,
    /// Mobile money; requires a transaction code when used for the advance
    #[sea_orm(string_value = "Mpesa")]
    Mpesa,
    #[sea_orm(string_value = "Card")]
    Card,
    #[sea_orm(string_value = "Bank")]
    Bank,
    #[sea_orm(string_value = "Insurance")]
    Insurance,
}

impl PaymentMethod {
    /// Value stored in the database and shown in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::Mpesa => "Mpesa",
            Self::Card => "Card",
            Self::Bank => "Bank",
            Self::Insurance => "Insurance",
        }
    }
}

/// Payment progress of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Partially Paid")]
    #[serde(rename = "Partially Paid")]
    PartiallyPaid,
    #[sea_orm(string_value = "Paid")]
    Paid,
}

impl PaymentStatus {
    /// Human-readable label, identical to the stored value.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::PartiallyPaid => "Partially Paid",
            Self::Paid => "Paid",
        }
    }
}

/// Sales database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    /// Unique identifier for the sale
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the examination this order was made against
    #[sea_orm(unique)]
    pub examination_id: i64,

    // Frame
    pub frame_brand: String,
    pub frame_model: String,
    pub frame_color: String,
    pub frame_quantity: i32,
    pub frame_price: f64,

    // Lens
    pub lens_brand: String,
    pub lens_type: String,
    pub lens_material: String,
    pub lens_coating: String,
    pub lens_quantity: i32,
    pub lens_price: f64,

    // Order
    pub fitting_instructions: String,
    pub delivery_date: Option<Date>,
    /// Display name of the staff member who booked the order
    pub booked_by: String,
    /// Display name of the staff member who served the client
    pub served_by: String,
    pub payment_method: PaymentMethod,

    // Payment
    pub total_price: f64,
    pub advance_payment_method: Option<PaymentMethod>,
    /// Cumulative amount paid towards the order
    pub advance_paid: f64,
    /// Outstanding amount, never negative
    pub balance_due: f64,
    pub advance_payment_status: PaymentStatus,
    pub balance_payment_status: PaymentStatus,
    pub order_paid: PaymentStatus,
    pub mpesa_transaction_code: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Sales and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each sale belongs to one examination
    #[sea_orm(
        belongs_to = "super::examination::Entity",
        from = "Column::ExaminationId",
        to = "super::examination::Column::Id",
        on_delete = "Cascade"
    )]
    Examination,
}

impl Related<super::examination::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Examination.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
