//! Shared test utilities for the clinic backend.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test records with sensible defaults.

use crate::{
    core::{
        branch::{self, NewBranch},
        client::{self, NewClient},
        examination::{self, ExaminationResults},
        notify::{MessageSender, Notifier},
        sales::{self, NewSale},
        staff::{self, NewStaff},
    },
    entities::{self, client::Gender, user_account::Role},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use std::sync::{Arc, Mutex};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a branch with the given name and code.
pub async fn create_test_branch(
    db: &DatabaseConnection,
    name: &str,
    code: &str,
) -> Result<entities::branch::Model> {
    branch::create_branch(
        db,
        NewBranch {
            name: name.to_string(),
            code: code.to_string(),
        },
    )
    .await
}

/// Creates an active, non-admin staff account named after its role.
pub async fn create_test_staff(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
) -> Result<entities::user_account::Model> {
    staff::create_staff(
        db,
        NewStaff {
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: role.as_str().to_string(),
            role,
            is_staff: false,
            is_superuser: false,
        },
    )
    .await
}

/// Creates an active administrator account.
pub async fn create_test_admin(
    db: &DatabaseConnection,
    email: &str,
) -> Result<entities::user_account::Model> {
    staff::create_staff(
        db,
        NewStaff {
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Admin".to_string(),
            role: Role::Staff,
            is_staff: true,
            is_superuser: false,
        },
    )
    .await
}

/// Registration input for "Jane Doe" at `location`.
pub fn sample_new_client(location: &str) -> NewClient {
    NewClient {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        dob: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap_or_default(),
        phone_number: "0712345678".to_string(),
        email: "jane.doe@example.com".to_string(),
        location: location.to_string(),
        gender: Gender::Female,
        previous_prescription: String::new(),
    }
}

/// Unsaved client model, for code that only formats client data.
pub fn sample_client() -> entities::client::Model {
    let now = Utc::now();
    entities::client::Model {
        id: 1,
        reg_no: "NRB/2026/01/ABC123".to_string(),
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        dob: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap_or_default(),
        phone_number: "0712345678".to_string(),
        email: "jane.doe@example.com".to_string(),
        location: "Nairobi CBD".to_string(),
        gender: Gender::Female,
        previous_prescription: String::new(),
        registered_by: "Rita Reception".to_string(),
        visit_count: 1,
        last_examination_date: None,
        created_at: now,
        updated_at: now,
    }
}

/// Order input of 2 frames at 100.00 and 1 lens pair at 50.00 (total 250.00).
pub fn sample_new_sale(examination_id: i64) -> NewSale {
    NewSale {
        examination_id,
        frame_brand: "Ray-Ban".to_string(),
        frame_model: "RB5154".to_string(),
        frame_color: "Black".to_string(),
        frame_quantity: 2,
        frame_price: 100.0,
        lens_brand: "Essilor".to_string(),
        lens_type: "Single Vision".to_string(),
        lens_material: "Polycarbonate".to_string(),
        lens_coating: "Anti-Reflective".to_string(),
        lens_quantity: 1,
        lens_price: 50.0,
        fitting_instructions: String::new(),
        delivery_date: None,
        booked_by: None,
        served_by: None,
        payment_method: entities::sales::PaymentMethod::Cash,
        advance_payment_method: None,
        advance_paid: 0.0,
        mpesa_transaction_code: None,
    }
}

/// Sender that records every message instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    /// Messages sent so far as `(phone_number, message)` pairs.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, phone_number: &str, message: &str) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((phone_number.to_string(), message.to_string()));
        }
        Ok(())
    }
}

/// Sender whose every delivery fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSender;

#[async_trait]
impl MessageSender for FailingSender {
    async fn send(&self, _phone_number: &str, _message: &str) -> Result<()> {
        Err(Error::Notification {
            message: "gateway unavailable".to_string(),
        })
    }
}

pub fn test_notifier() -> Notifier {
    Notifier::logging("Iris")
}

pub fn recording_notifier() -> (Notifier, Arc<RecordingSender>) {
    let recorder = Arc::new(RecordingSender::default());
    (Notifier::new(recorder.clone(), "Iris"), recorder)
}

pub fn failing_notifier() -> Notifier {
    Notifier::new(Arc::new(FailingSender), "Iris")
}

/// Registers "Jane Doe" and returns the client with her initial pending examination.
pub async fn setup_with_client() -> Result<(
    DatabaseConnection,
    entities::client::Model,
    entities::examination::Model,
)> {
    let db = setup_test_db().await?;
    let (client, exam) = client::register_client(
        &db,
        &test_notifier(),
        sample_new_client("Nairobi CBD"),
        "Rita Reception",
    )
    .await?;
    Ok((db, client, exam))
}

/// Like [`setup_with_client`], with the examination already completed.
pub async fn setup_with_completed_examination() -> Result<(
    DatabaseConnection,
    entities::client::Model,
    entities::examination::Model,
)> {
    let (db, client, exam) = setup_with_client().await?;
    let results = ExaminationResults {
        right_sph: Some(-1.0),
        left_sph: Some(-0.75),
        ..Default::default()
    };
    let exam = examination::complete_examination(&db, exam.id, results, "Otto Metrist").await?;
    let client = client::get_client_by_id(&db, client.id)
        .await?
        .ok_or_else(|| Error::not_found("Client", client.id))?;
    Ok((db, client, exam))
}

/// Creates the sample order (total 250.00, nothing paid) for an examination.
pub async fn create_test_sale(
    db: &DatabaseConnection,
    examination_id: i64,
) -> Result<entities::sales::Model> {
    sales::create_sale(db, &test_notifier(), sample_new_sale(examination_id), "Sam Sales").await
}
