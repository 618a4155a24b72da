//! Client business logic - Registration, lookup and administration of clients.
//!
//! Registering a client assigns its registration number, inserts the client and
//! books the initial `Pending` examination in one transaction. Welcome and
//! booking messages go out after the commit.

use crate::{
    core::{examination, notify::Notifier, registration},
    entities::{
        Client, Examination, Sales, client, client::Gender, examination as exam_entity, sales,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::LikeExpr};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Input for registering a new client.
#[derive(Debug, Clone, Deserialize)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub phone_number: String,
    pub email: String,
    pub location: String,
    pub gender: Gender,
    #[serde(default)]
    pub previous_prescription: String,
}

impl NewClient {
    /// Field-level validation performed before any database access.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("phone_number", &self.phone_number),
            ("email", &self.email),
            ("location", &self.location),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(field, "This field may not be blank."));
            }
        }
        validate_email(&self.email)?;
        if self.dob > today {
            return Err(Error::validation("dob", "Date of birth cannot be in the future."));
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(Error::validation("email", "Enter a valid email address.")),
    }
}

/// Partial update of client details. The registration number is immutable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub gender: Option<Gender>,
    pub previous_prescription: Option<String>,
}

/// Whether a client owes money on any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    FullyPaid,
    PendingBalance,
}

/// Client with examinations and outstanding-balance information.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    #[serde(flatten)]
    pub client: client::Model,
    pub examinations: Vec<exam_entity::Model>,
    pub latest_examination_id: Option<i64>,
    /// Sum of the positive balances across the client's orders
    pub balance: f64,
    pub payment_status: BalanceStatus,
    pub latest_sales_id: Option<i64>,
}

/// Registers a client and books their first examination.
///
/// `registered_by` is the display name of the receptionist, captured as-is.
pub async fn register_client(
    db: &DatabaseConnection,
    notifier: &Notifier,
    input: NewClient,
    registered_by: &str,
) -> Result<(client::Model, exam_entity::Model)> {
    let now = Utc::now();
    input.validate(now.date_naive())?;

    let txn = db.begin().await?;

    let reg_no = registration::generate_reg_no(&txn, &input.location, now).await?;
    let new_client = client::ActiveModel {
        reg_no: Set(reg_no),
        first_name: Set(input.first_name.trim().to_string()),
        last_name: Set(input.last_name.trim().to_string()),
        dob: Set(input.dob),
        phone_number: Set(input.phone_number.trim().to_string()),
        email: Set(input.email.trim().to_string()),
        location: Set(input.location.trim().to_string()),
        gender: Set(input.gender),
        previous_prescription: Set(input.previous_prescription),
        registered_by: Set(registered_by.to_string()),
        visit_count: Set(1),
        last_examination_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let client = new_client.insert(&txn).await?;
    let exam = examination::insert_pending(&txn, client.id, now).await?;

    txn.commit().await?;

    info!(client_id = client.id, reg_no = %client.reg_no, registered_by, "Client registered");
    notifier.client_registered(&client).await;
    notifier.examination_booked(&client, &exam).await;
    Ok((client, exam))
}

/// Finds a client by ID.
pub async fn get_client_by_id(
    db: &DatabaseConnection,
    client_id: i64,
) -> Result<Option<client::Model>> {
    Client::find_by_id(client_id).one(db).await.map_err(Into::into)
}

/// Finds a client by ID, failing with `NotFound` when missing.
pub async fn require_client<C>(db: &C, client_id: i64) -> Result<client::Model>
where
    C: ConnectionTrait,
{
    Client::find_by_id(client_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Client", client_id))
}

/// `LIKE` pattern matching `query` anywhere, with `%`, `_` and `\` taken literally.
pub(crate) fn contains_pattern(query: &str) -> LikeExpr {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    LikeExpr::new(format!("%{escaped}%")).escape('\\')
}

/// Substring search over names, phone number, email and registration number.
///
/// Matching uses SQL `LIKE`, which is case-insensitive for ASCII on `SQLite`.
pub async fn search_clients(db: &DatabaseConnection, query: &str) -> Result<Vec<client::Model>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }
    Client::find()
        .filter(
            Condition::any()
                .add(client::Column::FirstName.like(contains_pattern(query)))
                .add(client::Column::LastName.like(contains_pattern(query)))
                .add(client::Column::PhoneNumber.like(contains_pattern(query)))
                .add(client::Column::Email.like(contains_pattern(query)))
                .add(client::Column::RegNo.like(contains_pattern(query))),
        )
        .order_by_desc(client::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists clients for administrators, optionally filtered by registration number or first name.
pub async fn list_clients(
    db: &DatabaseConnection,
    query: Option<&str>,
) -> Result<Vec<client::Model>> {
    let mut select = Client::find().order_by_desc(client::Column::CreatedAt);
    if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(client::Column::RegNo.like(contains_pattern(query)))
                .add(client::Column::FirstName.like(contains_pattern(query))),
        );
    }
    select.all(db).await.map_err(Into::into)
}

/// Builds the summary view of a client: examinations, outstanding balance and latest IDs.
pub async fn summarize(db: &DatabaseConnection, client: client::Model) -> Result<ClientSummary> {
    let examinations = Examination::find()
        .filter(exam_entity::Column::ClientId.eq(client.id))
        .order_by_desc(exam_entity::Column::ExaminationDate)
        .order_by_desc(exam_entity::Column::Id)
        .all(db)
        .await?;

    let exam_ids: Vec<i64> = examinations.iter().map(|e| e.id).collect();
    let orders = if exam_ids.is_empty() {
        Vec::new()
    } else {
        Sales::find()
            .filter(sales::Column::ExaminationId.is_in(exam_ids))
            .order_by_desc(sales::Column::CreatedAt)
            .order_by_desc(sales::Column::Id)
            .all(db)
            .await?
    };

    let balance = crate::core::sales::round_cents(
        orders
            .iter()
            .map(|s| s.balance_due)
            .filter(|b| *b > 0.0)
            .sum(),
    );
    let payment_status = if balance > 0.0 {
        BalanceStatus::PendingBalance
    } else {
        BalanceStatus::FullyPaid
    };

    Ok(ClientSummary {
        latest_examination_id: examinations.first().map(|e| e.id),
        latest_sales_id: orders.first().map(|s| s.id),
        client,
        examinations,
        balance,
        payment_status,
    })
}

/// Applies an administrator's partial update to a client.
pub async fn update_client(
    db: &DatabaseConnection,
    client_id: i64,
    update: ClientUpdate,
) -> Result<client::Model> {
    let existing = require_client(db, client_id).await?;
    let mut active: client::ActiveModel = existing.into();

    for (field, value) in [
        ("first_name", &update.first_name),
        ("last_name", &update.last_name),
        ("phone_number", &update.phone_number),
        ("email", &update.email),
        ("location", &update.location),
    ] {
        if value.as_ref().is_some_and(|v| v.trim().is_empty()) {
            return Err(Error::validation(field, "This field may not be blank."));
        }
    }
    if let Some(email) = &update.email {
        validate_email(email)?;
    }

    if let Some(v) = update.first_name {
        active.first_name = Set(v.trim().to_string());
    }
    if let Some(v) = update.last_name {
        active.last_name = Set(v.trim().to_string());
    }
    if let Some(v) = update.dob {
        active.dob = Set(v);
    }
    if let Some(v) = update.phone_number {
        active.phone_number = Set(v.trim().to_string());
    }
    if let Some(v) = update.email {
        active.email = Set(v.trim().to_string());
    }
    if let Some(v) = update.location {
        active.location = Set(v.trim().to_string());
    }
    if let Some(v) = update.gender {
        active.gender = Set(v);
    }
    if let Some(v) = update.previous_prescription {
        active.previous_prescription = Set(v);
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Deletes a client together with their examinations and orders.
pub async fn delete_client(db: &DatabaseConnection, client_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    require_client(&txn, client_id).await?;

    let exam_ids: Vec<i64> = Examination::find()
        .filter(exam_entity::Column::ClientId.eq(client_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|e| e.id)
        .collect();

    if !exam_ids.is_empty() {
        Sales::delete_many()
            .filter(sales::Column::ExaminationId.is_in(exam_ids))
            .exec(&txn)
            .await?;
    }
    Examination::delete_many()
        .filter(exam_entity::Column::ClientId.eq(client_id))
        .exec(&txn)
        .await?;
    Client::delete_by_id(client_id).exec(&txn).await?;

    txn.commit().await?;
    info!(client_id, "Client deleted");
    Ok(())
}
