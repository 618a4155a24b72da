//! Sales business logic - Orders, balance payments and receipts.
//!
//! Every write recomputes the derived columns from the stored line items:
//!
//! - `total_price = frame_price * frame_quantity + lens_price * lens_quantity`
//! - `balance_due = max(0, total_price - advance_paid)`
//! - the three payment statuses, from `balance_due` and `advance_paid`
//!
//! Balance payments are incremental: the submitted amount is added to
//! `advance_paid`, it never replaces it. A payment larger than the balance, or
//! any change to an order whose balance is already zero, is rejected before
//! anything is written. Amounts are kept rounded to cents.

use crate::{
    core::{client::ClientSummary, notify::Notifier},
    entities::{
        Client, Examination, Sales, client, examination,
        sales::{self, PaymentMethod, PaymentStatus},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Rounds an amount to whole cents.
#[must_use]
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Order total from the frame and lens line items.
#[must_use]
pub fn compute_total(frame_price: f64, frame_quantity: i32, lens_price: f64, lens_quantity: i32) -> f64 {
    round_cents(
        frame_price * f64::from(frame_quantity) + lens_price * f64::from(lens_quantity),
    )
}

/// Outstanding balance, clamped at zero.
#[must_use]
pub fn compute_balance(total_price: f64, advance_paid: f64) -> f64 {
    round_cents((total_price - advance_paid).max(0.0))
}

/// The three payment statuses stored on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentStatuses {
    pub advance: PaymentStatus,
    pub balance: PaymentStatus,
    pub order: PaymentStatus,
}

impl PaymentStatuses {
    const fn all(status: PaymentStatus) -> Self {
        Self {
            advance: status,
            balance: status,
            order: status,
        }
    }
}

/// Derives the payment statuses from the balance and the amount paid so far.
///
/// Zero balance means everything is paid; otherwise any payment at all makes
/// the order partially paid, and no payment leaves it pending.
#[must_use]
pub fn derive_statuses(balance_due: f64, advance_paid: f64) -> PaymentStatuses {
    if balance_due <= 0.0 {
        PaymentStatuses::all(PaymentStatus::Paid)
    } else if advance_paid > 0.0 {
        PaymentStatuses::all(PaymentStatus::PartiallyPaid)
    } else {
        PaymentStatuses::all(PaymentStatus::Pending)
    }
}

/// Derived columns for an order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation {
    pub total_price: f64,
    pub advance_paid: f64,
    pub balance_due: f64,
    pub statuses: PaymentStatuses,
}

impl Reconciliation {
    /// Computes every derived column from the line items and the amount paid.
    #[must_use]
    pub fn compute(
        frame_price: f64,
        frame_quantity: i32,
        lens_price: f64,
        lens_quantity: i32,
        advance_paid: f64,
    ) -> Self {
        let total_price = compute_total(frame_price, frame_quantity, lens_price, lens_quantity);
        let advance_paid = round_cents(advance_paid);
        let balance_due = compute_balance(total_price, advance_paid);
        Self {
            total_price,
            advance_paid,
            balance_due,
            statuses: derive_statuses(balance_due, advance_paid),
        }
    }

    fn apply(self, active: &mut sales::ActiveModel) {
        active.total_price = Set(self.total_price);
        active.advance_paid = Set(self.advance_paid);
        active.balance_due = Set(self.balance_due);
        active.advance_payment_status = Set(self.statuses.advance);
        active.balance_payment_status = Set(self.statuses.balance);
        active.order_paid = Set(self.statuses.order);
    }
}

const fn default_quantity() -> i32 {
    1
}

/// Input for creating an order against an examination.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSale {
    #[serde(alias = "examination")]
    pub examination_id: i64,

    pub frame_brand: String,
    pub frame_model: String,
    pub frame_color: String,
    #[serde(default = "default_quantity")]
    pub frame_quantity: i32,
    #[serde(default)]
    pub frame_price: f64,

    pub lens_brand: String,
    pub lens_type: String,
    pub lens_material: String,
    pub lens_coating: String,
    #[serde(default = "default_quantity")]
    pub lens_quantity: i32,
    #[serde(default)]
    pub lens_price: f64,

    #[serde(default)]
    pub fitting_instructions: String,
    pub delivery_date: Option<NaiveDate>,
    /// Defaults to the acting staff member
    pub booked_by: Option<String>,
    /// Defaults to the acting staff member
    pub served_by: Option<String>,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,

    pub advance_payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub advance_paid: f64,
    pub mpesa_transaction_code: Option<String>,
}

const fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Cash
}

/// Changes submitted against an existing order.
///
/// `payment` (also accepted as `advance_paid`) is an incremental amount added
/// to what has been paid so far.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleUpdate {
    #[serde(alias = "advance_paid")]
    pub payment: Option<f64>,

    pub frame_brand: Option<String>,
    pub frame_model: Option<String>,
    pub frame_color: Option<String>,
    pub frame_quantity: Option<i32>,
    pub frame_price: Option<f64>,

    pub lens_brand: Option<String>,
    pub lens_type: Option<String>,
    pub lens_material: Option<String>,
    pub lens_coating: Option<String>,
    pub lens_quantity: Option<i32>,
    pub lens_price: Option<f64>,

    pub fitting_instructions: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub served_by: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub advance_payment_method: Option<PaymentMethod>,
    pub mpesa_transaction_code: Option<String>,
}

/// Snapshot of client, examination and order printed on a receipt.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub client: client::Model,
    pub examination: examination::Model,
    pub sale: sales::Model,
    pub issued_at: DateTime<Utc>,
}

fn validate_amount(field: &str, amount: f64) -> Result<()> {
    if !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }
    if amount < 0.0 {
        return Err(Error::validation(field, "Ensure this value is greater than or equal to 0."));
    }
    Ok(())
}

fn validate_quantity(field: &str, quantity: i32) -> Result<()> {
    if quantity < 0 {
        return Err(Error::validation(field, "Ensure this value is greater than or equal to 0."));
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "This field may not be blank."));
    }
    Ok(())
}

fn has_code(code: Option<&str>) -> bool {
    code.is_some_and(|c| !c.trim().is_empty())
}

/// Mobile-money advances must carry the transaction code.
fn validate_mpesa(method: Option<PaymentMethod>, code: Option<&str>) -> Result<()> {
    if method == Some(PaymentMethod::Mpesa) && !has_code(code) {
        return Err(Error::validation(
            "mpesa_transaction_code",
            "M-Pesa transaction code is required for M-Pesa payments.",
        ));
    }
    Ok(())
}

impl NewSale {
    /// Field-level validation performed before any database access.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("frame_brand", &self.frame_brand),
            ("frame_model", &self.frame_model),
            ("frame_color", &self.frame_color),
            ("lens_brand", &self.lens_brand),
            ("lens_type", &self.lens_type),
            ("lens_material", &self.lens_material),
            ("lens_coating", &self.lens_coating),
        ] {
            require_text(field, value)?;
        }
        validate_quantity("frame_quantity", self.frame_quantity)?;
        validate_quantity("lens_quantity", self.lens_quantity)?;
        validate_amount("frame_price", self.frame_price)?;
        validate_amount("lens_price", self.lens_price)?;
        validate_amount("advance_paid", self.advance_paid)?;
        validate_mpesa(
            self.advance_payment_method,
            self.mpesa_transaction_code.as_deref(),
        )
    }
}

impl SaleUpdate {
    /// Field-level validation performed before any database access.
    pub fn validate(&self) -> Result<()> {
        if let Some(payment) = self.payment {
            validate_amount("payment", payment)?;
        }
        for (field, value) in [
            ("frame_brand", &self.frame_brand),
            ("frame_model", &self.frame_model),
            ("frame_color", &self.frame_color),
            ("lens_brand", &self.lens_brand),
            ("lens_type", &self.lens_type),
            ("lens_material", &self.lens_material),
            ("lens_coating", &self.lens_coating),
            ("served_by", &self.served_by),
        ] {
            if let Some(value) = value {
                require_text(field, value)?;
            }
        }
        if let Some(q) = self.frame_quantity {
            validate_quantity("frame_quantity", q)?;
        }
        if let Some(q) = self.lens_quantity {
            validate_quantity("lens_quantity", q)?;
        }
        if let Some(p) = self.frame_price {
            validate_amount("frame_price", p)?;
        }
        if let Some(p) = self.lens_price {
            validate_amount("lens_price", p)?;
        }
        Ok(())
    }
}

/// Lists orders, most recent first.
pub async fn list_sales(db: &DatabaseConnection) -> Result<Vec<sales::Model>> {
    Sales::find()
        .order_by_desc(sales::Column::CreatedAt)
        .order_by_desc(sales::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an order by ID.
pub async fn get_sale_by_id(db: &DatabaseConnection, sale_id: i64) -> Result<Option<sales::Model>> {
    Sales::find_by_id(sale_id).one(db).await.map_err(Into::into)
}

async fn owner_of<C>(db: &C, examination_id: i64) -> Result<(examination::Model, client::Model)>
where
    C: ConnectionTrait,
{
    let exam = Examination::find_by_id(examination_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Examination", examination_id))?;
    let client = Client::find_by_id(exam.client_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Client", exam.client_id))?;
    Ok((exam, client))
}

/// A unique-index violation on insert means a concurrent order won the race.
fn insert_error(err: DbErr, examination_id: i64) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateSale { examination_id },
        _ => Error::from(err),
    }
}

/// Creates the order for a completed examination.
///
/// Rejects a second order for the same examination, both through an explicit
/// check and through the unique index on `examination_id`. On success the
/// examination leaves the booked-for-sales list and the client gets an order
/// confirmation.
pub async fn create_sale(
    db: &DatabaseConnection,
    notifier: &Notifier,
    input: NewSale,
    acting_staff: &str,
) -> Result<sales::Model> {
    input.validate()?;

    let reconciliation = Reconciliation::compute(
        input.frame_price,
        input.frame_quantity,
        input.lens_price,
        input.lens_quantity,
        input.advance_paid,
    );
    if reconciliation.advance_paid > reconciliation.total_price {
        return Err(Error::Overpayment {
            amount: reconciliation.advance_paid,
            balance_due: reconciliation.total_price,
        });
    }

    let examination_id = input.examination_id;
    let txn = db.begin().await?;

    let (exam, client) = owner_of(&txn, examination_id).await?;

    let existing = Sales::find()
        .filter(sales::Column::ExaminationId.eq(examination_id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(Error::DuplicateSale { examination_id });
    }

    let now = Utc::now();
    let mut new_sale = sales::ActiveModel {
        examination_id: Set(examination_id),
        frame_brand: Set(input.frame_brand.trim().to_string()),
        frame_model: Set(input.frame_model.trim().to_string()),
        frame_color: Set(input.frame_color.trim().to_string()),
        frame_quantity: Set(input.frame_quantity),
        frame_price: Set(round_cents(input.frame_price)),
        lens_brand: Set(input.lens_brand.trim().to_string()),
        lens_type: Set(input.lens_type.trim().to_string()),
        lens_material: Set(input.lens_material.trim().to_string()),
        lens_coating: Set(input.lens_coating.trim().to_string()),
        lens_quantity: Set(input.lens_quantity),
        lens_price: Set(round_cents(input.lens_price)),
        fitting_instructions: Set(input.fitting_instructions),
        delivery_date: Set(input.delivery_date),
        booked_by: Set(input.booked_by.unwrap_or_else(|| acting_staff.to_string())),
        served_by: Set(input.served_by.unwrap_or_else(|| acting_staff.to_string())),
        payment_method: Set(input.payment_method),
        advance_payment_method: Set(input.advance_payment_method),
        mpesa_transaction_code: Set(input.mpesa_transaction_code),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    reconciliation.apply(&mut new_sale);

    let sale = new_sale
        .insert(&txn)
        .await
        .map_err(|e| insert_error(e, examination_id))?;

    let mut exam: examination::ActiveModel = exam.into();
    exam.booked_for_sales = Set(false);
    exam.updated_at = Set(now);
    exam.update(&txn).await?;

    txn.commit().await?;

    info!(
        sale_id = sale.id,
        examination_id,
        total_price = sale.total_price,
        balance_due = sale.balance_due,
        "Sale created"
    );
    notifier.order_placed(&client, &sale).await;
    Ok(sale)
}

/// Records a balance payment and/or edits an order.
///
/// The payment is added to `advance_paid`. Orders with nothing left to pay
/// reject every change, and a payment above the outstanding balance is
/// rejected with the exact remaining amount. Rejections leave the order as it was.
pub async fn update_sale(
    db: &DatabaseConnection,
    notifier: &Notifier,
    sale_id: i64,
    update: SaleUpdate,
) -> Result<sales::Model> {
    update.validate()?;

    let txn = db.begin().await?;

    let sale = Sales::find_by_id(sale_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Sale", sale_id))?;

    if sale.balance_due <= 0.0 {
        return Err(Error::AlreadyPaid { sale_id });
    }

    let payment = round_cents(update.payment.unwrap_or(0.0));
    if payment > sale.balance_due {
        warn!(sale_id, payment, balance_due = sale.balance_due, "Rejected overpayment");
        return Err(Error::Overpayment {
            amount: payment,
            balance_due: sale.balance_due,
        });
    }

    let advance_method = update.advance_payment_method.or(sale.advance_payment_method);
    let code = update
        .mpesa_transaction_code
        .as_deref()
        .or(sale.mpesa_transaction_code.as_deref());
    validate_mpesa(advance_method, code)?;

    let frame_price = update.frame_price.map_or(sale.frame_price, round_cents);
    let frame_quantity = update.frame_quantity.unwrap_or(sale.frame_quantity);
    let lens_price = update.lens_price.map_or(sale.lens_price, round_cents);
    let lens_quantity = update.lens_quantity.unwrap_or(sale.lens_quantity);
    let reconciliation = Reconciliation::compute(
        frame_price,
        frame_quantity,
        lens_price,
        lens_quantity,
        sale.advance_paid + payment,
    );

    let (_, client) = owner_of(&txn, sale.examination_id).await?;

    let mut active: sales::ActiveModel = sale.into();
    if let Some(v) = update.frame_brand {
        active.frame_brand = Set(v.trim().to_string());
    }
    if let Some(v) = update.frame_model {
        active.frame_model = Set(v.trim().to_string());
    }
    if let Some(v) = update.frame_color {
        active.frame_color = Set(v.trim().to_string());
    }
    if let Some(v) = update.lens_brand {
        active.lens_brand = Set(v.trim().to_string());
    }
    if let Some(v) = update.lens_type {
        active.lens_type = Set(v.trim().to_string());
    }
    if let Some(v) = update.lens_material {
        active.lens_material = Set(v.trim().to_string());
    }
    if let Some(v) = update.lens_coating {
        active.lens_coating = Set(v.trim().to_string());
    }
    if let Some(v) = update.fitting_instructions {
        active.fitting_instructions = Set(v);
    }
    if let Some(v) = update.delivery_date {
        active.delivery_date = Set(Some(v));
    }
    if let Some(v) = update.served_by {
        active.served_by = Set(v.trim().to_string());
    }
    if let Some(v) = update.payment_method {
        active.payment_method = Set(v);
    }
    if let Some(v) = update.advance_payment_method {
        active.advance_payment_method = Set(Some(v));
    }
    if let Some(v) = update.mpesa_transaction_code {
        active.mpesa_transaction_code = Set(Some(v));
    }
    active.frame_price = Set(frame_price);
    active.frame_quantity = Set(frame_quantity);
    active.lens_price = Set(lens_price);
    active.lens_quantity = Set(lens_quantity);
    reconciliation.apply(&mut active);
    active.updated_at = Set(Utc::now());

    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!(
        sale_id,
        payment,
        advance_paid = updated.advance_paid,
        balance_due = updated.balance_due,
        status = updated.order_paid.label(),
        "Sale updated"
    );
    notifier.payment_updated(&client, &updated).await;
    Ok(updated)
}

/// Builds the receipt projection for an order.
pub async fn get_receipt(db: &DatabaseConnection, sale_id: i64) -> Result<Receipt> {
    let sale = get_sale_by_id(db, sale_id)
        .await?
        .ok_or_else(|| Error::not_found("Sale", sale_id))?;
    let (examination, client) = owner_of(db, sale.examination_id).await?;
    Ok(Receipt {
        client,
        examination,
        sale,
        issued_at: Utc::now(),
    })
}

/// Clients matching `query` who still owe money, with their balance summary.
pub async fn search_outstanding_balances(
    db: &DatabaseConnection,
    query: &str,
) -> Result<Vec<ClientSummary>> {
    let mut results = Vec::new();
    for client in crate::core::client::search_clients(db, query).await? {
        let summary = crate::core::client::summarize(db, client).await?;
        if summary.balance > 0.0 {
            results.push(summary);
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::client::BalanceStatus;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_reconciliation_scenario() {
        let r = Reconciliation::compute(100.0, 2, 50.0, 1, 0.0);
        assert_eq!(r.total_price, 250.0);
        assert_eq!(r.balance_due, 250.0);
        assert_eq!(r.statuses, PaymentStatuses::all(PaymentStatus::Pending));

        let r = Reconciliation::compute(100.0, 2, 50.0, 1, 100.0);
        assert_eq!(r.balance_due, 150.0);
        assert_eq!(r.statuses.balance, PaymentStatus::PartiallyPaid);
        assert_eq!(r.statuses.order, PaymentStatus::PartiallyPaid);

        let r = Reconciliation::compute(100.0, 2, 50.0, 1, 250.0);
        assert_eq!(r.balance_due, 0.0);
        assert_eq!(r.statuses, PaymentStatuses::all(PaymentStatus::Paid));
    }

    #[test]
    fn test_balance_is_clamped_at_zero() {
        assert_eq!(compute_balance(100.0, 120.0), 0.0);
        let r = Reconciliation::compute(10.0, 1, 0.0, 0, 25.0);
        assert_eq!(r.balance_due, 0.0);
        assert_eq!(r.statuses.order, PaymentStatus::Paid);
    }

    #[test]
    fn test_cents_do_not_drift() {
        assert_eq!(compute_total(0.1, 1, 0.2, 1), 0.3);
        assert_eq!(compute_balance(0.3, 0.1), 0.2);
    }

    #[tokio::test]
    async fn test_mpesa_without_code_is_rejected() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let mut input = sample_new_sale(1);
        input.advance_payment_method = Some(PaymentMethod::Mpesa);
        input.advance_paid = 50.0;
        input.mpesa_transaction_code = None;

        let err = create_sale(&db, &test_notifier(), input, "Sam Sales")
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Validation { ref field, .. } if field == "mpesa_transaction_code")
        );

        let mut input = sample_new_sale(1);
        input.advance_payment_method = Some(PaymentMethod::Mpesa);
        input.mpesa_transaction_code = Some("   ".to_string());
        assert!(input.validate().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_amounts_are_rejected() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut input = sample_new_sale(1);
        input.frame_price = f64::NAN;
        let err = create_sale(&db, &test_notifier(), input, "Sam").await.unwrap_err();
        assert!(matches!(err, Error::InvalidAmount { .. }));

        let mut input = sample_new_sale(1);
        input.lens_quantity = -1;
        let err = create_sale(&db, &test_notifier(), input, "Sam").await.unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "lens_quantity"));

        let update = SaleUpdate {
            payment: Some(-5.0),
            ..Default::default()
        };
        let err = update_sale(&db, &test_notifier(), 1, update).await.unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "payment"));
        Ok(())
    }

    #[tokio::test]
    async fn test_advance_larger_than_total_is_rejected() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let mut input = sample_new_sale(1);
        input.advance_paid = 251.0;

        let err = create_sale(&db, &test_notifier(), input, "Sam").await.unwrap_err();
        assert!(matches!(err, Error::Overpayment { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_sale_computes_totals_and_clears_booking() -> Result<()> {
        let (db, _, exam) = setup_with_completed_examination().await?;
        assert!(exam.booked_for_sales);
        let (notifier, recorder) = recording_notifier();

        let sale = create_sale(&db, &notifier, sample_new_sale(exam.id), "Sam Sales").await?;

        assert_eq!(sale.total_price, 250.0);
        assert_eq!(sale.advance_paid, 0.0);
        assert_eq!(sale.balance_due, 250.0);
        assert_eq!(sale.advance_payment_status, PaymentStatus::Pending);
        assert_eq!(sale.balance_payment_status, PaymentStatus::Pending);
        assert_eq!(sale.order_paid, PaymentStatus::Pending);
        assert_eq!(sale.booked_by, "Sam Sales");
        assert_eq!(sale.served_by, "Sam Sales");

        let exam = Examination::find_by_id(exam.id).one(&db).await?.unwrap();
        assert!(!exam.booked_for_sales);
        assert!(
            crate::core::examination::list_booked_for_sales(&db)
                .await?
                .is_empty()
        );

        let sent = recorder.messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("Total: 250.00, Balance: 250.00"));
        assert!(sent[0].1.ends_with("Payment method: Cash."));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_sale_with_advance() -> Result<()> {
        let (db, _, exam) = setup_with_completed_examination().await?;
        let mut input = sample_new_sale(exam.id);
        input.advance_payment_method = Some(PaymentMethod::Mpesa);
        input.mpesa_transaction_code = Some("QFT12ABC34".to_string());
        input.advance_paid = 100.0;

        let sale = create_sale(&db, &test_notifier(), input, "Sam").await?;
        assert_eq!(sale.advance_paid, 100.0);
        assert_eq!(sale.balance_due, 150.0);
        assert_eq!(sale.advance_payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(sale.order_paid, PaymentStatus::PartiallyPaid);
        Ok(())
    }

    #[tokio::test]
    async fn test_second_sale_for_examination_is_rejected() -> Result<()> {
        let (db, _, exam) = setup_with_completed_examination().await?;
        let first = create_test_sale(&db, exam.id).await?;

        let mut second = sample_new_sale(exam.id);
        second.frame_brand = "Other".to_string();
        let err = create_sale(&db, &test_notifier(), second, "Sam")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSale { examination_id } if examination_id == exam.id));

        let untouched = get_sale_by_id(&db, first.id).await?.unwrap();
        assert_eq!(untouched.frame_brand, first.frame_brand);
        assert_eq!(list_sales(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unique_index_rejects_second_sale() -> Result<()> {
        let (db, _, exam) = setup_with_completed_examination().await?;
        let first = create_test_sale(&db, exam.id).await?;

        // Bypasses the pre-check, as a concurrent request would
        let mut second: sales::ActiveModel = first.into();
        second.id = sea_orm::ActiveValue::NotSet;
        let err = second.insert(&db).await.unwrap_err();

        assert!(matches!(
            insert_error(err, exam.id),
            Error::DuplicateSale { examination_id } if examination_id == exam.id
        ));
        assert_eq!(list_sales(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_sale_survives_notification_failure() -> Result<()> {
        let (db, _, exam) = setup_with_completed_examination().await?;

        let sale = create_sale(&db, &failing_notifier(), sample_new_sale(exam.id), "Sam").await?;

        let stored = get_sale_by_id(&db, sale.id).await?.unwrap();
        assert_eq!(stored.total_price, 250.0);
        let exam = Examination::find_by_id(exam.id).one(&db).await?.unwrap();
        assert!(!exam.booked_for_sales);
        Ok(())
    }

    #[tokio::test]
    async fn test_sale_for_unknown_examination_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let err = create_sale(&db, &test_notifier(), sample_new_sale(77), "Sam")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Examination", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_balance_payments_until_paid() -> Result<()> {
        let (db, _, exam) = setup_with_completed_examination().await?;
        let sale = create_test_sale(&db, exam.id).await?;
        let (notifier, recorder) = recording_notifier();

        let sale = update_sale(
            &db,
            &notifier,
            sale.id,
            SaleUpdate {
                payment: Some(100.0),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(sale.advance_paid, 100.0);
        assert_eq!(sale.balance_due, 150.0);
        assert_eq!(sale.balance_payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(sale.order_paid, PaymentStatus::PartiallyPaid);

        let sale = update_sale(
            &db,
            &notifier,
            sale.id,
            SaleUpdate {
                payment: Some(150.0),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(sale.advance_paid, 250.0);
        assert_eq!(sale.balance_due, 0.0);
        assert_eq!(sale.advance_payment_status, PaymentStatus::Paid);
        assert_eq!(sale.balance_payment_status, PaymentStatus::Paid);
        assert_eq!(sale.order_paid, PaymentStatus::Paid);

        let sent = recorder.messages();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].1.contains("Partially Paid. Balance Due: 150.00"));
        assert!(sent[1].1.contains("Your order is now complete"));

        let err = update_sale(
            &db,
            &notifier,
            sale.id,
            SaleUpdate {
                payment: Some(1.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::AlreadyPaid { .. }));

        let unchanged = get_sale_by_id(&db, sale.id).await?.unwrap();
        assert_eq!(unchanged.advance_paid, 250.0);
        assert_eq!(unchanged.balance_due, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_overpayment_is_rejected_without_changes() -> Result<()> {
        let (db, _, exam) = setup_with_completed_examination().await?;
        let sale = create_test_sale(&db, exam.id).await?;

        let err = update_sale(
            &db,
            &test_notifier(),
            sale.id,
            SaleUpdate {
                payment: Some(250.01),
                frame_brand: Some("Changed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Overpayment { balance_due, .. } if balance_due == 250.0));
        assert!(err.to_string().contains("250.00"));

        let unchanged = get_sale_by_id(&db, sale.id).await?.unwrap();
        assert_eq!(unchanged.advance_paid, 0.0);
        assert_eq!(unchanged.balance_due, 250.0);
        assert_eq!(unchanged.frame_brand, sale.frame_brand);
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_recomputes_totals() -> Result<()> {
        let (db, _, exam) = setup_with_completed_examination().await?;
        let sale = create_test_sale(&db, exam.id).await?;

        let sale = update_sale(
            &db,
            &test_notifier(),
            sale.id,
            SaleUpdate {
                payment: Some(50.0),
                lens_quantity: Some(2),
                fitting_instructions: Some("High fitting".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(sale.total_price, 300.0);
        assert_eq!(sale.advance_paid, 50.0);
        assert_eq!(sale.balance_due, 250.0);
        assert_eq!(sale.fitting_instructions, "High fitting");
        Ok(())
    }

    #[tokio::test]
    async fn test_switching_advance_to_mpesa_needs_code() -> Result<()> {
        let (db, _, exam) = setup_with_completed_examination().await?;
        let sale = create_test_sale(&db, exam.id).await?;

        let err = update_sale(
            &db,
            &test_notifier(),
            sale.id,
            SaleUpdate {
                payment: Some(10.0),
                advance_payment_method: Some(PaymentMethod::Mpesa),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_unknown_sale_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let err = update_sale(&db, &test_notifier(), 9, SaleUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Sale", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_payment_survives_notification_failure() -> Result<()> {
        let (db, _, exam) = setup_with_completed_examination().await?;
        let sale = create_test_sale(&db, exam.id).await?;

        let updated = update_sale(
            &db,
            &failing_notifier(),
            sale.id,
            SaleUpdate {
                payment: Some(20.0),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.balance_due, 230.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_receipt_and_balance_search() -> Result<()> {
        let (db, client, exam) = setup_with_completed_examination().await?;
        let sale = create_test_sale(&db, exam.id).await?;

        let receipt = get_receipt(&db, sale.id).await?;
        assert_eq!(receipt.client.id, client.id);
        assert_eq!(receipt.examination.id, exam.id);
        assert_eq!(receipt.sale.id, sale.id);

        let owing = search_outstanding_balances(&db, "jane").await?;
        assert_eq!(owing.len(), 1);
        assert_eq!(owing[0].balance, 250.0);
        assert_eq!(owing[0].payment_status, BalanceStatus::PendingBalance);
        assert_eq!(owing[0].latest_sales_id, Some(sale.id));

        update_sale(
            &db,
            &test_notifier(),
            sale.id,
            SaleUpdate {
                payment: Some(250.0),
                ..Default::default()
            },
        )
        .await?;
        assert!(search_outstanding_balances(&db, "jane").await?.is_empty());

        assert!(matches!(
            get_receipt(&db, 999).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
