//! Examination business logic - Booking visits and recording results.
//!
//! An examination is created `Pending` and moves to `Completed` when the
//! optometrist submits results. Completing an examination also stamps the
//! client's `last_examination_date` and raises `booked_for_sales`, all inside a
//! single database transaction. Re-booking a client adds a fresh `Pending`
//! examination and bumps the client's visit count.

use crate::{
    core::notify::Notifier,
    entities::{
        Client, Examination, Sales, client, examination,
        examination::ExaminationState, sales,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Placeholder visual acuity for eyes that have not been measured.
pub const UNMEASURED_VA: &str = "N/A";

const MAX_AXIS: i32 = 180;
const MAX_VA_LEN: usize = 20;

/// Results submitted when completing an examination. Every field is optional;
/// omitted fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExaminationResults {
    pub clinical_history: Option<String>,
    pub right_sph: Option<f64>,
    pub right_cyl: Option<f64>,
    pub right_axis: Option<i32>,
    pub right_add: Option<f64>,
    pub right_va: Option<String>,
    pub right_ipd: Option<f64>,
    pub left_sph: Option<f64>,
    pub left_cyl: Option<f64>,
    pub left_axis: Option<i32>,
    pub left_add: Option<f64>,
    pub left_va: Option<String>,
    pub left_ipd: Option<f64>,
}

impl ExaminationResults {
    /// Checks measurement ranges before anything is written.
    pub fn validate(&self) -> Result<()> {
        let measurements = [
            ("right_sph", self.right_sph),
            ("right_cyl", self.right_cyl),
            ("right_add", self.right_add),
            ("right_ipd", self.right_ipd),
            ("left_sph", self.left_sph),
            ("left_cyl", self.left_cyl),
            ("left_add", self.left_add),
            ("left_ipd", self.left_ipd),
        ];
        for (field, value) in measurements {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(Error::validation(field, "Must be a valid number"));
            }
        }

        for (field, axis) in [("right_axis", self.right_axis), ("left_axis", self.left_axis)] {
            if axis.is_some_and(|a| !(0..=MAX_AXIS).contains(&a)) {
                return Err(Error::validation(
                    field,
                    format!("Axis must be between 0 and {MAX_AXIS} degrees"),
                ));
            }
        }

        for (field, va) in [("right_va", &self.right_va), ("left_va", &self.left_va)] {
            if va.as_ref().is_some_and(|v| v.chars().count() > MAX_VA_LEN) {
                return Err(Error::validation(
                    field,
                    format!("Ensure this field has no more than {MAX_VA_LEN} characters"),
                ));
            }
        }
        Ok(())
    }

    fn apply(self, active: &mut examination::ActiveModel) {
        if let Some(history) = self.clinical_history {
            active.clinical_history = Set(history);
        }
        if let Some(v) = self.right_sph {
            active.right_sph = Set(Some(v));
        }
        if let Some(v) = self.right_cyl {
            active.right_cyl = Set(Some(v));
        }
        if let Some(v) = self.right_axis {
            active.right_axis = Set(Some(v));
        }
        if let Some(v) = self.right_add {
            active.right_add = Set(Some(v));
        }
        if let Some(v) = self.right_va {
            active.right_va = Set(v);
        }
        if let Some(v) = self.right_ipd {
            active.right_ipd = Set(Some(v));
        }
        if let Some(v) = self.left_sph {
            active.left_sph = Set(Some(v));
        }
        if let Some(v) = self.left_cyl {
            active.left_cyl = Set(Some(v));
        }
        if let Some(v) = self.left_axis {
            active.left_axis = Set(Some(v));
        }
        if let Some(v) = self.left_add {
            active.left_add = Set(Some(v));
        }
        if let Some(v) = self.left_va {
            active.left_va = Set(v);
        }
        if let Some(v) = self.left_ipd {
            active.left_ipd = Set(Some(v));
        }
    }
}

/// Examination joined with the client fields shown in examination lists.
#[derive(Debug, Clone, Serialize)]
pub struct ExaminationView {
    #[serde(flatten)]
    pub examination: examination::Model,
    pub client_name: Option<String>,
    pub client_reg_no: Option<String>,
    /// Who registered the client, not who examined them
    pub registered_by: Option<String>,
}

impl ExaminationView {
    fn new(examination: examination::Model, client: Option<client::Model>) -> Self {
        Self {
            client_name: client.as_ref().map(client::Model::full_name),
            client_reg_no: client.as_ref().map(|c| c.reg_no.clone()),
            registered_by: client.map(|c| c.registered_by),
            examination,
        }
    }
}

/// Inserts a new `Pending` examination for a client.
///
/// Used both for the initial examination at registration and for re-bookings;
/// callers run it inside their own transaction.
pub(crate) async fn insert_pending<C>(
    db: &C,
    client_id: i64,
    now: DateTime<Utc>,
) -> Result<examination::Model>
where
    C: ConnectionTrait,
{
    let exam = examination::ActiveModel {
        client_id: Set(client_id),
        examination_date: Set(now.date_naive()),
        examined_by: Set(String::new()),
        clinical_history: Set(String::new()),
        right_sph: Set(None),
        right_cyl: Set(None),
        right_axis: Set(None),
        right_add: Set(None),
        right_va: Set(UNMEASURED_VA.to_string()),
        right_ipd: Set(None),
        left_sph: Set(None),
        left_cyl: Set(None),
        left_axis: Set(None),
        left_add: Set(None),
        left_va: Set(UNMEASURED_VA.to_string()),
        left_ipd: Set(None),
        state: Set(ExaminationState::Pending),
        booked_for_sales: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    exam.insert(db).await.map_err(Into::into)
}

/// Finds an examination by its ID.
pub async fn get_examination_by_id(
    db: &DatabaseConnection,
    examination_id: i64,
) -> Result<Option<examination::Model>> {
    Examination::find_by_id(examination_id)
        .one(db)
        .await
        .map_err(Into::into)
}

async fn list_where(
    db: &DatabaseConnection,
    condition: Option<sea_orm::Condition>,
) -> Result<Vec<ExaminationView>> {
    let mut select = Examination::find()
        .find_also_related(Client)
        .order_by_desc(examination::Column::CreatedAt)
        .order_by_desc(examination::Column::Id);
    if let Some(condition) = condition {
        select = select.filter(condition);
    }
    let rows = select.all(db).await?;
    Ok(rows
        .into_iter()
        .map(|(exam, client)| ExaminationView::new(exam, client))
        .collect())
}

/// Lists every examination, newest first.
pub async fn list_examinations(db: &DatabaseConnection) -> Result<Vec<ExaminationView>> {
    list_where(db, None).await
}

/// Lists examinations still waiting for results.
pub async fn list_pending(db: &DatabaseConnection) -> Result<Vec<ExaminationView>> {
    list_where(
        db,
        Some(
            sea_orm::Condition::all()
                .add(examination::Column::State.eq(ExaminationState::Pending)),
        ),
    )
    .await
}

/// Lists completed examinations that have not been turned into an order yet.
pub async fn list_booked_for_sales(db: &DatabaseConnection) -> Result<Vec<ExaminationView>> {
    list_where(
        db,
        Some(
            sea_orm::Condition::all()
                .add(examination::Column::State.eq(ExaminationState::Completed))
                .add(examination::Column::BookedForSales.eq(true)),
        ),
    )
    .await
}

/// Lists a client's examinations, newest first.
pub async fn list_for_client(
    db: &DatabaseConnection,
    client_id: i64,
) -> Result<Vec<ExaminationView>> {
    Client::find_by_id(client_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Client", client_id))?;

    list_where(
        db,
        Some(sea_orm::Condition::all().add(examination::Column::ClientId.eq(client_id))),
    )
    .await
}

/// Records examination results and marks the examination `Completed`.
///
/// In the same transaction the client's `last_examination_date` is set to today
/// and `booked_for_sales` is raised, unless an order already exists for this
/// examination (results can be corrected after the sale without re-listing it).
pub async fn complete_examination(
    db: &DatabaseConnection,
    examination_id: i64,
    results: ExaminationResults,
    examined_by: &str,
) -> Result<examination::Model> {
    results.validate()?;

    let txn = db.begin().await?;

    let exam = Examination::find_by_id(examination_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Examination", examination_id))?;

    let has_sale = Sales::find()
        .filter(sales::Column::ExaminationId.eq(examination_id))
        .one(&txn)
        .await?
        .is_some();

    let now = Utc::now();
    let client_id = exam.client_id;
    let mut active: examination::ActiveModel = exam.into();
    results.apply(&mut active);
    active.examined_by = Set(examined_by.to_string());
    active.state = Set(ExaminationState::Completed);
    active.booked_for_sales = Set(!has_sale);
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    let client = Client::find_by_id(client_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Client", client_id))?;
    let mut client: client::ActiveModel = client.into();
    client.last_examination_date = Set(Some(now.date_naive()));
    client.updated_at = Set(now);
    client.update(&txn).await?;

    txn.commit().await?;

    info!(examination_id, examined_by, "Examination completed");
    Ok(updated)
}

/// Books an existing client for a new examination.
///
/// The client's `visit_count` is incremented atomically in SQL
/// (`visit_count = visit_count + 1`) so concurrent bookings cannot lose an update.
/// Earlier examinations are left untouched.
pub async fn book_examination(
    db: &DatabaseConnection,
    notifier: &Notifier,
    client_id: i64,
) -> Result<examination::Model> {
    let txn = db.begin().await?;

    Client::find_by_id(client_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Client", client_id))?;

    let now = Utc::now();
    Client::update_many()
        .col_expr(
            client::Column::VisitCount,
            Expr::col(client::Column::VisitCount).add(1),
        )
        .col_expr(client::Column::UpdatedAt, Expr::value(now))
        .filter(client::Column::Id.eq(client_id))
        .exec(&txn)
        .await?;

    let exam = insert_pending(&txn, client_id, now).await?;

    let client = Client::find_by_id(client_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Client", client_id))?;

    txn.commit().await?;

    info!(client_id, visit_count = client.visit_count, "Client booked for examination");
    notifier.examination_booked(&client, &exam).await;
    Ok(exam)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_results_validation_runs_before_database() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let results = ExaminationResults {
            right_axis: Some(190),
            ..Default::default()
        };
        let err = complete_examination(&db, 1, results, "Dr. Otto").await.unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "right_axis"));

        let results = ExaminationResults {
            left_sph: Some(f64::NAN),
            ..Default::default()
        };
        let err = complete_examination(&db, 1, results, "Dr. Otto").await.unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "left_sph"));
        Ok(())
    }

    #[tokio::test]
    async fn test_registration_creates_pending_examination() -> Result<()> {
        let (db, client, exam) = setup_with_client().await?;
        assert_eq!(exam.client_id, client.id);
        assert_eq!(exam.state, ExaminationState::Pending);
        assert!(!exam.booked_for_sales);
        assert_eq!(exam.right_va, UNMEASURED_VA);

        let pending = list_pending(&db).await?;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].client_reg_no.as_deref(), Some(client.reg_no.as_str()));
        assert_eq!(pending[0].client_name.as_deref(), Some("Jane Doe"));
        Ok(())
    }

    #[tokio::test]
    async fn test_completion_sets_flag_and_last_examination_date() -> Result<()> {
        let (db, client, exam) = setup_with_client().await?;
        assert!(client.last_examination_date.is_none());

        let results = ExaminationResults {
            clinical_history: Some("Blurred distance vision".to_string()),
            right_sph: Some(-1.25),
            right_axis: Some(90),
            left_va: Some("6/9".to_string()),
            ..Default::default()
        };
        let completed = complete_examination(&db, exam.id, results, "Otto Metrist").await?;

        assert_eq!(completed.state, ExaminationState::Completed);
        assert!(completed.booked_for_sales);
        assert_eq!(completed.examined_by, "Otto Metrist");
        assert_eq!(completed.right_sph, Some(-1.25));
        assert_eq!(completed.right_axis, Some(90));
        assert_eq!(completed.left_va, "6/9");
        assert_eq!(completed.right_va, UNMEASURED_VA);

        let client = Client::find_by_id(client.id).one(&db).await?.unwrap();
        assert_eq!(client.last_examination_date, Some(Utc::now().date_naive()));

        let booked = list_booked_for_sales(&db).await?;
        assert_eq!(booked.len(), 1);
        assert_eq!(booked[0].examination.id, exam.id);
        assert!(list_pending(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_unknown_examination_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let err = complete_examination(&db, 42, ExaminationResults::default(), "Otto")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Examination", .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_rebooking_increments_visit_count_once() -> Result<()> {
        let (db, client, first_exam) = setup_with_client().await?;
        assert_eq!(client.visit_count, 1);
        let first_exam =
            complete_examination(&db, first_exam.id, ExaminationResults::default(), "Otto")
                .await?;

        let notifier = test_notifier();
        let second_exam = book_examination(&db, &notifier, client.id).await?;

        assert_ne!(second_exam.id, first_exam.id);
        assert_eq!(second_exam.state, ExaminationState::Pending);

        let client = Client::find_by_id(client.id).one(&db).await?.unwrap();
        assert_eq!(client.visit_count, 2);

        let unchanged = get_examination_by_id(&db, first_exam.id).await?.unwrap();
        assert_eq!(unchanged.state, ExaminationState::Completed);
        assert!(unchanged.booked_for_sales);
        assert_eq!(unchanged.examined_by, first_exam.examined_by);
        assert_eq!(unchanged.client_id, client.id);

        assert_eq!(list_for_client(&db, client.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_rebooking_sends_confirmation() -> Result<()> {
        let (db, client, _) = setup_with_client().await?;
        let (notifier, recorder) = recording_notifier();

        book_examination(&db, &notifier, client.id).await?;

        let sent = recorder.messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("your examination is booked for"));
        Ok(())
    }

    #[tokio::test]
    async fn test_booking_unknown_client_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let err = book_examination(&db, &test_notifier(), 404).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Client", .. }));
        Ok(())
    }
}
