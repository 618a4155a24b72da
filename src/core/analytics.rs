//! Usage analytics - Request counters, dashboard totals and business reports.

use crate::{
    core::sales::round_cents,
    entities::{
        ApiRequestLog, Branch, Client, Examination, Sales, UserAccount, api_request_log, client,
        client::Gender, examination, sales, sales::PaymentMethod, user_account,
    },
    errors::Result,
};
use chrono::{DateTime, Datelike, Days, NaiveTime, Utc};
use sea_orm::{Iterable, QueryOrder, Set, SqlErr, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Increments the counter for `(method, endpoint)`, creating it on first use.
///
/// The increment is a single `UPDATE ... SET count = count + 1`, so concurrent
/// requests never lose counts. A concurrent first insert that loses the race on
/// the unique index falls back to the increment.
pub async fn record_request(
    db: &DatabaseConnection,
    method: &str,
    endpoint: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    if increment(db, method, endpoint, at).await? {
        return Ok(());
    }

    let row = api_request_log::ActiveModel {
        method: Set(method.to_string()),
        endpoint: Set(endpoint.to_string()),
        count: Set(1),
        last_requested: Set(at),
        created_at: Set(at),
        ..Default::default()
    };
    match row.insert(db).await {
        Ok(_) => {
            debug!(method, endpoint, "Created request counter");
            Ok(())
        }
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            increment(db, method, endpoint, at).await.map(|_| ())
        }
        Err(e) => Err(e.into()),
    }
}

async fn increment(
    db: &DatabaseConnection,
    method: &str,
    endpoint: &str,
    at: DateTime<Utc>,
) -> Result<bool> {
    let result = ApiRequestLog::update_many()
        .col_expr(
            api_request_log::Column::Count,
            Expr::col(api_request_log::Column::Count).add(1),
        )
        .col_expr(api_request_log::Column::LastRequested, Expr::value(at))
        .filter(api_request_log::Column::Method.eq(method))
        .filter(api_request_log::Column::Endpoint.eq(endpoint))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// All request counters, most recently requested first.
pub async fn list_request_logs(db: &DatabaseConnection) -> Result<Vec<api_request_log::Model>> {
    ApiRequestLog::find()
        .order_by_desc(api_request_log::Column::LastRequested)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records created within one reporting range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RangeCounts {
    pub clients: u64,
    pub examinations: u64,
    pub sales: u64,
}

/// Headline numbers for the administrator dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_clients: u64,
    pub total_examinations: u64,
    pub total_active_staff: u64,
    pub total_sales: u64,
    pub total_branches: u64,
    pub today: RangeCounts,
    /// Since Monday of the current week
    pub this_week: RangeCounts,
    pub this_month: RangeCounts,
}

/// Start of the day, week (Monday) and month containing `now`, in UTC.
fn range_starts(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let week = today
        .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
        .unwrap_or(today);
    let month = today.with_day(1).unwrap_or(today);
    let midnight = |date: chrono::NaiveDate| date.and_time(NaiveTime::MIN).and_utc();
    (midnight(today), midnight(week), midnight(month))
}

async fn counts_since(db: &DatabaseConnection, since: DateTime<Utc>) -> Result<RangeCounts> {
    Ok(RangeCounts {
        clients: Client::find()
            .filter(client::Column::CreatedAt.gte(since))
            .count(db)
            .await?,
        examinations: Examination::find()
            .filter(examination::Column::CreatedAt.gte(since))
            .count(db)
            .await?,
        sales: Sales::find()
            .filter(sales::Column::CreatedAt.gte(since))
            .count(db)
            .await?,
    })
}

/// Computes the dashboard totals relative to `now`.
pub async fn dashboard_summary(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<DashboardSummary> {
    let (day, week, month) = range_starts(now);
    Ok(DashboardSummary {
        total_clients: Client::find().count(db).await?,
        total_examinations: Examination::find().count(db).await?,
        total_active_staff: UserAccount::find()
            .filter(user_account::Column::IsActive.eq(true))
            .count(db)
            .await?,
        total_sales: Sales::find().count(db).await?,
        total_branches: Branch::find().count(db).await?,
        today: counts_since(db, day).await?,
        this_week: counts_since(db, week).await?,
        this_month: counts_since(db, month).await?,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchClients {
    pub branch_code: String,
    pub clients: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchSales {
    pub branch_code: String,
    pub sales: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentMethodSales {
    pub payment_method: PaymentMethod,
    pub sales: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenderCount {
    pub gender: Gender,
    pub clients: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySales {
    /// `YYYY-MM`
    pub month: String,
    pub sales: u64,
    pub revenue: f64,
}

/// Aggregate business report. Revenue is the sum of order totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub clients_per_branch: Vec<BranchClients>,
    pub sales_per_branch: Vec<BranchSales>,
    pub sales_by_payment_method: Vec<PaymentMethodSales>,
    pub gender_distribution: Vec<GenderCount>,
    pub monthly_sales: Vec<MonthlySales>,
}

/// Branch code embedded in a registration number (`NRB/2025/03/...` → `NRB`).
#[must_use]
pub fn branch_code_of(reg_no: &str) -> &str {
    reg_no.split('/').next().unwrap_or(reg_no)
}

#[derive(Default)]
struct Tally {
    count: u64,
    revenue: f64,
}

impl Tally {
    fn add(&mut self, amount: f64) {
        self.count += 1;
        self.revenue += amount;
    }
}

/// Builds the aggregate report over every client and sale.
pub async fn analytics_report(db: &DatabaseConnection) -> Result<AnalyticsReport> {
    let clients = Client::find().all(db).await?;
    let exam_owner: HashMap<i64, i64> = Examination::find()
        .all(db)
        .await?
        .into_iter()
        .map(|e| (e.id, e.client_id))
        .collect();
    let sales = Sales::find().all(db).await?;

    let mut clients_per_branch: BTreeMap<&str, u64> = BTreeMap::new();
    let mut genders: HashMap<Gender, u64> = HashMap::new();
    let mut branch_of_client: HashMap<i64, &str> = HashMap::new();
    for c in &clients {
        let code = branch_code_of(&c.reg_no);
        *clients_per_branch.entry(code).or_default() += 1;
        *genders.entry(c.gender).or_default() += 1;
        branch_of_client.insert(c.id, code);
    }

    let mut per_branch: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut per_method: HashMap<PaymentMethod, Tally> = HashMap::new();
    let mut per_month: BTreeMap<String, Tally> = BTreeMap::new();
    for sale in &sales {
        let code = exam_owner
            .get(&sale.examination_id)
            .and_then(|client_id| branch_of_client.get(client_id))
            .copied()
            .unwrap_or("unknown");
        per_branch.entry(code).or_default().add(sale.total_price);
        per_method
            .entry(sale.payment_method)
            .or_default()
            .add(sale.total_price);
        per_month
            .entry(sale.created_at.format("%Y-%m").to_string())
            .or_default()
            .add(sale.total_price);
    }

    Ok(AnalyticsReport {
        clients_per_branch: clients_per_branch
            .into_iter()
            .map(|(code, clients)| BranchClients {
                branch_code: code.to_string(),
                clients,
            })
            .collect(),
        sales_per_branch: per_branch
            .into_iter()
            .map(|(code, t)| BranchSales {
                branch_code: code.to_string(),
                sales: t.count,
                revenue: round_cents(t.revenue),
            })
            .collect(),
        sales_by_payment_method: PaymentMethod::iter()
            .filter_map(|method| {
                per_method.remove(&method).map(|t| PaymentMethodSales {
                    payment_method: method,
                    sales: t.count,
                    revenue: round_cents(t.revenue),
                })
            })
            .collect(),
        gender_distribution: Gender::iter()
            .map(|gender| GenderCount {
                gender,
                clients: genders.get(&gender).copied().unwrap_or(0),
            })
            .collect(),
        monthly_sales: per_month
            .into_iter()
            .map(|(month, t)| MonthlySales {
                month,
                sales: t.count,
                revenue: round_cents(t.revenue),
            })
            .collect(),
    })
}
